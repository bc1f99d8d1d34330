//! The output sink the ticker loop streams ticks to. Production
//! deployments implement this over their own WebSocket/HTTP transport;
//! this crate supplies only the trait boundary and an in-memory sink for
//! tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::bar::Bar;
use crate::persistence::model::SymbolId;

/// One emission from the replay controller's ticker loop.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplayTick {
    pub bars: HashMap<SymbolId, Vec<Bar>>,
}

/// Where the ticker loop writes ticks. The out-of-scope WebSocket/HTTP
/// transport is the production implementation of this trait.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn send(&self, tick: ReplayTick);
}

/// An [`OutputSink`] that simply accumulates ticks, for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    ticks: tokio::sync::Mutex<Vec<ReplayTick>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ticks(&self) -> Vec<ReplayTick> {
        self.ticks.lock().await.clone()
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn send(&self, tick: ReplayTick) {
        self.ticks.lock().await.push(tick);
    }
}

//! TTL-guarded cache for [`symbol_date_ranges`](crate::bar_source::BarStore::symbol_date_ranges),
//! matching the original's single-mutex, one-hour-TTL cache.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::bar_source::{BarStore, SymbolDateRange};
use crate::error::BarSourceError;

const TTL: Duration = Duration::from_secs(3_600);

struct CacheState {
    ranges: Vec<SymbolDateRange>,
    fetched_at: Instant,
}

/// Caches [`BarStore::symbol_date_ranges`] results for one hour behind a
/// single mutex.
pub struct SymbolDateRangeCache {
    state: Mutex<Option<CacheState>>,
}

impl SymbolDateRangeCache {
    pub fn new() -> Self {
        Self { state: Mutex::new(None) }
    }

    /// Returns the cached ranges if fresher than the TTL, otherwise queries
    /// `store` and refreshes the cache.
    pub async fn get<S: BarStore>(&self, store: &S) -> Result<Vec<SymbolDateRange>, BarSourceError> {
        {
            let guard = self.state.lock();
            if let Some(cached) = guard.as_ref() {
                if cached.fetched_at.elapsed() < TTL {
                    tracing::debug!("symbol date range cache hit");
                    return Ok(cached.ranges.clone());
                }
            }
        }

        tracing::debug!("symbol date range cache miss, refreshing");
        let ranges = store.symbol_date_ranges().await?;
        *self.state.lock() = Some(CacheState { ranges: ranges.clone(), fetched_at: Instant::now() });
        Ok(ranges)
    }
}

impl Default for SymbolDateRangeCache {
    fn default() -> Self {
        Self::new()
    }
}

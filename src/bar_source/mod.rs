//! The bar source: queries and assembles OHLCV bars at arbitrary
//! timeframes against an underlying time-series store, with tail
//! composition and Regular Trading Hours masking.

pub mod aggregator;
pub mod cache;
pub mod query;

pub use aggregator::Aggregator;
pub use cache::SymbolDateRangeCache;

use chrono::{DateTime, Utc};

use crate::bar::Bar;
use crate::error::BarSourceError;
use crate::persistence::model::SymbolId;
use crate::time::Timeframe;

/// The inclusive date range over which a symbol has data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolDateRange {
    pub symbol_id: SymbolId,
    pub earliest_millis: i64,
    pub latest_millis: i64,
}

/// The external time-series collaborator the aggregator composes queries
/// against. One method per physical table family the original's
/// TimescaleDB-backed `BarData` queried; implementations talk whatever
/// storage engine they like, the aggregator never constructs SQL itself.
#[async_trait::async_trait]
pub trait BarStore: Send + Sync {
    async fn query_seconds(&self, symbol_id: SymbolId, start: DateTime<Utc>, end: DateTime<Utc>, bucket: Timeframe) -> Result<Vec<Bar>, BarSourceError>;

    async fn query_minutes(&self, symbol_id: SymbolId, start: DateTime<Utc>, end: DateTime<Utc>, bucket: Timeframe) -> Result<Vec<Bar>, BarSourceError>;

    async fn query_daily(&self, symbol_id: SymbolId, start: DateTime<Utc>, end: DateTime<Utc>, rth: Option<crate::time::RthProfile>) -> Result<Vec<Bar>, BarSourceError>;

    async fn last_prices(&self, end: DateTime<Utc>, symbol_ids: &[SymbolId]) -> Result<Vec<(SymbolId, rust_decimal::Decimal)>, BarSourceError>;

    async fn symbol_date_ranges(&self) -> Result<Vec<SymbolDateRange>, BarSourceError>;
}

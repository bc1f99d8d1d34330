//! Exercises the bar aggregator's tail-query composition end to end against
//! a scripted [`BarStore`], rather than unit-testing `merge_tail` in
//! isolation (see `src/bar_source/aggregator.rs`'s own tests for that).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use tapecore::bar::Bar;
use tapecore::bar_source::{Aggregator, BarStore, SymbolDateRange};
use tapecore::config::{EngineConfig, ReplayConfig, SymbolReference};
use tapecore::error::BarSourceError;
use tapecore::persistence::model::SymbolId;
use tapecore::time::{RthProfile, TimeUnit, Timeframe};

struct ScriptedStore {
    minute_calls: AtomicUsize,
    second_calls: AtomicUsize,
    minute_bar: Bar,
    second_bars: Vec<Bar>,
}

#[async_trait]
impl BarStore for ScriptedStore {
    async fn query_seconds(&self, _: SymbolId, _: DateTime<Utc>, _: DateTime<Utc>, _: Timeframe) -> Result<Vec<Bar>, BarSourceError> {
        self.second_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.second_bars.clone())
    }

    async fn query_minutes(&self, _: SymbolId, _: DateTime<Utc>, _: DateTime<Utc>, _: Timeframe) -> Result<Vec<Bar>, BarSourceError> {
        self.minute_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.minute_bar])
    }

    async fn query_daily(&self, _: SymbolId, _: DateTime<Utc>, _: DateTime<Utc>, _: Option<RthProfile>) -> Result<Vec<Bar>, BarSourceError> {
        Ok(vec![])
    }

    async fn last_prices(&self, _: DateTime<Utc>, _: &[SymbolId]) -> Result<Vec<(SymbolId, rust_decimal::Decimal)>, BarSourceError> {
        Ok(vec![])
    }

    async fn symbol_date_ranges(&self) -> Result<Vec<SymbolDateRange>, BarSourceError> {
        Ok(vec![])
    }
}

fn config() -> EngineConfig {
    let mut symbols = HashMap::new();
    symbols.insert(SymbolId(1), SymbolReference { rth_profile: RthProfile::Standard, tick_value_multiplier: dec!(1) });
    EngineConfig { replay: ReplayConfig::default(), symbols }
}

#[tokio::test]
async fn get_bars_between_folds_sub_minute_tail_into_running_minute_bar() {
    let minute_open = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
    let minute_bar = Bar { date_millis: minute_open.timestamp_millis(), open: dec!(100), high: dec!(101), low: dec!(99), close: dec!(100), volume: 5 };

    let tail_start = minute_open + chrono::Duration::seconds(5);
    let second_bars = vec![Bar { date_millis: tail_start.timestamp_millis(), open: dec!(100), high: dec!(102), low: dec!(100), close: dec!(101), volume: 2 }];

    let store = Arc::new(ScriptedStore {
        minute_calls: AtomicUsize::new(0),
        second_calls: AtomicUsize::new(0),
        minute_bar,
        second_bars,
    });
    let aggregator = Aggregator::new(store.clone(), Arc::new(config()));

    let end = minute_open + chrono::Duration::seconds(15);
    let bars = aggregator.get_bars_between(SymbolId(1), Timeframe::new(1, TimeUnit::Minute), minute_open, end, true).await.unwrap();

    assert_eq!(store.minute_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.second_calls.load(Ordering::SeqCst), 1);
    // The tail falls within the same 1-minute bucket as the main bar, so it
    // combines rather than appending a second bar.
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].high, dec!(102));
    assert_eq!(bars[0].close, dec!(101));
    assert_eq!(bars[0].volume, 7);
}

#[tokio::test]
async fn get_bars_between_skips_sub_minute_tail_when_end_is_minute_aligned() {
    let minute_open = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
    let minute_bar = Bar { date_millis: minute_open.timestamp_millis(), open: dec!(100), high: dec!(101), low: dec!(99), close: dec!(100), volume: 5 };

    let store = Arc::new(ScriptedStore {
        minute_calls: AtomicUsize::new(0),
        second_calls: AtomicUsize::new(0),
        minute_bar,
        second_bars: vec![],
    });
    let aggregator = Aggregator::new(store.clone(), Arc::new(config()));

    let end = minute_open + chrono::Duration::minutes(1);
    let bars = aggregator.get_bars_between(SymbolId(1), Timeframe::new(1, TimeUnit::Minute), minute_open, end, false).await.unwrap();

    assert_eq!(store.second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(bars.len(), 1);
}

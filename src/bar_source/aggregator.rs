//! Composes the bar source's tail queries into one gap-free series at an
//! arbitrary timeframe, honoring RTH masking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::bar::Bar;
use crate::bar_source::query::{needs_end_of_day_partial, needs_sub_minute_tail};
use crate::bar_source::{BarStore, SymbolDateRange};
use crate::config::EngineConfig;
use crate::error::BarSourceError;
use crate::persistence::model::SymbolId;
use crate::time::{
    is_same_day, is_same_group_of_hours, is_same_group_of_minutes, is_same_month, is_same_week, round_up_time,
    combine_bars, TimeUnit, Timeframe,
};

/// Composes queries against a [`BarStore`] into the tail-query/merge
/// algorithm the bar source is specified by.
pub struct Aggregator<S: BarStore> {
    store: Arc<S>,
    config: Arc<EngineConfig>,
}

impl<S: BarStore> Aggregator<S> {
    pub fn new(store: Arc<S>, config: Arc<EngineConfig>) -> Self {
        Self { store, config }
    }

    /// Serves bars for `symbol_id` at `tf` over `(start, end]`, composing
    /// the main rolled-up query with the end-of-day partial and sub-minute
    /// tail queries, masked by RTH when `rth` is set.
    pub async fn get_bars_between(
        &self,
        symbol_id: SymbolId,
        tf: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rth: bool,
    ) -> Result<Vec<Bar>, BarSourceError> {
        let rth_profile = self
            .config
            .symbol(symbol_id)
            .map(|r| r.rth_profile)
            .ok_or(BarSourceError::UnknownRthProfile(symbol_id.0))?;
        let filter = rth.then_some(rth_profile);

        let end_minute_aligned = end.timestamp() % 60 == 0;

        let main_query = self.main_query(symbol_id, tf, start, end, filter);
        let eod_query = self.end_of_day_partial(symbol_id, tf, end, filter);
        let tail_query = self.sub_minute_tail(symbol_id, tf, end, end_minute_aligned, filter);

        let (main, eod, tail) = futures::join!(main_query, eod_query, tail_query);
        let mut bars = main?;

        if let Some(eod_bar) = eod? {
            tracing::debug!(symbol = symbol_id.0, %tf, "end-of-day partial tail applied");
            merge_tail(&mut bars, eod_bar, tf);
        }
        if let Some(tail_bar) = tail? {
            tracing::debug!(symbol = symbol_id.0, %tf, "sub-minute tail applied");
            merge_tail(&mut bars, tail_bar, tf);
        }

        Ok(bars)
    }

    async fn main_query(
        &self,
        symbol_id: SymbolId,
        tf: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rth: Option<crate::time::RthProfile>,
    ) -> Result<Vec<Bar>, BarSourceError> {
        match tf.unit {
            TimeUnit::Second => self.store.query_seconds(symbol_id, start, end, tf).await,
            TimeUnit::Minute | TimeUnit::Hour => self.store.query_minutes(symbol_id, start, end, tf).await,
            TimeUnit::Day | TimeUnit::Week | TimeUnit::Month => {
                let day_bound = end - Duration::milliseconds(end.timestamp_millis() % Duration::days(1).num_milliseconds());
                self.store.query_daily(symbol_id, start, day_bound, rth).await
            }
        }
    }

    async fn end_of_day_partial(
        &self,
        symbol_id: SymbolId,
        tf: Timeframe,
        end: DateTime<Utc>,
        rth: Option<crate::time::RthProfile>,
    ) -> Result<Option<Bar>, BarSourceError> {
        if !needs_end_of_day_partial(tf) {
            return Ok(None);
        }
        let day_start = end - Duration::milliseconds(end.timestamp_millis().rem_euclid(Duration::days(1).num_milliseconds()));
        let minute_bars = self
            .store
            .query_minutes(symbol_id, day_start, end, Timeframe::new(1, TimeUnit::Minute))
            .await?;
        let filtered: Vec<Bar> = match rth {
            Some(profile) => minute_bars
                .into_iter()
                .filter(|b| profile.contains(DateTime::from_timestamp_millis(b.date_millis).unwrap_or(end)))
                .collect(),
            None => minute_bars,
        };
        Ok(fold_bars(&filtered))
    }

    async fn sub_minute_tail(
        &self,
        symbol_id: SymbolId,
        tf: Timeframe,
        end: DateTime<Utc>,
        end_is_minute_aligned: bool,
        rth: Option<crate::time::RthProfile>,
    ) -> Result<Option<Bar>, BarSourceError> {
        if !needs_sub_minute_tail(tf, end_is_minute_aligned) {
            return Ok(None);
        }
        let minute_floor = end - Duration::milliseconds(end.timestamp_millis().rem_euclid(60_000));
        let second_bars = self
            .store
            .query_seconds(symbol_id, minute_floor, end, Timeframe::new(1, TimeUnit::Second))
            .await?;
        let filtered: Vec<Bar> = match rth {
            Some(profile) => second_bars
                .into_iter()
                .filter(|b| profile.contains(DateTime::from_timestamp_millis(b.date_millis).unwrap_or(end)))
                .collect(),
            None => second_bars,
        };
        Ok(fold_bars(&filtered))
    }

    pub async fn symbol_date_ranges(&self) -> Result<Vec<SymbolDateRange>, BarSourceError> {
        self.store.symbol_date_ranges().await
    }
}

fn fold_bars(bars: &[Bar]) -> Option<Bar> {
    let mut iter = bars.iter();
    let first = *iter.next()?;
    Some(iter.fold(first, |acc, b| combine_bars(&acc, b)))
}

/// Merges `tail` into `bars` following the unit-specific combine-or-append
/// policy.
fn merge_tail(bars: &mut Vec<Bar>, tail: Bar, tf: Timeframe) {
    let Some(last) = bars.last().copied() else {
        bars.push(tail);
        return;
    };
    let last_dt = DateTime::from_timestamp_millis(last.date_millis).unwrap_or_else(Utc::now);
    let tail_dt = DateTime::from_timestamp_millis(tail.date_millis).unwrap_or_else(Utc::now);

    let should_combine = match tf.unit {
        TimeUnit::Day => is_same_day(last_dt, tail_dt),
        TimeUnit::Week => is_same_week(last_dt, tail_dt),
        TimeUnit::Month => is_same_month(last_dt, tail_dt),
        TimeUnit::Minute => is_same_group_of_minutes(last_dt, tail_dt, tf.value),
        TimeUnit::Hour => is_same_group_of_hours(last_dt, tail_dt, tf.value),
        TimeUnit::Second => false,
    };

    if should_combine {
        *bars.last_mut().expect("checked non-empty above") = combine_bars(&last, &tail);
    } else if matches!(tf.unit, TimeUnit::Minute | TimeUnit::Hour) {
        let mut rounded = tail;
        rounded.date_millis = round_up_time(tail_dt, tf).timestamp_millis();
        bars.push(rounded);
    } else {
        bars.push(tail);
    }
}

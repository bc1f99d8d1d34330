//! Selects which underlying table family and RTH predicate a request maps
//! to, given a [`Timeframe`]'s unit.

use crate::time::{RthProfile, TimeUnit, Timeframe};

/// Which physical table family backs a given [`Timeframe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFamily {
    Seconds,
    Minutes,
    Daily,
}

/// `true` if the bucketing function needs its interval adjusted back by one
/// base unit before bucketing (the original's `-1 second`/`-1 minute`
/// adjustment, which compensates for `time_bucket` keying by interval
/// start while this crate's [`Bar::date_millis`](crate::bar::Bar) is an
/// interval end).
pub fn bucket_needs_adjustment(unit: TimeUnit) -> bool {
    matches!(unit, TimeUnit::Second | TimeUnit::Minute | TimeUnit::Hour)
}

pub fn table_family(tf: Timeframe) -> TableFamily {
    match tf.unit {
        TimeUnit::Second => TableFamily::Seconds,
        TimeUnit::Minute | TimeUnit::Hour => TableFamily::Minutes,
        TimeUnit::Day | TimeUnit::Week | TimeUnit::Month => TableFamily::Daily,
    }
}

/// Row cap applied to the main rolled-up query, matching the original's
/// fixed 5,000-row limit.
pub const MAIN_QUERY_ROW_LIMIT: usize = 5_000;

/// Whether the end-of-day partial tail query is needed for this timeframe.
pub fn needs_end_of_day_partial(tf: Timeframe) -> bool {
    matches!(tf.unit, TimeUnit::Day | TimeUnit::Week | TimeUnit::Month)
}

/// Whether the sub-minute tail query is needed: any unit coarser than
/// seconds, when the request's end isn't minute-aligned.
pub fn needs_sub_minute_tail(tf: Timeframe, end_is_minute_aligned: bool) -> bool {
    tf.unit != TimeUnit::Second && !end_is_minute_aligned
}

/// Applies an `rth` request flag to derive the concrete filter to use for
/// a daily-or-coarser query: `Some(profile)` selects the RTH-specific daily
/// table, `None` selects the unfiltered table.
pub fn daily_rth_filter(rth: bool, profile: RthProfile) -> Option<RthProfile> {
    rth.then_some(profile)
}

//! Timeframe parsing, duration math, and the calendar helpers the bar
//! aggregator and replay controller share: week/month/day/hour-group
//! comparisons, RTH session windows, and the `/inc-date` vocabulary.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::BarSourceError;

/// Timezone the underlying OHLCV tables are keyed by, following the data
/// vendor's convention.
pub const DATA_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Timezone the exchange's Regular Trading Hours session and market-open
/// wall-clock time (09:30) are expressed in.
pub const EXCHANGE_TIMEZONE: Tz = chrono_tz::America::New_York;

/// One unit of a [`Timeframe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum TimeUnit {
    #[display("s")]
    Second,
    #[display("m")]
    Minute,
    #[display("h")]
    Hour,
    #[display("d")]
    Day,
    #[display("w")]
    Week,
    #[display("mo")]
    Month,
}

impl TimeUnit {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "s" => Some(Self::Second),
            "m" => Some(Self::Minute),
            "h" => Some(Self::Hour),
            "d" => Some(Self::Day),
            "w" => Some(Self::Week),
            "mo" => Some(Self::Month),
            _ => None,
        }
    }
}

/// A bar width: a positive multiple of one [`TimeUnit`] (e.g. `5m`, `1d`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    pub value: u32,
    pub unit: TimeUnit,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

impl Timeframe {
    pub fn new(value: u32, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    /// Parses timeframe strings of the shape `<digits><unit>`, e.g. `"1m"`,
    /// `"15m"`, `"4h"`, `"1d"`, `"1w"`, `"1mo"`.
    pub fn parse(s: &str) -> Result<Self, BarSourceError> {
        let split_at = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| BarSourceError::InvalidTimeframe(s.to_string()))?;
        let (digits, unit_str) = s.split_at(split_at);
        let value: u32 = digits
            .parse()
            .map_err(|_| BarSourceError::InvalidTimeframe(s.to_string()))?;
        if value == 0 {
            return Err(BarSourceError::InvalidTimeframe(s.to_string()));
        }
        let unit = TimeUnit::from_str(unit_str)
            .ok_or_else(|| BarSourceError::InvalidTimeframe(s.to_string()))?;
        Ok(Self { value, unit })
    }

    /// `true` when this timeframe carries no meaningful width (used by the
    /// replay controller to treat an unset frame as "not yet configured").
    pub fn is_empty(&self) -> bool {
        self.value == 0
    }

    /// The fixed-length duration of one bar of this timeframe. `mo` is
    /// treated as a flat 30 days for duration math; see
    /// [`Timeframe::is_same_month`] for the calendar-aware comparison used
    /// elsewhere.
    pub fn duration(&self) -> Duration {
        let base = match self.unit {
            TimeUnit::Second => Duration::seconds(1),
            TimeUnit::Minute => Duration::minutes(1),
            TimeUnit::Hour => Duration::hours(1),
            TimeUnit::Day => Duration::hours(24),
            TimeUnit::Week => Duration::days(7),
            TimeUnit::Month => Duration::days(30),
        };
        base * self.value as i32
    }

    pub fn millis(&self) -> i64 {
        self.duration().num_milliseconds()
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self { value: 0, unit: TimeUnit::Minute }
    }
}

/// Merges two adjacent bars into one, keeping `a`'s open and date, `b`'s
/// close, the widened high/low, and summed volume.
pub fn combine_bars(a: &crate::bar::Bar, b: &crate::bar::Bar) -> crate::bar::Bar {
    crate::bar::Bar {
        date_millis: a.date_millis,
        open: a.open,
        high: a.high.max(b.high),
        low: a.low.min(b.low),
        close: b.close,
        volume: a.volume + b.volume,
    }
}

/// Normalizes a weekday so that the week starts on Monday (`0`) through
/// Sunday (`6`), matching the original's `(weekday+6)%7` trick applied to a
/// Go `time.Weekday` whose zero value is Sunday.
fn week_index(d: Weekday) -> i64 {
    d.num_days_from_monday() as i64
}

/// `true` iff both instants fall within the same Monday-to-Sunday week.
pub fn is_same_week(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    let start_of_week = |dt: DateTime<Utc>| dt.date_naive() - Duration::days(week_index(dt.weekday()));
    start_of_week(a) == start_of_week(b)
}

/// `true` iff both instants fall within the same calendar month.
pub fn is_same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// `true` iff both instants fall within the same calendar day.
pub fn is_same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

/// `true` iff both instants, after subtracting one minute (matching the
/// original's off-by-one bucket alignment), fall in the same group of
/// `group_size` minutes.
pub fn is_same_group_of_minutes(a: DateTime<Utc>, b: DateTime<Utc>, group_size: u32) -> bool {
    let bucket = |dt: DateTime<Utc>| {
        let adjusted = dt - Duration::minutes(1);
        let total_minutes = adjusted.timestamp() / 60;
        total_minutes / group_size as i64
    };
    bucket(a) == bucket(b)
}

/// `true` iff both instants, after subtracting one minute, fall in the same
/// group of `group_size` hours.
pub fn is_same_group_of_hours(a: DateTime<Utc>, b: DateTime<Utc>, group_size: u32) -> bool {
    let bucket = |dt: DateTime<Utc>| {
        let adjusted = dt - Duration::minutes(1);
        let total_hours = adjusted.timestamp() / 3600;
        total_hours / group_size as i64
    };
    bucket(a) == bucket(b)
}

/// Rounds `dt` up to the next boundary of `tf`, used when a sub-minute tail
/// bar cannot be combined with the running main bar.
pub fn round_up_time(dt: DateTime<Utc>, tf: Timeframe) -> DateTime<Utc> {
    let millis = tf.millis().max(1);
    let ts = dt.timestamp_millis();
    let rounded = ((ts + millis - 1) / millis) * millis;
    DateTime::from_timestamp_millis(rounded).unwrap_or(dt)
}

/// One of three Regular Trading Hours session-window profiles a symbol may
/// be assigned to, each a set of wall-clock `(start, end)` minute-of-day
/// pairs in [`EXCHANGE_TIMEZONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RthProfile {
    /// Core session 09:00-14:00, plus an 08:30-09:00 pre-open partial and a
    /// 15:00-15:15 post-close partial.
    Standard,
    /// Core session 09:00-12:00, plus an 08:00-09:00 pre-open partial and a
    /// 13:00-13:30 post-close partial.
    Extended,
    /// Core session 08:00-13:00, plus a 07:20-08:00 pre-open partial and an
    /// exact 14:00 post-close tick.
    PreMarket,
}

/// A wall-clock `(start, end)` minute-of-day window, both ends inclusive of
/// the start minute and exclusive of the end minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start_minute_of_day: u32,
    pub end_minute_of_day: u32,
}

impl RthProfile {
    /// The session windows that together make up this profile's trading day,
    /// in chronological order.
    pub fn windows(self) -> &'static [SessionWindow] {
        const STANDARD: [SessionWindow; 3] = [
            SessionWindow { start_minute_of_day: 8 * 60 + 30, end_minute_of_day: 9 * 60 },
            SessionWindow { start_minute_of_day: 9 * 60, end_minute_of_day: 14 * 60 },
            SessionWindow { start_minute_of_day: 15 * 60, end_minute_of_day: 15 * 60 + 15 },
        ];
        const EXTENDED: [SessionWindow; 3] = [
            SessionWindow { start_minute_of_day: 8 * 60, end_minute_of_day: 9 * 60 },
            SessionWindow { start_minute_of_day: 9 * 60, end_minute_of_day: 12 * 60 },
            SessionWindow { start_minute_of_day: 13 * 60, end_minute_of_day: 13 * 60 + 30 },
        ];
        const PRE_MARKET: [SessionWindow; 3] = [
            SessionWindow { start_minute_of_day: 7 * 60 + 20, end_minute_of_day: 8 * 60 },
            SessionWindow { start_minute_of_day: 8 * 60, end_minute_of_day: 13 * 60 },
            SessionWindow { start_minute_of_day: 14 * 60, end_minute_of_day: 14 * 60 },
        ];
        match self {
            Self::Standard => &STANDARD,
            Self::Extended => &EXTENDED,
            Self::PreMarket => &PRE_MARKET,
        }
    }

    /// `true` if `dt` (interpreted in [`EXCHANGE_TIMEZONE`]) falls within any
    /// of this profile's session windows.
    pub fn contains(self, dt: DateTime<Utc>) -> bool {
        let local = dt.with_timezone(&EXCHANGE_TIMEZONE);
        let minute_of_day = local.hour() * 60 + local.minute();
        self.windows().iter().any(|w| {
            if w.start_minute_of_day == w.end_minute_of_day {
                minute_of_day == w.start_minute_of_day
            } else {
                minute_of_day >= w.start_minute_of_day && minute_of_day < w.end_minute_of_day
            }
        })
    }
}

/// The `/inc-date` increment vocabulary: truncating minute/hour buckets plus
/// `next`, which advances to the next weekday's market open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum DateIncrement {
    #[display("1m")]
    OneMinute,
    #[display("5m")]
    FiveMinutes,
    #[display("15m")]
    FifteenMinutes,
    #[display("30m")]
    ThirtyMinutes,
    #[display("1h")]
    OneHour,
    #[display("2h")]
    TwoHours,
    #[display("4h")]
    FourHours,
    #[display("next")]
    NextSession,
}

impl DateIncrement {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "1m" => Self::OneMinute,
            "5m" => Self::FiveMinutes,
            "15m" => Self::FifteenMinutes,
            "30m" => Self::ThirtyMinutes,
            "1h" => Self::OneHour,
            "2h" => Self::TwoHours,
            "4h" => Self::FourHours,
            "next" => Self::NextSession,
            _ => return None,
        })
    }

    /// Applies this increment to `current`, returning the new simulated
    /// date. Minute/hour increments add the increment then truncate down to
    /// its own boundary; `next` advances to the next weekday (skipping
    /// Saturday/Sunday) at 09:30 exchange-local time.
    pub fn apply(self, current: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::OneMinute => truncate_minutes(current + Duration::minutes(1), 1),
            Self::FiveMinutes => truncate_minutes(current + Duration::minutes(5), 5),
            Self::FifteenMinutes => truncate_minutes(current + Duration::minutes(15), 15),
            Self::ThirtyMinutes => truncate_minutes(current + Duration::minutes(30), 30),
            Self::OneHour => truncate_minutes(current + Duration::minutes(60), 60),
            Self::TwoHours => truncate_minutes(current + Duration::minutes(120), 120),
            Self::FourHours => truncate_minutes(current + Duration::minutes(240), 240),
            Self::NextSession => next_session_open(current),
        }
    }
}

fn truncate_minutes(dt: DateTime<Utc>, group: i64) -> DateTime<Utc> {
    let ts = dt.timestamp();
    let truncated = (ts / (group * 60)) * (group * 60);
    Utc.timestamp_opt(truncated, 0).single().unwrap_or(dt)
}

fn next_session_open(current: DateTime<Utc>) -> DateTime<Utc> {
    let local = current.with_timezone(&EXCHANGE_TIMEZONE);
    let mut next_day = local.date_naive() + Duration::days(1);
    match next_day.weekday() {
        Weekday::Sat => next_day += Duration::days(2),
        Weekday::Sun => next_day += Duration::days(1),
        _ => {}
    }
    let open = next_day.and_hms_opt(9, 30, 0).expect("valid time");
    EXCHANGE_TIMEZONE
        .from_local_datetime(&open)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

//! OHLCV [`Bar`] and the dummy-bar sentinel used to signal "time advanced,
//! no data" downstream.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. `date_millis` is the *end* timestamp of the bar's
/// interval, not its start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date_millis: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl Bar {
    /// A sentinel bar carrying only a date, used by the replay controller
    /// when an interval has elapsed but no underlying bar exists for it.
    pub fn dummy(date_millis: i64) -> Self {
        Self {
            date_millis,
            open: Decimal::ZERO,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            close: Decimal::ZERO,
            volume: -1,
        }
    }

    /// `true` for a [`Bar::dummy`] sentinel.
    pub fn is_dummy(&self) -> bool {
        self.volume == -1
    }
}

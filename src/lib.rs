//! # tapecore
//! `tapecore` is the core engine of a historical-market replay and
//! order-matching trading simulator. Given a time-series of OHLCV bars it
//! lets a client step forward through simulated time, submit linked
//! limit/stop/market orders, and observe deterministic order matching,
//! position netting, realized P&L, and trade reconstruction.
//!
//! It is:
//! * **Deterministic**: given the same bars and the same orders in the
//!   same input order, matching always produces the same fills.
//! * **Storage-agnostic**: the [`bar_source::BarStore`] and
//!   [`persistence`] traits are the only collaborator boundaries; this
//!   crate ships an in-memory implementation of each for tests and
//!   examples, not a production database client.
//! * **Transport-agnostic**: [`replay::sink::OutputSink`] is the only
//!   boundary with the outside world; HTTP/WebSocket framing, auth,
//!   billing, and analytics are deliberately out of scope.
//!
//! ## Overview
//! * **Bar source** ([`bar_source`]): composes tail queries against a
//!   [`bar_source::BarStore`] into bars at an arbitrary timeframe, honoring
//!   per-symbol Regular Trading Hours windows.
//! * **Persistence** ([`persistence`]): durable record shapes for
//!   accounts, orders, positions, and users, behind narrow repository
//!   traits.
//! * **Matching engine** ([`matching`]): walks a bar stream chronologically,
//!   fills ready orders, nets positions, realizes P&L, and wires up OCO
//!   bracket activation/cancellation.
//! * **Replay controller** ([`replay`]): streams buffered bars to an
//!   [`replay::sink::OutputSink`] at a client-configured cadence, driven by
//!   `play`/`pause` commands.
//! * **Trade reconstructor** ([`trade`]): FIFO-pairs fulfilled buy/sell
//!   orders per symbol into closed trades with signed P&L.

#![warn(missing_copy_implementations)]

/// OHLCV bar representation and the dummy-bar sentinel.
pub mod bar;

/// Bar aggregation: tail composition, RTH masking, and the TTL-cached
/// symbol-date-range lookup, all generic over a [`bar_source::BarStore`]
/// collaborator.
pub mod bar_source;

/// Symbol reference data and replay tuning, loaded as plain config values.
pub mod config;

/// Crate-wide and per-component error types.
pub mod error;

/// Deterministic order matching and position netting over a bar stream.
pub mod matching;

/// Durable record shapes and repository traits for accounts, orders,
/// positions, and users, plus an in-memory implementation.
pub mod persistence;

/// The replay controller: timed streaming of buffered bars driven by a
/// command channel.
pub mod replay;

/// Timeframe parsing, duration math, RTH session windows, and the
/// `/inc-date` increment vocabulary.
pub mod time;

/// FIFO reconstruction of closed trades from fulfilled orders.
pub mod trade;

pub use bar::Bar;
pub use error::EngineError;

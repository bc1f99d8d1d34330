//! Durable record shapes: accounts, orders, positions, and the users that
//! own accounts. Mirrors the GORM models the original persisted, minus the
//! auth/billing fields that belong to the out-of-scope subsystems.

use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier for a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Unique identifier for an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize)]
pub struct AccountId(pub u64);

/// Unique identifier for a traded instrument, corresponding to the
/// original's `symbol_id` foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Unique identifier for an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize)]
pub struct OrderId(pub u64);

/// Buy or sell side of an [`Order`] / [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// How an [`Order`]'s fill price is determined against a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

/// A credentialed account holder. The core never inspects `password_hash`;
/// it exists only so [`AccountRepository`](crate::persistence::AccountRepository)
/// can check account ownership without reaching into the out-of-scope auth
/// subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

/// A trading account. `simulated_date` is the engine's current position in
/// history; advancing it drives matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub name: String,
    pub simulated_date: DateTime<Utc>,
    pub realized_pnl: Decimal,
}

/// A resting, activated, cancelled, or fulfilled order. `entry_order_id`
/// identifies the root of an OCO bracket when this order is a linked leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol_id: SymbolId,
    pub direction: Direction,
    pub order_type: OrderType,
    pub price: Decimal,
    pub quantity: u64,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub fulfilled_price: Option<Decimal>,
    pub entry_order_id: Option<OrderId>,
}

impl Order {
    /// An order is ready to match iff it has been activated, and has
    /// neither been cancelled nor fulfilled.
    pub fn is_ready(&self) -> bool {
        self.activated_at.is_some() && self.cancelled_at.is_none() && self.fulfilled_at.is_none()
    }

    /// `true` when this order is a linked leg of an OCO bracket rather than
    /// the bracket's root entry.
    pub fn is_linked_leg(&self) -> bool {
        self.entry_order_id.is_some()
    }
}

/// One open lot of a position. All lots for a given `(account, symbol)` at
/// any moment share the same [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub account_id: AccountId,
    pub symbol_id: SymbolId,
    pub direction: Direction,
    pub price: Decimal,
    pub quantity: u64,
}

//! Persistence traits for accounts, orders, positions, and users, and an
//! in-memory implementation backing tests and examples.

pub mod in_memory;
pub mod model;

pub use in_memory::InMemoryRepository;
pub use model::{Account, AccountId, Direction, Order, OrderId, OrderType, Position, SymbolId, User, UserId};

use crate::error::RepositoryError;

/// Account lookups and the single-write-per-matching-step account update.
pub trait AccountRepository {
    fn get(&self, id: AccountId) -> Result<Account, RepositoryError>;
    fn get_by_username(&self, username: &str) -> Result<Account, RepositoryError>;
    fn update(&self, account: Account) -> Result<(), RepositoryError>;
}

/// Order queries generalizing the original's `GetReadyOrders`,
/// `GetFulfilledOrders`, and `UpdateMultipleOrders`.
pub trait OrderRepository {
    fn create(&self, order: Order) -> Result<Order, RepositoryError>;
    fn get_ready(&self, account_id: AccountId) -> Result<Vec<Order>, RepositoryError>;
    fn get_fulfilled(&self, account_id: AccountId, limit: Option<usize>) -> Result<Vec<Order>, RepositoryError>;
    fn get_linked(&self, entry_order_id: OrderId) -> Result<Vec<Order>, RepositoryError>;
    fn update_many(&self, orders: Vec<Order>) -> Result<(), RepositoryError>;
}

/// Position queries. `replace_for_account` performs the original's
/// delete-then-insert wholesale replacement.
pub trait PositionRepository {
    fn get_for_account(&self, account_id: AccountId) -> Result<Vec<Position>, RepositoryError>;
    fn replace_for_account(&self, account_id: AccountId, positions: Vec<Position>) -> Result<(), RepositoryError>;
}

/// Minimal user lookup; authentication proper is out of scope.
pub trait UserRepository {
    fn get_by_id(&self, id: UserId) -> Result<User, RepositoryError>;
}

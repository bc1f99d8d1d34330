//! An in-memory [`InMemoryRepository`] implementing every persistence
//! trait. Not production-durable — state is lost on process exit — but
//! sufficient for tests, examples, and embedding the engine in a process
//! that owns its own durability layer.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::RepositoryError;
use crate::persistence::model::{Account, AccountId, Order, OrderId, Position, User, UserId};
use crate::persistence::{AccountRepository, OrderRepository, PositionRepository, UserRepository};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    accounts: HashMap<AccountId, Account>,
    orders: HashMap<OrderId, Order>,
    positions: HashMap<AccountId, Vec<Position>>,
    next_order_id: u64,
}

/// Single-mutex-guarded in-memory backing store for accounts, orders,
/// positions, and users.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user for tests and examples.
    pub fn seed_user(&self, user: User) {
        self.tables.lock().users.insert(user.id, user);
    }

    /// Seeds an account for tests and examples.
    pub fn seed_account(&self, account: Account) {
        self.tables.lock().accounts.insert(account.id, account);
    }
}

impl AccountRepository for InMemoryRepository {
    fn get(&self, id: AccountId) -> Result<Account, RepositoryError> {
        self.tables
            .lock()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::AccountNotFound(id.0))
    }

    fn get_by_username(&self, username: &str) -> Result<Account, RepositoryError> {
        let tables = self.tables.lock();
        let user = tables
            .users
            .values()
            .find(|u| u.username == username)
            .ok_or(RepositoryError::AccountNotFound(0))?;
        tables
            .accounts
            .values()
            .find(|a| a.user_id == user.id)
            .cloned()
            .ok_or(RepositoryError::AccountNotFound(0))
    }

    fn update(&self, account: Account) -> Result<(), RepositoryError> {
        self.tables.lock().accounts.insert(account.id, account);
        Ok(())
    }
}

impl OrderRepository for InMemoryRepository {
    fn create(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.lock();
        tables.next_order_id += 1;
        order.id = OrderId(tables.next_order_id);
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn get_ready(&self, account_id: AccountId) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .orders
            .values()
            .filter(|o| o.account_id == account_id && o.is_ready())
            .cloned()
            .collect())
    }

    fn get_fulfilled(&self, account_id: AccountId, limit: Option<usize>) -> Result<Vec<Order>, RepositoryError> {
        let mut fulfilled: Vec<Order> = self
            .tables
            .lock()
            .orders
            .values()
            .filter(|o| o.account_id == account_id && o.fulfilled_at.is_some())
            .cloned()
            .collect();
        fulfilled.sort_by_key(|o| std::cmp::Reverse(o.fulfilled_at));
        if let Some(limit) = limit {
            fulfilled.truncate(limit);
        }
        Ok(fulfilled)
    }

    fn get_linked(&self, entry_order_id: OrderId) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .orders
            .values()
            .filter(|o| o.entry_order_id == Some(entry_order_id))
            .cloned()
            .collect())
    }

    fn update_many(&self, orders: Vec<Order>) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock();
        for order in orders {
            tables.orders.insert(order.id, order);
        }
        Ok(())
    }
}

impl PositionRepository for InMemoryRepository {
    fn get_for_account(&self, account_id: AccountId) -> Result<Vec<Position>, RepositoryError> {
        Ok(self.tables.lock().positions.get(&account_id).cloned().unwrap_or_default())
    }

    fn replace_for_account(&self, account_id: AccountId, positions: Vec<Position>) -> Result<(), RepositoryError> {
        self.tables.lock().positions.insert(account_id, positions);
        Ok(())
    }
}

impl UserRepository for InMemoryRepository {
    fn get_by_id(&self, id: UserId) -> Result<User, RepositoryError> {
        self.tables.lock().users.get(&id).cloned().ok_or(RepositoryError::AccountNotFound(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::model::{Direction, OrderType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(account_id: AccountId, ready: bool) -> Order {
        Order {
            id: OrderId(0),
            account_id,
            symbol_id: crate::persistence::model::SymbolId(1),
            direction: Direction::Buy,
            order_type: OrderType::Market,
            price: dec!(0),
            quantity: 1,
            created_at: Utc::now(),
            activated_at: ready.then(Utc::now),
            cancelled_at: None,
            fulfilled_at: None,
            fulfilled_price: None,
            entry_order_id: None,
        }
    }

    #[test]
    fn create_assigns_a_fresh_order_id() {
        let repo = InMemoryRepository::new();
        let account_id = AccountId(1);

        let first = repo.create(order(account_id, true)).unwrap();
        let second = repo.create(order(account_id, true)).unwrap();

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn get_ready_excludes_unactivated_orders() {
        let repo = InMemoryRepository::new();
        let account_id = AccountId(1);
        repo.create(order(account_id, true)).unwrap();
        repo.create(order(account_id, false)).unwrap();

        let ready = repo.get_ready(account_id).unwrap();

        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn replace_for_account_overwrites_wholesale() {
        let repo = InMemoryRepository::new();
        let account_id = AccountId(1);
        let position = Position {
            account_id,
            symbol_id: crate::persistence::model::SymbolId(1),
            direction: Direction::Buy,
            price: dec!(100),
            quantity: 5,
        };

        repo.replace_for_account(account_id, vec![position]).unwrap();
        repo.replace_for_account(account_id, vec![]).unwrap();

        assert!(repo.get_for_account(account_id).unwrap().is_empty());
    }
}

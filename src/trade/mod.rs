//! Reconstructs closed trades from a fulfilled-order log by FIFO pairing
//! buy and sell fills per symbol.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::TradeError;
use crate::persistence::model::{AccountId, Direction, Order, SymbolId};

/// A closed trade: the pairing of an entry fill with an exit fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub account_id: AccountId,
    pub symbol_id: SymbolId,
    pub quantity: u64,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub profit_or_loss: Decimal,
}

#[derive(Default)]
pub struct TradeReconstructor;

impl TradeReconstructor {
    pub fn new() -> Self {
        Self
    }

    /// Reconstructs every closed trade from `fulfilled_orders`, which need
    /// not be pre-sorted. Orders must all belong to `account_id` and carry
    /// `fulfilled_at`/`fulfilled_price`.
    pub fn reconstruct(
        &self,
        config: &EngineConfig,
        account_id: AccountId,
        mut fulfilled_orders: Vec<Order>,
    ) -> Result<Vec<Trade>, TradeError> {
        fulfilled_orders.sort_by_key(|o| o.fulfilled_at);

        let by_symbol = fulfilled_orders.into_iter().into_group_map_by(|o| o.symbol_id);

        tracing::debug!(symbols = by_symbol.len(), "reconstructing trades for account {}", account_id);

        let mut trades = Vec::new();
        for (symbol_id, orders) in by_symbol {
            let multiplier = config
                .symbol(symbol_id)
                .map(|r| r.tick_value_multiplier)
                .unwrap_or(Decimal::ONE);

            let mut buy_queue: VecDeque<Order> = VecDeque::new();
            let mut sell_queue: VecDeque<Order> = VecDeque::new();

            for order in orders {
                match order.direction {
                    Direction::Buy => buy_queue.push_back(order),
                    Direction::Sell => sell_queue.push_back(order),
                }
            }

            while let (Some(buy), Some(sell)) = (buy_queue.front_mut(), sell_queue.front_mut()) {
                let trade_quantity = buy.quantity.min(sell.quantity);

                // Strict Before: on an exact tie the sell is the entry.
                let (entry, exit) = if buy.fulfilled_at < sell.fulfilled_at {
                    (&*buy, &*sell)
                } else {
                    (&*sell, &*buy)
                };

                let entry_price = entry.fulfilled_price.unwrap_or(Decimal::ZERO);
                let exit_price = exit.fulfilled_price.unwrap_or(Decimal::ZERO);
                let quantity_dec = Decimal::from(trade_quantity);
                let raw_pnl = if entry.direction == Direction::Buy {
                    (exit_price - entry_price) * quantity_dec
                } else {
                    (entry_price - exit_price) * quantity_dec
                };

                trades.push(Trade {
                    account_id,
                    symbol_id,
                    quantity: trade_quantity,
                    entry_price,
                    exit_price,
                    entered_at: entry.fulfilled_at.unwrap_or_else(Utc::now),
                    exited_at: exit.fulfilled_at.unwrap_or_else(Utc::now),
                    profit_or_loss: raw_pnl * multiplier,
                });

                buy.quantity -= trade_quantity;
                sell.quantity -= trade_quantity;
                if buy.quantity == 0 {
                    buy_queue.pop_front();
                }
                if sell.quantity == 0 {
                    sell_queue.pop_front();
                }
            }
        }

        trades.sort_by_key(|t| t.entered_at);
        tracing::debug!(count = trades.len(), "reconstructed trades");
        Ok(trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::model::{OrderId, OrderType};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn fulfilled_order(id: u64, direction: Direction, price: Decimal, quantity: u64, at: i64) -> Order {
        Order {
            id: OrderId(id),
            account_id: AccountId(1),
            symbol_id: SymbolId(1),
            direction,
            order_type: OrderType::Market,
            price,
            quantity,
            created_at: Utc.timestamp_opt(at, 0).unwrap(),
            activated_at: Some(Utc.timestamp_opt(at, 0).unwrap()),
            cancelled_at: None,
            fulfilled_at: Some(Utc.timestamp_opt(at, 0).unwrap()),
            fulfilled_price: Some(price),
            entry_order_id: None,
        }
    }

    #[test]
    fn fifo_pairs_partial_fills_across_two_buys_and_one_sell() {
        let config = EngineConfig {
            symbols: [(SymbolId(1), crate::config::SymbolReference { rth_profile: crate::time::RthProfile::Standard, tick_value_multiplier: dec!(1) })]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let orders = vec![
            fulfilled_order(1, Direction::Buy, dec!(100), 3, 1),
            fulfilled_order(2, Direction::Buy, dec!(102), 2, 2),
            fulfilled_order(3, Direction::Sell, dec!(110), 4, 3),
        ];

        let trades = TradeReconstructor::new().reconstruct(&config, AccountId(1), orders).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].quantity, 3);
        assert_eq!(trades[0].entry_price, dec!(100));
        assert_eq!(trades[0].exit_price, dec!(110));
        assert_eq!(trades[0].profit_or_loss, dec!(30));

        assert_eq!(trades[1].quantity, 1);
        assert_eq!(trades[1].entry_price, dec!(102));
        assert_eq!(trades[1].profit_or_loss, dec!(8));
    }

    #[test]
    fn sell_is_treated_as_entry_on_an_exact_fulfilled_at_tie() {
        let config = EngineConfig {
            symbols: [(SymbolId(1), crate::config::SymbolReference { rth_profile: crate::time::RthProfile::Standard, tick_value_multiplier: dec!(1) })]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let orders = vec![
            fulfilled_order(1, Direction::Buy, dec!(100), 1, 5),
            fulfilled_order(2, Direction::Sell, dec!(90), 1, 5),
        ];

        let trades = TradeReconstructor::new().reconstruct(&config, AccountId(1), orders).unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_price, dec!(90));
        assert_eq!(trades[0].exit_price, dec!(100));
        assert_eq!(trades[0].profit_or_loss, dec!(-10));
    }

    #[test]
    fn leaves_residual_quantity_unpaired_when_sides_are_unbalanced() {
        let config = EngineConfig::default();
        let orders = vec![
            fulfilled_order(1, Direction::Buy, dec!(100), 3, 1),
            fulfilled_order(2, Direction::Buy, dec!(102), 2, 2),
            fulfilled_order(3, Direction::Sell, dec!(110), 4, 3),
        ];

        let trades = TradeReconstructor::new().reconstruct(&config, AccountId(1), orders).unwrap();

        let total_closed: u64 = trades.iter().map(|t| t.quantity).sum();
        assert_eq!(total_closed, 4);
    }
}

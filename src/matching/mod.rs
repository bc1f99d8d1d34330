//! The matching engine: walks a per-symbol bar stream chronologically,
//! fills ready orders, nets positions, and activates/cancels OCO legs.

pub mod netting;

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::bar::Bar;
use crate::config::EngineConfig;
use crate::error::MatchingError;
use crate::matching::netting::execute_order;
use crate::persistence::model::{AccountId, Direction, Order, OrderType, Position, SymbolId};

/// Result of one [`MatchingEngine::simulate_bars`] call.
#[derive(Debug, Clone, Default)]
pub struct SimulationResult {
    pub did_execute: bool,
    pub orders: Vec<Order>,
    pub positions: Vec<Position>,
    pub realized_pnl: Decimal,
}

#[derive(Default)]
pub struct MatchingEngine;

impl MatchingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Runs every symbol's bar stream against its ready orders and open
    /// positions independently, then combines the per-symbol outcomes.
    ///
    /// Symbols with no entry in `bars_by_symbol` keep their existing
    /// positions untouched and contribute no orders or P&L, matching the
    /// original's "re-add positions for symbols untouched by the bar map"
    /// behavior.
    pub async fn simulate_bars(
        &self,
        config: &EngineConfig,
        account_id: AccountId,
        bars_by_symbol: HashMap<SymbolId, Vec<Bar>>,
        orders: Vec<Order>,
        positions: Vec<Position>,
    ) -> Result<SimulationResult, MatchingError> {
        let mut orders_by_symbol: HashMap<SymbolId, Vec<Order>> = HashMap::new();
        for order in orders {
            orders_by_symbol.entry(order.symbol_id).or_default().push(order);
        }
        let mut positions_by_symbol: HashMap<SymbolId, Vec<Position>> = HashMap::new();
        for position in positions {
            positions_by_symbol.entry(position.symbol_id).or_default().push(position);
        }

        let symbols_with_activity: Vec<SymbolId> = bars_by_symbol.keys().copied().collect();

        let mut join_set = tokio::task::JoinSet::new();
        for symbol_id in symbols_with_activity {
            let bars = bars_by_symbol.get(&symbol_id).cloned().unwrap_or_default();
            let symbol_orders = orders_by_symbol.remove(&symbol_id).unwrap_or_default();
            let symbol_positions = positions_by_symbol.remove(&symbol_id).unwrap_or_default();
            let multiplier = config
                .symbol(symbol_id)
                .map(|r| r.tick_value_multiplier)
                .ok_or(MatchingError::UnknownSymbol(symbol_id.0))?;

            join_set.spawn(async move {
                simulate_symbol(account_id, symbol_id, &bars, symbol_orders, symbol_positions, multiplier)
            });
        }

        let mut did_execute = false;
        let mut all_orders = Vec::new();
        let mut all_positions = Vec::new();
        let mut total_pnl = Decimal::ZERO;

        while let Some(joined) = join_set.join_next().await {
            let outcome = joined.expect("matching task panicked");
            did_execute |= outcome.did_execute;
            all_orders.extend(outcome.orders);
            all_positions.extend(outcome.positions);
            total_pnl += outcome.realized_pnl;
        }

        tracing::debug!(account = account_id.0, did_execute, pnl = %total_pnl, "simulate_bars complete");

        // Symbols with no bars in this step keep their orders/positions as-is.
        for (_symbol, remaining_orders) in orders_by_symbol {
            all_orders.extend(remaining_orders);
        }
        for (_symbol, remaining_positions) in positions_by_symbol {
            all_positions.extend(remaining_positions);
        }

        Ok(SimulationResult { did_execute, orders: all_orders, positions: all_positions, realized_pnl: total_pnl })
    }
}

struct SymbolOutcome {
    did_execute: bool,
    orders: Vec<Order>,
    positions: Vec<Position>,
    realized_pnl: Decimal,
}

/// Matches one symbol's bars against its ready orders in input-list order.
/// This is a deliberate simplification: stops and limits that both lie
/// inside the same bar fire in input order, not by price-time priority.
fn simulate_symbol(
    account_id: AccountId,
    symbol_id: SymbolId,
    bars: &[Bar],
    mut orders: Vec<Order>,
    mut positions: Vec<Position>,
    tick_value_multiplier: Decimal,
) -> SymbolOutcome {
    let mut did_execute = false;
    let mut pnl_points = Decimal::ZERO;

    for bar in bars {
        // Readiness is re-checked per order as the loop proceeds, not
        // snapshotted up front: a leg activated by its root filling earlier
        // in this same bar must still get a chance to fill in this bar.
        for idx in 0..orders.len() {
            if !orders[idx].is_ready() {
                continue;
            }

            let Some(fill_price) = order_fill_price(&orders[idx], bar) else { continue };

            did_execute = true;
            let bar_date = bar.date_millis;
            let fill_time = chrono::DateTime::from_timestamp_millis(bar_date).unwrap_or_else(chrono::Utc::now);

            orders[idx].fulfilled_at = Some(fill_time);
            orders[idx].fulfilled_price = Some(fill_price);

            tracing::debug!(
                order_id = orders[idx].id.0,
                symbol = symbol_id.0,
                price = %fill_price,
                "order filled"
            );

            let outcome = execute_order(
                account_id,
                symbol_id,
                &positions,
                orders[idx].direction,
                fill_price,
                orders[idx].quantity,
            );
            positions = outcome.positions;
            pnl_points += outcome.pnl_points;

            let filled_order_id = orders[idx].id;
            let entry_order_id = orders[idx].entry_order_id;

            if entry_order_id.is_none() {
                // Root entry filled: activate its ready-but-unactivated legs.
                for other in orders.iter_mut() {
                    if other.entry_order_id == Some(filled_order_id) && other.activated_at.is_none() && other.cancelled_at.is_none() {
                        tracing::debug!(order_id = other.id.0, root_id = filled_order_id.0, "oco leg activated");
                        other.activated_at = Some(fill_time);
                    }
                }
            } else {
                // A leg filled: cancel its siblings and the root, if still ready.
                let root_id = entry_order_id;
                for other in orders.iter_mut() {
                    let is_sibling = other.id != filled_order_id
                        && (other.entry_order_id == root_id || Some(other.id) == root_id);
                    if is_sibling && other.is_ready() {
                        tracing::debug!(order_id = other.id.0, filled_leg = filled_order_id.0, "oco sibling cancelled");
                        other.cancelled_at = Some(fill_time);
                    }
                }
            }
        }
    }

    SymbolOutcome {
        did_execute,
        orders,
        positions,
        realized_pnl: pnl_points * tick_value_multiplier,
    }
}

/// The price at which `order` would fill against `bar`, or `None` if it
/// does not cross.
fn order_fill_price(order: &Order, bar: &Bar) -> Option<Decimal> {
    match order.order_type {
        OrderType::Market => Some(bar.open),
        OrderType::Limit | OrderType::Stop => {
            if order.price >= bar.low && order.price <= bar.high {
                Some(order.price)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::model::OrderId;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar { date_millis: 0, open, high, low, close, volume: 1 }
    }

    fn market_order(id: u64, direction: Direction) -> Order {
        Order {
            id: OrderId(id),
            account_id: AccountId(1),
            symbol_id: SymbolId(1),
            direction,
            order_type: OrderType::Market,
            price: dec!(0),
            quantity: 1,
            created_at: Utc::now(),
            activated_at: Some(Utc::now()),
            cancelled_at: None,
            fulfilled_at: None,
            fulfilled_price: None,
            entry_order_id: None,
        }
    }

    #[test]
    fn market_order_fills_at_bar_open() {
        let b = bar(dec!(100), dec!(101), dec!(99), dec!(100));
        let order = market_order(1, Direction::Buy);

        let price = order_fill_price(&order, &b);

        assert_eq!(price, Some(dec!(100)));
    }

    #[test]
    fn limit_order_fills_only_if_price_within_bar_range() {
        let b = bar(dec!(100), dec!(100.5), dec!(99), dec!(99.8));
        let mut order = market_order(1, Direction::Buy);
        order.order_type = OrderType::Limit;
        order.price = dec!(99.5);

        assert_eq!(order_fill_price(&order, &b), Some(dec!(99.5)));

        order.price = dec!(102);
        assert_eq!(order_fill_price(&order, &b), None);
    }

    #[test]
    fn simulate_symbol_matches_market_buy_then_sell_and_realizes_pnl() {
        let orders = vec![market_order(1, Direction::Buy), market_order(2, Direction::Sell)];
        let bars = vec![
            Bar { date_millis: 1, ..bar(dec!(100), dec!(101), dec!(99), dec!(100)) },
            Bar { date_millis: 2, ..bar(dec!(110), dec!(112), dec!(108), dec!(111)) },
        ];

        let outcome = simulate_symbol(AccountId(1), SymbolId(1), &bars, orders, vec![], dec!(1));

        assert!(outcome.did_execute);
        assert!(outcome.positions.is_empty());
        assert_eq!(outcome.realized_pnl, dec!(10));
    }

    #[test]
    fn simulate_symbol_activates_oco_legs_and_cancels_sibling_on_fill() {
        let entry = market_order(1, Direction::Buy);
        let mut take_profit = market_order(2, Direction::Sell);
        take_profit.order_type = OrderType::Limit;
        take_profit.price = dec!(110);
        take_profit.entry_order_id = Some(OrderId(1));
        take_profit.activated_at = None;

        let mut stop_loss = market_order(3, Direction::Sell);
        stop_loss.order_type = OrderType::Stop;
        stop_loss.price = dec!(95);
        stop_loss.entry_order_id = Some(OrderId(1));
        stop_loss.activated_at = None;

        let bars = vec![
            Bar { date_millis: 1, ..bar(dec!(100), dec!(101), dec!(99), dec!(100)) },
            Bar { date_millis: 2, ..bar(dec!(96), dec!(97), dec!(94), dec!(95)) },
        ];

        let outcome = simulate_symbol(AccountId(1), SymbolId(1), &bars, vec![entry, take_profit, stop_loss], vec![], dec!(1));

        let tp = outcome.orders.iter().find(|o| o.id == OrderId(2)).unwrap();
        let sl = outcome.orders.iter().find(|o| o.id == OrderId(3)).unwrap();

        assert!(sl.fulfilled_at.is_some());
        assert!(tp.cancelled_at.is_some());
        assert!(tp.fulfilled_at.is_none());
        assert!(outcome.positions.is_empty());
        assert_eq!(outcome.realized_pnl, dec!(-5));
    }

    #[test]
    fn oco_leg_activated_by_its_root_can_fill_within_the_same_bar() {
        let entry = market_order(1, Direction::Buy);
        let mut take_profit = market_order(2, Direction::Sell);
        take_profit.order_type = OrderType::Limit;
        take_profit.price = dec!(100.5);
        take_profit.entry_order_id = Some(OrderId(1));
        take_profit.activated_at = None;

        let bars = vec![Bar { date_millis: 1, ..bar(dec!(100), dec!(101), dec!(99), dec!(100)) }];

        let outcome = simulate_symbol(AccountId(1), SymbolId(1), &bars, vec![entry, take_profit], vec![], dec!(1));

        let tp = outcome.orders.iter().find(|o| o.id == OrderId(2)).unwrap();
        assert!(tp.fulfilled_at.is_some(), "leg activated by its root's fill should still fill within the same bar");
        assert_eq!(tp.fulfilled_price, Some(dec!(100.5)));
        assert!(outcome.positions.is_empty());
    }
}

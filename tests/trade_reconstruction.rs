//! S6 — FIFO trade reconstruction across a partially-filled entry.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use tapecore::config::{EngineConfig, ReplayConfig, SymbolReference};
use tapecore::persistence::model::{AccountId, Direction, Order, OrderId, OrderType, SymbolId};
use tapecore::time::RthProfile;
use tapecore::trade::TradeReconstructor;

fn fulfilled(id: u64, direction: Direction, quantity: u64, price: rust_decimal::Decimal, at_secs: i64) -> Order {
    Order {
        id: OrderId(id),
        account_id: AccountId(1),
        symbol_id: SymbolId(1),
        direction,
        order_type: OrderType::Market,
        price: dec!(0),
        quantity,
        created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        activated_at: Some(Utc.timestamp_opt(at_secs, 0).unwrap()),
        cancelled_at: None,
        fulfilled_at: Some(Utc.timestamp_opt(at_secs, 0).unwrap()),
        fulfilled_price: Some(price),
        entry_order_id: None,
    }
}

#[tokio::test]
async fn fifo_pairs_two_buys_against_one_larger_sell_leaving_a_residual_open_buy() {
    let symbol_id = SymbolId(1);
    let mut symbols = HashMap::new();
    symbols.insert(symbol_id, SymbolReference { rth_profile: RthProfile::Standard, tick_value_multiplier: dec!(1) });
    let config = EngineConfig { replay: ReplayConfig::default(), symbols };

    let orders = vec![
        fulfilled(1, Direction::Buy, 3, dec!(100), 1),
        fulfilled(2, Direction::Buy, 2, dec!(102), 2),
        fulfilled(3, Direction::Sell, 4, dec!(110), 3),
    ];

    let trades = TradeReconstructor::new().reconstruct(&config, AccountId(1), orders).unwrap();

    assert_eq!(trades.len(), 2);

    let first = &trades[0];
    assert_eq!(first.quantity, 3);
    assert_eq!(first.entry_price, dec!(100));
    assert_eq!(first.exit_price, dec!(110));
    assert_eq!(first.profit_or_loss, dec!(30));

    let second = &trades[1];
    assert_eq!(second.quantity, 1);
    assert_eq!(second.entry_price, dec!(102));
    assert_eq!(second.exit_price, dec!(110));
    assert_eq!(second.profit_or_loss, dec!(8));
}

//! Position netting: the per-order consume-the-FIFO-queue state machine
//! that turns a fill against existing lots into realized P&L and an
//! updated lot list.

use rust_decimal::Decimal;

use crate::persistence::model::{Direction, Position, SymbolId};
use crate::persistence::model::AccountId;

/// Unsigned P&L contribution of one fill, before the direction sign and
/// tick-value multiplier are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NettingOutcome {
    pub positions: Vec<Position>,
    /// Signed P&L in price points (not yet multiplied by tick value).
    pub pnl_points: Decimal,
}

/// Nets an incoming fill of `direction`/`quantity`/`price` against the
/// existing `positions` for one `(account, symbol)`.
///
/// If `positions` is empty or already holds the same direction, the fill
/// opens (or adds to) a new lot with zero realized P&L. Otherwise the fill
/// closes opposing lots FIFO; see [`reduce_position`] for the partial-close
/// cost-basis rule.
pub fn execute_order(
    account_id: AccountId,
    symbol_id: SymbolId,
    positions: &[Position],
    direction: Direction,
    price: Decimal,
    quantity: u64,
) -> NettingOutcome {
    if positions.is_empty() || positions[0].direction == direction {
        let mut new_positions = positions.to_vec();
        new_positions.push(Position { account_id, symbol_id, direction, price, quantity });
        return NettingOutcome { positions: new_positions, pnl_points: Decimal::ZERO };
    }

    let mut remaining = quantity;
    let mut pnl_points = Decimal::ZERO;
    let mut result = Vec::with_capacity(positions.len());

    for lot in positions {
        if remaining == 0 {
            result.push(*lot);
            continue;
        }
        if lot.quantity > remaining {
            pnl_points += signed_pnl(lot.direction, lot.price, price, remaining);
            result.push(reduce_position(*lot, remaining, price));
            remaining = 0;
        } else {
            pnl_points += signed_pnl(lot.direction, lot.price, price, lot.quantity);
            remaining -= lot.quantity;
        }
    }

    if remaining > 0 {
        result.push(Position { account_id, symbol_id, direction, price, quantity: remaining });
    }

    NettingOutcome { positions: result, pnl_points }
}

/// Reduces `lot` by `closed_quantity` at the new `fill_price`.
///
/// The remaining quantity's cost basis is rewritten to `fill_price` rather
/// than preserved at the lot's original entry price. This reproduces the
/// original `executeOrder`'s "lot larger than remaining" branch, which
/// unconditionally constructs the reduced lot with the new fill price; a
/// strict FIFO accounting would instead keep `lot.price`.
pub fn reduce_position(lot: Position, closed_quantity: u64, fill_price: Decimal) -> Position {
    Position {
        quantity: lot.quantity - closed_quantity,
        price: fill_price,
        ..lot
    }
}

/// `(exit - entry) * qty` for a closed long; `(entry - exit) * qty` for a
/// closed short.
fn signed_pnl(closed_direction: Direction, entry: Decimal, exit: Decimal, qty: u64) -> Decimal {
    let qty = Decimal::from(qty);
    match closed_direction {
        Direction::Buy => (exit - entry) * qty,
        Direction::Sell => (entry - exit) * qty,
    }
}

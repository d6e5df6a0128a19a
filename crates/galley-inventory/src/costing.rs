use galley_core::StockItem;
use rust_decimal::Decimal;

/// Decimal places kept on derived quantities.
pub const QTY_SCALE: u32 = 4;

/// Largest quantity or unit cost accepted on a single document line.
pub const MAX_LINE_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

pub fn round_qty(quantity: Decimal) -> Decimal {
    quantity.round_dp(QTY_SCALE)
}

/// Moving average after receiving `incoming_qty` at `incoming_cost`, or
/// `None` when the arithmetic leaves the representable range.
///
/// When the resulting quantity is not positive the blend is meaningless and
/// the incoming cost is taken as-is.
pub fn weighted_average(
    on_hand: Decimal,
    average_cost: Decimal,
    incoming_qty: Decimal,
    incoming_cost: Decimal,
) -> Option<Decimal> {
    let new_qty = on_hand.checked_add(incoming_qty)?;
    if new_qty <= Decimal::ZERO {
        return Some(incoming_cost);
    }

    let current_value = on_hand.checked_mul(average_cost)?;
    let incoming_value = incoming_qty.checked_mul(incoming_cost)?;
    current_value.checked_add(incoming_value)?.checked_div(new_qty)
}

/// Per-unit cost of a batch, zero when nothing was produced.
pub fn unit_cost(total_cost: Decimal, quantity: Decimal) -> Option<Decimal> {
    if quantity <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    total_cost.checked_div(quantity)
}

/// The quantity/cost mutations a stock item supports.
///
/// The fallible methods leave the item untouched when they return `None`.
pub trait Costing {
    /// Blends a receipt into the average; returns the new average cost.
    fn receive(&mut self, quantity: Decimal, unit_cost: Decimal) -> Option<Decimal>;
    /// Removes stock at the current average cost and returns the value issued.
    fn issue(&mut self, quantity: Decimal) -> Option<Decimal>;
    /// Absolute overwrite from a physical count; returns the previous quantity.
    fn count(&mut self, counted: Decimal) -> Decimal;
    /// Replaces the average cost; returns the previous cost.
    fn revalue(&mut self, new_cost: Decimal) -> Decimal;
}

impl Costing for StockItem {
    fn receive(&mut self, quantity: Decimal, unit_cost: Decimal) -> Option<Decimal> {
        let average = weighted_average(self.current_stock, self.avg_cost, quantity, unit_cost)?;
        let stock = self.current_stock.checked_add(quantity)?;
        self.avg_cost = average;
        self.current_stock = stock;
        Some(average)
    }

    fn issue(&mut self, quantity: Decimal) -> Option<Decimal> {
        let value = quantity.checked_mul(self.avg_cost)?;
        self.current_stock = self.current_stock.checked_sub(quantity)?;
        Some(value)
    }

    fn count(&mut self, counted: Decimal) -> Decimal {
        std::mem::replace(&mut self.current_stock, counted)
    }

    fn revalue(&mut self, new_cost: Decimal) -> Decimal {
        std::mem::replace(&mut self.avg_cost, new_cost)
    }
}

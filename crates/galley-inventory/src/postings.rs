//! Pure transaction postors.
//!
//! Each function takes the current Item Master and a document, validates the
//! whole document, and returns the posted document together with the items
//! it changed. Any error leaves the caller's items untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use galley_core::{
    AdjustmentStatus, CostAdjustmentRecord, DocumentStatus, ItemId, PostError, ProductionRecord,
    PurchaseLine, PurchaseOrder, PurchaseStatus, SaleRecord, SaleStatus, Shortfall, StateError,
    StockItem, StocktakeRecord, TransferRecord, ValidationError, WasteRecord,
};
use rust_decimal::Decimal;

use crate::book::ItemBook;
use crate::costing::{Costing, MAX_LINE_AMOUNT, unit_cost};
use crate::history::TransactionHistory;
use crate::location::location_stock;

#[derive(Debug, Clone)]
pub struct Posting<T> {
    pub record: T,
    pub changed_items: Vec<StockItem>,
    /// Net change in inventory value across `changed_items`.
    pub value_change: Decimal,
}

impl<T> Posting<T> {
    fn from_book(record: T, book: ItemBook<'_>) -> Result<Self, PostError> {
        let value_change = book.value_change().ok_or(ValidationError::OutOfRange {
            field: "inventory value",
        })?;
        Ok(Self {
            record,
            changed_items: book.into_changed(),
            value_change,
        })
    }
}

pub fn post_purchase(
    items: &HashMap<ItemId, StockItem>,
    mut order: PurchaseOrder,
    now: DateTime<Utc>,
) -> Result<Posting<PurchaseOrder>, PostError> {
    if order.status == PurchaseStatus::Completed {
        return Err(StateError::AlreadyPosted {
            kind: "purchase order",
            id: order.id,
            status: "completed",
        }
        .into());
    }
    validate_purchase_lines(&order)?;

    let mut book = ItemBook::new(items);
    receive_lines(&mut book, &mut order.lines)?;

    order.total = checked_total(order.lines.iter().map(|line| line.line_total), "order total")?;
    order.status = PurchaseStatus::Completed;
    order.posted_at = Some(now);

    Posting::from_book(order, book)
}

/// Re-applies an edited, already completed purchase order.
///
/// The previous lines' quantities are backed out first; their cost effect is
/// not reversed because a moving average cannot be unwound. The revised lines
/// are then received on top of the reduced quantity.
pub fn revise_purchase(
    items: &HashMap<ItemId, StockItem>,
    previous: &PurchaseOrder,
    mut revised: PurchaseOrder,
    now: DateTime<Utc>,
) -> Result<Posting<PurchaseOrder>, PostError> {
    if previous.status != PurchaseStatus::Completed {
        return Err(StateError::NotEditable {
            kind: "purchase order",
            id: previous.id,
            expected: "completed",
        }
        .into());
    }
    validate_purchase_lines(&revised)?;

    let mut book = ItemBook::new(items);
    for (index, line) in previous.lines.iter().enumerate() {
        let item = book.require_mut(index, &line.item_id)?;
        item.current_stock = item
            .current_stock
            .checked_sub(line.quantity)
            .ok_or_else(|| out_of_range(index, "quantity", line.quantity))?;
    }
    receive_lines(&mut book, &mut revised.lines)?;

    revised.total =
        checked_total(revised.lines.iter().map(|line| line.line_total), "order total")?;
    revised.status = PurchaseStatus::Completed;
    revised.is_edited = true;
    revised.posted_at = Some(now);

    Posting::from_book(revised, book)
}

fn validate_purchase_lines(order: &PurchaseOrder) -> Result<(), ValidationError> {
    require_text("location_id", &order.location_id)?;
    if order.lines.is_empty() {
        return Err(ValidationError::EmptyDocument {
            kind: "purchase order",
        });
    }
    for (index, line) in order.lines.iter().enumerate() {
        positive(index, "quantity", line.quantity)?;
        non_negative(index, "unit_cost", line.unit_cost)?;
    }
    Ok(())
}

fn receive_lines(book: &mut ItemBook<'_>, lines: &mut [PurchaseLine]) -> Result<(), PostError> {
    for (index, line) in lines.iter_mut().enumerate() {
        let item = book.require_mut(index, &line.item_id)?;
        item.receive(line.quantity, line.unit_cost)
            .ok_or_else(|| out_of_range(index, "quantity", line.quantity))?;
        line.line_total = line
            .quantity
            .checked_mul(line.unit_cost)
            .ok_or_else(|| out_of_range(index, "unit_cost", line.unit_cost))?;
    }
    Ok(())
}

/// Consumes ingredients and adds the produced quantity.
///
/// Each line is costed at the ingredient's average cost at the moment it is
/// issued; the draft's `unit_cost` and `line_cost` are overwritten. When the
/// product's category is manufactured its average cost is replaced by this
/// run's unit cost rather than blended with stock already on hand.
pub fn post_production(
    items: &HashMap<ItemId, StockItem>,
    mut record: ProductionRecord,
    manufactured: bool,
    now: DateTime<Utc>,
) -> Result<Posting<ProductionRecord>, PostError> {
    if record.status == DocumentStatus::Posted {
        return Err(StateError::AlreadyPosted {
            kind: "production record",
            id: record.id,
            status: "posted",
        }
        .into());
    }
    require_text("location_id", &record.location_id)?;
    if record.produced_qty <= Decimal::ZERO {
        return Err(ValidationError::InvalidValue {
            field: "produced_qty",
            reason: "must be positive",
            value: record.produced_qty,
        }
        .into());
    }
    if record.produced_qty > MAX_LINE_AMOUNT {
        return Err(ValidationError::InvalidValue {
            field: "produced_qty",
            reason: "is out of range",
            value: record.produced_qty,
        }
        .into());
    }
    if !items.contains_key(&record.product_id) {
        return Err(ValidationError::UnknownProduct {
            item_id: record.product_id.clone(),
        }
        .into());
    }
    for (index, line) in record.ingredients.iter().enumerate() {
        non_negative(index, "required_qty", line.required_qty)?;
        non_negative(index, "unit_cost", line.unit_cost)?;
    }

    let mut book = ItemBook::new(items);
    for (index, line) in record.ingredients.iter_mut().enumerate() {
        let item = book.require_mut(index, &line.stock_item_id)?;
        line.unit_cost = item.avg_cost;
        line.line_cost = line
            .required_qty
            .checked_mul(line.unit_cost)
            .ok_or_else(|| out_of_range(index, "unit_cost", line.unit_cost))?;
        item.issue(line.required_qty)
            .ok_or_else(|| out_of_range(index, "required_qty", line.required_qty))?;
    }

    record.total_cost = checked_total(
        record.ingredients.iter().map(|line| line.line_cost),
        "production cost",
    )?;

    let product = book.require_mut(0, &record.product_id)?;
    product.current_stock = product
        .current_stock
        .checked_add(record.produced_qty)
        .ok_or(ValidationError::OutOfRange {
            field: "product stock",
        })?;
    if manufactured {
        let cost = unit_cost(record.total_cost, record.produced_qty)
            .ok_or(ValidationError::OutOfRange { field: "unit cost" })?;
        product.revalue(cost);
    }

    record.status = DocumentStatus::Posted;
    record.posted_at = Some(now);

    Posting::from_book(record, book)
}

pub fn post_waste(
    items: &HashMap<ItemId, StockItem>,
    mut record: WasteRecord,
    now: DateTime<Utc>,
) -> Result<Posting<WasteRecord>, PostError> {
    if record.status == DocumentStatus::Posted {
        return Err(StateError::AlreadyPosted {
            kind: "waste record",
            id: record.id,
            status: "posted",
        }
        .into());
    }
    require_text("location_id", &record.location_id)?;
    if record.lines.is_empty() {
        return Err(ValidationError::EmptyDocument {
            kind: "waste record",
        }
        .into());
    }
    for (index, line) in record.lines.iter().enumerate() {
        positive(index, "quantity", line.quantity)?;
    }

    let mut book = ItemBook::new(items);
    for (index, line) in record.lines.iter_mut().enumerate() {
        let item = book.require_mut(index, &line.item_id)?;
        line.unit_cost = item.avg_cost;
        line.line_value = item
            .issue(line.quantity)
            .ok_or_else(|| out_of_range(index, "quantity", line.quantity))?;
    }

    record.total_value =
        checked_total(record.lines.iter().map(|line| line.line_value), "waste value")?;
    record.status = DocumentStatus::Posted;
    record.posted_at = Some(now);

    Posting::from_book(record, book)
}

/// Overwrites book quantity with the counted quantity for every line.
pub fn post_stocktake(
    items: &HashMap<ItemId, StockItem>,
    mut record: StocktakeRecord,
    now: DateTime<Utc>,
) -> Result<Posting<StocktakeRecord>, PostError> {
    if record.status == DocumentStatus::Posted {
        return Err(StateError::AlreadyPosted {
            kind: "stocktake",
            id: record.id,
            status: "posted",
        }
        .into());
    }
    require_text("location_id", &record.location_id)?;
    if record.lines.is_empty() {
        return Err(ValidationError::EmptyDocument { kind: "stocktake" }.into());
    }
    for (index, line) in record.lines.iter().enumerate() {
        non_negative(index, "counted_qty", line.counted_qty)?;
    }

    let mut book = ItemBook::new(items);
    for (index, line) in record.lines.iter_mut().enumerate() {
        let item = book.require_mut(index, &line.item_id)?;
        line.system_qty = item.count(line.counted_qty);
        line.variance_qty = line
            .counted_qty
            .checked_sub(line.system_qty)
            .ok_or_else(|| out_of_range(index, "counted_qty", line.counted_qty))?;
        line.variance_value = line
            .variance_qty
            .checked_mul(item.avg_cost)
            .ok_or_else(|| out_of_range(index, "counted_qty", line.counted_qty))?;
    }

    record.total_variance_value = checked_total(
        record.lines.iter().map(|line| line.variance_value),
        "variance value",
    )?;
    record.status = DocumentStatus::Posted;
    record.posted_at = Some(now);

    Posting::from_book(record, book)
}

/// Validates a transfer against replayed stock at the source location as of
/// the transfer's date; documents dated later do not count.
///
/// Transfers never touch the global item quantities: the posted record is
/// the movement, and location stock is derived by replay.
pub fn post_transfer(
    items: &HashMap<ItemId, StockItem>,
    history: &TransactionHistory,
    mut record: TransferRecord,
    now: DateTime<Utc>,
) -> Result<Posting<TransferRecord>, PostError> {
    if record.status == DocumentStatus::Posted {
        return Err(StateError::AlreadyPosted {
            kind: "transfer",
            id: record.id,
            status: "posted",
        }
        .into());
    }
    require_text("source_location_id", &record.source_location_id)?;
    require_text("destination_location_id", &record.destination_location_id)?;
    if record.source_location_id == record.destination_location_id {
        return Err(StateError::SameLocation {
            location_id: record.source_location_id.clone(),
        }
        .into());
    }
    if record.lines.is_empty() {
        return Err(ValidationError::EmptyDocument { kind: "transfer" }.into());
    }

    let book = ItemBook::new(items);
    for (index, line) in record.lines.iter().enumerate() {
        positive(index, "quantity", line.quantity)?;
        book.require(index, &line.item_id)?;
    }

    // Lines for the same item draw on one balance.
    let mut requested: BTreeMap<&str, Decimal> = BTreeMap::new();
    let mut available: BTreeMap<&str, Decimal> = BTreeMap::new();
    let mut shortfalls = Vec::new();
    for (index, line) in record.lines.iter().enumerate() {
        let item_id = line.item_id.as_str();
        let on_hand = *available.entry(item_id).or_insert_with(|| {
            location_stock(
                history,
                items,
                item_id,
                &record.source_location_id,
                Some(record.date),
            )
            .raw
        });
        let total = requested.entry(item_id).or_insert(Decimal::ZERO);
        *total += line.quantity;

        if *total > on_hand {
            shortfalls.push(Shortfall {
                line: index,
                item_id: line.item_id.clone(),
                requested: *total,
                available: on_hand,
            });
        }
    }

    if !shortfalls.is_empty() {
        return Err(PostError::InsufficientStock {
            location_id: record.source_location_id.clone(),
            shortfalls,
        });
    }

    record.status = DocumentStatus::Posted;
    record.posted_at = Some(now);

    Posting::from_book(record, book)
}

/// Administrative override of average cost; quantities are untouched.
pub fn post_cost_adjustment(
    items: &HashMap<ItemId, StockItem>,
    mut record: CostAdjustmentRecord,
    now: DateTime<Utc>,
) -> Result<Posting<CostAdjustmentRecord>, PostError> {
    if record.status == AdjustmentStatus::Closed {
        return Err(StateError::AlreadyPosted {
            kind: "cost adjustment",
            id: record.id,
            status: "closed",
        }
        .into());
    }
    if record.lines.is_empty() {
        return Err(ValidationError::EmptyDocument {
            kind: "cost adjustment",
        }
        .into());
    }
    for (index, line) in record.lines.iter().enumerate() {
        non_negative(index, "new_cost", line.new_cost)?;
    }

    let mut book = ItemBook::new(items);
    for (index, line) in record.lines.iter_mut().enumerate() {
        let item = book.require_mut(index, &line.item_id)?;
        line.old_cost = item.revalue(line.new_cost);
    }

    record.status = AdjustmentStatus::Closed;
    record.posted_at = Some(now);

    Posting::from_book(record, book)
}

/// Completes a POS sale. Sales never move item quantities directly;
/// their consumption is derived from recipes when reconciling.
pub fn complete_sale(mut sale: SaleRecord, now: DateTime<Utc>) -> Result<SaleRecord, PostError> {
    if sale.status == SaleStatus::Completed {
        return Err(StateError::AlreadyPosted {
            kind: "sale",
            id: sale.id,
            status: "completed",
        }
        .into());
    }
    require_text("location_id", &sale.location_id)?;
    if sale.lines.is_empty() {
        return Err(ValidationError::EmptyDocument { kind: "sale" }.into());
    }
    for (index, line) in sale.lines.iter().enumerate() {
        require_text("menu_item_id", &line.menu_item_id)?;
        positive(index, "quantity", line.quantity)?;
        non_negative(index, "unit_price", line.unit_price)?;
    }

    sale.status = SaleStatus::Completed;
    sale.completed_at = Some(now);
    Ok(sale)
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

fn positive(line: usize, field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::InvalidNumber {
            line,
            field,
            reason: "must be positive",
            value,
        });
    }
    within_limit(line, field, value)
}

fn non_negative(line: usize, field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::InvalidNumber {
            line,
            field,
            reason: "must not be negative",
            value,
        });
    }
    within_limit(line, field, value)
}

fn within_limit(line: usize, field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value > MAX_LINE_AMOUNT {
        return Err(out_of_range(line, field, value));
    }
    Ok(())
}

fn out_of_range(line: usize, field: &'static str, value: Decimal) -> ValidationError {
    ValidationError::InvalidNumber {
        line,
        field,
        reason: "is out of range",
        value,
    }
}

fn checked_total(
    values: impl IntoIterator<Item = Decimal>,
    field: &'static str,
) -> Result<Decimal, ValidationError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or(ValidationError::OutOfRange { field })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use galley_core::{
        CostAdjustmentLine, CountLine, IngredientLine, PurchaseLine, TransferLine, WasteLine,
    };
    use uuid::Uuid;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn book_of(items: Vec<StockItem>) -> HashMap<ItemId, StockItem> {
        items.into_iter().map(|item| (item.id.clone(), item)).collect()
    }

    fn raw(id: &str) -> StockItem {
        StockItem::new(id, id, "kg", "g", Decimal::from(1000))
    }

    fn apply(items: &mut HashMap<ItemId, StockItem>, changed: Vec<StockItem>) {
        for item in changed {
            items.insert(item.id.clone(), item);
        }
    }

    #[test]
    fn purchase_blends_and_completes() {
        let mut items = book_of(vec![raw("RAW-001")]);
        let first = PurchaseOrder::draft(
            day(1),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", Decimal::from(10), Decimal::from(5))],
        );
        let posted = post_purchase(&items, first, Utc::now()).unwrap();
        assert_eq!(posted.record.status, PurchaseStatus::Completed);
        assert_eq!(posted.record.total, Decimal::from(50));
        assert_eq!(posted.value_change, Decimal::from(50));
        apply(&mut items, posted.changed_items);

        let second = PurchaseOrder::draft(
            day(2),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", Decimal::from(10), Decimal::from(7))],
        );
        let posted = post_purchase(&items, second, Utc::now()).unwrap();
        apply(&mut items, posted.changed_items);

        assert_eq!(items["RAW-001"].current_stock, Decimal::from(20));
        assert_eq!(items["RAW-001"].avg_cost, Decimal::from(6));
    }

    #[test]
    fn completed_purchase_cannot_be_posted_again() {
        let items = book_of(vec![raw("RAW-001")]);
        let mut order = PurchaseOrder::draft(
            day(1),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", Decimal::ONE, Decimal::ONE)],
        );
        order.status = PurchaseStatus::Completed;

        let err = post_purchase(&items, order, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PostError::State(StateError::AlreadyPosted { .. })
        ));
    }

    #[test]
    fn unknown_item_rejects_whole_order() {
        let items = book_of(vec![raw("RAW-001")]);
        let order = PurchaseOrder::draft(
            day(1),
            "KITCHEN",
            vec![
                PurchaseLine::new("RAW-001", Decimal::ONE, Decimal::ONE),
                PurchaseLine::new("RAW-404", Decimal::ONE, Decimal::ONE),
            ],
        );

        let err = post_purchase(&items, order, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            PostError::Validation(ValidationError::UnknownItem {
                line: 1,
                item_id: "RAW-404".to_string(),
            })
        );
        assert_eq!(items["RAW-001"].current_stock, Decimal::ZERO);
    }

    #[test]
    fn revision_backs_out_previous_quantity() {
        let mut items = book_of(vec![raw("RAW-001")]);
        let order = PurchaseOrder::draft(
            day(1),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", Decimal::from(5), Decimal::from(4))],
        );
        let posted = post_purchase(&items, order, Utc::now()).unwrap();
        apply(&mut items, posted.changed_items);
        let before = items["RAW-001"].current_stock;

        let mut revised = posted.record.clone();
        revised.lines = vec![PurchaseLine::new("RAW-001", Decimal::from(8), Decimal::from(4))];
        let repost = revise_purchase(&items, &posted.record, revised, Utc::now()).unwrap();
        apply(&mut items, repost.changed_items);

        assert_eq!(items["RAW-001"].current_stock - before, Decimal::from(3));
        assert_eq!(items["RAW-001"].avg_cost, Decimal::from(4));
        assert!(repost.record.is_edited);
    }

    #[test]
    fn draft_purchase_cannot_be_revised() {
        let items = book_of(vec![raw("RAW-001")]);
        let order = PurchaseOrder::draft(
            day(1),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", Decimal::ONE, Decimal::ONE)],
        );

        let err = revise_purchase(&items, &order, order.clone(), Utc::now()).unwrap_err();
        assert!(matches!(err, PostError::State(StateError::NotEditable { .. })));
    }

    fn production(ingredients: Vec<IngredientLine>, produced: i64) -> ProductionRecord {
        ProductionRecord {
            id: Uuid::new_v4(),
            date: day(3),
            product_id: "FG-SAUCE".to_string(),
            produced_qty: Decimal::from(produced),
            unit: "l".to_string(),
            location_id: "KITCHEN".to_string(),
            status: DocumentStatus::Draft,
            ingredients,
            total_cost: Decimal::ZERO,
            posted_at: None,
        }
    }

    fn tomatoes_line(qty: i64, cost: i64) -> IngredientLine {
        IngredientLine {
            stock_item_id: "RAW-TOM".to_string(),
            required_qty: Decimal::from(qty),
            unit_cost: Decimal::from(cost),
            line_cost: Decimal::from(qty * cost),
            is_manual: false,
        }
    }

    #[test]
    fn manufactured_product_takes_run_cost() {
        let mut tomatoes = raw("RAW-TOM");
        tomatoes.current_stock = Decimal::from(20);
        tomatoes.avg_cost = Decimal::from(3);
        let mut sauce = raw("FG-SAUCE");
        sauce.current_stock = Decimal::from(2);
        sauce.avg_cost = Decimal::from(100);
        let items = book_of(vec![tomatoes, sauce]);

        let posted = post_production(
            &items,
            production(vec![tomatoes_line(12, 3)], 4),
            true,
            Utc::now(),
        )
        .unwrap();
        let changed = book_of(posted.changed_items);

        assert_eq!(changed["RAW-TOM"].current_stock, Decimal::from(8));
        assert_eq!(changed["RAW-TOM"].avg_cost, Decimal::from(3));
        assert_eq!(changed["FG-SAUCE"].current_stock, Decimal::from(6));
        assert_eq!(changed["FG-SAUCE"].avg_cost, Decimal::from(9));
        assert_eq!(posted.record.total_cost, Decimal::from(36));
    }

    #[test]
    fn non_manufactured_product_keeps_cost() {
        let mut tomatoes = raw("RAW-TOM");
        tomatoes.current_stock = Decimal::from(20);
        tomatoes.avg_cost = Decimal::from(3);
        let mut sauce = raw("FG-SAUCE");
        sauce.avg_cost = Decimal::from(7);
        let items = book_of(vec![tomatoes, sauce]);

        let posted = post_production(
            &items,
            production(vec![tomatoes_line(12, 3)], 4),
            false,
            Utc::now(),
        )
        .unwrap();
        let changed = book_of(posted.changed_items);
        assert_eq!(changed["FG-SAUCE"].avg_cost, Decimal::from(7));
        assert_eq!(changed["FG-SAUCE"].current_stock, Decimal::from(4));
    }

    #[test]
    fn production_without_ingredients_is_allowed() {
        let items = book_of(vec![raw("FG-SAUCE")]);
        let posted = post_production(&items, production(vec![], 4), true, Utc::now()).unwrap();
        let changed = book_of(posted.changed_items);
        assert_eq!(changed["FG-SAUCE"].current_stock, Decimal::from(4));
        assert_eq!(changed["FG-SAUCE"].avg_cost, Decimal::ZERO);
    }

    #[test]
    fn production_rejects_unknown_product() {
        let items = book_of(vec![raw("RAW-TOM")]);
        let err = post_production(&items, production(vec![], 4), true, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PostError::Validation(ValidationError::UnknownProduct { .. })
        ));
    }

    #[test]
    fn waste_captures_cost_at_posting() {
        let mut flour = raw("RAW-001");
        flour.current_stock = Decimal::from(20);
        flour.avg_cost = Decimal::from(6);
        let items = book_of(vec![flour]);

        let record = WasteRecord::draft(day(4), "KITCHEN", vec![WasteLine::new("RAW-001", Decimal::from(4))]);
        let posted = post_waste(&items, record, Utc::now()).unwrap();

        assert_eq!(posted.record.total_value, Decimal::from(24));
        assert_eq!(posted.record.lines[0].unit_cost, Decimal::from(6));
        assert_eq!(posted.value_change, Decimal::from(-24));
        assert_eq!(posted.changed_items[0].current_stock, Decimal::from(16));
    }

    #[test]
    fn waste_rejects_non_positive_quantity() {
        let items = book_of(vec![raw("RAW-001")]);
        let record = WasteRecord::draft(day(4), "KITCHEN", vec![WasteLine::new("RAW-001", Decimal::ZERO)]);
        let err = post_waste(&items, record, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PostError::Validation(ValidationError::InvalidNumber { line: 0, field: "quantity", .. })
        ));
    }

    #[test]
    fn stocktake_overwrites_quantity() {
        let mut flour = raw("RAW-001");
        flour.current_stock = Decimal::from(16);
        flour.avg_cost = Decimal::new(65, 1);
        let items = book_of(vec![flour]);

        let record = StocktakeRecord::draft(day(5), "KITCHEN", vec![CountLine::new("RAW-001", Decimal::from(15))]);
        let posted = post_stocktake(&items, record, Utc::now()).unwrap();

        let line = &posted.record.lines[0];
        assert_eq!(line.system_qty, Decimal::from(16));
        assert_eq!(line.variance_qty, Decimal::from(-1));
        assert_eq!(line.variance_value, Decimal::new(-65, 1));
        assert_eq!(posted.changed_items[0].current_stock, Decimal::from(15));
    }

    #[test]
    fn cost_adjustment_records_old_cost() {
        let mut flour = raw("RAW-001");
        flour.current_stock = Decimal::from(16);
        flour.avg_cost = Decimal::from(6);
        let items = book_of(vec![flour]);

        let record = CostAdjustmentRecord::draft(
            day(5),
            vec![CostAdjustmentLine::new("RAW-001", Decimal::new(65, 1))],
        );
        let posted = post_cost_adjustment(&items, record, Utc::now()).unwrap();

        assert_eq!(posted.record.status, AdjustmentStatus::Closed);
        assert_eq!(posted.record.lines[0].old_cost, Decimal::from(6));
        assert_eq!(posted.changed_items[0].avg_cost, Decimal::new(65, 1));
        assert_eq!(posted.changed_items[0].current_stock, Decimal::from(16));
        assert_eq!(posted.value_change, Decimal::from(8));
    }

    fn transfer(source: &str, destination: &str, qty: i64) -> TransferRecord {
        TransferRecord {
            id: Uuid::new_v4(),
            date: day(6),
            source_location_id: source.to_string(),
            destination_location_id: destination.to_string(),
            status: DocumentStatus::Draft,
            lines: vec![TransferLine {
                item_id: "RAW-001".to_string(),
                quantity: Decimal::from(qty),
            }],
            posted_at: None,
        }
    }

    #[test]
    fn transfer_to_same_location_is_rejected() {
        let items = book_of(vec![raw("RAW-001")]);
        let err = post_transfer(
            &items,
            &TransactionHistory::default(),
            transfer("KITCHEN", "KITCHEN", 1),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, PostError::State(StateError::SameLocation { .. })));
    }

    #[test]
    fn transfer_beyond_location_stock_is_itemized() {
        let items = book_of(vec![raw("RAW-001")]);
        let mut history = TransactionHistory::default();
        let mut order = PurchaseOrder::draft(
            day(1),
            "STORE",
            vec![PurchaseLine::new("RAW-001", Decimal::from(5), Decimal::ONE)],
        );
        order.status = PurchaseStatus::Completed;
        history.purchases.push(order);

        let err = post_transfer(&items, &history, transfer("STORE", "BAR", 7), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            PostError::InsufficientStock {
                location_id: "STORE".to_string(),
                shortfalls: vec![Shortfall {
                    line: 0,
                    item_id: "RAW-001".to_string(),
                    requested: Decimal::from(7),
                    available: Decimal::from(5),
                }],
            }
        );

        let posted = post_transfer(&items, &history, transfer("STORE", "BAR", 5), Utc::now())
            .unwrap();
        assert!(posted.changed_items.is_empty());
        assert_eq!(posted.record.status, DocumentStatus::Posted);
    }

    #[test]
    fn transfer_ignores_stock_received_after_its_date() {
        let items = book_of(vec![raw("RAW-001")]);
        let mut history = TransactionHistory::default();
        let mut order = PurchaseOrder::draft(
            day(8),
            "STORE",
            vec![PurchaseLine::new("RAW-001", Decimal::from(5), Decimal::ONE)],
        );
        order.status = PurchaseStatus::Completed;
        history.purchases.push(order);

        let err = post_transfer(&items, &history, transfer("STORE", "BAR", 2), Utc::now())
            .unwrap_err();
        match err {
            PostError::InsufficientStock { shortfalls, .. } => {
                assert_eq!(shortfalls[0].available, Decimal::ZERO);
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut later = transfer("STORE", "BAR", 2);
        later.date = day(9);
        assert!(post_transfer(&items, &history, later, Utc::now()).is_ok());
    }

    #[test]
    fn production_recomputes_line_costs() {
        let mut tomatoes = raw("RAW-TOM");
        tomatoes.current_stock = Decimal::from(20);
        tomatoes.avg_cost = Decimal::from(3);
        let items = book_of(vec![tomatoes, raw("FG-SAUCE")]);

        let mut line = tomatoes_line(12, 50);
        line.line_cost = Decimal::from(-400);
        let posted =
            post_production(&items, production(vec![line], 4), true, Utc::now()).unwrap();
        let changed = book_of(posted.changed_items);

        assert_eq!(posted.record.ingredients[0].unit_cost, Decimal::from(3));
        assert_eq!(posted.record.ingredients[0].line_cost, Decimal::from(36));
        assert_eq!(posted.record.total_cost, Decimal::from(36));
        assert_eq!(changed["FG-SAUCE"].avg_cost, Decimal::from(9));
    }

    #[test]
    fn product_consumed_as_its_own_ingredient() {
        let mut tomatoes = raw("RAW-TOM");
        tomatoes.current_stock = Decimal::from(20);
        tomatoes.avg_cost = Decimal::from(3);
        let mut sauce = raw("FG-SAUCE");
        sauce.current_stock = Decimal::from(5);
        sauce.avg_cost = Decimal::from(10);
        let items = book_of(vec![tomatoes, sauce]);

        // A mother sauce: one litre of the previous batch seeds the next.
        let starter = IngredientLine {
            stock_item_id: "FG-SAUCE".to_string(),
            required_qty: Decimal::ONE,
            unit_cost: Decimal::from(10),
            line_cost: Decimal::ZERO,
            is_manual: true,
        };
        let posted = post_production(
            &items,
            production(vec![tomatoes_line(12, 3), starter], 4),
            true,
            Utc::now(),
        )
        .unwrap();
        let changed = book_of(posted.changed_items);

        assert_eq!(changed.len(), 2);
        assert_eq!(changed["FG-SAUCE"].current_stock, Decimal::from(8));
        assert_eq!(posted.record.total_cost, Decimal::from(46));
        assert_eq!(changed["FG-SAUCE"].avg_cost, Decimal::new(115, 1));
        assert_eq!(changed["RAW-TOM"].current_stock, Decimal::from(8));
        assert_eq!(
            posted.value_change,
            Decimal::from(8) * Decimal::new(115, 1) + Decimal::from(24) - Decimal::from(110)
        );
    }

    #[test]
    fn production_with_unknown_later_ingredient_changes_nothing() {
        let mut tomatoes = raw("RAW-TOM");
        tomatoes.current_stock = Decimal::from(20);
        let items = book_of(vec![tomatoes, raw("FG-SAUCE")]);

        let mut basil = tomatoes_line(1, 2);
        basil.stock_item_id = "RAW-404".to_string();
        let err = post_production(
            &items,
            production(vec![tomatoes_line(12, 3), basil], 4),
            true,
            Utc::now(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            PostError::Validation(ValidationError::UnknownItem {
                line: 1,
                item_id: "RAW-404".to_string(),
            })
        );
        assert_eq!(items["RAW-TOM"].current_stock, Decimal::from(20));
        assert_eq!(items["FG-SAUCE"].current_stock, Decimal::ZERO);
    }

    #[test]
    fn waste_with_unknown_later_line_changes_nothing() {
        let mut flour = raw("RAW-001");
        flour.current_stock = Decimal::from(20);
        flour.avg_cost = Decimal::from(6);
        let items = book_of(vec![flour]);

        let record = WasteRecord::draft(
            day(4),
            "KITCHEN",
            vec![
                WasteLine::new("RAW-001", Decimal::from(4)),
                WasteLine::new("RAW-404", Decimal::ONE),
            ],
        );
        let err = post_waste(&items, record, Utc::now()).unwrap_err();

        assert!(matches!(
            err,
            PostError::Validation(ValidationError::UnknownItem { line: 1, .. })
        ));
        assert_eq!(items["RAW-001"].current_stock, Decimal::from(20));
    }

    #[test]
    fn oversized_purchase_line_is_rejected_not_panicking() {
        let items = book_of(vec![raw("RAW-001")]);
        let huge = Decimal::from(10_000_000_000_000_000i64);
        let order = PurchaseOrder::draft(
            day(1),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", huge, huge)],
        );

        let err = post_purchase(&items, order, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            PostError::Validation(ValidationError::InvalidNumber {
                line: 0,
                field: "quantity",
                reason: "is out of range",
                value: huge,
            })
        );
    }

    #[test]
    fn overflowing_stock_balance_is_rejected() {
        let mut flour = raw("RAW-001");
        flour.current_stock = Decimal::MAX;
        flour.avg_cost = Decimal::ONE;
        let items = book_of(vec![flour]);
        let order = PurchaseOrder::draft(
            day(1),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", Decimal::from(10), Decimal::ONE)],
        );

        let err = post_purchase(&items, order, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PostError::Validation(ValidationError::InvalidNumber {
                line: 0,
                reason: "is out of range",
                ..
            })
        ));
        assert_eq!(items["RAW-001"].current_stock, Decimal::MAX);
    }

    #[test]
    fn completed_sale_is_stamped() {
        let sale = SaleRecord {
            id: Uuid::new_v4(),
            date: day(7),
            location_id: "BAR".to_string(),
            status: SaleStatus::Open,
            lines: vec![galley_core::SaleLine {
                menu_item_id: "MENU-LATTE".to_string(),
                quantity: Decimal::from(2),
                unit_price: Decimal::from(4),
            }],
            completed_at: None,
        };

        let completed = complete_sale(sale, Utc::now()).unwrap();
        assert_eq!(completed.status, SaleStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert!(complete_sale(completed, Utc::now()).is_err());
    }
}

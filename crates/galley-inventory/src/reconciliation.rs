//! Book-versus-physical reconciliation over the transaction logs.
//!
//! Everything here is read-only: missing recipes, archived items and
//! dangling references contribute zero instead of failing the report.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use galley_core::{DateRange, ItemId, LocationId, StockItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::history::{LocationScope, Movement, TransactionHistory, Window};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemFilter {
    #[default]
    All,
    Ids(Vec<ItemId>),
    Category(String),
}

impl ItemFilter {
    pub fn matches(&self, item: &StockItem) -> bool {
        match self {
            ItemFilter::All => true,
            ItemFilter::Ids(ids) => ids.iter().any(|id| *id == item.id),
            ItemFilter::Category(category) => item.category == *category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub items: ItemFilter,
    /// `None` reconciles across all locations.
    pub location: Option<LocationId>,
    pub range: DateRange,
    /// Variances at or below this magnitude count as a match.
    pub epsilon: Decimal,
}

impl ReconcileRequest {
    pub fn new(range: DateRange) -> Self {
        Self {
            items: ItemFilter::All,
            location: None,
            range,
            epsilon: default_epsilon(),
        }
    }
}

pub fn default_epsilon() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalSource {
    /// Latest posted count inside the range.
    Count { date: NaiveDate },
    /// No count in range; the item's current stock stands in.
    ItemMaster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRow {
    pub item_id: ItemId,
    pub name: String,
    pub stock_unit: String,
    pub avg_cost: Decimal,
    pub opening: Decimal,
    pub opening_count_date: Option<NaiveDate>,
    pub movement: Movement,
    pub book: Decimal,
    pub physical: Decimal,
    pub physical_source: PhysicalSource,
    pub variance_qty: Decimal,
    pub variance_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub items_checked: usize,
    pub items_with_variance: usize,
    /// Share of items without variance, 0..=1.
    pub accuracy: Decimal,
    pub total_variance_value: Decimal,
}

impl ReconciliationSummary {
    pub fn accuracy_pct(&self) -> Decimal {
        (self.accuracy * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub range: DateRange,
    pub location: Option<LocationId>,
    /// The report reflects the logs as of this instant.
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ReconciliationRow>,
    pub summary: ReconciliationSummary,
}

/// Reconciles every active item matching the request.
///
/// Opening is the latest posted count strictly before the range start (zero
/// without one); flows are posted documents dated inside the range; physical
/// is the latest count inside the range, or the item's current stock.
pub fn reconcile(
    history: &TransactionHistory,
    items: &HashMap<ItemId, StockItem>,
    request: &ReconcileRequest,
    now: DateTime<Utc>,
) -> ReconciliationReport {
    let recipes = history.recipe_index();
    let index = history.stocktake_index();
    let scope = LocationScope::from_option(request.location.as_deref());
    let window = Window::Range(request.range);

    let mut selected: Vec<&StockItem> = items
        .values()
        .filter(|item| item.active && request.items.matches(item))
        .collect();
    selected.sort_by(|a, b| a.id.cmp(&b.id));

    let rows: Vec<ReconciliationRow> = selected
        .into_iter()
        .map(|item| {
            let opening_count = index.latest_before(&item.id, scope, request.range.start);
            let opening = opening_count.map_or(Decimal::ZERO, |count| count.counted_qty);

            let movement =
                history.movement(&item.id, item.conversion_factor, scope, window, &recipes);
            let book = opening.saturating_add(movement.net());

            let (physical, physical_source) =
                match index.latest_within(&item.id, scope, request.range) {
                    Some(count) => (count.counted_qty, PhysicalSource::Count { date: count.date }),
                    None => (item.current_stock, PhysicalSource::ItemMaster),
                };

            let variance_qty = physical.saturating_sub(book);
            ReconciliationRow {
                item_id: item.id.clone(),
                name: item.name.clone(),
                stock_unit: item.stock_unit.clone(),
                avg_cost: item.avg_cost,
                opening,
                opening_count_date: opening_count.map(|count| count.date),
                movement,
                book,
                physical,
                physical_source,
                variance_qty,
                variance_value: variance_qty.saturating_mul(item.avg_cost),
            }
        })
        .collect();

    let summary = summarize(&rows, request.epsilon);
    ReconciliationReport {
        range: request.range,
        location: request.location.clone(),
        generated_at: now,
        rows,
        summary,
    }
}

fn summarize(rows: &[ReconciliationRow], epsilon: Decimal) -> ReconciliationSummary {
    let items_checked = rows.len();
    let items_with_variance = rows
        .iter()
        .filter(|row| row.variance_qty.abs() > epsilon)
        .count();

    let accuracy = if items_checked == 0 {
        Decimal::ONE
    } else {
        (Decimal::ONE - Decimal::from(items_with_variance) / Decimal::from(items_checked))
            .round_dp(4)
    };

    ReconciliationSummary {
        items_checked,
        items_with_variance,
        accuracy,
        total_variance_value: rows
            .iter()
            .fold(Decimal::ZERO, |total, row| total.saturating_add(row.variance_value)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRow {
    pub item_id: ItemId,
    pub name: String,
    pub stock_unit: String,
    pub quantity: Decimal,
    pub value: Decimal,
}

/// Recipe-derived consumption of completed sales in the range, per item,
/// valued at current average cost. Items with no usage are omitted.
pub fn theoretical_usage(
    history: &TransactionHistory,
    items: &HashMap<ItemId, StockItem>,
    range: DateRange,
    location: Option<&str>,
) -> Vec<UsageRow> {
    let recipes = history.recipe_index();
    let scope = LocationScope::from_option(location);
    let window = Window::Range(range);

    let mut rows: Vec<UsageRow> = items
        .values()
        .filter_map(|item| {
            let movement =
                history.movement(&item.id, item.conversion_factor, scope, window, &recipes);
            if movement.sold.is_zero() {
                return None;
            }
            Some(UsageRow {
                item_id: item.id.clone(),
                name: item.name.clone(),
                stock_unit: item.stock_unit.clone(),
                quantity: movement.sold,
                value: movement.sold.saturating_mul(item.avg_cost),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.item_id.cmp(&b.item_id));
    rows
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ItemId = String;
pub type LocationId = String;

/// Canonical record for one stock item.
///
/// `current_stock` and `avg_cost` are derived state: only the postors in
/// `galley-inventory` compute new values for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockItem {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub department: String,
    pub stock_unit: String,
    pub recipe_unit: String,
    /// Recipe units per one stock unit (1 kg = 1000 g gives 1000).
    pub conversion_factor: Decimal,
    #[serde(default)]
    pub current_stock: Decimal,
    #[serde(default)]
    pub avg_cost: Decimal,
    #[serde(default)]
    pub standard_cost: Decimal,
    #[serde(default)]
    pub min_level: Decimal,
    #[serde(default)]
    pub reorder_level: Decimal,
    #[serde(default)]
    pub max_level: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl StockItem {
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        stock_unit: impl Into<String>,
        recipe_unit: impl Into<String>,
        conversion_factor: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            department: String::new(),
            stock_unit: stock_unit.into(),
            recipe_unit: recipe_unit.into(),
            conversion_factor,
            current_stock: Decimal::ZERO,
            avg_cost: Decimal::ZERO,
            standard_cost: Decimal::ZERO,
            min_level: Decimal::ZERO,
            reorder_level: Decimal::ZERO,
            max_level: Decimal::ZERO,
            active: true,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Quantity times average cost, saturating at the decimal bounds.
    pub fn stock_value(&self) -> Decimal {
        self.current_stock.saturating_mul(self.avg_cost)
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PurchaseStatus {
    #[default]
    Draft,
    Completed,
}

/// Status of production, waste, transfer and stocktake documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DocumentStatus {
    #[default]
    Draft,
    Posted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AdjustmentStatus {
    #[default]
    Draft,
    Closed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SaleStatus {
    #[default]
    Open,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub line_total: Decimal,
}

impl PurchaseLine {
    pub fn new(item_id: impl Into<ItemId>, quantity: Decimal, unit_cost: Decimal) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            unit_cost,
            line_total: quantity * unit_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrder {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub supplier_id: String,
    pub date: NaiveDate,
    pub location_id: LocationId,
    #[serde(default)]
    pub status: PurchaseStatus,
    pub lines: Vec<PurchaseLine>,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    pub fn draft(date: NaiveDate, location_id: impl Into<LocationId>, lines: Vec<PurchaseLine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            supplier_id: String::new(),
            date,
            location_id: location_id.into(),
            status: PurchaseStatus::Draft,
            lines,
            total: Decimal::ZERO,
            is_edited: false,
            posted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientLine {
    pub stock_item_id: ItemId,
    pub required_qty: Decimal,
    pub unit_cost: Decimal,
    pub line_cost: Decimal,
    #[serde(default)]
    pub is_manual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub product_id: ItemId,
    pub produced_qty: Decimal,
    #[serde(default)]
    pub unit: String,
    pub location_id: LocationId,
    #[serde(default)]
    pub status: DocumentStatus,
    pub ingredients: Vec<IngredientLine>,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

impl ProductionRecord {
    /// Sum of the line costs, saturating at the decimal bounds. Posting
    /// recomputes every line, so this is only a draft figure.
    pub fn ingredient_cost(&self) -> Decimal {
        self.ingredients
            .iter()
            .fold(Decimal::ZERO, |total, line| total.saturating_add(line.line_cost))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
    #[serde(default)]
    pub reason: String,
    /// Captured from the item's average cost at posting.
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub line_value: Decimal,
}

impl WasteLine {
    pub fn new(item_id: impl Into<ItemId>, quantity: Decimal) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            reason: String::new(),
            unit_cost: Decimal::ZERO,
            line_value: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub location_id: LocationId,
    #[serde(default)]
    pub status: DocumentStatus,
    pub lines: Vec<WasteLine>,
    #[serde(default)]
    pub total_value: Decimal,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

impl WasteRecord {
    pub fn draft(date: NaiveDate, location_id: impl Into<LocationId>, lines: Vec<WasteLine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            location_id: location_id.into(),
            status: DocumentStatus::Draft,
            lines,
            total_value: Decimal::ZERO,
            posted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub source_location_id: LocationId,
    pub destination_location_id: LocationId,
    #[serde(default)]
    pub status: DocumentStatus,
    pub lines: Vec<TransferLine>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountLine {
    pub item_id: ItemId,
    pub counted_qty: Decimal,
    /// Book quantity that the count replaced.
    #[serde(default)]
    pub system_qty: Decimal,
    #[serde(default)]
    pub variance_qty: Decimal,
    #[serde(default)]
    pub variance_value: Decimal,
}

impl CountLine {
    pub fn new(item_id: impl Into<ItemId>, counted_qty: Decimal) -> Self {
        Self {
            item_id: item_id.into(),
            counted_qty,
            system_qty: Decimal::ZERO,
            variance_qty: Decimal::ZERO,
            variance_value: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StocktakeRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub location_id: LocationId,
    #[serde(default)]
    pub status: DocumentStatus,
    pub lines: Vec<CountLine>,
    #[serde(default)]
    pub total_variance_value: Decimal,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

impl StocktakeRecord {
    pub fn draft(date: NaiveDate, location_id: impl Into<LocationId>, lines: Vec<CountLine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            location_id: location_id.into(),
            status: DocumentStatus::Draft,
            lines,
            total_variance_value: Decimal::ZERO,
            posted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostAdjustmentLine {
    pub item_id: ItemId,
    pub new_cost: Decimal,
    #[serde(default)]
    pub old_cost: Decimal,
    #[serde(default)]
    pub reason: String,
}

impl CostAdjustmentLine {
    pub fn new(item_id: impl Into<ItemId>, new_cost: Decimal) -> Self {
        Self {
            item_id: item_id.into(),
            new_cost,
            old_cost: Decimal::ZERO,
            reason: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostAdjustmentRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: AdjustmentStatus,
    pub lines: Vec<CostAdjustmentLine>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

impl CostAdjustmentRecord {
    pub fn draft(date: NaiveDate, lines: Vec<CostAdjustmentLine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            status: AdjustmentStatus::Draft,
            lines,
            posted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeLine {
    pub stock_item_id: ItemId,
    /// Quantity in the ingredient's recipe unit, per one unit of output.
    pub quantity: Decimal,
}

/// Recipe for a menu item or a produced stock item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub menu_item_id: String,
    pub lines: Vec<RecipeLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleLine {
    pub menu_item_id: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub location_id: LocationId,
    #[serde(default)]
    pub status: SaleStatus,
    pub lines: Vec<SaleLine>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Produced items in this category take their cost from production runs.
    #[serde(default)]
    pub manufactured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Department {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Supplier {
    pub id: String,
    pub name: String,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

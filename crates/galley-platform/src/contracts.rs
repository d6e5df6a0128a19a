use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use galley_core::{IngredientLine, ItemId, LocationId, StockItem};
use galley_inventory::{Explosion, ItemFilter, LocationStock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Document kinds accepted by `post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostKind {
    Purchase,
    Production,
    Waste,
    Transfer,
    Stocktake,
    CostAdjustment,
    Sale,
}

impl PostKind {
    pub const ALL: [PostKind; 7] = [
        PostKind::Purchase,
        PostKind::Production,
        PostKind::Waste,
        PostKind::Transfer,
        PostKind::Stocktake,
        PostKind::CostAdjustment,
        PostKind::Sale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Purchase => "purchase",
            PostKind::Production => "production",
            PostKind::Waste => "waste",
            PostKind::Transfer => "transfer",
            PostKind::Stocktake => "stocktake",
            PostKind::CostAdjustment => "cost-adjustment",
            PostKind::Sale => "sale",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        PostKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| {
                let known: Vec<&str> = PostKind::ALL.iter().map(PostKind::as_str).collect();
                anyhow::anyhow!("unknown document kind `{raw}` (expected one of {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplodeResponse {
    pub product_id: ItemId,
    pub produced_qty: Decimal,
    pub recipe_found: bool,
    pub unresolved: Vec<ItemId>,
    pub ingredients: Vec<IngredientLine>,
    pub total_cost: Decimal,
}

impl ExplodeResponse {
    pub fn new(product_id: impl Into<ItemId>, produced_qty: Decimal, explosion: Explosion) -> Self {
        Self {
            product_id: product_id.into(),
            produced_qty,
            recipe_found: explosion.recipe_found,
            unresolved: explosion.unresolved.clone(),
            total_cost: explosion.total_cost(),
            ingredients: explosion.ingredients,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockResponse {
    pub item_id: ItemId,
    pub name: String,
    pub stock_unit: String,
    pub current_stock: Decimal,
    pub avg_cost: Decimal,
    pub stock_value: Decimal,
    /// Replayed stock at the requested location, when one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationStock>,
}

impl StockResponse {
    pub fn new(item: StockItem, location: Option<LocationStock>) -> Self {
        Self {
            stock_value: item.stock_value(),
            item_id: item.id,
            name: item.name,
            stock_unit: item.stock_unit,
            current_stock: item.current_stock,
            avg_cost: item.avg_cost,
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub location: Option<LocationId>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
}

impl ReconcileQuery {
    pub fn item_filter(&self) -> ItemFilter {
        match &self.item_id {
            Some(item_id) => ItemFilter::Ids(vec![item_id.clone()]),
            None => ItemFilter::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// True for domain rejections, false for storage or I/O failures.
    pub rejected: bool,
    pub at: DateTime<Utc>,
}

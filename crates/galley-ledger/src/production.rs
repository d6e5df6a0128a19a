use chrono::NaiveDate;
use galley_core::{
    DocumentStatus, IngredientLine, ItemId, LocationId, ProductionRecord, Recipe, StateError,
    ValidationError,
};
use galley_inventory::{Explosion, MAX_LINE_AMOUNT, explode, rescale, round_qty};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backoffice::Backoffice;
use crate::document::Document;
use crate::error::{LedgerError, LedgerResult};

/// A saved draft plus what the explosion found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionDraft {
    pub record: ProductionRecord,
    /// False when the product has no recipe; the operator should be warned.
    pub recipe_found: bool,
    pub unresolved: Vec<ItemId>,
}

impl Backoffice {
    /// Raw-material lines for `produced_qty` of a product, costed now.
    pub async fn explode_recipe(
        &self,
        product_id: &str,
        produced_qty: Decimal,
    ) -> LedgerResult<Explosion> {
        positive_quantity("produced_qty", produced_qty)?;

        let recipe = self.logs.recipes.get(product_id).await?;
        let items = self.items.by_id().await?;
        let explosion = explode(recipe.as_ref(), &items, produced_qty);
        warn_on_gaps(product_id, &explosion);
        Ok(explosion)
    }

    /// Explodes the product's recipe and saves the result as a draft.
    pub async fn draft_production(
        &self,
        product_id: &str,
        produced_qty: Decimal,
        location_id: impl Into<LocationId>,
        date: NaiveDate,
    ) -> LedgerResult<ProductionDraft> {
        let location_id = location_id.into();
        positive_quantity("produced_qty", produced_qty)?;
        let _guard = self.posting.lock().await;
        self.check_locations(&[location_id.as_str()]).await?;

        let Some(product) = self.items.get(product_id).await? else {
            return Err(ValidationError::UnknownProduct {
                item_id: product_id.to_string(),
            }
            .into());
        };
        let explosion = self.explode_recipe(product_id, produced_qty).await?;

        let record = ProductionRecord {
            id: Uuid::new_v4(),
            date,
            product_id: product.id,
            produced_qty,
            unit: product.stock_unit,
            location_id,
            status: DocumentStatus::Draft,
            total_cost: explosion.total_cost(),
            ingredients: explosion.ingredients,
            posted_at: None,
        };
        self.logs.production.upsert(record.clone()).await?;

        info!(id = %record.id, product_id, "production draft saved");
        Ok(ProductionDraft {
            record,
            recipe_found: explosion.recipe_found,
            unresolved: explosion.unresolved,
        })
    }

    /// Re-explodes the recipe lines of a draft for a new quantity. Manual
    /// lines keep their quantities.
    pub async fn rescale_production(
        &self,
        id: Uuid,
        produced_qty: Decimal,
    ) -> LedgerResult<ProductionDraft> {
        positive_quantity("produced_qty", produced_qty)?;
        let _guard = self.posting.lock().await;
        let mut record = self.draft(id).await?;

        let recipe = self.logs.recipes.get(&record.product_id).await?;
        let items = self.items.by_id().await?;
        let explosion = rescale(&mut record, recipe.as_ref(), &items, produced_qty);
        warn_on_gaps(&record.product_id, &explosion);

        self.logs.production.upsert(record.clone()).await?;
        Ok(ProductionDraft {
            record,
            recipe_found: explosion.recipe_found,
            unresolved: explosion.unresolved,
        })
    }

    /// Appends a manual ingredient to a draft, costed at the item's current
    /// average cost.
    pub async fn add_manual_ingredient(
        &self,
        id: Uuid,
        item_id: &str,
        quantity: Decimal,
    ) -> LedgerResult<ProductionRecord> {
        positive_quantity("quantity", quantity)?;
        let _guard = self.posting.lock().await;
        let mut record = self.draft(id).await?;

        let line = record.ingredients.len();
        let Some(item) = self.items.get(item_id).await? else {
            return Err(ValidationError::UnknownItem {
                line,
                item_id: item_id.to_string(),
            }
            .into());
        };

        let required_qty = round_qty(quantity);
        let line_cost = required_qty
            .checked_mul(item.avg_cost)
            .ok_or(ValidationError::OutOfRange { field: "line_cost" })?;
        record.ingredients.push(IngredientLine {
            stock_item_id: item.id,
            required_qty,
            unit_cost: item.avg_cost,
            line_cost,
            is_manual: true,
        });
        record.total_cost = record.ingredient_cost();

        self.logs.production.upsert(record.clone()).await?;
        Ok(record)
    }

    pub async fn production_record(&self, id: Uuid) -> LedgerResult<ProductionRecord> {
        self.logs
            .production
            .get(&id.to_string())
            .await?
            .ok_or_else(|| LedgerError::not_found(ProductionRecord::KIND, id))
    }

    /// Saves a recipe after checking every line against the Item Master.
    pub async fn upsert_recipe(&self, recipe: Recipe) -> LedgerResult<Recipe> {
        if recipe.menu_item_id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "menu_item_id",
            }
            .into());
        }
        if recipe.lines.is_empty() {
            return Err(ValidationError::EmptyDocument { kind: "recipe" }.into());
        }

        let _guard = self.posting.lock().await;
        let items = self.items.by_id().await?;
        for (line, entry) in recipe.lines.iter().enumerate() {
            if !items.contains_key(&entry.stock_item_id) {
                return Err(ValidationError::UnknownItem {
                    line,
                    item_id: entry.stock_item_id.clone(),
                }
                .into());
            }
            if entry.quantity <= Decimal::ZERO || entry.quantity > MAX_LINE_AMOUNT {
                return Err(ValidationError::InvalidNumber {
                    line,
                    field: "quantity",
                    reason: "must be positive and within range",
                    value: entry.quantity,
                }
                .into());
            }
        }

        self.logs.recipes.upsert(recipe.clone()).await?;
        info!(menu_item_id = %recipe.menu_item_id, lines = recipe.lines.len(), "recipe saved");
        Ok(recipe)
    }

    pub async fn recipes(&self) -> LedgerResult<Vec<Recipe>> {
        Ok(self.logs.recipes.all().await?)
    }

    async fn draft(&self, id: Uuid) -> LedgerResult<ProductionRecord> {
        let record = self.production_record(id).await?;
        if record.is_final() {
            return Err(StateError::NotEditable {
                kind: ProductionRecord::KIND,
                id,
                expected: "a draft",
            }
            .into());
        }
        Ok(record)
    }
}

fn positive_quantity(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::InvalidValue {
            field,
            reason: "must be positive",
            value,
        });
    }
    if value > MAX_LINE_AMOUNT {
        return Err(ValidationError::InvalidValue {
            field,
            reason: "is out of range",
            value,
        });
    }
    Ok(())
}

fn warn_on_gaps(product_id: &str, explosion: &Explosion) {
    if !explosion.recipe_found {
        warn!(product_id, "no recipe for product; ingredients must be entered manually");
    }
    if !explosion.unresolved.is_empty() {
        warn!(
            product_id,
            unresolved = ?explosion.unresolved,
            "recipe references unknown stock items"
        );
    }
}

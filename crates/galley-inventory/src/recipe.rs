use std::collections::HashMap;

use galley_core::{IngredientLine, ItemId, ProductionRecord, Recipe, StockItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::costing::round_qty;

/// Raw-material lines for a produced quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explosion {
    pub ingredients: Vec<IngredientLine>,
    /// False when the product has no recipe; the caller should warn the
    /// operator, who may continue with manual lines or none at all.
    pub recipe_found: bool,
    /// Recipe lines naming items missing from the Item Master, or whose
    /// quantity or cost overflows for this output.
    pub unresolved: Vec<ItemId>,
}

impl Explosion {
    pub fn total_cost(&self) -> Decimal {
        self.ingredients
            .iter()
            .fold(Decimal::ZERO, |total, line| total.saturating_add(line.line_cost))
    }
}

/// Stock-unit quantity needed for `produced_qty` units of output, or `None`
/// when it does not fit in a decimal.
///
/// A non-positive conversion factor is treated as 1 (recipe unit equals
/// stock unit).
pub fn required_quantity(
    recipe_qty: Decimal,
    conversion_factor: Decimal,
    produced_qty: Decimal,
) -> Option<Decimal> {
    let factor = if conversion_factor > Decimal::ZERO {
        conversion_factor
    } else {
        Decimal::ONE
    };
    let per_unit = recipe_qty.checked_div(factor)?;
    per_unit.checked_mul(produced_qty).map(round_qty)
}

/// Expands a recipe, costing every line at the item's current average cost.
/// The costs are a snapshot: later cost changes do not touch these lines.
pub fn explode(
    recipe: Option<&Recipe>,
    items: &HashMap<ItemId, StockItem>,
    produced_qty: Decimal,
) -> Explosion {
    let Some(recipe) = recipe else {
        return Explosion {
            ingredients: Vec::new(),
            recipe_found: false,
            unresolved: Vec::new(),
        };
    };

    let mut ingredients = Vec::with_capacity(recipe.lines.len());
    let mut unresolved = Vec::new();

    for line in &recipe.lines {
        let Some(item) = items.get(&line.stock_item_id) else {
            unresolved.push(line.stock_item_id.clone());
            continue;
        };

        let costed = required_quantity(line.quantity, item.conversion_factor, produced_qty)
            .and_then(|required_qty| Some((required_qty, required_qty.checked_mul(item.avg_cost)?)));
        let Some((required_qty, line_cost)) = costed else {
            unresolved.push(item.id.clone());
            continue;
        };
        ingredients.push(IngredientLine {
            stock_item_id: item.id.clone(),
            required_qty,
            unit_cost: item.avg_cost,
            line_cost,
            is_manual: false,
        });
    }

    Explosion {
        ingredients,
        recipe_found: true,
        unresolved,
    }
}

/// Re-explodes the recipe lines of a draft for a new produced quantity.
/// Manual lines keep their quantity and cost and stay after the recipe lines.
pub fn rescale(
    record: &mut ProductionRecord,
    recipe: Option<&Recipe>,
    items: &HashMap<ItemId, StockItem>,
    produced_qty: Decimal,
) -> Explosion {
    let explosion = explode(recipe, items, produced_qty);

    let manual: Vec<IngredientLine> = record
        .ingredients
        .drain(..)
        .filter(|line| line.is_manual)
        .collect();

    record.ingredients = explosion.ingredients.clone();
    record.ingredients.extend(manual);
    record.produced_qty = produced_qty;
    record.total_cost = record.ingredient_cost();

    explosion
}

use std::collections::{BTreeMap, HashMap};

use galley_core::{ItemId, StockItem, ValidationError};
use rust_decimal::Decimal;

/// Copy-on-write view of the Item Master for one posting.
///
/// Postors mutate the copies; nothing reaches the store unless the whole
/// posting validates and the caller commits `into_changed()`.
pub struct ItemBook<'a> {
    base: &'a HashMap<ItemId, StockItem>,
    changed: BTreeMap<ItemId, StockItem>,
}

impl<'a> ItemBook<'a> {
    pub fn new(base: &'a HashMap<ItemId, StockItem>) -> Self {
        Self {
            base,
            changed: BTreeMap::new(),
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.base.contains_key(item_id)
    }

    pub fn get(&self, item_id: &str) -> Option<&StockItem> {
        self.changed.get(item_id).or_else(|| self.base.get(item_id))
    }

    pub fn require(&self, line: usize, item_id: &str) -> Result<&StockItem, ValidationError> {
        self.get(item_id).ok_or_else(|| ValidationError::UnknownItem {
            line,
            item_id: item_id.to_string(),
        })
    }

    pub fn require_mut(
        &mut self,
        line: usize,
        item_id: &str,
    ) -> Result<&mut StockItem, ValidationError> {
        if !self.changed.contains_key(item_id) {
            let original = self.base.get(item_id).ok_or_else(|| ValidationError::UnknownItem {
                line,
                item_id: item_id.to_string(),
            })?;
            self.changed.insert(item_id.to_string(), original.clone());
        }

        self.changed
            .get_mut(item_id)
            .ok_or_else(|| ValidationError::UnknownItem {
                line,
                item_id: item_id.to_string(),
            })
    }

    /// Net change in inventory value (quantity x average cost) across the
    /// touched items, or `None` when a value does not fit in a decimal.
    pub fn value_change(&self) -> Option<Decimal> {
        self.changed.values().try_fold(Decimal::ZERO, |total, after| {
            let before = match self.base.get(&after.id) {
                Some(before) => before.current_stock.checked_mul(before.avg_cost)?,
                None => Decimal::ZERO,
            };
            let after = after.current_stock.checked_mul(after.avg_cost)?;
            total.checked_add(after.checked_sub(before)?)
        })
    }

    pub fn into_changed(self) -> Vec<StockItem> {
        self.changed.into_values().collect()
    }
}

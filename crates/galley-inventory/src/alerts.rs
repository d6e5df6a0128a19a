use std::collections::BTreeMap;

use galley_core::{ItemId, StockItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// At or below the minimum level.
    Critical,
    /// At or below the reorder level.
    Reorder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub item_id: ItemId,
    pub name: String,
    pub current_stock: Decimal,
    pub min_level: Decimal,
    pub reorder_level: Decimal,
    pub max_level: Decimal,
    pub severity: AlertSeverity,
    pub suggested_order: Decimal,
}

/// Active items that have dropped to a configured level. Levels left at
/// zero are treated as unset.
pub fn stock_alerts<'a>(items: impl IntoIterator<Item = &'a StockItem>) -> Vec<StockAlert> {
    let mut alerts: Vec<StockAlert> = items
        .into_iter()
        .filter(|item| item.active)
        .filter_map(|item| {
            let severity = if item.min_level > Decimal::ZERO && item.current_stock <= item.min_level {
                AlertSeverity::Critical
            } else if item.reorder_level > Decimal::ZERO
                && item.current_stock <= item.reorder_level
            {
                AlertSeverity::Reorder
            } else {
                return None;
            };

            Some(StockAlert {
                item_id: item.id.clone(),
                name: item.name.clone(),
                current_stock: item.current_stock,
                min_level: item.min_level,
                reorder_level: item.reorder_level,
                max_level: item.max_level,
                severity,
                suggested_order: item.max_level.saturating_sub(item.current_stock).max(Decimal::ZERO),
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        (a.severity != AlertSeverity::Critical, &a.item_id)
            .cmp(&(b.severity != AlertSeverity::Critical, &b.item_id))
    });
    alerts
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub category: String,
    pub items: usize,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub categories: Vec<CategoryValue>,
    pub total: Decimal,
}

/// Stock on hand at average cost, grouped by category.
pub fn valuation<'a>(items: impl IntoIterator<Item = &'a StockItem>) -> Valuation {
    let mut by_category: BTreeMap<&str, CategoryValue> = BTreeMap::new();

    for item in items.into_iter().filter(|item| item.active) {
        let entry = by_category
            .entry(item.category.as_str())
            .or_insert_with(|| CategoryValue {
                category: item.category.clone(),
                items: 0,
                value: Decimal::ZERO,
            });
        entry.items += 1;
        entry.value = entry.value.saturating_add(item.stock_value());
    }

    let categories: Vec<CategoryValue> = by_category.into_values().collect();
    let total = categories
        .iter()
        .fold(Decimal::ZERO, |total, category| total.saturating_add(category.value));
    Valuation { categories, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, category: &str, stock: i64, cost: i64) -> StockItem {
        let mut item = StockItem::new(id, id, "kg", "g", Decimal::from(1000)).with_category(category);
        item.current_stock = Decimal::from(stock);
        item.avg_cost = Decimal::from(cost);
        item
    }

    #[test]
    fn alerts_rank_critical_first_and_suggest_refill() {
        let mut low = item("RAW-A", "Dry", 3, 1);
        low.reorder_level = Decimal::from(5);
        low.max_level = Decimal::from(20);
        let mut empty = item("RAW-B", "Dry", 0, 1);
        empty.min_level = Decimal::from(1);
        empty.max_level = Decimal::from(10);
        let mut fine = item("RAW-C", "Dry", 50, 1);
        fine.reorder_level = Decimal::from(5);
        let unset = item("RAW-D", "Dry", 0, 1);

        let alerts = stock_alerts(&[low, empty, fine, unset]);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].item_id, "RAW-B");
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].suggested_order, Decimal::from(10));
        assert_eq!(alerts[1].item_id, "RAW-A");
        assert_eq!(alerts[1].suggested_order, Decimal::from(17));
    }

    #[test]
    fn valuation_groups_active_items() {
        let mut archived = item("RAW-Z", "Dairy", 100, 100);
        archived.active = false;
        let items = [
            item("RAW-A", "Dry", 10, 2),
            item("RAW-B", "Dry", 5, 4),
            item("RAW-C", "Dairy", 3, 3),
            archived,
        ];

        let valuation = valuation(&items);
        assert_eq!(valuation.categories.len(), 2);
        assert_eq!(valuation.categories[0].category, "Dairy");
        assert_eq!(valuation.categories[0].value, Decimal::from(9));
        assert_eq!(valuation.categories[1].items, 2);
        assert_eq!(valuation.total, Decimal::from(49));
    }
}

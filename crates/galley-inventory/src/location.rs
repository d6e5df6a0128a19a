use std::collections::HashMap;

use chrono::NaiveDate;
use galley_core::{ItemId, LocationId, StockItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::history::{CountEntry, LocationScope, Movement, TransactionHistory, Window};

/// Replayed quantity of one item at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStock {
    pub item_id: ItemId,
    pub location_id: LocationId,
    /// Count the replay started from; none means from the first document.
    pub anchor: Option<CountEntry>,
    pub movement: Movement,
    /// Unfloored replay result; transfer validation uses this.
    pub raw: Decimal,
    /// `raw` floored at zero, for display.
    pub available: Decimal,
}

impl LocationStock {
    pub fn is_negative(&self) -> bool {
        self.raw < Decimal::ZERO
    }
}

/// Starts at the latest posted count of the item at the location and
/// replays every posted document after it, up to `as_of` when given.
pub fn location_stock(
    history: &TransactionHistory,
    items: &HashMap<ItemId, StockItem>,
    item_id: &str,
    location_id: &str,
    as_of: Option<NaiveDate>,
) -> LocationStock {
    let recipes = history.recipe_index();
    let index = history.stocktake_index();
    let conversion_factor = items
        .get(item_id)
        .map_or(Decimal::ONE, |item| item.conversion_factor);

    let scope = LocationScope::Only(location_id);
    let anchor = index.latest_until(item_id, scope, as_of);
    let window = Window::SinceCount {
        anchor,
        until: as_of,
    };
    let movement = history.movement(item_id, conversion_factor, scope, window, &recipes);

    let opening = anchor.map_or(Decimal::ZERO, |count| count.counted_qty);
    let raw = opening.saturating_add(movement.net());

    LocationStock {
        item_id: item_id.to_string(),
        location_id: location_id.to_string(),
        anchor,
        movement,
        raw,
        available: raw.max(Decimal::ZERO),
    }
}

/// Location stock for every active item, ordered by item id.
pub fn location_stock_sheet(
    history: &TransactionHistory,
    items: &HashMap<ItemId, StockItem>,
    location_id: &str,
    as_of: Option<NaiveDate>,
) -> Vec<LocationStock> {
    let mut ids: Vec<&ItemId> = items
        .values()
        .filter(|item| item.active)
        .map(|item| &item.id)
        .collect();
    ids.sort();

    ids.into_iter()
        .map(|item_id| location_stock(history, items, item_id, location_id, as_of))
        .collect()
}

#[cfg(test)]
mod tests {
    use galley_core::{
        CountLine, DocumentStatus, PurchaseLine, PurchaseOrder, PurchaseStatus, Recipe,
        RecipeLine, SaleLine, SaleRecord, SaleStatus, StocktakeRecord, TransferLine,
        TransferRecord, WasteLine, WasteRecord,
    };
    use uuid::Uuid;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn items() -> HashMap<ItemId, StockItem> {
        let milk = StockItem::new("RAW-MILK", "Milk", "l", "ml", Decimal::from(1000));
        HashMap::from([(milk.id.clone(), milk)])
    }

    fn purchase(location: &str, date: NaiveDate, qty: i64) -> PurchaseOrder {
        let mut order = PurchaseOrder::draft(
            date,
            location,
            vec![PurchaseLine::new("RAW-MILK", Decimal::from(qty), Decimal::ONE)],
        );
        order.status = PurchaseStatus::Completed;
        order
    }

    fn transfer(from: &str, to: &str, date: NaiveDate, qty: i64) -> TransferRecord {
        TransferRecord {
            id: Uuid::new_v4(),
            date,
            source_location_id: from.to_string(),
            destination_location_id: to.to_string(),
            status: DocumentStatus::Posted,
            lines: vec![TransferLine {
                item_id: "RAW-MILK".to_string(),
                quantity: Decimal::from(qty),
            }],
            posted_at: None,
        }
    }

    #[test]
    fn replays_from_latest_count_at_the_location() {
        let mut count = StocktakeRecord::draft(
            day(5),
            "STORE",
            vec![CountLine::new("RAW-MILK", Decimal::from(8))],
        );
        count.status = DocumentStatus::Posted;

        let mut waste = WasteRecord::draft(
            day(6),
            "STORE",
            vec![WasteLine::new("RAW-MILK", Decimal::ONE)],
        );
        waste.status = DocumentStatus::Posted;

        let history = TransactionHistory {
            purchases: vec![purchase("STORE", day(1), 50), purchase("STORE", day(7), 4)],
            transfers: vec![transfer("STORE", "BAR", day(8), 3)],
            stocktakes: vec![count],
            waste: vec![waste],
            ..TransactionHistory::default()
        };

        let store = location_stock(&history, &items(), "RAW-MILK", "STORE", None);
        assert_eq!(store.raw, Decimal::from(8)); // 8 - 1 + 4 - 3
        assert_eq!(store.anchor.map(|a| a.date), Some(day(5)));

        let bar = location_stock(&history, &items(), "RAW-MILK", "BAR", None);
        assert_eq!(bar.raw, Decimal::from(3));
    }

    #[test]
    fn negative_replay_is_floored_for_display_only() {
        let history = TransactionHistory {
            purchases: vec![purchase("STORE", day(1), 2)],
            transfers: vec![transfer("STORE", "BAR", day(2), 5)],
            ..TransactionHistory::default()
        };

        let store = location_stock(&history, &items(), "RAW-MILK", "STORE", None);
        assert_eq!(store.raw, Decimal::from(-3));
        assert_eq!(store.available, Decimal::ZERO);
        assert!(store.is_negative());
    }

    #[test]
    fn sales_consume_through_menu_recipes() {
        let history = TransactionHistory {
            purchases: vec![purchase("BAR", day(1), 10)],
            recipes: vec![Recipe {
                menu_item_id: "MENU-LATTE".to_string(),
                lines: vec![RecipeLine {
                    stock_item_id: "RAW-MILK".to_string(),
                    quantity: Decimal::from(250),
                }],
            }],
            sales: vec![SaleRecord {
                id: Uuid::new_v4(),
                date: day(2),
                location_id: "BAR".to_string(),
                status: SaleStatus::Completed,
                lines: vec![SaleLine {
                    menu_item_id: "MENU-LATTE".to_string(),
                    quantity: Decimal::from(6),
                    unit_price: Decimal::from(4),
                }],
                completed_at: None,
            }],
            ..TransactionHistory::default()
        };

        let bar = location_stock(&history, &items(), "RAW-MILK", "BAR", None);
        assert_eq!(bar.movement.sold, Decimal::new(15, 1));
        assert_eq!(bar.raw, Decimal::new(85, 1));
    }

    #[test]
    fn as_of_caps_the_replay() {
        let history = TransactionHistory {
            purchases: vec![purchase("STORE", day(1), 2), purchase("STORE", day(9), 5)],
            ..TransactionHistory::default()
        };

        let early = location_stock(&history, &items(), "RAW-MILK", "STORE", Some(day(3)));
        assert_eq!(early.raw, Decimal::from(2));
        assert_eq!(location_stock_sheet(&history, &items(), "STORE", None)[0].raw, Decimal::from(7));
    }
}

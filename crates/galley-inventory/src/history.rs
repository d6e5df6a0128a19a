use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use galley_core::{
    DateRange, DocumentStatus, ItemId, LocationId, ProductionRecord, PurchaseOrder,
    PurchaseStatus, Recipe, SaleRecord, SaleStatus, StocktakeRecord, TransferRecord, WasteRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::recipe::required_quantity;

/// Everything the replay needs, loaded from the transaction logs.
/// Drafts may be present; only posted/completed documents count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub purchases: Vec<PurchaseOrder>,
    pub production: Vec<ProductionRecord>,
    pub waste: Vec<WasteRecord>,
    pub transfers: Vec<TransferRecord>,
    pub stocktakes: Vec<StocktakeRecord>,
    pub sales: Vec<SaleRecord>,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationScope<'a> {
    All,
    Only(&'a str),
}

impl<'a> LocationScope<'a> {
    pub fn from_option(location: Option<&'a str>) -> Self {
        location.map_or(LocationScope::All, LocationScope::Only)
    }

    pub fn includes(&self, location_id: &str) -> bool {
        match self {
            LocationScope::All => true,
            LocationScope::Only(only) => *only == location_id,
        }
    }
}

/// Quantities moved for one item, split by source. All values are in the
/// item's stock unit and non-negative; direction is given by the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub purchased: Decimal,
    pub produced: Decimal,
    pub transferred_in: Decimal,
    pub sold: Decimal,
    pub used_in_production: Decimal,
    pub wasted: Decimal,
    pub transferred_out: Decimal,
}

/// Totals saturate at the decimal bounds; reports never fail on size.
impl Movement {
    pub fn inflow(&self) -> Decimal {
        self.purchased
            .saturating_add(self.produced)
            .saturating_add(self.transferred_in)
    }

    pub fn outflow(&self) -> Decimal {
        self.sold
            .saturating_add(self.used_in_production)
            .saturating_add(self.wasted)
            .saturating_add(self.transferred_out)
    }

    pub fn net(&self) -> Decimal {
        self.inflow().saturating_sub(self.outflow())
    }
}

/// A posted count of one item at one location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountEntry {
    pub date: NaiveDate,
    pub posted_at: Option<DateTime<Utc>>,
    pub counted_qty: Decimal,
}

impl CountEntry {
    fn order_key(&self) -> (NaiveDate, Option<DateTime<Utc>>) {
        (self.date, self.posted_at)
    }
}

/// Posted counts per item and location, oldest first.
#[derive(Debug, Clone, Default)]
pub struct StocktakeIndex {
    entries: BTreeMap<(ItemId, LocationId), Vec<CountEntry>>,
}

impl StocktakeIndex {
    pub fn build(stocktakes: &[StocktakeRecord]) -> Self {
        let mut entries: BTreeMap<(ItemId, LocationId), Vec<CountEntry>> = BTreeMap::new();

        for stocktake in stocktakes
            .iter()
            .filter(|stocktake| stocktake.status == DocumentStatus::Posted)
        {
            for line in &stocktake.lines {
                entries
                    .entry((line.item_id.clone(), stocktake.location_id.clone()))
                    .or_default()
                    .push(CountEntry {
                        date: stocktake.date,
                        posted_at: stocktake.posted_at,
                        counted_qty: line.counted_qty,
                    });
            }
        }

        // Stable sort: a repeated line within one count keeps its last value last.
        for counts in entries.values_mut() {
            counts.sort_by_key(CountEntry::order_key);
        }

        Self { entries }
    }

    fn latest_matching(
        &self,
        item_id: &str,
        scope: LocationScope<'_>,
        accept: impl Fn(&CountEntry) -> bool,
    ) -> Option<CountEntry> {
        self.entries
            .iter()
            .filter(|((item, location), _)| item == item_id && scope.includes(location))
            .filter_map(|(_, counts)| counts.iter().rev().find(|count| accept(count)))
            .max_by_key(|count| count.order_key())
            .copied()
    }

    /// Latest count dated strictly before `date`.
    pub fn latest_before(
        &self,
        item_id: &str,
        scope: LocationScope<'_>,
        date: NaiveDate,
    ) -> Option<CountEntry> {
        self.latest_matching(item_id, scope, |count| count.date < date)
    }

    pub fn latest_within(
        &self,
        item_id: &str,
        scope: LocationScope<'_>,
        range: DateRange,
    ) -> Option<CountEntry> {
        self.latest_matching(item_id, scope, |count| range.contains(count.date))
    }

    /// Latest count on or before `until`, or the latest overall.
    pub fn latest_until(
        &self,
        item_id: &str,
        scope: LocationScope<'_>,
        until: Option<NaiveDate>,
    ) -> Option<CountEntry> {
        self.latest_matching(item_id, scope, |count| {
            until.is_none_or(|until| count.date <= until)
        })
    }
}

/// Which documents a replay picks up.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Window {
    Range(DateRange),
    /// Everything after a count, optionally capped at a date. Documents on
    /// the count's own date only count when posted after it.
    SinceCount {
        anchor: Option<CountEntry>,
        until: Option<NaiveDate>,
    },
}

impl Window {
    fn includes(&self, date: NaiveDate, stamp: Option<DateTime<Utc>>) -> bool {
        match self {
            Window::Range(range) => range.contains(date),
            Window::SinceCount { anchor, until } => {
                if until.is_some_and(|until| date > until) {
                    return false;
                }
                match anchor {
                    None => true,
                    Some(anchor) if date == anchor.date => {
                        matches!((stamp, anchor.posted_at), (Some(stamp), Some(counted)) if stamp > counted)
                    }
                    Some(anchor) => date > anchor.date,
                }
            }
        }
    }
}

impl TransactionHistory {
    pub fn stocktake_index(&self) -> StocktakeIndex {
        StocktakeIndex::build(&self.stocktakes)
    }

    pub fn recipe_index(&self) -> HashMap<&str, &Recipe> {
        self.recipes
            .iter()
            .map(|recipe| (recipe.menu_item_id.as_str(), recipe))
            .collect()
    }

    /// Replays posted documents for one item. Transfers only count for a
    /// single location; across all locations they cancel out.
    pub(crate) fn movement(
        &self,
        item_id: &str,
        conversion_factor: Decimal,
        scope: LocationScope<'_>,
        window: Window,
        recipes: &HashMap<&str, &Recipe>,
    ) -> Movement {
        let mut movement = Movement::default();

        for order in self.purchases.iter().filter(|order| {
            order.status == PurchaseStatus::Completed
                && scope.includes(&order.location_id)
                && window.includes(order.date, order.posted_at)
        }) {
            movement.purchased += order
                .lines
                .iter()
                .filter(|line| line.item_id == item_id)
                .map(|line| line.quantity)
                .sum::<Decimal>();
        }

        for run in self.production.iter().filter(|run| {
            run.status == DocumentStatus::Posted
                && scope.includes(&run.location_id)
                && window.includes(run.date, run.posted_at)
        }) {
            if run.product_id == item_id {
                movement.produced += run.produced_qty;
            }
            movement.used_in_production += run
                .ingredients
                .iter()
                .filter(|line| line.stock_item_id == item_id)
                .map(|line| line.required_qty)
                .sum::<Decimal>();
        }

        for record in self.waste.iter().filter(|record| {
            record.status == DocumentStatus::Posted
                && scope.includes(&record.location_id)
                && window.includes(record.date, record.posted_at)
        }) {
            movement.wasted += record
                .lines
                .iter()
                .filter(|line| line.item_id == item_id)
                .map(|line| line.quantity)
                .sum::<Decimal>();
        }

        if let LocationScope::Only(location_id) = scope {
            for transfer in self.transfers.iter().filter(|transfer| {
                transfer.status == DocumentStatus::Posted
                    && window.includes(transfer.date, transfer.posted_at)
            }) {
                let quantity: Decimal = transfer
                    .lines
                    .iter()
                    .filter(|line| line.item_id == item_id)
                    .map(|line| line.quantity)
                    .sum();
                if transfer.source_location_id == location_id {
                    movement.transferred_out += quantity;
                }
                if transfer.destination_location_id == location_id {
                    movement.transferred_in += quantity;
                }
            }
        }

        movement.sold = self.sale_consumption(item_id, conversion_factor, scope, window, recipes);
        movement
    }

    /// Stock consumed by completed sales, exploded through menu recipes.
    /// Menu items without a recipe contribute nothing.
    fn sale_consumption(
        &self,
        item_id: &str,
        conversion_factor: Decimal,
        scope: LocationScope<'_>,
        window: Window,
        recipes: &HashMap<&str, &Recipe>,
    ) -> Decimal {
        let mut consumed = Decimal::ZERO;

        for sale in self.sales.iter().filter(|sale| {
            sale.status == SaleStatus::Completed
                && scope.includes(&sale.location_id)
                && window.includes(sale.date, sale.completed_at)
        }) {
            for line in &sale.lines {
                let Some(recipe) = recipes.get(line.menu_item_id.as_str()) else {
                    continue;
                };
                for ingredient in recipe
                    .lines
                    .iter()
                    .filter(|ingredient| ingredient.stock_item_id == item_id)
                {
                    // A requirement that overflows contributes nothing.
                    let used =
                        required_quantity(ingredient.quantity, conversion_factor, line.quantity)
                            .unwrap_or(Decimal::ZERO);
                    consumed = consumed.saturating_add(used);
                }
            }
        }

        consumed
    }
}

#[cfg(test)]
mod tests {
    use galley_core::CountLine;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn count(location: &str, date: NaiveDate, qty: i64) -> StocktakeRecord {
        let mut record =
            StocktakeRecord::draft(date, location, vec![CountLine::new("RAW-001", Decimal::from(qty))]);
        record.status = DocumentStatus::Posted;
        record.posted_at = date.and_hms_opt(22, 0, 0).map(|at| at.and_utc());
        record
    }

    #[test]
    fn index_ignores_draft_counts() {
        let mut draft = count("KITCHEN", day(3), 9);
        draft.status = DocumentStatus::Draft;
        let index = StocktakeIndex::build(&[draft]);

        assert!(index.latest_until("RAW-001", LocationScope::All, None).is_none());
    }

    #[test]
    fn lookups_respect_date_bounds_and_location() {
        let index = StocktakeIndex::build(&[
            count("KITCHEN", day(1), 10),
            count("KITCHEN", day(10), 12),
            count("BAR", day(5), 3),
        ]);

        let before = index
            .latest_before("RAW-001", LocationScope::Only("KITCHEN"), day(10))
            .unwrap();
        assert_eq!(before.counted_qty, Decimal::from(10));

        let within = index
            .latest_within(
                "RAW-001",
                LocationScope::Only("KITCHEN"),
                DateRange::new(day(2), day(20)),
            )
            .unwrap();
        assert_eq!(within.counted_qty, Decimal::from(12));

        let any_before = index
            .latest_before("RAW-001", LocationScope::All, day(9))
            .unwrap();
        assert_eq!(any_before.counted_qty, Decimal::from(3));

        assert!(
            index
                .latest_before("RAW-001", LocationScope::Only("BAR"), day(5))
                .is_none()
        );
    }

    #[test]
    fn same_day_documents_count_only_after_the_stocktake() {
        let anchor = CountEntry {
            date: day(3),
            posted_at: day(3).and_hms_opt(12, 0, 0).map(|at| at.and_utc()),
            counted_qty: Decimal::ZERO,
        };
        let window = Window::SinceCount {
            anchor: Some(anchor),
            until: None,
        };

        let morning = day(3).and_hms_opt(8, 0, 0).map(|at| at.and_utc());
        let evening = day(3).and_hms_opt(18, 0, 0).map(|at| at.and_utc());
        assert!(!window.includes(day(3), morning));
        assert!(window.includes(day(3), evening));
        assert!(!window.includes(day(3), None));
        assert!(window.includes(day(4), None));
        assert!(!window.includes(day(2), None));
    }

    #[test]
    fn movement_nets_inflows_and_outflows() {
        let movement = Movement {
            purchased: Decimal::from(20),
            produced: Decimal::from(2),
            transferred_in: Decimal::from(1),
            sold: Decimal::from(3),
            used_in_production: Decimal::from(4),
            wasted: Decimal::from(5),
            transferred_out: Decimal::from(6),
        };
        assert_eq!(movement.net(), Decimal::from(5));
    }

    #[test]
    fn later_posting_on_the_same_day_wins() {
        let first = count("KITCHEN", day(4), 7);
        let mut second = count("KITCHEN", day(4), 8);
        second.posted_at = day(4).and_hms_opt(23, 0, 0).map(|at| at.and_utc());

        let index = StocktakeIndex::build(&[second, first]);
        let latest = index
            .latest_until("RAW-001", LocationScope::Only("KITCHEN"), None)
            .unwrap();
        assert_eq!(latest.counted_qty, Decimal::from(8));
    }
}

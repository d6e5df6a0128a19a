//! Double-entry valuation journals for inventory postings.
//!
//! Every builder returns `None` when the posting moves no value, so
//! transfers and clean counts leave nothing in the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use galley_core::events::item_aggregate_id;
use galley_core::{
    AvcoProfile, ChartOfAccounts, CostAdjustmentRecord, ProductionRecord, PurchaseOrder,
    StandardsProfile, StocktakeRecord, WasteRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money in journals is kept to four places; anything smaller is dropped.
const MONEY_SCALE: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalLine {
    pub account: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: Uuid,
    /// Record the entry was booked for.
    pub source_id: Uuid,
    pub date: NaiveDate,
    pub memo: String,
    pub lines: Vec<JournalLine>,
    pub posted_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn total_debit(&self) -> Decimal {
        self.lines.iter().map(|line| line.debit).sum()
    }

    pub fn total_credit(&self) -> Decimal {
        self.lines.iter().map(|line| line.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debit() == self.total_credit()
    }

    /// Net debit on one account across the entry.
    pub fn net_debit(&self, account: &str) -> Decimal {
        self.lines
            .iter()
            .filter(|line| line.account == account)
            .map(|line| line.debit - line.credit)
            .sum()
    }
}

/// Builds journals against one standards profile's chart of accounts.
#[derive(Debug, Clone)]
pub struct JournalBook {
    profile_name: &'static str,
    coa: ChartOfAccounts,
}

impl Default for JournalBook {
    fn default() -> Self {
        Self::new(&AvcoProfile)
    }
}

impl JournalBook {
    pub fn new(profile: &dyn StandardsProfile) -> Self {
        Self {
            profile_name: profile.name(),
            coa: profile.chart_of_accounts(),
        }
    }

    pub fn profile_name(&self) -> &'static str {
        self.profile_name
    }

    pub fn chart_of_accounts(&self) -> &ChartOfAccounts {
        &self.coa
    }

    /// Dr Inventory / Cr Accounts Payable for the order total.
    pub fn purchase(&self, order: &PurchaseOrder, value_change: Decimal) -> Option<JournalEntry> {
        let mut lines = pair(&self.coa.inventory, &self.coa.accounts_payable, order.total);
        self.push_residual(&mut lines, order.total, value_change);
        self.entry(order.id, order.date, "Purchase received", lines, order.posted_at)
    }

    /// Books only the difference between the revised and the previous total.
    pub fn purchase_revision(
        &self,
        previous: &PurchaseOrder,
        revised: &PurchaseOrder,
        value_change: Decimal,
    ) -> Option<JournalEntry> {
        let difference = revised.total - previous.total;
        let mut lines = pair(&self.coa.inventory, &self.coa.accounts_payable, difference);
        self.push_residual(&mut lines, difference, value_change);
        self.entry(
            revised.id,
            revised.date,
            "Purchase revised",
            lines,
            revised.posted_at,
        )
    }

    /// Raw materials move into finished goods at ingredient cost. Both sides
    /// sit on the inventory account; any revaluation of the product on top
    /// of that lands in the residual.
    pub fn production(
        &self,
        record: &ProductionRecord,
        value_change: Decimal,
    ) -> Option<JournalEntry> {
        let mut lines = pair(&self.coa.inventory, &self.coa.inventory, record.total_cost);
        self.push_residual(&mut lines, Decimal::ZERO, value_change);
        self.entry(
            record.id,
            record.date,
            &format!("Production of {}", record.product_id),
            lines,
            record.posted_at,
        )
    }

    pub fn waste(&self, record: &WasteRecord, value_change: Decimal) -> Option<JournalEntry> {
        let mut lines = pair(&self.coa.waste_expense, &self.coa.inventory, record.total_value);
        self.push_residual(&mut lines, -record.total_value, value_change);
        self.entry(record.id, record.date, "Waste posted", lines, record.posted_at)
    }

    /// Count gains debit inventory; shrinkage credits it.
    pub fn stocktake(
        &self,
        record: &StocktakeRecord,
        value_change: Decimal,
    ) -> Option<JournalEntry> {
        let variance = record.total_variance_value;
        let mut lines = pair(&self.coa.inventory, &self.coa.inventory_adjustment, variance);
        self.push_residual(&mut lines, variance, value_change);
        self.entry(record.id, record.date, "Stocktake variance", lines, record.posted_at)
    }

    /// Revaluation is Σ on-hand × (new − old), which is exactly the posting's
    /// value change since quantities stay put.
    pub fn cost_adjustment(
        &self,
        record: &CostAdjustmentRecord,
        value_change: Decimal,
    ) -> Option<JournalEntry> {
        let lines = pair(
            &self.coa.inventory,
            &self.coa.inventory_revaluation,
            value_change,
        );
        self.entry(record.id, record.date, "Cost adjustment", lines, record.posted_at)
    }

    /// Direct Item Master quantity change, valued at average cost.
    pub fn quantity_adjustment(
        &self,
        item_id: &str,
        at: DateTime<Utc>,
        value: Decimal,
    ) -> Option<JournalEntry> {
        let lines = pair(&self.coa.inventory, &self.coa.inventory_adjustment, value);
        self.entry(
            item_aggregate_id(item_id),
            at.date_naive(),
            &format!("Quantity adjusted for {item_id}"),
            lines,
            Some(at),
        )
    }

    /// Direct Item Master cost change over the quantity on hand.
    pub fn cost_override(
        &self,
        item_id: &str,
        at: DateTime<Utc>,
        value: Decimal,
    ) -> Option<JournalEntry> {
        let lines = pair(&self.coa.inventory, &self.coa.inventory_revaluation, value);
        self.entry(
            item_aggregate_id(item_id),
            at.date_naive(),
            &format!("Cost set for {item_id}"),
            lines,
            Some(at),
        )
    }

    /// Brings the inventory account in line with the Item Master when the
    /// booked amount differs from the actual value change.
    fn push_residual(&self, lines: &mut Vec<JournalLine>, booked: Decimal, value_change: Decimal) {
        let residual = value_change.saturating_sub(booked);
        lines.extend(pair(
            &self.coa.inventory,
            &self.coa.inventory_revaluation,
            residual,
        ));
    }

    fn entry(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        memo: &str,
        lines: Vec<JournalLine>,
        posted_at: Option<DateTime<Utc>>,
    ) -> Option<JournalEntry> {
        if lines.is_empty() {
            return None;
        }
        Some(JournalEntry {
            id: Uuid::new_v4(),
            source_id,
            date,
            memo: memo.to_string(),
            lines,
            posted_at: posted_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Debit one account and credit the other. A negative amount swaps the
/// sides; a zero amount yields no lines.
pub fn pair(debit_account: &str, credit_account: &str, amount: Decimal) -> Vec<JournalLine> {
    let amount = amount.round_dp(MONEY_SCALE);
    if amount.is_zero() {
        return Vec::new();
    }
    let (debit_account, credit_account, amount) = if amount.is_sign_negative() {
        (credit_account, debit_account, -amount)
    } else {
        (debit_account, credit_account, amount)
    };

    vec![
        JournalLine {
            account: debit_account.to_string(),
            debit: amount,
            credit: Decimal::ZERO,
        },
        JournalLine {
            account: credit_account.to_string(),
            debit: Decimal::ZERO,
            credit: amount,
        },
    ]
}

#[cfg(test)]
mod tests {
    use galley_core::{CountLine, PurchaseLine, WasteLine};

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn completed_order(total: i64) -> PurchaseOrder {
        let mut order = PurchaseOrder::draft(
            day(),
            "KITCHEN",
            vec![PurchaseLine::new("RAW-001", Decimal::from(total), Decimal::ONE)],
        );
        order.total = Decimal::from(total);
        order.posted_at = Some(Utc::now());
        order
    }

    #[test]
    fn negative_amount_swaps_sides() {
        let lines = pair("1300", "5200", Decimal::from(-3));
        assert_eq!(lines[0].account, "5200");
        assert_eq!(lines[0].debit, Decimal::from(3));
        assert_eq!(lines[1].account, "1300");
        assert_eq!(lines[1].credit, Decimal::from(3));
        assert!(pair("1300", "5200", Decimal::ZERO).is_empty());
    }

    #[test]
    fn purchase_debits_inventory_against_payables() {
        let book = JournalBook::default();
        let journal = book.purchase(&completed_order(50), Decimal::from(50)).unwrap();

        assert!(journal.is_balanced());
        assert_eq!(journal.lines.len(), 2);
        assert_eq!(journal.net_debit("1300"), Decimal::from(50));
        assert_eq!(journal.net_debit("2100"), Decimal::from(-50));
    }

    #[test]
    fn revision_books_only_the_difference() {
        let book = JournalBook::default();
        let previous = completed_order(50);
        let revised = completed_order(80);

        let journal = book
            .purchase_revision(&previous, &revised, Decimal::from(30))
            .unwrap();
        assert_eq!(journal.net_debit("2100"), Decimal::from(-30));
        assert_eq!(journal.lines.len(), 2);

        assert!(
            book.purchase_revision(&previous, &completed_order(50), Decimal::ZERO)
                .is_none()
        );
    }

    #[test]
    fn waste_expenses_the_issued_value() {
        let book = JournalBook::default();
        let mut record = WasteRecord::draft(
            day(),
            "KITCHEN",
            vec![WasteLine::new("RAW-001", Decimal::from(4))],
        );
        record.total_value = Decimal::from(24);

        let journal = book.waste(&record, Decimal::from(-24)).unwrap();
        assert!(journal.is_balanced());
        assert_eq!(journal.net_debit("5100"), Decimal::from(24));
        assert_eq!(journal.net_debit("1300"), Decimal::from(-24));
    }

    #[test]
    fn shrinkage_credits_inventory_and_clean_counts_book_nothing() {
        let book = JournalBook::default();
        let mut record = StocktakeRecord::draft(
            day(),
            "KITCHEN",
            vec![CountLine::new("RAW-001", Decimal::from(15))],
        );
        record.total_variance_value = Decimal::new(-65, 1);

        let journal = book.stocktake(&record, Decimal::new(-65, 1)).unwrap();
        assert_eq!(journal.net_debit("5200"), Decimal::new(65, 1));
        assert_eq!(journal.net_debit("1300"), Decimal::new(-65, 1));

        record.total_variance_value = Decimal::ZERO;
        assert!(book.stocktake(&record, Decimal::ZERO).is_none());
    }

    #[test]
    fn production_revaluation_lands_in_residual() {
        let book = JournalBook::default();
        let mut record = ProductionRecord {
            id: Uuid::new_v4(),
            date: day(),
            product_id: "FG-DOUGH".to_string(),
            produced_qty: Decimal::from(8),
            unit: "each".to_string(),
            location_id: "KITCHEN".to_string(),
            status: Default::default(),
            ingredients: Vec::new(),
            total_cost: Decimal::from(4),
            posted_at: None,
        };
        record.posted_at = Some(Utc::now());

        let journal = book.production(&record, Decimal::ONE).unwrap();
        assert!(journal.is_balanced());
        assert_eq!(journal.lines.len(), 4);
        assert_eq!(journal.net_debit("1300"), Decimal::ONE);
        assert_eq!(journal.net_debit("5300"), Decimal::from(-1));
    }
}

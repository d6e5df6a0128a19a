use serde::{Deserialize, Serialize};

/// Account codes the valuation journals post against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartOfAccounts {
    pub inventory: String,
    pub accounts_payable: String,
    /// Debited for spoiled or discarded stock.
    pub waste_expense: String,
    /// Offsets count variances (shrinkage and overage).
    pub inventory_adjustment: String,
    /// Offsets cost overrides and production cost replacement.
    pub inventory_revaluation: String,
}

pub trait StandardsProfile {
    fn name(&self) -> &'static str;
    fn chart_of_accounts(&self) -> ChartOfAccounts;
}

/// Moving-average costing with a small back-office chart.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvcoProfile;

impl StandardsProfile for AvcoProfile {
    fn name(&self) -> &'static str {
        "back-office AVCO"
    }

    fn chart_of_accounts(&self) -> ChartOfAccounts {
        ChartOfAccounts {
            inventory: "1300".into(),
            accounts_payable: "2100".into(),
            waste_expense: "5100".into(),
            inventory_adjustment: "5200".into(),
            inventory_revaluation: "5300".into(),
        }
    }
}

pub mod alerts;
pub mod book;
pub mod costing;
pub mod history;
pub mod location;
pub mod postings;
pub mod recipe;
pub mod reconciliation;

pub use alerts::{AlertSeverity, CategoryValue, StockAlert, Valuation, stock_alerts, valuation};
pub use book::ItemBook;
pub use costing::{Costing, MAX_LINE_AMOUNT, QTY_SCALE, round_qty, unit_cost, weighted_average};
pub use history::{CountEntry, LocationScope, Movement, StocktakeIndex, TransactionHistory};
pub use location::{LocationStock, location_stock, location_stock_sheet};
pub use postings::{
    Posting, complete_sale, post_cost_adjustment, post_production, post_purchase, post_stocktake,
    post_transfer, post_waste, revise_purchase,
};
pub use recipe::{Explosion, explode, rescale, required_quantity};
pub use reconciliation::{
    ItemFilter, PhysicalSource, ReconcileRequest, ReconciliationReport, ReconciliationRow,
    ReconciliationSummary, UsageRow, default_epsilon, reconcile, theoretical_usage,
};

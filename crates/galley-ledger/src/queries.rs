//! Read-only views over the logs and the Item Master. None of these take
//! the posting lock.

use chrono::{NaiveDate, Utc};
use galley_core::{DateRange, EventEnvelope, EventStore};
use galley_finance::JournalEntry;
use galley_inventory::{
    LocationStock, ReconcileRequest, ReconciliationReport, StockAlert, TransactionHistory,
    UsageRow, Valuation, location_stock, location_stock_sheet, reconcile, stock_alerts,
    theoretical_usage, valuation,
};
use galley_store::MasterData;
use tracing::{debug, warn};

use crate::backoffice::Backoffice;
use crate::error::LedgerResult;

impl Backoffice {
    /// Every transaction log the replay engines read.
    pub async fn history(&self) -> LedgerResult<TransactionHistory> {
        Ok(TransactionHistory {
            purchases: self.logs.purchases.all().await?,
            production: self.logs.production.all().await?,
            waste: self.logs.waste.all().await?,
            transfers: self.logs.transfers.all().await?,
            stocktakes: self.logs.stocktakes.all().await?,
            sales: self.logs.sales.all().await?,
            recipes: self.logs.recipes.all().await?,
        })
    }

    pub async fn get_location_stock(
        &self,
        item_id: &str,
        location_id: &str,
        as_of: Option<NaiveDate>,
    ) -> LedgerResult<LocationStock> {
        let history = self.history().await?;
        let items = self.items.by_id().await?;

        let stock = location_stock(&history, &items, item_id, location_id, as_of);
        if stock.is_negative() {
            warn!(
                item_id,
                location_id,
                raw = %stock.raw,
                "replayed location stock is negative"
            );
        }
        Ok(stock)
    }

    pub async fn location_stock_sheet(
        &self,
        location_id: &str,
        as_of: Option<NaiveDate>,
    ) -> LedgerResult<Vec<LocationStock>> {
        let history = self.history().await?;
        let items = self.items.by_id().await?;
        Ok(location_stock_sheet(&history, &items, location_id, as_of))
    }

    /// A request over `range` using the configured variance epsilon.
    pub fn reconcile_request(&self, range: DateRange) -> ReconcileRequest {
        ReconcileRequest {
            epsilon: self.variance_epsilon,
            ..ReconcileRequest::new(range)
        }
    }

    pub async fn reconcile(&self, request: &ReconcileRequest) -> LedgerResult<ReconciliationReport> {
        let history = self.history().await?;
        let items = self.items.by_id().await?;

        let report = reconcile(&history, &items, request, Utc::now());
        debug!(
            start = %request.range.start,
            end = %request.range.end,
            location = ?request.location,
            checked = report.summary.items_checked,
            flagged = report.summary.items_with_variance,
            accuracy = %report.summary.accuracy,
            "reconciliation run"
        );
        Ok(report)
    }

    pub async fn theoretical_usage(
        &self,
        range: DateRange,
        location_id: Option<&str>,
    ) -> LedgerResult<Vec<UsageRow>> {
        let history = self.history().await?;
        let items = self.items.by_id().await?;
        Ok(theoretical_usage(&history, &items, range, location_id))
    }

    pub async fn stock_alerts(&self) -> LedgerResult<Vec<StockAlert>> {
        let items = self.items.all().await?;
        Ok(stock_alerts(&items))
    }

    pub async fn valuation(&self) -> LedgerResult<Valuation> {
        let items = self.items.all().await?;
        Ok(valuation(&items))
    }

    pub async fn journals(&self) -> LedgerResult<Vec<JournalEntry>> {
        Ok(self.journals.all().await?)
    }

    pub async fn audit_log(&self) -> LedgerResult<Vec<EventEnvelope>> {
        Ok(self.audit.all().await?)
    }

    pub async fn master_data(&self) -> LedgerResult<MasterData> {
        Ok(self.master.snapshot().await?)
    }
}

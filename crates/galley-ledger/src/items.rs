//! Item Master operations. Every mutation is persisted before it returns.

use chrono::Utc;
use galley_core::{AuditEvent, AuditEventKind, EventStore, StockItem, ValidationError};
use galley_inventory::MAX_LINE_AMOUNT;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};

use crate::backoffice::Backoffice;
use crate::error::{LedgerError, LedgerResult};

impl Backoffice {
    pub async fn get_item(&self, id: &str) -> LedgerResult<StockItem> {
        self.items
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("stock item", id))
    }

    pub async fn items(&self) -> LedgerResult<Vec<StockItem>> {
        Ok(self.items.all().await?)
    }

    /// Creates or edits an item's descriptive fields.
    ///
    /// Quantity and average cost are derived state: an existing item keeps
    /// its values and a new item starts at zero for both.
    pub async fn upsert_item(&self, mut item: StockItem) -> LedgerResult<StockItem> {
        if item.id.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "id" }.into());
        }
        if item.name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "name" }.into());
        }
        if item.conversion_factor <= Decimal::ZERO {
            warn!(
                item_id = %item.id,
                conversion_factor = %item.conversion_factor,
                "non-positive conversion factor; recipes will treat it as 1"
            );
        }

        let _guard = self.posting.lock().await;
        match self.items.get(&item.id).await? {
            Some(existing) => {
                item.current_stock = existing.current_stock;
                item.avg_cost = existing.avg_cost;
            }
            None => {
                item.current_stock = Decimal::ZERO;
                item.avg_cost = Decimal::ZERO;
            }
        }

        self.items.upsert(item.clone()).await?;
        info!(item_id = %item.id, "stock item saved");
        Ok(item)
    }

    /// Moves the book quantity by `delta` without touching cost.
    pub async fn adjust_quantity(
        &self,
        id: &str,
        delta: Decimal,
        reason: &str,
    ) -> LedgerResult<StockItem> {
        if delta.abs() > MAX_LINE_AMOUNT {
            return Err(ValidationError::InvalidValue {
                field: "delta",
                reason: "is out of range",
                value: delta,
            }
            .into());
        }

        let _guard = self.posting.lock().await;
        let mut item = self.get_item(id).await?;

        let previous = item.current_stock;
        let value = delta.checked_mul(item.avg_cost);
        let (Some(stock), Some(value)) = (previous.checked_add(delta), value) else {
            return Err(ValidationError::OutOfRange {
                field: "current_stock",
            }
            .into());
        };
        item.current_stock = stock;
        if item.current_stock.checked_mul(item.avg_cost).is_none() {
            return Err(ValidationError::OutOfRange {
                field: "current_stock",
            }
            .into());
        }
        self.items.upsert(item.clone()).await?;

        self.audit
            .append(AuditEvent::for_item(
                &item.id,
                AuditEventKind::ItemQuantityAdjusted,
                json!({ "previous": previous, "delta": delta, "reason": reason }),
            ))
            .await?;
        if let Some(journal) =
            self.journal_book
                .quantity_adjustment(&item.id, Utc::now(), value)
        {
            self.journals.append(journal).await?;
        }

        info!(item_id = %item.id, %delta, "item quantity adjusted");
        Ok(item)
    }

    /// Sets average cost outside a cost adjustment document.
    pub async fn set_cost(&self, id: &str, new_cost: Decimal) -> LedgerResult<StockItem> {
        if new_cost < Decimal::ZERO {
            return Err(ValidationError::InvalidValue {
                field: "avg_cost",
                reason: "must not be negative",
                value: new_cost,
            }
            .into());
        }
        if new_cost > MAX_LINE_AMOUNT {
            return Err(ValidationError::InvalidValue {
                field: "avg_cost",
                reason: "is out of range",
                value: new_cost,
            }
            .into());
        }

        let _guard = self.posting.lock().await;
        let mut item = self.get_item(id).await?;

        let old_cost = item.avg_cost;
        let revaluation = new_cost
            .checked_sub(old_cost)
            .and_then(|change| item.current_stock.checked_mul(change))
            .filter(|_| item.current_stock.checked_mul(new_cost).is_some())
            .ok_or(ValidationError::OutOfRange {
                field: "inventory value",
            })?;
        item.avg_cost = new_cost;
        self.items.upsert(item.clone()).await?;

        self.audit
            .append(AuditEvent::for_item(
                &item.id,
                AuditEventKind::ItemCostSet,
                json!({ "old_cost": old_cost, "new_cost": new_cost }),
            ))
            .await?;
        if let Some(journal) = self.journal_book.cost_override(&item.id, Utc::now(), revaluation)
        {
            self.journals.append(journal).await?;
        }

        info!(item_id = %item.id, %old_cost, %new_cost, "item cost set");
        Ok(item)
    }

    pub async fn archive_item(&self, id: &str) -> LedgerResult<StockItem> {
        self.set_active(id, false, AuditEventKind::ItemArchived).await
    }

    pub async fn reactivate_item(&self, id: &str) -> LedgerResult<StockItem> {
        self.set_active(id, true, AuditEventKind::ItemReactivated).await
    }

    async fn set_active(
        &self,
        id: &str,
        active: bool,
        kind: AuditEventKind,
    ) -> LedgerResult<StockItem> {
        let _guard = self.posting.lock().await;
        let mut item = self.get_item(id).await?;
        if item.active == active {
            return Ok(item);
        }

        item.active = active;
        self.items.upsert(item.clone()).await?;
        self.audit
            .append(AuditEvent::for_item(&item.id, kind, json!({ "active": active })))
            .await?;

        info!(item_id = %item.id, active, "item status changed");
        Ok(item)
    }
}

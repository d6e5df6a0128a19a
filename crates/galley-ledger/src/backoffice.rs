use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use galley_core::{
    AuditEvent, AuditEventKind, CostAdjustmentRecord, EventStore, ItemId, KeyValueStore,
    PostError, ProductionRecord, PurchaseOrder, SaleRecord, StateError, StockItem,
    StocktakeRecord, TableKey, TransferRecord, ValidationError, WasteRecord,
};
use galley_finance::{JournalBook, JournalEntry};
use galley_inventory::{Posting, default_epsilon};
use galley_store::{
    ItemRepository, KeyValueEventStore, MasterDataRepository, Table, TransactionLogRepository,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::document::Document;
use crate::error::{LedgerError, LedgerResult};

/// A posted document together with the journal it produced, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posted<T> {
    pub record: T,
    pub journal: Option<JournalEntry>,
}

/// The back-office inventory service.
///
/// Every posting and Item Master mutation runs behind one lock, so the
/// moving-average read-modify-write is strictly ordered. Reports and stock
/// queries read without it and stamp their output with the time they ran.
pub struct Backoffice {
    pub(crate) items: ItemRepository,
    pub(crate) logs: TransactionLogRepository,
    pub(crate) master: MasterDataRepository,
    pub(crate) audit: KeyValueEventStore,
    pub(crate) journals: Table<JournalEntry>,
    pub(crate) journal_book: JournalBook,
    pub(crate) variance_epsilon: Decimal,
    pub(crate) posting: Mutex<()>,
}

impl Backoffice {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            items: ItemRepository::new(Arc::clone(&store)),
            logs: TransactionLogRepository::new(Arc::clone(&store)),
            master: MasterDataRepository::new(Arc::clone(&store)),
            audit: KeyValueEventStore::new(Arc::clone(&store)),
            journals: Table::new(store, TableKey::Journals),
            journal_book: JournalBook::default(),
            variance_epsilon: default_epsilon(),
            posting: Mutex::new(()),
        }
    }

    pub fn with_variance_epsilon(mut self, epsilon: Decimal) -> Self {
        self.variance_epsilon = epsilon;
        self
    }

    pub fn variance_epsilon(&self) -> Decimal {
        self.variance_epsilon
    }

    pub async fn post_purchase(&self, order: PurchaseOrder) -> LedgerResult<Posted<PurchaseOrder>> {
        let _guard = self.posting.lock().await;
        self.post_document(
            &self.logs.purchases,
            order,
            AuditEventKind::PurchaseReceived,
            |items, order| galley_inventory::post_purchase(items, order, Utc::now()),
            |book, posting| book.purchase(&posting.record, posting.value_change),
        )
        .await
    }

    /// Re-applies an edited purchase order that was already completed.
    pub async fn revise_purchase(
        &self,
        revised: PurchaseOrder,
    ) -> LedgerResult<Posted<PurchaseOrder>> {
        let _guard = self.posting.lock().await;

        let previous = self
            .logs
            .purchases
            .get(&revised.id.to_string())
            .await?
            .ok_or_else(|| LedgerError::not_found(PurchaseOrder::KIND, revised.id))?;
        self.check_locations(&revised.locations()).await?;

        let items = self.items.by_id().await?;
        let posting = galley_inventory::revise_purchase(&items, &previous, revised, Utc::now())?;
        let journal = self
            .journal_book
            .purchase_revision(&previous, &posting.record, posting.value_change);

        info!(
            id = %previous.id,
            previous_total = %previous.total,
            total = %posting.record.total,
            "purchase order revised"
        );
        self.persist(&self.logs.purchases, posting, AuditEventKind::PurchaseRevised, journal)
            .await
    }

    /// Posts a production run. The product's category decides whether the
    /// run replaces the product's average cost.
    pub async fn post_production(
        &self,
        record: ProductionRecord,
    ) -> LedgerResult<Posted<ProductionRecord>> {
        let _guard = self.posting.lock().await;

        let manufactured = self.is_manufactured(&record.product_id).await?;
        if record.ingredients.is_empty() {
            warn!(
                id = %record.id,
                product_id = %record.product_id,
                "posting production with no ingredients"
            );
        }

        self.post_document(
            &self.logs.production,
            record,
            AuditEventKind::ProductionPosted,
            |items, record| {
                galley_inventory::post_production(items, record, manufactured, Utc::now())
            },
            |book, posting| book.production(&posting.record, posting.value_change),
        )
        .await
    }

    pub async fn post_waste(&self, record: WasteRecord) -> LedgerResult<Posted<WasteRecord>> {
        let _guard = self.posting.lock().await;
        self.post_document(
            &self.logs.waste,
            record,
            AuditEventKind::WastePosted,
            |items, record| galley_inventory::post_waste(items, record, Utc::now()),
            |book, posting| book.waste(&posting.record, posting.value_change),
        )
        .await
    }

    /// Validates against replayed stock at the source; global item
    /// quantities are left alone.
    pub async fn post_transfer(
        &self,
        record: TransferRecord,
    ) -> LedgerResult<Posted<TransferRecord>> {
        let _guard = self.posting.lock().await;

        let history = self.history().await?;
        let result = self
            .post_document(
                &self.logs.transfers,
                record,
                AuditEventKind::TransferPosted,
                |items, record| {
                    galley_inventory::post_transfer(items, &history, record, Utc::now())
                },
                |_, _| None,
            )
            .await;

        if let Err(LedgerError::Post(err @ PostError::InsufficientStock { .. })) = &result {
            warn!("transfer rejected: {err}");
        }
        result
    }

    pub async fn post_stocktake(
        &self,
        record: StocktakeRecord,
    ) -> LedgerResult<Posted<StocktakeRecord>> {
        let _guard = self.posting.lock().await;
        self.post_document(
            &self.logs.stocktakes,
            record,
            AuditEventKind::StocktakePosted,
            |items, record| galley_inventory::post_stocktake(items, record, Utc::now()),
            |book, posting| book.stocktake(&posting.record, posting.value_change),
        )
        .await
    }

    pub async fn post_cost_adjustment(
        &self,
        record: CostAdjustmentRecord,
    ) -> LedgerResult<Posted<CostAdjustmentRecord>> {
        let _guard = self.posting.lock().await;
        self.post_document(
            &self.logs.cost_adjustments,
            record,
            AuditEventKind::CostAdjusted,
            |items, record| galley_inventory::post_cost_adjustment(items, record, Utc::now()),
            |book, posting| book.cost_adjustment(&posting.record, posting.value_change),
        )
        .await
    }

    /// Stores a completed POS sale. The Item Master is not touched; sale
    /// consumption is derived from recipes when reconciling.
    pub async fn complete_sale(&self, sale: SaleRecord) -> LedgerResult<Posted<SaleRecord>> {
        let _guard = self.posting.lock().await;

        let recipes = self.logs.recipes.all().await?;
        for line in &sale.lines {
            if !recipes
                .iter()
                .any(|recipe| recipe.menu_item_id == line.menu_item_id)
            {
                warn!(
                    menu_item_id = %line.menu_item_id,
                    "sold menu item has no recipe; it will not consume stock"
                );
            }
        }

        self.post_document(
            &self.logs.sales,
            sale,
            AuditEventKind::SaleCompleted,
            |_, sale| {
                galley_inventory::complete_sale(sale, Utc::now()).map(|record| Posting {
                    record,
                    changed_items: Vec::new(),
                    value_change: Decimal::ZERO,
                })
            },
            |_, _| None,
        )
        .await
    }

    /// Shared posting pipeline. Callers hold the posting lock.
    async fn post_document<T, P, J>(
        &self,
        table: &Table<T>,
        document: T,
        kind: AuditEventKind,
        postor: P,
        journal: J,
    ) -> LedgerResult<Posted<T>>
    where
        T: Document,
        P: FnOnce(&HashMap<ItemId, StockItem>, T) -> Result<Posting<T>, PostError>,
        J: FnOnce(&JournalBook, &Posting<T>) -> Option<JournalEntry>,
    {
        self.ensure_not_posted(table, &document).await?;
        self.check_locations(&document.locations()).await?;

        let items = self.items.by_id().await?;
        let posting = postor(&items, document)?;
        let journal = journal(&self.journal_book, &posting);

        self.persist(table, posting, kind, journal).await
    }

    /// Writes the changed items in one store write, then the record, the
    /// audit event and the journal.
    async fn persist<T: Document>(
        &self,
        table: &Table<T>,
        posting: Posting<T>,
        kind: AuditEventKind,
        journal: Option<JournalEntry>,
    ) -> LedgerResult<Posted<T>> {
        let Posting {
            record,
            changed_items,
            value_change,
        } = posting;

        self.items.commit(changed_items).await?;
        table.upsert(record.clone()).await?;

        let payload = serde_json::to_value(&record)
            .with_context(|| format!("serializing {} {}", T::KIND, record.document_id()))?;
        let envelope = self
            .audit
            .append(AuditEvent::new(record.document_id(), kind, payload))
            .await?;

        if let Some(entry) = &journal {
            self.journals.append(entry.clone()).await?;
        }

        info!(
            kind = T::KIND,
            id = %record.document_id(),
            lines = record.line_count(),
            value_change = %value_change,
            sequence = envelope.sequence,
            "document posted"
        );

        Ok(Posted { record, journal })
    }

    /// Rejects a document whose stored copy has already been posted, even
    /// if the caller sends it back as a draft.
    async fn ensure_not_posted<T: Document>(
        &self,
        table: &Table<T>,
        document: &T,
    ) -> LedgerResult<()> {
        let stored = table.get(&document.document_id().to_string()).await?;
        if stored.is_some_and(|stored| stored.is_final()) {
            return Err(StateError::AlreadyPosted {
                kind: T::KIND,
                id: document.document_id(),
                status: T::FINAL_STATUS,
            }
            .into());
        }
        Ok(())
    }

    /// Location ids must exist once the location table has been set up.
    pub(crate) async fn check_locations(&self, location_ids: &[&str]) -> LedgerResult<()> {
        let locations = self.master.locations().await?;
        if locations.is_empty() {
            return Ok(());
        }

        for location_id in location_ids {
            if location_id.trim().is_empty() {
                continue;
            }
            if !locations.iter().any(|location| location.id == *location_id) {
                return Err(ValidationError::UnknownLocation {
                    location_id: location_id.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn is_manufactured(&self, product_id: &str) -> LedgerResult<bool> {
        let Some(product) = self.items.get(product_id).await? else {
            return Err(ValidationError::UnknownProduct {
                item_id: product_id.to_string(),
            }
            .into());
        };
        if product.category.is_empty() {
            return Ok(false);
        }

        let category = self.master.category(&product.category).await?;
        Ok(category.is_some_and(|category| category.manufactured))
    }
}

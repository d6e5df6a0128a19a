use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Context;
use galley_core::{
    Category, CostAdjustmentRecord, Department, KeyValueStore, Location, ProductionRecord,
    PurchaseOrder, Recipe, SaleRecord, StockItem, StocktakeRecord, Supplier, TableKey,
    TransferRecord, WasteRecord,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A row that can be located inside its table by a string key.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn record_key(&self) -> String;
}

/// Typed view of one logical table. The whole table lives under a single
/// key as a JSON array, so `replace_all` is one atomic write.
pub struct Table<T> {
    store: Arc<dyn KeyValueStore>,
    key: TableKey,
    _rows: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _rows: PhantomData,
        }
    }
}

impl<T> Table<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: TableKey) -> Self {
        Self {
            store,
            key,
            _rows: PhantomData,
        }
    }

    pub fn key(&self) -> TableKey {
        self.key
    }

    pub async fn all(&self) -> anyhow::Result<Vec<T>> {
        match self.store.get(self.key.as_str()).await? {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("table `{}` holds malformed rows", self.key.as_str())),
            None => Ok(Vec::new()),
        }
    }

    pub async fn replace_all(&self, rows: &[T]) -> anyhow::Result<()> {
        let value = serde_json::to_value(rows)?;
        self.store.set(self.key.as_str(), value).await
    }

    pub async fn append(&self, row: T) -> anyhow::Result<()> {
        let mut rows = self.all().await?;
        rows.push(row);
        self.replace_all(&rows).await
    }
}

impl<T: Record> Table<T> {
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<T>> {
        let rows = self.all().await?;
        Ok(rows.into_iter().find(|row| row.record_key() == key))
    }

    pub async fn upsert(&self, row: T) -> anyhow::Result<()> {
        self.upsert_many(vec![row]).await
    }

    /// Replaces rows with matching keys and appends the rest, in one write.
    pub async fn upsert_many(&self, incoming: Vec<T>) -> anyhow::Result<()> {
        if incoming.is_empty() {
            return Ok(());
        }

        let mut rows = self.all().await?;
        for row in incoming {
            let key = row.record_key();
            match rows.iter_mut().find(|existing| existing.record_key() == key) {
                Some(existing) => *existing = row,
                None => rows.push(row),
            }
        }

        self.replace_all(&rows).await
    }
}

impl Record for StockItem {
    fn record_key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Recipe {
    fn record_key(&self) -> String {
        self.menu_item_id.clone()
    }
}

impl Record for Category {
    fn record_key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Location {
    fn record_key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Department {
    fn record_key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Supplier {
    fn record_key(&self) -> String {
        self.id.clone()
    }
}

macro_rules! uuid_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                fn record_key(&self) -> String {
                    self.id.to_string()
                }
            }
        )*
    };
}

uuid_record!(
    PurchaseOrder,
    ProductionRecord,
    WasteRecord,
    TransferRecord,
    StocktakeRecord,
    CostAdjustmentRecord,
    SaleRecord,
);

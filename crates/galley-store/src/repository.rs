use std::collections::HashMap;
use std::sync::Arc;

use galley_core::{
    Category, CostAdjustmentRecord, Department, ItemId, KeyValueStore, Location,
    ProductionRecord, PurchaseOrder, Recipe, SaleRecord, StockItem, StocktakeRecord, Supplier,
    TableKey, TransferRecord, WasteRecord,
};
use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Typed access to the Item Master table.
#[derive(Clone)]
pub struct ItemRepository {
    items: Table<StockItem>,
}

impl ItemRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            items: Table::new(store, TableKey::Items),
        }
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<Option<StockItem>> {
        self.items.get(id).await
    }

    pub async fn all(&self) -> anyhow::Result<Vec<StockItem>> {
        self.items.all().await
    }

    pub async fn by_id(&self) -> anyhow::Result<HashMap<ItemId, StockItem>> {
        let items = self.items.all().await?;
        Ok(items.into_iter().map(|item| (item.id.clone(), item)).collect())
    }

    pub async fn upsert(&self, item: StockItem) -> anyhow::Result<()> {
        self.items.upsert(item).await
    }

    /// Writes every changed item in a single store write.
    pub async fn commit(&self, changed: Vec<StockItem>) -> anyhow::Result<()> {
        self.items.upsert_many(changed).await
    }
}

/// One table per posted document kind, plus recipes and sales.
#[derive(Clone)]
pub struct TransactionLogRepository {
    pub purchases: Table<PurchaseOrder>,
    pub production: Table<ProductionRecord>,
    pub waste: Table<WasteRecord>,
    pub transfers: Table<TransferRecord>,
    pub stocktakes: Table<StocktakeRecord>,
    pub cost_adjustments: Table<CostAdjustmentRecord>,
    pub sales: Table<SaleRecord>,
    pub recipes: Table<Recipe>,
}

impl TransactionLogRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            purchases: Table::new(Arc::clone(&store), TableKey::Purchases),
            production: Table::new(Arc::clone(&store), TableKey::Production),
            waste: Table::new(Arc::clone(&store), TableKey::Waste),
            transfers: Table::new(Arc::clone(&store), TableKey::Transfers),
            stocktakes: Table::new(Arc::clone(&store), TableKey::Stocktakes),
            cost_adjustments: Table::new(Arc::clone(&store), TableKey::CostAdjustments),
            sales: Table::new(Arc::clone(&store), TableKey::Sales),
            recipes: Table::new(store, TableKey::Recipes),
        }
    }
}

/// Read-only lookups; the core never writes these tables.
#[derive(Clone)]
pub struct MasterDataRepository {
    categories: Table<Category>,
    locations: Table<Location>,
    departments: Table<Department>,
    suppliers: Table<Supplier>,
}

impl MasterDataRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            categories: Table::new(Arc::clone(&store), TableKey::Categories),
            locations: Table::new(Arc::clone(&store), TableKey::Locations),
            departments: Table::new(Arc::clone(&store), TableKey::Departments),
            suppliers: Table::new(store, TableKey::Suppliers),
        }
    }

    pub async fn categories(&self) -> anyhow::Result<Vec<Category>> {
        self.categories.all().await
    }

    pub async fn category(&self, id_or_name: &str) -> anyhow::Result<Option<Category>> {
        let categories = self.categories.all().await?;
        Ok(categories
            .into_iter()
            .find(|category| category.id == id_or_name || category.name == id_or_name))
    }

    pub async fn locations(&self) -> anyhow::Result<Vec<Location>> {
        self.locations.all().await
    }

    pub async fn departments(&self) -> anyhow::Result<Vec<Department>> {
        self.departments.all().await
    }

    pub async fn suppliers(&self) -> anyhow::Result<Vec<Supplier>> {
        self.suppliers.all().await
    }

    pub async fn snapshot(&self) -> anyhow::Result<MasterData> {
        Ok(MasterData {
            categories: self.categories().await?,
            locations: self.locations().await?,
            departments: self.departments().await?,
            suppliers: self.suppliers().await?,
        })
    }
}

/// All master data tables, for labelling reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterData {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
    pub departments: Vec<Department>,
    pub suppliers: Vec<Supplier>,
}

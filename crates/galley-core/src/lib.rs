pub mod error;
pub mod events;
pub mod models;
pub mod standards;
pub mod storage;

pub use error::{PostError, Shortfall, StateError, ValidationError};
pub use events::{AuditEvent, AuditEventKind};
pub use models::{
    AdjustmentStatus, Category, CostAdjustmentLine, CostAdjustmentRecord, CountLine, DateRange,
    Department, DocumentStatus, IngredientLine, ItemId, Location, LocationId, ProductionRecord,
    PurchaseLine, PurchaseOrder, PurchaseStatus, Recipe, RecipeLine, SaleLine, SaleRecord,
    SaleStatus, StockItem, StocktakeRecord, Supplier, TransferLine, TransferRecord, WasteLine,
    WasteRecord,
};
pub use standards::{AvcoProfile, ChartOfAccounts, StandardsProfile};
pub use storage::{EventEnvelope, EventStore, KeyValueStore, TableKey};

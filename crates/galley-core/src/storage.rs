use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::events::AuditEvent;

/// Keys of the logical tables kept in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKey {
    Items,
    Purchases,
    Production,
    Waste,
    Transfers,
    Stocktakes,
    CostAdjustments,
    Recipes,
    Sales,
    Categories,
    Locations,
    Departments,
    Suppliers,
    Journals,
    AuditLog,
}

impl TableKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKey::Items => "items",
            TableKey::Purchases => "purchases",
            TableKey::Production => "production",
            TableKey::Waste => "waste",
            TableKey::Transfers => "transfers",
            TableKey::Stocktakes => "stocktakes",
            TableKey::CostAdjustments => "cost_adjustments",
            TableKey::Recipes => "recipes",
            TableKey::Sales => "sales",
            TableKey::Categories => "categories",
            TableKey::Locations => "locations",
            TableKey::Departments => "departments",
            TableKey::Suppliers => "suppliers",
            TableKey::Journals => "journals",
            TableKey::AuditLog => "audit_log",
        }
    }
}

/// Persisted JSON document store, one value per key.
///
/// `set` must be durable once it returns: later reads in the same posting
/// observe the write.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EventEnvelope {
    pub sequence: i64,
    pub event: AuditEvent,
    pub stored_at: DateTime<Utc>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: AuditEvent) -> anyhow::Result<EventEnvelope>;
    async fn stream(&self, aggregate_id: uuid::Uuid) -> anyhow::Result<Vec<EventEnvelope>>;
    async fn all(&self) -> anyhow::Result<Vec<EventEnvelope>>;
}

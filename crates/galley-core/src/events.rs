use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditEventKind {
    PurchaseReceived,
    PurchaseRevised,
    ProductionPosted,
    SaleCompleted,
    WastePosted,
    StocktakePosted,
    TransferPosted,
    CostAdjusted,
    ItemQuantityAdjusted,
    ItemCostSet,
    ItemArchived,
    ItemReactivated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    /// Record id for postings, or a v5 id derived from the item id for
    /// Item Master changes.
    pub aggregate_id: Uuid,
    pub kind: AuditEventKind,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl AuditEvent {
    pub fn new(aggregate_id: Uuid, kind: AuditEventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            kind,
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn for_item(item_id: &str, kind: AuditEventKind, payload: serde_json::Value) -> Self {
        Self::new(item_aggregate_id(item_id), kind, payload)
    }
}

pub fn item_aggregate_id(item_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, item_id.as_bytes())
}

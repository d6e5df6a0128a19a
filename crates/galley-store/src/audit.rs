use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use galley_core::{AuditEvent, EventEnvelope, EventStore, KeyValueStore, TableKey};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::table::Table;

/// Append-only audit log persisted under the `audit_log` key.
pub struct KeyValueEventStore {
    log: Table<EventEnvelope>,
    append_lock: Mutex<()>,
}

impl KeyValueEventStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            log: Table::new(store, TableKey::AuditLog),
            append_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl EventStore for KeyValueEventStore {
    async fn append(&self, event: AuditEvent) -> anyhow::Result<EventEnvelope> {
        let _guard = self.append_lock.lock().await;

        let mut envelopes = self.log.all().await?;
        let sequence = envelopes.last().map_or(0, |last| last.sequence) + 1;

        let envelope = EventEnvelope {
            sequence,
            event,
            stored_at: Utc::now(),
        };

        envelopes.push(envelope.clone());
        self.log.replace_all(&envelopes).await?;

        Ok(envelope)
    }

    async fn stream(&self, aggregate_id: Uuid) -> anyhow::Result<Vec<EventEnvelope>> {
        let envelopes = self.log.all().await?;
        Ok(envelopes
            .into_iter()
            .filter(|envelope| envelope.event.aggregate_id == aggregate_id)
            .collect())
    }

    async fn all(&self) -> anyhow::Result<Vec<EventEnvelope>> {
        self.log.all().await
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use galley_core::KeyValueStore;
use tokio::sync::RwLock;

/// Process-local store, used by tests and as a scratch backend.
#[derive(Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        let values = self.values.read().await;
        let mut keys: Vec<String> = values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

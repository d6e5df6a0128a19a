use std::sync::Arc;

use galley_core::{
    AuditEvent, AuditEventKind, EventStore, KeyValueStore, StockItem, TableKey,
};
use galley_store::{InMemoryStore, ItemRepository, KeyValueEventStore, Table};
use rust_decimal::Decimal;
use serde_json::json;

fn flour() -> StockItem {
    StockItem::new("RAW-001", "Flour", "kg", "g", Decimal::from(1000))
}

#[tokio::test]
async fn missing_table_reads_as_empty() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let table: Table<StockItem> = Table::new(store, TableKey::Items);

    assert!(table.all().await.unwrap().is_empty());
    assert!(table.get("RAW-001").await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_replaces_rows_by_key() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let items = ItemRepository::new(Arc::clone(&store));

    items.upsert(flour()).await.unwrap();
    let mut renamed = flour();
    renamed.name = "Bread flour".to_string();
    items.upsert(renamed).await.unwrap();

    let all = items.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Bread flour");
}

#[tokio::test]
async fn commit_writes_the_items_table_once() {
    let store = Arc::new(InMemoryStore::new());
    let items = ItemRepository::new(store.clone());

    let sugar = StockItem::new("RAW-002", "Sugar", "kg", "g", Decimal::from(1000));
    items.commit(vec![flour(), sugar]).await.unwrap();

    assert_eq!(store.keys().await, vec!["items".to_string()]);
    assert_eq!(items.by_id().await.unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_table_is_reported_with_its_key() {
    let store = Arc::new(InMemoryStore::new());
    store.set("items", json!({"not": "an array"})).await.unwrap();

    let items = ItemRepository::new(store);
    let err = items.all().await.unwrap_err();
    assert!(err.to_string().contains("items"));
}

#[tokio::test]
async fn audit_log_sequences_are_monotonic() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let log = KeyValueEventStore::new(store);

    let first = log
        .append(AuditEvent::for_item(
            "RAW-001",
            AuditEventKind::ItemCostSet,
            json!({"old_cost": "5", "new_cost": "6"}),
        ))
        .await
        .unwrap();
    let second = log
        .append(AuditEvent::for_item(
            "RAW-002",
            AuditEventKind::ItemArchived,
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(first.sequence, 1);
    assert_eq!(second.sequence, 2);
    assert_eq!(log.all().await.unwrap().len(), 2);
    assert_eq!(
        log.stream(first.event.aggregate_id).await.unwrap().len(),
        1
    );
}

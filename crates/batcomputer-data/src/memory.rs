//! In-process record store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use batcomputer_core::{ConsoleError, Result};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::store::{timestamp, ChangeEvent, ChangeHub, ChangeKind, RecordStore};

/// Store keeping every table in memory
///
/// Every mutation broadcasts a change to the table's subscribers. The store
/// can be switched offline to simulate an unreachable backend.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    changes: ChangeHub,
    offline: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows as-is, without assigning ids or timestamps or notifying
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// While offline every call fails with a network error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ConsoleError::Network("Failed to fetch".to_string()))
        } else {
            Ok(())
        }
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn created_at(row: &Value) -> &str {
    row.get("created_at").and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, table: &str) -> Result<Vec<Value>> {
        self.check_online()?;
        let tables = self.tables.read().await;

        // Newest insert first, so equal timestamps keep insertion order reversed
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().rev().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| created_at(b).cmp(created_at(a)));

        debug!("Listed {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        self.check_online()?;
        let Value::Object(mut fields) = row else {
            return Err(ConsoleError::Serialization(format!(
                "{} rows must be JSON objects",
                table
            )));
        };

        let now = timestamp();
        fields
            .entry("id")
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
        fields.insert("created_at".to_string(), Value::String(now.clone()));
        fields.insert("updated_at".to_string(), Value::String(now));
        let row = Value::Object(fields);

        let id = row_id(&row).unwrap_or_default().to_string();
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        debug!("Inserted {} into {}", id, table);
        self.changes.publish(table, ChangeKind::Insert, &id);
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
        self.check_online()?;
        let Value::Object(patch) = patch else {
            return Err(ConsoleError::Serialization(format!(
                "{} patches must be JSON objects",
                table
            )));
        };

        let updated = {
            let mut tables = self.tables.write().await;
            let row = tables
                .get_mut(table)
                .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
                .ok_or_else(|| ConsoleError::NotFound {
                    table: table.to_string(),
                    id: id.to_string(),
                })?;

            if let Value::Object(fields) = row {
                for (key, value) in patch {
                    if key != "id" && key != "created_at" {
                        fields.insert(key, value);
                    }
                }
                fields.insert("updated_at".to_string(), Value::String(timestamp()));
            }
            row.clone()
        };

        debug!("Updated {} in {}", id, table);
        self.changes.publish(table, ChangeKind::Update, id);
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.check_online()?;
        {
            let mut tables = self.tables.write().await;
            if let Some(rows) = tables.get_mut(table) {
                rows.retain(|row| row_id(row) != Some(id));
            }
        }

        debug!("Deleted {} from {}", id, table);
        self.changes.publish(table, ChangeKind::Delete, id);
        Ok(())
    }

    fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = MemoryRecordStore::new();
        let row = store
            .insert("modules", json!({"name": "Bat-Signal", "clearance_level": "DELTA"}))
            .await
            .unwrap();

        assert!(row_id(&row).is_some());
        assert_eq!(row["created_at"], row["updated_at"]);
        assert_eq!(store.list("modules").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryRecordStore::new();
        store
            .seed(
                "movies",
                vec![
                    json!({"id": "old", "created_at": "2020-01-01T00:00:00Z"}),
                    json!({"id": "new", "created_at": "2024-01-01T00:00:00Z"}),
                ],
            )
            .await;
        store.insert("movies", json!({"id": "newest"})).await.unwrap();

        let ids: Vec<String> = store
            .list("movies")
            .await
            .unwrap()
            .iter()
            .map(|r| row_id(r).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["newest", "new", "old"]);
    }

    #[tokio::test]
    async fn test_update_merges_and_protects_identity() {
        let store = MemoryRecordStore::new();
        store
            .seed(
                "characters",
                vec![json!({"id": "c1", "alias": "Robin", "created_at": "2020-01-01T00:00:00Z"})],
            )
            .await;

        let updated = store
            .update("characters", "c1", json!({"alias": "Nightwing", "id": "hijack"}))
            .await
            .unwrap();
        assert_eq!(updated["id"], "c1");
        assert_eq!(updated["alias"], "Nightwing");
        assert_eq!(updated["created_at"], "2020-01-01T00:00:00Z");
        assert!(updated["updated_at"].is_string());

        let missing = store.update("characters", "nope", json!({})).await;
        assert!(matches!(missing, Err(ConsoleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let store = MemoryRecordStore::new();
        let mut rx = store.subscribe("locations");

        let row = store.insert("locations", json!({"name": "Wayne Manor"})).await.unwrap();
        let id = row_id(&row).unwrap().to_string();
        store.delete("locations", &id).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Insert);
        let deleted = rx.recv().await.unwrap();
        assert_eq!(deleted.kind, ChangeKind::Delete);
        assert_eq!(deleted.id, id);
    }

    #[tokio::test]
    async fn test_offline_store_fails_with_network_error() {
        let store = MemoryRecordStore::new();
        store.set_offline(true);
        let err = store.list("modules").await.unwrap_err();
        assert_eq!(err.kind(), batcomputer_core::ErrorKind::Network);
    }
}

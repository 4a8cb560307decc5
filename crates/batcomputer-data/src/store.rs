//! Record store abstraction

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use batcomputer_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Buffered change notifications per table
const CHANGE_BUFFER: usize = 64;

/// What happened to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Notification that a table changed; carries no row data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub id: String,
}

/// Remote store of JSON rows, keyed by table name
///
/// Rows are returned newest first. No call is retried; a failure comes back
/// as a `NETWORK` error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All rows, ordered by `created_at` descending
    async fn list(&self, table: &str) -> Result<Vec<Value>>;

    /// Insert a row; the store assigns `id`, `created_at` and `updated_at`
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Merge `patch` into the row with `id` and bump `updated_at`
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value>;

    async fn delete(&self, table: &str, id: &str) -> Result<()>;

    /// Change notifications for `table`, used only to trigger a refetch
    fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent>;
}

/// Per-table broadcast channels shared by store implementations
#[derive(Default)]
pub(crate) struct ChangeHub {
    channels: Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeHub {
    pub(crate) fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_BUFFER).0)
            .subscribe()
    }

    pub(crate) fn publish(&self, table: &str, kind: ChangeKind, id: &str) {
        let channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tx) = channels.get(table) {
            // No receivers is fine
            let _ = tx.send(ChangeEvent {
                table: table.to_string(),
                kind,
                id: id.to_string(),
            });
        }
    }
}

/// Current time in the store's timestamp format
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

//! Typed, clearance-bound view of one record table
//!
//! Fetches go through the visibility filter; mutations are refused below
//! ALPHA before any network call. A failed remote call leaves the cached rows
//! untouched.

use std::sync::Arc;

use batcomputer_core::{
    ensure_can_modify, visible, ClearanceLevel, ConsoleError, Record, Result, Session,
};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::store::{ChangeEvent, RecordStore};

/// Rows of one table visible at one clearance level
pub struct Dataset<T: Record> {
    store: Arc<dyn RecordStore>,
    level: ClearanceLevel,
    rows: Vec<T>,
    last_error: Option<String>,
}

impl<T: Record> Dataset<T> {
    pub fn new(store: Arc<dyn RecordStore>, level: ClearanceLevel) -> Self {
        Self {
            store,
            level,
            rows: Vec::new(),
            last_error: None,
        }
    }

    /// View bound to a session's clearance, DELTA when anonymous
    pub fn for_session(store: Arc<dyn RecordStore>, session: Option<&Session>) -> Self {
        let level = session.map(|s| s.level).unwrap_or(ClearanceLevel::Delta);
        Self::new(store, level)
    }

    pub fn table(&self) -> &'static str {
        T::KIND.table()
    }

    pub fn level(&self) -> ClearanceLevel {
        self.level
    }

    /// Cached rows, newest first
    pub fn data(&self) -> &[T] {
        &self.rows
    }

    /// Message of the last failed fetch, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn can_modify(&self) -> bool {
        self.level.can_modify()
    }

    /// Change notifications for this table
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.store.subscribe(self.table())
    }

    /// Replace the cache with a full, filtered fetch
    pub async fn refetch(&mut self) -> Result<&[T]> {
        let table = self.table();
        let raw = match self.store.list(table).await {
            Ok(raw) => raw,
            Err(e) => {
                let e = network(e, "Failed to fetch data");
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let total = raw.len();
        let parsed = raw.into_iter().filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} row: {}", table, e);
                None
            }
        });
        self.rows = visible(parsed, self.level);
        self.last_error = None;

        debug!(
            "{}: showing {} of {} rows at {} clearance",
            table,
            self.rows.len(),
            total,
            self.level
        );
        Ok(self.rows.as_slice())
    }

    /// Insert a record; ALPHA only
    pub async fn insert(&mut self, draft: &T::Draft) -> Result<T> {
        ensure_can_modify(self.level, "insert")?;
        let row = serde_json::to_value(draft)?;
        let inserted = self
            .store
            .insert(self.table(), row)
            .await
            .map_err(|e| network(e, "Failed to insert data"))?;
        let record: T = serde_json::from_value(inserted)?;

        self.rows.insert(0, record.clone());
        Ok(record)
    }

    /// Apply a partial update; ALPHA only
    pub async fn update(&mut self, id: &str, patch: Value) -> Result<T> {
        ensure_can_modify(self.level, "update")?;
        let updated = self
            .store
            .update(self.table(), id, patch)
            .await
            .map_err(|e| network(e, "Failed to update data"))?;
        let record: T = serde_json::from_value(updated)?;

        if let Some(slot) = self.rows.iter_mut().find(|row| row.id() == id) {
            *slot = record.clone();
        }
        Ok(record)
    }

    /// Delete a record; ALPHA only
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        ensure_can_modify(self.level, "delete")?;
        self.store
            .delete(self.table(), id)
            .await
            .map_err(|e| network(e, "Failed to delete data"))?;

        self.rows.retain(|row| row.id() != id);
        Ok(())
    }

    /// Wait for the next change notification, then refetch everything
    ///
    /// Returns `Ok(false)` once the subscription is closed.
    pub async fn sync_on_change(
        &mut self,
        changes: &mut broadcast::Receiver<ChangeEvent>,
    ) -> Result<bool> {
        match changes.recv().await {
            Ok(event) => debug!("{} changed ({:?} {}), refetching", event.table, event.kind, event.id),
            Err(RecvError::Lagged(skipped)) => {
                debug!("Missed {} change notifications, refetching", skipped)
            }
            Err(RecvError::Closed) => return Ok(false),
        }
        self.refetch().await?;
        Ok(true)
    }
}

/// Collapse any store failure into a NETWORK error with a fallback message
fn network(error: ConsoleError, fallback: &str) -> ConsoleError {
    match error {
        ConsoleError::Network(message) => ConsoleError::network(message, fallback),
        ConsoleError::NotFound { .. } => error,
        other => ConsoleError::network(other.to_string(), fallback),
    }
}

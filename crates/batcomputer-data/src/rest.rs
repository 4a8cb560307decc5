//! Client for the managed PostgREST backend

use async_trait::async_trait;
use batcomputer_core::{ConsoleError, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::store::{timestamp, ChangeEvent, ChangeHub, ChangeKind, RecordStore};

/// REST path prefix under the project URL
const REST_PREFIX: &str = "rest/v1";

/// Store talking to a PostgREST endpoint
///
/// Change notifications cover mutations made through this client only; the
/// backend's realtime channel is not consumed.
pub struct RestRecordStore {
    client: Client,
    base_url: String,
    api_key: String,
    changes: ChangeHub,
}

/// PostgREST error body
#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    error: Option<String>,
}

impl RestRecordStore {
    /// Create a store for the project at `base_url` with its anon key
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            changes: ChangeHub::default(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PREFIX, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ConsoleError::network(e.to_string(), fallback))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or(body);
        warn!("Store request failed with {}: {}", status, message);
        Err(ConsoleError::network(message, fallback))
    }

    async fn rows(response: Response, fallback: &str) -> Result<Vec<Value>> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| ConsoleError::network(e.to_string(), fallback))
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn list(&self, table: &str) -> Result<Vec<Value>> {
        const FALLBACK: &str = "Failed to fetch data";
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let rows = Self::rows(self.send(request, FALLBACK).await?, FALLBACK).await?;

        debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        const FALLBACK: &str = "Failed to insert data";
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&[row]);
        let inserted = Self::rows(self.send(request, FALLBACK).await?, FALLBACK)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConsoleError::Network(FALLBACK.to_string()))?;

        let id = inserted.get("id").and_then(Value::as_str).unwrap_or_default();
        debug!("Inserted {} into {}", id, table);
        self.changes.publish(table, ChangeKind::Insert, id);
        Ok(inserted)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
        const FALLBACK: &str = "Failed to update data";
        let Value::Object(mut fields) = patch else {
            return Err(ConsoleError::Serialization(format!(
                "{} patches must be JSON objects",
                table
            )));
        };
        fields.insert("updated_at".to_string(), Value::String(timestamp()));

        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&Value::Object(fields));
        let updated = Self::rows(self.send(request, FALLBACK).await?, FALLBACK)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConsoleError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })?;

        debug!("Updated {} in {}", id, table);
        self.changes.publish(table, ChangeKind::Update, id);
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        const FALLBACK: &str = "Failed to delete data";
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))]);
        self.send(request, FALLBACK).await?;

        debug!("Deleted {} from {}", id, table);
        self.changes.publish(table, ChangeKind::Delete, id);
        Ok(())
    }

    fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe(table)
    }
}

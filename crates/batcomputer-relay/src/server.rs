//! HTTP surface of the relay
//!
//! - `POST /api/chat` with `{messages}`, answered by `{reply}` or `{error}`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RelayError;
use crate::provider::{ChatMessage, Relay};

/// Generic message when an error carries no text
const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::NotConfigured => StatusCode::BAD_REQUEST,
            RelayError::Upstream { .. } | RelayError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let mut error = self.to_string();
        if error.trim().is_empty() {
            error = SERVER_ERROR.to_string();
        }
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Relay a conversation and return the reply
pub async fn chat_handler(
    State(relay): State<Arc<Relay>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, RelayError> {
    match relay.complete(&request.messages).await {
        Ok(reply) => Ok(Json(ChatResponse { reply })),
        Err(e) => {
            warn!("Chat relay failed: {}", e);
            Err(e)
        }
    }
}

/// Router exposing the chat endpoint
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(relay)
}

/// Bind `addr` and serve until the process stops
pub async fn serve(relay: Arc<Relay>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    match relay.provider_kind() {
        Some(kind) => info!("Relay listening on {} ({:?})", listener.local_addr()?, kind),
        None => warn!(
            "Relay listening on {} without a provider; every chat will fail",
            listener.local_addr()?
        ),
    }
    axum::serve(listener, router(relay)).await
}

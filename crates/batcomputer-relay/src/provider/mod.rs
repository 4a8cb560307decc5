//! Completion providers and the relay that fronts them

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ProviderKind, ProviderSettings, RelayConfig};
use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A hosted model that turns a conversation into one reply
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Reply text, empty when the provider returned no content
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError>;
}

/// Pass non-2xx responses back as upstream errors
pub(crate) async fn check_status(response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Completion provider returned {}", status);
    Err(RelayError::Upstream {
        status: status.as_u16(),
        body,
    })
}

/// Entry point used by the HTTP route and the CLI
pub struct Relay {
    provider: Option<Box<dyn CompletionProvider>>,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: RelayConfig, client: Client) -> Self {
        let provider = config.provider.map(|settings| provider_for(settings, client));
        Self { provider }
    }

    pub fn from_env() -> Self {
        Self::new(RelayConfig::from_env())
    }

    /// Relay backed by an arbitrary provider
    pub fn with_provider(provider: Box<dyn CompletionProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn provider_kind(&self) -> Option<ProviderKind> {
        self.provider.as_ref().map(|p| p.kind())
    }

    /// Forward the conversation; no retry, no streaming
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
        let provider = self.provider.as_ref().ok_or(RelayError::NotConfigured)?;
        let reply = provider.complete(messages).await?;
        info!(
            "Relayed {} messages via {:?}, reply {} chars",
            messages.len(),
            provider.kind(),
            reply.chars().count()
        );
        Ok(reply)
    }
}

fn provider_for(settings: ProviderSettings, client: Client) -> Box<dyn CompletionProvider> {
    match settings.kind {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(client, settings)),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(client, settings)),
    }
}

//! Anthropic messages API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, ChatMessage, CompletionProvider, Role};
use crate::config::{ProviderKind, ProviderSettings};
use crate::error::RelayError;

const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 800;

pub struct AnthropicProvider {
    client: Client,
    settings: ProviderSettings,
}

impl AnthropicProvider {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    // Only two roles exist on this API; system prompts are sent as user turns
    fn from(msg: &'a ChatMessage) -> Self {
        let role = match msg.role {
            Role::Assistant => "assistant",
            Role::User | Role::System => "user",
        };
        Self {
            role,
            content: &msg.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
        let url = format!("{}{}", self.settings.base_url.trim_end_matches('/'), MESSAGES_PATH);
        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: MAX_TOKENS,
            messages: messages.iter().map(WireMessage::from).collect(),
        };
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let body: MessagesResponse = check_status(response).await?.json().await?;
        Ok(body
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default())
    }
}

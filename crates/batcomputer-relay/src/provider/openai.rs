//! OpenAI chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, ChatMessage, CompletionProvider};
use crate::config::{ProviderKind, ProviderSettings};
use crate::error::RelayError;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub struct OpenAiProvider {
    client: Client,
    settings: ProviderSettings,
}

impl OpenAiProvider {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
        let url = format!("{}{}", self.settings.base_url.trim_end_matches('/'), COMPLETIONS_PATH);
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&CompletionRequest {
                model: &self.settings.model,
                messages,
            })
            .send()
            .await?;

        let body: CompletionResponse = check_status(response).await?.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(
            Client::new(),
            ProviderSettings {
                kind: ProviderKind::OpenAi,
                api_key: "sk-test".to_string(),
                model: "gpt-4o-mini".to_string(),
                base_url: server.uri(),
            },
        )
    }

    #[tokio::test]
    async fn test_forwards_conversation_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "You are the Batcomputer."},
                    {"role": "user", "content": "Status?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "All systems nominal."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let messages = [
            ChatMessage {
                role: Role::System,
                content: "You are the Batcomputer.".to_string(),
            },
            ChatMessage::user("Status?"),
        ];
        let reply = provider(&server).complete(&messages).await.unwrap();
        assert_eq!(reply, "All systems nominal.");
    }

    #[tokio::test]
    async fn test_missing_choice_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let reply = provider(&server).complete(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn test_upstream_error_body_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider(&server).complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, RelayError::Upstream { status: 401, .. }));
        assert_eq!(err.to_string(), "invalid api key");
    }
}

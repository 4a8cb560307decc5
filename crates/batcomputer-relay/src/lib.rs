//! Batcomputer relay - forwards assistant conversations to a hosted model
//!
//! One provider is chosen from the environment: OpenAI when its key is set,
//! Anthropic otherwise. The relay is stateless; every call carries the whole
//! conversation and returns a single reply.

pub mod config;
pub mod error;
pub mod provider;
pub mod server;

pub use config::{ProviderKind, ProviderSettings, RelayConfig};
pub use error::RelayError;
pub use provider::{AnthropicProvider, ChatMessage, CompletionProvider, OpenAiProvider, Relay, Role};
pub use server::{router, serve, ChatRequest, ChatResponse, ErrorResponse};

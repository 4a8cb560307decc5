//! Relay error types

use batcomputer_core::ErrorKind;
use thiserror::Error;

/// Shown when neither provider key is set
pub const NOT_CONFIGURED: &str = "AI not configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY.";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{}", NOT_CONFIGURED)]
    NotConfigured,

    /// Non-2xx from the provider; the body is surfaced verbatim
    #[error("{body}")]
    Upstream { status: u16, body: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::NotConfigured => ErrorKind::Config,
            RelayError::Upstream { .. } | RelayError::Transport(_) => ErrorKind::Network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_messages() {
        assert_eq!(RelayError::NotConfigured.kind(), ErrorKind::Config);
        assert_eq!(RelayError::NotConfigured.to_string(), NOT_CONFIGURED);

        let upstream = RelayError::Upstream {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(upstream.kind(), ErrorKind::Network);
        assert_eq!(upstream.to_string(), "rate limited");
    }
}

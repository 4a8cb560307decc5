//! Error types for the Batcomputer console

use std::fmt;

use thiserror::Error;

use crate::auth::AuthError;
use crate::clearance::ClearanceLevel;
use crate::credentials::CredentialError;
use crate::storage::StorageError;

/// Result type alias for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Error category rendered by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Login attempted during the lockout window
    Locked,
    /// Bad username or secret, or a malformed entry
    Invalid,
    /// Mutation attempted below ALPHA
    Forbidden,
    /// Remote call failed
    Network,
    /// Local persistence failed
    Storage,
    /// Missing or malformed configuration
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Locked => "LOCKED",
            ErrorKind::Invalid => "INVALID",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Network => "NETWORK",
            ErrorKind::Storage => "STORAGE",
            ErrorKind::Config => "CONFIG",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in console operations
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Gate error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Mutation below ALPHA
    #[error("Insufficient clearance for data modification ({level} cannot {action})")]
    Forbidden {
        action: &'static str,
        level: ClearanceLevel,
    },

    /// Remote call failed; message is surfaced verbatim
    #[error("{0}")]
    Network(String),

    /// Row not found in the remote store
    #[error("No {table} record with id {id}")]
    NotFound { table: String, id: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Entry rejected before it reached storage
    #[error("Invalid entry: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Network failure with the generic fallback when the cause has no text
    pub fn network(message: impl Into<String>, fallback: &str) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            ConsoleError::Network(fallback.to_string())
        } else {
            ConsoleError::Network(message)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::Auth(e) => e.kind(),
            ConsoleError::Forbidden { .. } => ErrorKind::Forbidden,
            ConsoleError::Network(_) | ConsoleError::NotFound { .. } => ErrorKind::Network,
            ConsoleError::Serialization(_) | ConsoleError::Io(_) => ErrorKind::Storage,
            ConsoleError::Validation(_) => ErrorKind::Invalid,
            ConsoleError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::Serialization(e.to_string())
    }
}

impl From<StorageError> for ConsoleError {
    fn from(e: StorageError) -> Self {
        ConsoleError::Auth(AuthError::Storage(e))
    }
}

impl From<CredentialError> for ConsoleError {
    fn from(e: CredentialError) -> Self {
        ConsoleError::Auth(AuthError::Credentials(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ConsoleError::from(AuthError::Invalid).kind(), ErrorKind::Invalid);
        assert_eq!(
            ConsoleError::from(AuthError::Locked { remaining_ms: 1 }).kind(),
            ErrorKind::Locked
        );
        assert_eq!(
            ConsoleError::Forbidden {
                action: "delete",
                level: ClearanceLevel::Beta
            }
            .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(ConsoleError::Network("down".into()).kind(), ErrorKind::Network);
        assert_eq!(ConsoleError::Validation("blank".into()).kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_network_fallback() {
        let err = ConsoleError::network("  ", "Failed to fetch data");
        assert_eq!(err.to_string(), "Failed to fetch data");
        let err = ConsoleError::network("relation does not exist", "Failed to fetch data");
        assert_eq!(err.to_string(), "relation does not exist");
    }

    #[test]
    fn test_locked_message_rounds_up() {
        let err = AuthError::Locked { remaining_ms: 1_500 };
        assert_eq!(err.to_string(), "Lockdown engaged (2s remaining)");
    }
}

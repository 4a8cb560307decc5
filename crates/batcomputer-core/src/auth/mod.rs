//! Access gate for the Batcomputer console
//!
//! Resolves a secret to a clearance level, issues sessions, and escalates
//! lockout on repeated failures. ALL logins go through [`AuthService`].
//!
//! # Security Model
//!
//! - Secrets resolve against a fixed four-entry table (cleartext or Argon2id)
//! - Three consecutive failures open a lockout window that grows by 10s per
//!   failure, capped at 60s
//! - Session and lockout state persist in local key-value storage only;
//!   clearance checks downstream are advisory, not a security boundary

mod clock;
mod events;
mod lockout;
mod service;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{Cue, GateEvent, GateEventKind};
pub use lockout::{LockoutPolicy, LockoutState};
pub use service::{AuthService, ENTER_ONCE_KEY, FAIL_KEY, LOCK_KEY, SESSION_KEY};
pub use session::{make_codename, Session, ALPHA_CODENAME, CODENAME_BANK};

use crate::clearance::ClearanceLevel;
use crate::credentials::CredentialError;
use crate::error::ErrorKind;
use crate::storage::StorageError;

/// Lockout half of the gate state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    /// Logins refused until the given Unix milliseconds
    Locked { until: i64 },
}

/// Session half of the gate state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(ClearanceLevel),
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Lockdown engaged ({}s remaining)", .remaining_ms.div_ceil(1000))]
    Locked { remaining_ms: u64 },

    #[error("Invalid credentials")]
    Invalid,

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Category the presentation layer renders
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Locked { .. } => ErrorKind::Locked,
            AuthError::Invalid => ErrorKind::Invalid,
            AuthError::Credentials(_) => ErrorKind::Config,
            AuthError::Storage(_) => ErrorKind::Storage,
        }
    }
}

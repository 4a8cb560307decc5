//! Notifications emitted by the gate for the presentation layer
//!
//! The gate decides what happened; rendering a tone or speaking the
//! announcement is left to whoever subscribes.

use serde::{Deserialize, Serialize};

use crate::clearance::ClearanceLevel;

/// Audio cue classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    Ok,
    Error,
    Warn,
}

/// What triggered an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateEventKind {
    /// Login refused because the lockout window is open
    Locked { remaining_ms: u64 },
    /// Login refused for a bad username or secret
    Invalid { failure_count: u32 },
    /// Session issued
    Authenticated { level: ClearanceLevel },
    /// Session cleared
    LoggedOut,
}

/// A single gate notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateEvent {
    pub kind: GateEventKind,
    pub cue: Cue,
    /// Line to speak or log
    pub announcement: String,
}

impl GateEvent {
    pub fn locked(remaining_ms: u64) -> Self {
        Self {
            kind: GateEventKind::Locked { remaining_ms },
            cue: Cue::Error,
            announcement: "Lockdown engaged. Access denied.".to_string(),
        }
    }

    pub fn invalid(failure_count: u32) -> Self {
        Self {
            kind: GateEventKind::Invalid { failure_count },
            cue: Cue::Error,
            announcement: "Invalid credentials.".to_string(),
        }
    }

    pub fn authenticated(level: ClearanceLevel) -> Self {
        let announcement = if level == ClearanceLevel::Alpha {
            "Access granted. Welcome back, Batman.".to_string()
        } else {
            format!("Access granted. Clearance {}.", level)
        };
        Self {
            kind: GateEventKind::Authenticated { level },
            cue: Cue::Ok,
            announcement,
        }
    }

    pub fn logged_out() -> Self {
        Self {
            kind: GateEventKind::LoggedOut,
            cue: Cue::Warn,
            announcement: "Session terminated. Console locked.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcements() {
        assert_eq!(
            GateEvent::authenticated(ClearanceLevel::Alpha).announcement,
            "Access granted. Welcome back, Batman."
        );
        assert_eq!(
            GateEvent::authenticated(ClearanceLevel::Gamma).announcement,
            "Access granted. Clearance GAMMA."
        );
        assert_eq!(GateEvent::logged_out().cue, Cue::Warn);
        assert_eq!(GateEvent::invalid(1).cue, Cue::Error);
        assert_eq!(GateEvent::locked(5_000).cue, Cue::Error);
    }
}

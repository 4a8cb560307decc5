//! Authenticated console session

use chrono::{DateTime, TimeZone, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clearance::ClearanceLevel;

/// Codename reserved for ALPHA clearance
pub const ALPHA_CODENAME: &str = "Batman";

/// Names drawn from for every level below ALPHA
pub const CODENAME_BANK: [&str; 7] = ["Warden", "Sentinel", "Specter", "Rook", "Vigil", "Cipher", "Aegis"];

/// Session issued on a successful login
///
/// Serialized form is what gets persisted under the session key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Operator name as entered, trimmed
    pub username: String,
    /// Resolved clearance
    pub level: ClearanceLevel,
    /// Cosmetic display name
    pub codename: String,
    /// Unix milliseconds at issue
    #[serde(rename = "ts")]
    pub issued_at: i64,
}

impl Session {
    /// Create a session with a randomly drawn codename
    pub fn new(username: impl Into<String>, level: ClearanceLevel, issued_at: i64) -> Self {
        Self::with_rng(username, level, issued_at, &mut rand::thread_rng())
    }

    /// Create a session drawing the codename from `rng`
    pub fn with_rng<R: Rng + ?Sized>(
        username: impl Into<String>,
        level: ClearanceLevel,
        issued_at: i64,
        rng: &mut R,
    ) -> Self {
        Self {
            username: username.into(),
            level,
            codename: make_codename(level, rng),
            issued_at,
        }
    }

    /// Issue time as a UTC timestamp
    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.issued_at).single()
    }

    /// Whether this session may mutate records
    pub fn can_modify(&self) -> bool {
        self.level.can_modify()
    }
}

/// Derive a display codename for a level
pub fn make_codename<R: Rng + ?Sized>(level: ClearanceLevel, rng: &mut R) -> String {
    if level == ClearanceLevel::Alpha {
        return ALPHA_CODENAME.to_string();
    }
    let tag = CODENAME_BANK.choose(rng).copied().unwrap_or(CODENAME_BANK[0]);
    format!("{}-{}", tag, level)
}

//! Credential resolution
//!
//! Maps a submitted secret to the clearance level it unlocks. The built-in
//! table holds one plaintext secret per level; a credentials file may replace
//! it with Argon2id hashes.

use std::fmt;
use std::fs;
use std::path::Path;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::clearance::ClearanceLevel;

/// Errors raised while loading or building a credential table
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse credentials file: {0}")]
    Parse(String),

    #[error("No credential configured for {0}")]
    MissingLevel(ClearanceLevel),

    #[error("More than one credential configured for {0}")]
    DuplicateLevel(ClearanceLevel),

    #[error("{0} and {1} share the same secret")]
    DuplicateSecret(ClearanceLevel, ClearanceLevel),

    #[error("Credential for {0} must set exactly one of `secret` or `hash`")]
    AmbiguousEntry(ClearanceLevel),

    #[error("Credential for {0} is empty")]
    EmptySecret(ClearanceLevel),

    #[error("Invalid hash for {0}: {1}")]
    InvalidHash(ClearanceLevel, String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// How a single level's secret is stored
#[derive(Clone)]
enum Credential {
    /// Cleartext secret, compared in constant time
    Plain(Zeroizing<String>),
    /// Argon2 PHC string
    Hashed(String),
}

impl Credential {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Credential::Plain(secret) => secret.as_bytes().ct_eq(candidate.as_bytes()).into(),
            Credential::Hashed(phc) => match PasswordHash::new(phc) {
                Ok(parsed) => Argon2::default()
                    .verify_password(candidate.as_bytes(), &parsed)
                    .is_ok(),
                Err(_) => false,
            },
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Plain(_) => f.write_str("Plain(<redacted>)"),
            Credential::Hashed(_) => f.write_str("Hashed(<redacted>)"),
        }
    }
}

/// Fixed mapping from clearance level to exactly one secret
#[derive(Clone, Debug)]
pub struct CredentialTable {
    entries: Vec<(ClearanceLevel, Credential)>,
}

/// Built-in secrets, one per level
const BUILTIN_SECRETS: [(ClearanceLevel, &str); 4] = [
    (ClearanceLevel::Delta, "DarkAlley"),
    (ClearanceLevel::Gamma, "HiddenPulse"),
    (ClearanceLevel::Beta, "ShadowLock"),
    (ClearanceLevel::Alpha, "Brother_Eye"),
];

impl Default for CredentialTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CredentialTable {
    /// The compiled-in cleartext table
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_SECRETS
                .iter()
                .map(|(level, secret)| (*level, Credential::Plain(Zeroizing::new(secret.to_string()))))
                .collect(),
        }
    }

    /// Build a table from cleartext secrets, validating the one-secret-per-level rule
    pub fn from_secrets<I, S>(secrets: I) -> Result<Self, CredentialError>
    where
        I: IntoIterator<Item = (ClearanceLevel, S)>,
        S: Into<String>,
    {
        let entries = secrets
            .into_iter()
            .map(|(level, secret)| {
                let secret: String = secret.into();
                (level, Credential::Plain(Zeroizing::new(secret.trim().to_string())))
            })
            .collect();
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a TOML credentials file
    ///
    /// ```toml
    /// [[credential]]
    /// level = "ALPHA"
    /// hash = "$argon2id$v=19$..."
    ///
    /// [[credential]]
    /// level = "DELTA"
    /// secret = "DarkAlley"
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let contents = Zeroizing::new(fs::read_to_string(path)?);
        Self::from_toml(&contents)
    }

    /// Parse a table from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, CredentialError> {
        let file: CredentialFile =
            toml::from_str(contents).map_err(|e| CredentialError::Parse(e.to_string()))?;

        let mut entries = Vec::with_capacity(file.credential.len());
        for entry in file.credential {
            let credential = match (entry.secret, entry.hash) {
                (Some(secret), None) => {
                    let secret = Zeroizing::new(secret);
                    if secret.trim().is_empty() {
                        return Err(CredentialError::EmptySecret(entry.level));
                    }
                    Credential::Plain(Zeroizing::new(secret.trim().to_string()))
                }
                (None, Some(hash)) => {
                    PasswordHash::new(&hash)
                        .map_err(|e| CredentialError::InvalidHash(entry.level, e.to_string()))?;
                    Credential::Hashed(hash)
                }
                _ => return Err(CredentialError::AmbiguousEntry(entry.level)),
            };
            entries.push((entry.level, credential));
        }

        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    /// Resolve a submitted secret to its clearance level
    ///
    /// Surrounding whitespace is trimmed. Matching is exact; every entry is
    /// checked so the comparison time does not depend on which level matched.
    pub fn resolve(&self, secret: &str) -> Option<ClearanceLevel> {
        let candidate = secret.trim();
        let mut found = None;
        for (level, credential) in &self.entries {
            if credential.matches(candidate) && found.is_none() {
                found = Some(*level);
            }
        }
        found
    }

    fn validate(&self) -> Result<(), CredentialError> {
        for level in ClearanceLevel::ALL {
            match self.entries.iter().filter(|(l, _)| *l == level).count() {
                0 => return Err(CredentialError::MissingLevel(level)),
                1 => {}
                _ => return Err(CredentialError::DuplicateLevel(level)),
            }
        }

        // Hashed secrets are salted, so only cleartext entries can drive the check.
        // Each one is tested against every other entry, hashed ones included.
        for (i, (level_a, a)) in self.entries.iter().enumerate() {
            let Credential::Plain(secret_a) = a else { continue };
            if secret_a.is_empty() {
                return Err(CredentialError::EmptySecret(*level_a));
            }
            for (j, (level_b, b)) in self.entries.iter().enumerate() {
                if i != j && b.matches(secret_a) {
                    let (first, second) = if i < j { (*level_a, *level_b) } else { (*level_b, *level_a) };
                    return Err(CredentialError::DuplicateSecret(first, second));
                }
            }
        }
        Ok(())
    }
}

/// Hash a secret into an Argon2id PHC string suitable for a credentials file
pub fn hash_secret(secret: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let secret_bytes = Zeroizing::new(secret.trim().as_bytes().to_vec());
    Argon2::default()
        .hash_password(&secret_bytes, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Crypto(format!("Failed to hash secret: {}", e)))
}

#[derive(Deserialize)]
struct CredentialFile {
    #[serde(default)]
    credential: Vec<CredentialFileEntry>,
}

#[derive(Deserialize)]
struct CredentialFileEntry {
    level: ClearanceLevel,
    secret: Option<String>,
    hash: Option<String>,
}

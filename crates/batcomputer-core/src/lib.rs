//! Batcomputer core - the console's access gate
//!
//! This crate provides:
//! - Clearance levels and credential resolution
//! - The session & lockout manager ([`AuthService`])
//! - Classified record kinds and the visibility filter
//! - The route guard for console pages
//! - Local key-value persistence and configuration
//! - The ALPHA-gated local archives ([`LocalArchive`])

pub mod archive;
pub mod auth;
pub mod clearance;
pub mod config;
pub mod credentials;
pub mod error;
pub mod records;
pub mod routes;
pub mod storage;

pub use archive::{CreatorDocs, DccuArchive, LocalArchive};
pub use auth::{AuthError, AuthService, GateEvent, LockoutPolicy, Session};
pub use clearance::ClearanceLevel;
pub use config::ConsoleConfig;
pub use credentials::CredentialTable;
pub use error::{ConsoleError, ErrorKind, Result};
pub use records::{ensure_can_modify, visible, Classified, Record, RecordKind};
pub use routes::{guard, Route, RouteDecision};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

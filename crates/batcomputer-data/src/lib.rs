//! Batcomputer data - record stores behind the clearance filter
//!
//! - [`RecordStore`]: list/insert/update/delete plus change notifications
//! - [`MemoryRecordStore`]: in-process store
//! - [`RestRecordStore`]: client for the managed PostgREST backend
//! - [`Dataset`]: typed, level-bound view of one table

pub mod dataset;
pub mod memory;
pub mod rest;
pub mod store;

pub use dataset::Dataset;
pub use memory::MemoryRecordStore;
pub use rest::RestRecordStore;
pub use store::{ChangeEvent, ChangeKind, RecordStore};

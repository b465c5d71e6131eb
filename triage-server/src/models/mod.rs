//! Data models for triage-server

pub mod record;
pub mod tags;

pub use record::{ScreeningRecord, SyncStatus};
pub use tags::{ClinicalTag, TagSet};

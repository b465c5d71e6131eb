//! Database access for triage-server
//!
//! Schema creation lives in `triage_common::db`; this module holds the
//! queries.

pub mod lease;
pub mod records;

pub use lease::{lease_holder, release_lease, try_acquire_lease};
pub use records::{
    count_unsynced, get_record, insert_record, list_records, list_unsynced_due, mark_synced,
    record_sync_failure, sync_attempt_count, sync_status,
};

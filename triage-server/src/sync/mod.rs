//! Offline-first synchronization with the remote record store

pub mod probe;
pub mod reconciler;
pub mod remote;

pub use probe::{ConnectivityProbe, HttpProbe, OfflineProbe};
pub use reconciler::{
    backoff_delay, CycleOutcome, CycleReport, ReconcilerSettings, ReconcilerState,
    ReconcilerStatus, SyncReconciler,
};
pub use remote::{HttpRemoteStore, NoRemoteStore, RemoteStore};

use std::sync::Arc;
use std::time::Duration;
use triage_common::config::SyncConfig;

use crate::error::SyncError;

pub(crate) const USER_AGENT: &str = concat!("triage-server/", env!("CARGO_PKG_VERSION"));

/// Probe and remote store for the configured remote URL
///
/// Without a remote URL the reconciler runs permanently offline.
pub fn connect(
    config: &SyncConfig,
) -> Result<(Arc<dyn ConnectivityProbe>, Arc<dyn RemoteStore>), SyncError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    match (config.remote_url.as_deref(), config.effective_probe_url()) {
        (Some(remote_url), Some(probe_url)) => {
            let probe: Arc<dyn ConnectivityProbe> = Arc::new(HttpProbe::new(probe_url, timeout)?);
            let remote: Arc<dyn RemoteStore> =
                Arc::new(HttpRemoteStore::new(remote_url, timeout)?);
            Ok((probe, remote))
        }
        _ => {
            let probe: Arc<dyn ConnectivityProbe> = Arc::new(OfflineProbe);
            let remote: Arc<dyn RemoteStore> = Arc::new(NoRemoteStore);
            Ok((probe, remote))
        }
    }
}

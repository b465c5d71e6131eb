//! Offline-first sync reconciler
//!
//! Pushes unsynced screening records to the remote store whenever the
//! network is reachable. Records are never deleted locally; a failed upsert
//! is retried on a later cycle after an exponential backoff.
//!
//! Two guards keep processing single-threaded per store: an in-process
//! mutex stops overlapping cycles, and a lease row in the database stops a
//! second reconciler process from working the same store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use triage_common::config::SyncConfig;

use super::probe::ConnectivityProbe;
use super::remote::RemoteStore;
use crate::db;
use crate::error::SyncError;
use crate::models::ScreeningRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilerState {
    Idle,
    Probing,
    Syncing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Probe failed; nothing attempted
    Offline,
    Completed,
    /// Another cycle in this process is running
    AlreadyRunning,
    /// Another reconciler holds the store lease
    LeaseHeld,
}

/// What one cycle did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    /// Upserted, but another writer had already flipped the flag
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    fn empty(outcome: CycleOutcome, started_at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            attempted: 0,
            synced: 0,
            failed: 0,
            skipped: 0,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Reconciler snapshot for the status endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilerStatus {
    pub state: ReconcilerState,
    pub holder_id: String,
    pub lease_held: bool,
    pub pending: i64,
    pub last_cycle: Option<CycleReport>,
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub interval: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub lease_ttl: Duration,
}

impl From<&SyncConfig> for ReconcilerSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            backoff_base: Duration::from_secs(config.backoff_base_secs),
            backoff_max: Duration::from_secs(config.backoff_max_secs),
            lease_ttl: Duration::from_secs(config.lease_secs),
        }
    }
}

/// Delay before retry number `attempts + 1`: base * 2^(attempts - 1), capped
pub fn backoff_delay(attempts: i64, base: Duration, max: Duration) -> Duration {
    let exponent = u32::try_from(attempts.saturating_sub(1).max(0)).unwrap_or(u32::MAX);
    let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::weeks(52))
}

pub struct SyncReconciler {
    db: SqlitePool,
    probe: Arc<dyn ConnectivityProbe>,
    remote: Arc<dyn RemoteStore>,
    settings: ReconcilerSettings,
    holder_id: String,
    state: RwLock<ReconcilerState>,
    last_cycle: RwLock<Option<CycleReport>>,
    cycle_lock: Mutex<()>,
}

impl SyncReconciler {
    pub fn new(
        db: SqlitePool,
        probe: Arc<dyn ConnectivityProbe>,
        remote: Arc<dyn RemoteStore>,
        settings: ReconcilerSettings,
        device_id: &str,
    ) -> Self {
        Self {
            db,
            probe,
            remote,
            settings,
            holder_id: format!("{}/{}", device_id, triage_common::uuid_utils::generate()),
            state: RwLock::new(ReconcilerState::Idle),
            last_cycle: RwLock::new(None),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    pub async fn state(&self) -> ReconcilerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: ReconcilerState) {
        *self.state.write().await = state;
    }

    pub async fn status(&self) -> Result<ReconcilerStatus, SyncError> {
        let holder = db::lease_holder(&self.db, Utc::now()).await?;
        Ok(ReconcilerStatus {
            state: self.state().await,
            holder_id: self.holder_id.clone(),
            lease_held: holder.as_deref() == Some(self.holder_id.as_str()),
            pending: db::count_unsynced(&self.db).await?,
            last_cycle: self.last_cycle.read().await.clone(),
        })
    }

    /// Run one probe-and-push cycle
    ///
    /// Returns immediately with `AlreadyRunning` if a cycle is in progress.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        let started_at = Utc::now();
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::debug!("Sync cycle already running, skipping");
            return Ok(CycleReport::empty(CycleOutcome::AlreadyRunning, started_at));
        };

        let result = self.cycle(started_at).await;
        self.set_state(ReconcilerState::Idle).await;

        let report = result?;
        *self.last_cycle.write().await = Some(report.clone());
        Ok(report)
    }

    /// Take or extend the store lease for one lease period from now
    async fn renew_lease(&self) -> Result<bool, SyncError> {
        let acquired = db::try_acquire_lease(
            &self.db,
            &self.holder_id,
            Utc::now(),
            to_chrono(self.settings.lease_ttl),
        )
        .await?;
        if !acquired {
            tracing::debug!(holder = %self.holder_id, "Sync lease held by another reconciler");
        }
        Ok(acquired)
    }

    async fn cycle(&self, started_at: DateTime<Utc>) -> Result<CycleReport, SyncError> {
        if !self.renew_lease().await? {
            return Ok(CycleReport::empty(CycleOutcome::LeaseHeld, started_at));
        }

        self.set_state(ReconcilerState::Probing).await;
        if !self.probe.is_reachable().await {
            tracing::debug!("Remote store unreachable, staying offline");
            return Ok(CycleReport::empty(CycleOutcome::Offline, started_at));
        }

        self.set_state(ReconcilerState::Syncing).await;
        let due = db::list_unsynced_due(&self.db, Utc::now()).await?;
        let mut report = CycleReport::empty(CycleOutcome::Completed, started_at);

        for record in &due {
            // A slow remote can outlast the lease; never push without holding it
            if !self.renew_lease().await? {
                tracing::warn!(
                    holder = %self.holder_id,
                    attempted = report.attempted,
                    "Sync lease lost mid-cycle, stopping"
                );
                report.outcome = CycleOutcome::LeaseHeld;
                break;
            }
            report.attempted += 1;
            match self.remote.upsert(record).await {
                Ok(()) => {
                    if db::mark_synced(&self.db, record.id, Utc::now()).await? {
                        report.synced += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    self.record_failure(record, &e).await?;
                }
            }
        }

        report.finished_at = Utc::now();
        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                synced = report.synced,
                failed = report.failed,
                "Sync cycle complete"
            );
        }
        Ok(report)
    }

    async fn record_failure(
        &self,
        record: &ScreeningRecord,
        error: &SyncError,
    ) -> Result<(), SyncError> {
        let now = Utc::now();
        let attempts = db::sync_attempt_count(&self.db, record.id).await? + 1;
        let delay = backoff_delay(attempts, self.settings.backoff_base, self.settings.backoff_max);
        let next_attempt_at = now + to_chrono(delay);

        tracing::warn!(
            record_id = %record.id,
            attempts,
            retry_in_secs = delay.as_secs(),
            error = %error,
            "Failed to sync record"
        );

        db::record_sync_failure(
            &self.db,
            record.id,
            attempts,
            &error.to_string(),
            now,
            next_attempt_at,
        )
        .await?;
        Ok(())
    }

    /// Try to push a freshly saved record right away
    ///
    /// Returns whether the remote now holds it. A failure here is not
    /// recorded as a backoff attempt; the next cycle simply picks it up.
    /// The push is skipped while a cycle runs or another reconciler holds
    /// the lease, so the store keeps a single sync writer.
    pub async fn push_new(&self, record: &ScreeningRecord) -> bool {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::debug!(record_id = %record.id, "Sync cycle running, deferring immediate push");
            return false;
        };
        match self.renew_lease().await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                tracing::warn!(record_id = %record.id, error = %e, "Failed to take sync lease");
                return false;
            }
        }

        match self.remote.upsert(record).await {
            Ok(()) => match db::mark_synced(&self.db, record.id, Utc::now()).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "Failed to mark record synced");
                    true
                }
            },
            Err(e) => {
                tracing::debug!(record_id = %record.id, error = %e, "Immediate sync deferred");
                false
            }
        }
    }

    /// Run a cycle at startup and then every `interval` until cancelled
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::info!(
                holder = %self.holder_id,
                interval_secs = self.settings.interval.as_secs(),
                "Sync reconciler started"
            );

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            tracing::error!(error = %e, "Sync cycle failed");
                        }
                    }
                }
            }

            if let Err(e) = db::release_lease(&self.db, &self.holder_id).await {
                tracing::warn!(error = %e, "Failed to release sync lease");
            }
            tracing::info!("Sync reconciler stopped");
        })
    }
}

//! Reconciler lease tests against a shared database file
//!
//! Two pools on one file stand in for two reconciler processes.

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use triage_common::Demographics;
use triage_server::db;
use triage_server::error::SyncError;
use triage_server::fusion::fuse;
use triage_server::models::ScreeningRecord;
use triage_server::scoring::{SymptomAssessment, SymptomChecklist};
use triage_server::sync::{CycleOutcome, ReconcilerSettings, RemoteStore, SyncReconciler};

use helpers::SwitchProbe;

/// Remote that takes `delay` per upsert and then rejects it
struct SlowRejectingRemote {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowRejectingRemote {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for SlowRejectingRemote {
    async fn upsert(&self, _record: &ScreeningRecord) -> Result<(), SyncError> {
        tokio::time::sleep(self.delay).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SyncError::Remote(504))
    }
}

fn short_lease() -> ReconcilerSettings {
    ReconcilerSettings {
        interval: Duration::from_secs(300),
        backoff_base: Duration::from_secs(30),
        backoff_max: Duration::from_secs(3600),
        lease_ttl: Duration::from_secs(1),
    }
}

fn record() -> ScreeningRecord {
    let checklist = SymptomChecklist {
        night_sweats: true,
        ..Default::default()
    };
    let demographics = Demographics {
        name: None,
        age: Some(61),
        gender: Some("M".to_string()),
    };
    let assessment = SymptomAssessment::from_checklist(&checklist, demographics);
    let fusion = fuse(assessment.unit_score(), None, &assessment.tags, true);
    ScreeningRecord::new("device-a", assessment, None, fusion)
}

fn reconciler(pool: SqlitePool, remote: Arc<SlowRejectingRemote>, device: &str) -> SyncReconciler {
    SyncReconciler::new(
        pool,
        Arc::new(SwitchProbe::new(true)),
        remote,
        short_lease(),
        device,
    )
}

#[tokio::test]
async fn test_lease_outlives_a_slow_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triage.db");
    let pool_a = triage_common::db::init_database(&path).await.unwrap();
    let pool_b = triage_common::db::init_database(&path).await.unwrap();
    for _ in 0..3 {
        db::insert_record(&pool_a, &record()).await.unwrap();
    }

    let remote_a = Arc::new(SlowRejectingRemote::new(Duration::from_millis(600)));
    let remote_b = Arc::new(SlowRejectingRemote::new(Duration::ZERO));
    let first = Arc::new(reconciler(pool_a, remote_a.clone(), "device-a"));
    let second = reconciler(pool_b.clone(), remote_b.clone(), "device-b");

    let running = tokio::spawn({
        let first = first.clone();
        async move { first.run_cycle().await }
    });

    // Later than one lease period after the first cycle started
    tokio::time::sleep(Duration::from_millis(1300)).await;
    let report = second.run_cycle().await.unwrap();
    assert_eq!(report.outcome, CycleOutcome::LeaseHeld);
    assert_eq!(report.attempted, 0);
    assert_eq!(remote_b.calls(), 0);

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.failed, 3);
    assert_eq!(remote_a.calls(), 3);
    assert_eq!(db::count_unsynced(&pool_b).await.unwrap(), 3);
}

#[tokio::test]
async fn test_expired_lease_passes_to_next_reconciler() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triage.db");
    let pool_a = triage_common::db::init_database(&path).await.unwrap();
    let pool_b = triage_common::db::init_database(&path).await.unwrap();

    let first = reconciler(pool_a, Arc::new(SlowRejectingRemote::new(Duration::ZERO)), "device-a");
    let second = reconciler(pool_b, Arc::new(SlowRejectingRemote::new(Duration::ZERO)), "device-b");

    assert_eq!(first.run_cycle().await.unwrap().outcome, CycleOutcome::Completed);
    assert_eq!(second.run_cycle().await.unwrap().outcome, CycleOutcome::LeaseHeld);

    // The first holder stops renewing; its lease runs out
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(second.run_cycle().await.unwrap().outcome, CycleOutcome::Completed);
    assert!(second.status().await.unwrap().lease_held);
    assert!(!first.status().await.unwrap().lease_held);
}

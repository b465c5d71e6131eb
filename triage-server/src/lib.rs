//! triage-server library interface
//!
//! Respiratory pre-screening: a decision-graph symptom interview, a
//! rule-based severity scorer, fusion with an optional imaging assessment,
//! and offline-first persistence with background sync.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fusion;
pub mod interview;
pub mod models;
pub mod scoring;
pub mod services;
pub mod sync;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::interview::SymptomGraph;
use crate::services::{ConversationalModel, ImagingClassifier};
use crate::sync::SyncReconciler;

/// Per-call limits for the external collaborators, in seconds
#[derive(Debug, Clone, Copy)]
pub struct CollaboratorTimeouts {
    pub turn_secs: u64,
    pub summary_secs: u64,
}

impl Default for CollaboratorTimeouts {
    fn default() -> Self {
        Self {
            turn_secs: 45,
            summary_secs: 60,
        }
    }
}

/// Application state shared across handlers
///
/// Holds no interview sessions: conversation state travels with each
/// request.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Validated at startup, read-only afterwards
    pub graph: Arc<SymptomGraph>,
    pub reconciler: Arc<SyncReconciler>,
    pub imaging: Option<Arc<dyn ImagingClassifier>>,
    pub converse: Option<Arc<dyn ConversationalModel>>,
    pub timeouts: CollaboratorTimeouts,
    /// Stamped on every record created by this instance
    pub device_id: String,
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        graph: SymptomGraph,
        reconciler: Arc<SyncReconciler>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            db,
            graph: Arc::new(graph),
            reconciler,
            imaging: None,
            converse: None,
            timeouts: CollaboratorTimeouts::default(),
            device_id: device_id.into(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_imaging(mut self, imaging: Option<Arc<dyn ImagingClassifier>>) -> Self {
        self.imaging = imaging;
        self
    }

    pub fn with_converse(mut self, converse: Option<Arc<dyn ConversationalModel>>) -> Self {
        self.converse = converse;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CollaboratorTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub async fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::interview_routes())
        .merge(api::screening_routes())
        .merge(api::imaging_routes())
        .merge(api::triage_routes())
        .merge(api::record_routes())
        .merge(api::sync_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

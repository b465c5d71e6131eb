//! Sync reconciler status and manual trigger

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::sync::{CycleOutcome, CycleReport, ReconcilerStatus};
use crate::AppState;

/// GET /api/sync/status
pub async fn sync_status(State(state): State<AppState>) -> ApiResult<Json<ReconcilerStatus>> {
    Ok(Json(state.reconciler.status().await?))
}

/// POST /api/sync/run
pub async fn run_sync(State(state): State<AppState>) -> ApiResult<Json<CycleReport>> {
    let report = state.reconciler.run_cycle().await?;
    if report.outcome == CycleOutcome::AlreadyRunning {
        return Err(ApiError::Conflict("A sync cycle is already running".to_string()));
    }
    Ok(Json(report))
}

pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync/status", get(sync_status))
        .route("/api/sync/run", post(run_sync))
}

//! Screening record history and sync badges

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{ScreeningRecord, SyncStatus};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unsynced: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordList {
    pub records: Vec<ScreeningRecord>,
    pub count: usize,
    /// All unsynced records in the store, not just this page
    pub pending_sync: i64,
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    triage_common::uuid_utils::parse(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid record id: {}", e)))
}

/// GET /api/records
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<RecordList>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let records = db::list_records(&state.db, query.unsynced, limit).await?;
    let pending_sync = db::count_unsynced(&state.db).await?;

    Ok(Json(RecordList {
        count: records.len(),
        records,
        pending_sync,
    }))
}

/// GET /api/records/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScreeningRecord>> {
    let id = parse_id(&id)?;
    db::get_record(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Record {}", id)))
}

/// GET /api/records/:id/sync
pub async fn get_sync_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SyncStatus>> {
    let id = parse_id(&id)?;
    db::sync_status(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Record {}", id)))
}

pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/api/records", get(list_records))
        .route("/api/records/:id", get(get_record))
        .route("/api/records/:id/sync", get(get_sync_status))
}

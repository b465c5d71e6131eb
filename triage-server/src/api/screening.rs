//! Structured checklist scoring

use axum::{routing::post, Json, Router};
use serde::Serialize;

use crate::error::ApiResult;
use crate::models::TagSet;
use crate::scoring::{score, SeverityBreakdown, SymptomChecklist};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistResponse {
    #[serde(flatten)]
    pub severity: SeverityBreakdown,
    pub tags: TagSet,
}

/// POST /api/screening/checklist
///
/// Scores without persisting; the same answers through the interview
/// produce the same score.
pub async fn score_checklist(
    Json(checklist): Json<SymptomChecklist>,
) -> ApiResult<Json<ChecklistResponse>> {
    let severity = score(&checklist);
    tracing::debug!(score = severity.score, risk = %severity.risk_level, "Checklist scored");

    Ok(Json(ChecklistResponse {
        severity,
        tags: checklist.tags(),
    }))
}

pub fn screening_routes() -> Router<AppState> {
    Router::new().route("/api/screening/checklist", post(score_checklist))
}

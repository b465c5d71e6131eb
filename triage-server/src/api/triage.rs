//! Triage: fuse, persist, attempt immediate sync
//!
//! A computed verdict is always returned. Local or remote storage failures
//! are reported through `savedLocally` / `savedOnline`, never as an error.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use triage_common::{Demographics, ImagingAssessment};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::fusion::{fuse, FusionResult};
use crate::interview::ConversationState;
use crate::models::ScreeningRecord;
use crate::scoring::{SymptomAssessment, SymptomChecklist};
use crate::services::summary::triage_report;
use crate::AppState;

pub const OFFLINE_WARNING: &str =
    "Saved on this device only. It will upload automatically when the connection returns.";

pub const LOCAL_SAVE_FAILED_WARNING: &str =
    "Could not save on this device. Record the verdict below manually.";

/// Symptom input is either an interview state or a checklist
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageRequest {
    /// Interview as it stands; replayed and finalized server-side
    #[serde(default)]
    pub interview: Option<ConversationState>,
    #[serde(default)]
    pub checklist: Option<SymptomChecklist>,
    /// Required with `checklist`; taken from the interview otherwise
    #[serde(default)]
    pub demographics: Option<Demographics>,
    #[serde(default)]
    pub imaging: Option<ImagingAssessment>,
    /// Ignore `imaging` even if present
    #[serde(default)]
    pub is_symptom_only: bool,
    /// Overrides this instance's device id
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResponse {
    pub record_id: Uuid,
    pub result: FusionResult,
    pub symptom_score: u8,
    pub saved_locally: bool,
    pub saved_online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_warning: Option<String>,
    pub report: String,
}

fn assessment_from_request(
    state: &AppState,
    request: &TriageRequest,
) -> ApiResult<SymptomAssessment> {
    match (&request.interview, &request.checklist) {
        (Some(interview), None) => {
            interview.demographics.validate()?;
            Ok(SymptomAssessment::from_conversation(&state.graph, interview)?)
        }
        (None, Some(checklist)) => {
            let demographics = request.demographics.clone().ok_or_else(|| {
                ApiError::BadRequest("demographics are required with a checklist".to_string())
            })?;
            demographics.validate()?;
            Ok(SymptomAssessment::from_checklist(checklist, demographics))
        }
        _ => Err(ApiError::BadRequest(
            "Provide exactly one of interview or checklist".to_string(),
        )),
    }
}

/// POST /api/triage
pub async fn triage(
    State(state): State<AppState>,
    Json(request): Json<TriageRequest>,
) -> ApiResult<Json<TriageResponse>> {
    let assessment = assessment_from_request(&state, &request)?;

    let imaging = if request.is_symptom_only {
        None
    } else {
        request.imaging.map(|mut imaging| {
            if imaging.label.is_none() {
                imaging.label = Some(imaging.dominant_class().as_str().to_string());
            }
            imaging
        })
    };

    let fusion = fuse(
        assessment.unit_score(),
        imaging.as_ref(),
        &assessment.tags,
        imaging.is_none(),
    );

    let device_id = request
        .device_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.device_id.clone());
    let symptom_score = assessment.score;
    let record = ScreeningRecord::new(device_id, assessment, imaging, fusion);

    tracing::info!(
        record_id = %record.id,
        score = record.fusion.final_score,
        risk = %record.fusion.risk_level,
        override_reason = ?record.fusion.override_reason,
        "Triage computed"
    );

    let saved_locally = match db::insert_record(&state.db, &record).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(record_id = %record.id, error = %e, "Failed to save record locally");
            state.set_last_error(e.to_string()).await;
            false
        }
    };

    let saved_online = state.reconciler.push_new(&record).await;

    let offline_warning = match (saved_locally, saved_online) {
        (true, true) => None,
        (true, false) => Some(OFFLINE_WARNING.to_string()),
        (false, _) => Some(LOCAL_SAVE_FAILED_WARNING.to_string()),
    };

    let report = triage_report(
        &record.symptom_assessment,
        record.imaging.as_ref(),
        &record.fusion,
        record.created_at,
    );

    Ok(Json(TriageResponse {
        record_id: record.id,
        result: record.fusion,
        symptom_score,
        saved_locally,
        saved_online,
        offline_warning,
        report,
    }))
}

pub fn triage_routes() -> Router<AppState> {
    Router::new().route("/api/triage", post(triage))
}

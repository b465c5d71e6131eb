//! Screening record: the persisted triage aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_common::{Demographics, ImagingAssessment};
use uuid::Uuid;

use crate::fusion::FusionResult;
use crate::scoring::SymptomAssessment;

/// One completed triage
///
/// Immutable after creation except `synced` / `synced_at`, which only the
/// sync reconciler writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningRecord {
    pub id: Uuid,
    pub device_id: String,
    pub demographics: Demographics,
    pub symptom_assessment: SymptomAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imaging: Option<ImagingAssessment>,
    pub fusion: FusionResult,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScreeningRecord {
    pub fn new(
        device_id: impl Into<String>,
        symptom_assessment: SymptomAssessment,
        imaging: Option<ImagingAssessment>,
        fusion: FusionResult,
    ) -> Self {
        Self {
            id: triage_common::uuid_utils::generate(),
            device_id: device_id.into(),
            demographics: symptom_assessment.demographics.clone(),
            symptom_assessment,
            imaging,
            fusion,
            synced: false,
            synced_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Sync badge for one record, plus reconciler bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub record_id: Uuid,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub attempts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

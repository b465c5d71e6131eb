//! Imaging classification passthrough

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use triage_common::ImagingAssessment;

use crate::error::{ApiError, ApiResult, CollaboratorError};
use crate::services::summary::imaging_fallback_message;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    /// Base64-encoded image; a `data:` URL prefix is accepted
    pub image: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    /// `None` when the classifier is unavailable; continue symptom-only
    pub assessment: Option<ImagingAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
}

fn strip_data_url(image: &str) -> &str {
    match image.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => image,
    }
}

/// POST /api/imaging/classify
pub async fn classify_image(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> ApiResult<Json<ClassifyResponse>> {
    let image = strip_data_url(request.image.trim());
    if image.is_empty() {
        return Err(ApiError::BadRequest("Image data is empty".to_string()));
    }

    let result = match &state.imaging {
        Some(classifier) => classifier.classify(image).await,
        None => Err(CollaboratorError::NotConfigured("Imaging classifier")),
    };

    match result {
        Ok(assessment) => {
            tracing::info!(label = ?assessment.label, "Image classified");
            Ok(Json(ClassifyResponse {
                label: assessment.label.clone(),
                assessment: Some(assessment),
                fallback_message: None,
            }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Imaging classification unavailable");
            state.set_last_error(e.to_string()).await;
            Ok(Json(ClassifyResponse {
                assessment: None,
                label: None,
                fallback_message: Some(imaging_fallback_message().to_string()),
            }))
        }
    }
}

pub fn imaging_routes() -> Router<AppState> {
    Router::new().route("/api/imaging/classify", post(classify_image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_prefix_removed() {
        assert_eq!(strip_data_url("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
    }
}

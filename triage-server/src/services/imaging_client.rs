//! Imaging classifier client
//!
//! The classifier runs out of process and is treated as opaque: it takes a
//! base64 chest X-ray and answers with a probability per class. Nothing
//! here computes probabilities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use triage_common::ImagingAssessment;

use super::{with_timeout, USER_AGENT};
use crate::error::CollaboratorError;

#[async_trait]
pub trait ImagingClassifier: Send + Sync {
    /// Classify one base64-encoded image
    async fn classify(&self, image_base64: &str) -> Result<ImagingAssessment, CollaboratorError>;
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    prediction: Option<String>,
    probabilities: ImagingAssessment,
    /// Reference to a stored heat map, if the classifier keeps one
    #[serde(default)]
    explanation: Option<String>,
}

/// Reject vectors with values outside [0, 1] or all zeros
fn check_probabilities(assessment: &ImagingAssessment) -> Result<(), CollaboratorError> {
    let values = [
        assessment.normal,
        assessment.pneumonia,
        assessment.tb,
        assessment.abnormal,
    ];
    if values.iter().any(|p| !p.is_finite() || !(0.0..=1.0).contains(p)) {
        return Err(CollaboratorError::Parse(format!(
            "probability out of range: {:?}",
            values
        )));
    }
    if values.iter().all(|p| *p == 0.0) {
        return Err(CollaboratorError::Parse(
            "classifier returned no probabilities".to_string(),
        ));
    }
    Ok(())
}

/// `POST {base}/classify` client
pub struct HttpImagingClassifier {
    http_client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpImagingClassifier {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    async fn request(&self, image_base64: &str) -> Result<ImagingAssessment, CollaboratorError> {
        let url = format!("{}/classify", self.base_url);
        tracing::debug!(%url, bytes = image_base64.len(), "Requesting image classification");

        let response = self
            .http_client
            .post(&url)
            .json(&ClassifyRequest {
                image: image_base64,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Api(status.as_u16(), error_text));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        let mut assessment = body.probabilities;
        check_probabilities(&assessment)?;

        let dominant = assessment.dominant_class().as_str();
        if let Some(reported) = body.prediction.as_deref() {
            if !reported.eq_ignore_ascii_case(dominant) {
                tracing::debug!(reported, dominant, "Classifier label differs from dominant class");
            }
        }
        assessment.label = Some(dominant.to_string());
        assessment.explanation = body.explanation;

        Ok(assessment)
    }
}

#[async_trait]
impl ImagingClassifier for HttpImagingClassifier {
    async fn classify(&self, image_base64: &str) -> Result<ImagingAssessment, CollaboratorError> {
        with_timeout("Imaging classifier", self.timeout_secs, self.request(image_base64)).await
    }
}

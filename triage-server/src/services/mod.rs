//! External collaborators and local report generation

pub mod converse_client;
pub mod imaging_client;
pub mod summary;

pub use converse_client::{
    clinical_summary, converse_turn, extract_risk_hint, ChatMessage, ConversationalModel,
    ConverseReply, HttpChatClient,
};
pub use imaging_client::{HttpImagingClassifier, ImagingClassifier};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CollaboratorError;

pub(crate) const USER_AGENT: &str = concat!("triage-server/", env!("CARGO_PKG_VERSION"));

/// Bound a collaborator call; expiry becomes [`CollaboratorError::Timeout`]
pub async fn with_timeout<T, F>(
    label: &'static str,
    timeout_secs: u64,
    call: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(collaborator = label, timeout_secs, "Collaborator call timed out");
            Err(CollaboratorError::Timeout(label, timeout_secs))
        }
    }
}

pub type Collaborators = (
    Option<Arc<dyn ImagingClassifier>>,
    Option<Arc<dyn ConversationalModel>>,
);

/// Collaborator clients for the configured URLs; unset URLs yield `None`
pub fn connect(
    config: &triage_common::config::CollaboratorConfig,
) -> Result<Collaborators, CollaboratorError> {
    let imaging = match config.imaging_url.as_deref() {
        Some(url) => Some(Arc::new(HttpImagingClassifier::new(
            url,
            config.imaging_timeout_secs,
        )?) as Arc<dyn ImagingClassifier>),
        None => None,
    };

    let request_timeout = config.turn_timeout_secs.max(config.summary_timeout_secs);
    let converse = match config.converse_url.as_deref() {
        Some(url) => Some(Arc::new(HttpChatClient::new(
            url,
            config.converse_model.clone(),
            Duration::from_secs(request_timeout),
        )?) as Arc<dyn ConversationalModel>),
        None => None,
    };

    Ok((imaging, converse))
}

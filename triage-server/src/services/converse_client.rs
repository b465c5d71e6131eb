//! Conversational model client
//!
//! Text in, text out. The interview never depends on it: every call is
//! bounded by a timeout and callers fall back to locally generated text.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use triage_common::RiskLevel;

use super::{with_timeout, USER_AGENT};
use crate::error::CollaboratorError;
use crate::interview::{ConversationState, Role};
use crate::scoring::SymptomAssessment;

static RISK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[risk:\s*(high|moderate|low|unknown)\s*\]").expect("risk marker regex compiles")
});

static ANY_RISK_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[risk:[^\]]*\]").expect("risk strip regex compiles"));

const TURN_TEMPERATURE: f32 = 0.3;
const SUMMARY_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ConversationalModel: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, CollaboratorError>;
}

/// Reply with its advisory risk marker removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseReply {
    pub reply: String,
    /// `None` when the model answered "Unknown" or gave no hint
    pub risk_hint: Option<RiskLevel>,
}

/// Pull the trailing `[Risk: X]` marker out of a model reply
///
/// Without a marker, a reply mentioning an emergency or a hospital is read
/// as a high-risk hint.
pub fn extract_risk_hint(raw: &str) -> ConverseReply {
    let raw = raw.trim();
    if let Some(caps) = RISK_MARKER.captures(raw) {
        let risk_hint = caps[1].parse::<RiskLevel>().ok();
        let reply = RISK_MARKER.replace(raw, "").trim().to_string();
        return ConverseReply { reply, risk_hint };
    }

    let lower = raw.to_lowercase();
    let risk_hint = if lower.contains("emergency") || lower.contains("hospital") {
        Some(RiskLevel::High)
    } else {
        None
    };
    ConverseReply {
        reply: raw.to_string(),
        risk_hint,
    }
}

pub fn strip_risk_markers(text: &str) -> String {
    ANY_RISK_MARKER.replace_all(text, "").trim().to_string()
}

fn patient_line(state_demographics: &triage_common::Demographics) -> String {
    let age = state_demographics
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let gender = state_demographics.gender.as_deref().unwrap_or("Unknown");
    format!("{}-year-old {}", age, gender)
}

/// Prompt for a free-text turn the decision graph could not place
pub fn turn_messages(state: &ConversationState, user_text: &str) -> Vec<ChatMessage> {
    let covered = state.covered_topics();
    let avoid = if covered.is_empty() {
        "none".to_string()
    } else {
        covered.join(", ")
    };

    let mut messages = vec![ChatMessage::system(format!(
        "You are a respiratory screening assistant. Patient: {}.\n\
         - If the patient names a symptom without its duration, ask only how long they have had it.\n\
         - Never assume a duration.\n\
         - Do not ask again about: {}.\n\
         - Keep it conversational but professional.",
        patient_line(&state.demographics),
        avoid
    ))];

    for entry in &state.log {
        let content = strip_risk_markers(&entry.text);
        messages.push(match entry.role {
            Role::User => ChatMessage::user(content),
            Role::Assistant => ChatMessage::assistant(content),
        });
    }

    messages.push(ChatMessage::user(format!(
        "{}\n\n(SYSTEM: Reply naturally. End with [Risk: High|Moderate|Low|Unknown])",
        user_text
    )));
    messages
}

/// Scribe prompt turning a finished interview into a three-point summary
pub fn summary_messages(assessment: &SymptomAssessment) -> Vec<ChatMessage> {
    let transcript = assessment
        .log
        .iter()
        .map(|entry| {
            let speaker = match entry.role {
                Role::User => "Patient",
                Role::Assistant => "Screener",
            };
            format!("{}: {}", speaker, strip_risk_markers(&entry.text))
        })
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        ChatMessage::system("You are a medical scribe. Summarize the consultation."),
        ChatMessage::user(format!(
            "Patient: {}.\n\nTRANSCRIPT:\n{}\n\n\
             Symptom severity score: {}/100.\n\n\
             Write a clinical summary in 3 bullet points:\n\
             1. Chief complaint and duration (only what was explicitly confirmed).\n\
             2. Associated symptoms (positive and negative findings).\n\
             3. Provisional assessment and risk level.",
            patient_line(&assessment.demographics),
            transcript,
            assessment.score
        )),
    ]
}

/// One conversational turn, bounded by `timeout_secs`
pub async fn converse_turn(
    model: &dyn ConversationalModel,
    state: &ConversationState,
    user_text: &str,
    timeout_secs: u64,
) -> Result<ConverseReply, CollaboratorError> {
    let messages = turn_messages(state, user_text);
    let raw = with_timeout(
        "Conversational turn",
        timeout_secs,
        model.chat(&messages, TURN_TEMPERATURE),
    )
    .await?;
    Ok(extract_risk_hint(&raw))
}

/// Clinical summary of a finished interview, bounded by `timeout_secs`
pub async fn clinical_summary(
    model: &dyn ConversationalModel,
    assessment: &SymptomAssessment,
    timeout_secs: u64,
) -> Result<String, CollaboratorError> {
    let messages = summary_messages(assessment);
    let raw = with_timeout(
        "Summary generation",
        timeout_secs,
        model.chat(&messages, SUMMARY_TEMPERATURE),
    )
    .await?;
    Ok(strip_risk_markers(&raw))
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Client for an Ollama-style `POST {base}/api/chat` endpoint
pub struct HttpChatClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpChatClient {
    /// `request_timeout` caps the HTTP call; callers apply tighter per-use limits
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl ConversationalModel for HttpChatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions { temperature },
        };

        let response = self.http_client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Api(status.as_u16(), error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        Ok(body.message.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::{Language, SymptomGraph};
    use triage_common::Demographics;

    struct SlowModel;

    #[async_trait]
    impl ConversationalModel for SlowModel {
        async fn chat(&self, _: &[ChatMessage], _: f32) -> Result<String, CollaboratorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    struct EchoModel;

    #[async_trait]
    impl ConversationalModel for EchoModel {
        async fn chat(&self, messages: &[ChatMessage], _: f32) -> Result<String, CollaboratorError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("You said: {} [Risk: Moderate]", last.lines().next().unwrap_or("")))
        }
    }

    fn state() -> ConversationState {
        ConversationState::new(
            Demographics {
                name: None,
                age: Some(52),
                gender: Some("M".to_string()),
            },
            Language::En,
        )
    }

    #[test]
    fn test_risk_marker_parsed_and_stripped() {
        let reply = extract_risk_hint("How long have you had the fever? [Risk: Moderate]");
        assert_eq!(reply.reply, "How long have you had the fever?");
        assert_eq!(reply.risk_hint, Some(RiskLevel::Moderate));

        let reply = extract_risk_hint("Noted. [risk: unknown]");
        assert_eq!(reply.reply, "Noted.");
        assert_eq!(reply.risk_hint, None);
    }

    #[test]
    fn test_emergency_wording_implies_high() {
        let reply = extract_risk_hint("Please go to the nearest hospital now.");
        assert_eq!(reply.risk_hint, Some(RiskLevel::High));
        assert_eq!(reply.reply, "Please go to the nearest hospital now.");

        assert_eq!(extract_risk_hint("Thank you.").risk_hint, None);
    }

    #[test]
    fn test_turn_prompt_lists_covered_topics() {
        let graph = SymptomGraph::standard();
        let state = state()
            .transition(&graph, 0)
            .unwrap()
            .transition(&graph, 0)
            .unwrap();
        let messages = turn_messages(&state, "my chest feels tight");

        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("52-year-old M"));
        assert!(messages[0].content.contains("Do not ask again about: cough and sputum."));
        assert!(messages.last().unwrap().content.starts_with("my chest feels tight"));
        // Two question/answer pairs sit between the system prompt and the new turn
        assert_eq!(messages.len(), 6);
    }

    #[tokio::test]
    async fn test_turn_times_out() {
        let err = converse_turn(&SlowModel, &state(), "hello", 1).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Timeout("Conversational turn", 1)));
    }

    #[tokio::test]
    async fn test_turn_extracts_hint() {
        let reply = converse_turn(&EchoModel, &state(), "cough", 5).await.unwrap();
        assert_eq!(reply.reply, "You said: cough");
        assert_eq!(reply.risk_hint, Some(RiskLevel::Moderate));
    }
}

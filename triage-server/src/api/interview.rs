//! Interview API handlers
//!
//! Stateless: the client sends its `ConversationState` with every call and
//! receives the next one. A turn that cannot be placed returns the state
//! unchanged with a re-prompt.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use triage_common::{Demographics, RiskLevel};

use crate::error::{ApiError, ApiResult, InterviewError};
use crate::interview::{
    match_response, ConversationState, GraphSummary, Language, MatchStrategy, NodePrompt,
    SymptomGraph,
};
use crate::scoring::assessment::clamp_score;
use crate::scoring::SymptomAssessment;
use crate::services::{clinical_summary, converse_turn, summary};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub demographics: Demographics,
    #[serde(default)]
    pub language: Language,
}

/// State after a call, with the question to show next
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewStep {
    pub state: ConversationState,
    /// `None` once the interview is complete
    pub prompt: Option<NodePrompt>,
    pub complete: bool,
}

impl InterviewStep {
    fn new(graph: &SymptomGraph, state: ConversationState) -> Result<Self, InterviewError> {
        let node = graph.node(&state.current_node)?;
        let complete = node.is_terminal();
        let prompt = (!complete).then(|| NodePrompt::new(node, state.language));
        Ok(Self {
            state,
            prompt,
            complete,
        })
    }
}

/// One answer: exactly one of `optionIndex`, `days` or `text`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub state: ConversationState,
    #[serde(default)]
    pub option_index: Option<usize>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    /// False when free text matched no option; `state` is then unchanged
    pub matched: bool,
    #[serde(flatten)]
    pub step: InterviewStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MatchStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Re-prompt or conversational reply for an unmatched answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_hint: Option<RiskLevel>,
    /// The conversational hint is more urgent than the running score
    pub risk_hint_escalates: bool,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub state: ConversationState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Model,
    Local,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub assessment: SymptomAssessment,
    pub summary: String,
    pub summary_source: SummarySource,
}

/// GET /api/interview/graph
pub async fn graph_summary(State(state): State<AppState>) -> ApiResult<Json<GraphSummary>> {
    Ok(Json(state.graph.validate()?))
}

/// POST /api/interview/start
pub async fn start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<InterviewStep>> {
    request.demographics.validate()?;

    let conversation = ConversationState::new(request.demographics, request.language);
    tracing::debug!(language = ?request.language, "Interview started");

    Ok(Json(InterviewStep::new(&state.graph, conversation)?))
}

/// POST /api/interview/turn
pub async fn interview_turn(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> ApiResult<Json<TurnResponse>> {
    let graph = state.graph.as_ref();
    request.state.verify(graph)?;

    let node = graph.node(&request.state.current_node)?;
    if node.is_terminal() {
        return Err(InterviewError::Terminal(node.id.to_string()).into());
    }

    let given = [
        request.option_index.is_some(),
        request.days.is_some(),
        request.text.is_some(),
    ]
    .iter()
    .filter(|given| **given)
    .count();
    if given != 1 {
        return Err(ApiError::BadRequest(
            "Provide exactly one of optionIndex, days or text".to_string(),
        ));
    }

    let mut strategy = None;
    let mut days = request.days;

    let next = if let Some(index) = request.option_index {
        request.state.transition(graph, index)?
    } else if let Some(count) = request.days {
        request.state.transition_days(graph, count)?
    } else {
        let text = request.text.as_deref().unwrap_or_default();
        match match_response(text, node) {
            Some(outcome) => {
                tracing::debug!(node = %node.id, strategy = ?outcome.strategy, index = outcome.option_index, "Free-text answer matched");
                strategy = Some(outcome.strategy);
                days = outcome.days;
                request.state.transition(graph, outcome.option_index)?
            }
            None => return unmatched_turn(&state, request.state, text).await,
        }
    };

    Ok(Json(TurnResponse {
        matched: true,
        step: InterviewStep::new(graph, next)?,
        strategy,
        days,
        reply: None,
        risk_hint: None,
        risk_hint_escalates: false,
    }))
}

/// Unmatched free text: re-prompt without advancing
async fn unmatched_turn(
    state: &AppState,
    conversation: ConversationState,
    text: &str,
) -> ApiResult<Json<TurnResponse>> {
    let node = state.graph.node(&conversation.current_node)?;
    tracing::debug!(node = %node.id, "Free-text answer not matched, re-prompting");

    let fallback = || summary::reprompt_message(node.text.get(conversation.language));
    let (reply, risk_hint) = match &state.converse {
        Some(model) => {
            match converse_turn(model.as_ref(), &conversation, text, state.timeouts.turn_secs).await
            {
                Ok(reply) => (reply.reply, reply.risk_hint),
                Err(e) => {
                    tracing::warn!(error = %e, "Conversational model unavailable, using local re-prompt");
                    state.set_last_error(e.to_string()).await;
                    (fallback(), None)
                }
            }
        }
        None => (fallback(), None),
    };

    let (scored, _) = crate::fusion::band(clamp_score(conversation.score));
    let risk_hint_escalates = summary::hint_escalates(risk_hint, scored);

    Ok(Json(TurnResponse {
        matched: false,
        step: InterviewStep::new(&state.graph, conversation)?,
        strategy: None,
        days: None,
        reply: Some(reply),
        risk_hint,
        risk_hint_escalates,
    }))
}

/// POST /api/interview/summary
///
/// Finalizes the interview as it stands, complete or not.
pub async fn interview_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> ApiResult<Json<SummaryResponse>> {
    let assessment = SymptomAssessment::from_conversation(&state.graph, &request.state)?;

    let model_summary = match &state.converse {
        Some(model) => {
            match clinical_summary(model.as_ref(), &assessment, state.timeouts.summary_secs).await {
                Ok(text) if !text.is_empty() => Some(text),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Summary generation failed, using local summary");
                    state.set_last_error(e.to_string()).await;
                    None
                }
            }
        }
        None => None,
    };

    let (summary, summary_source) = match model_summary {
        Some(text) => (text, SummarySource::Model),
        None => (summary::interview_summary(&assessment), SummarySource::Local),
    };

    tracing::info!(
        score = assessment.score,
        completed = assessment.completed,
        source = ?summary_source,
        "Interview summarized"
    );

    Ok(Json(SummaryResponse {
        assessment,
        summary,
        summary_source,
    }))
}

pub fn interview_routes() -> Router<AppState> {
    Router::new()
        .route("/api/interview/graph", get(graph_summary))
        .route("/api/interview/start", post(start_interview))
        .route("/api/interview/turn", post(interview_turn))
        .route("/api/interview/summary", post(interview_summary))
}

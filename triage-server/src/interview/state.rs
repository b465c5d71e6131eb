//! Caller-owned conversation state
//!
//! The server keeps no sessions. Each turn the client sends its
//! `ConversationState`, the engine returns a new one, and the original is
//! left untouched; a failed or unmatched turn therefore cannot corrupt it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_common::Demographics;

use super::graph::{Language, SymptomGraph, ROOT_NODE};
use crate::error::InterviewError;
use crate::models::TagSet;
use crate::scoring::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One line of the interview transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Node the entry belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Set on user answers produced by a transition; replayed by [`ConversationState::verify`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub current_node: String,
    /// Running total, unclamped until the assessment is finalized
    pub score: i32,
    pub tags: TagSet,
    pub log: Vec<LogEntry>,
    /// Node ids answered so far, in order
    #[serde(default)]
    pub visited: Vec<String>,
    pub demographics: Demographics,
    #[serde(default)]
    pub language: Language,
}

impl ConversationState {
    pub fn new(demographics: Demographics, language: Language) -> Self {
        Self {
            current_node: ROOT_NODE.to_string(),
            score: 0,
            tags: TagSet::new(),
            log: Vec::new(),
            visited: Vec::new(),
            demographics,
            language,
        }
    }

    pub fn is_complete(&self, graph: &SymptomGraph) -> Result<bool, InterviewError> {
        Ok(graph.node(&self.current_node)?.is_terminal())
    }

    /// Apply one answer and return the next state
    pub fn transition(
        &self,
        graph: &SymptomGraph,
        option_index: usize,
    ) -> Result<Self, InterviewError> {
        let node = graph.node(&self.current_node)?;
        let step = graph.step(node.id, option_index)?;
        let now = Utc::now();

        let mut next = self.clone();
        next.score = next.score.saturating_add(step.score_delta);
        next.tags.extend(step.tags);
        next.log.push(LogEntry {
            role: Role::Assistant,
            text: node.text.get(self.language).to_string(),
            timestamp: now,
            node_id: Some(node.id.to_string()),
            option_index: None,
        });
        next.log.push(LogEntry {
            role: Role::User,
            text: node.options[option_index].label.get(self.language).to_string(),
            timestamp: now,
            node_id: Some(node.id.to_string()),
            option_index: Some(option_index),
        });
        next.visited.push(node.id.to_string());
        next.current_node = step.next.to_string();

        Ok(next)
    }

    /// Answer a duration node with a day count
    pub fn transition_days(&self, graph: &SymptomGraph, days: u32) -> Result<Self, InterviewError> {
        let index = graph.node(&self.current_node)?.resolve_duration(days)?;
        self.transition(graph, index)
    }

    /// Indices of the options chosen so far, with their node ids
    pub fn answers(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.log.iter().filter_map(|entry| match (entry.role, &entry.node_id, entry.option_index) {
            (Role::User, Some(node), Some(index)) => Some((node.as_str(), index)),
            _ => None,
        })
    }

    /// Checklist signals asserted by the answers so far
    pub fn signals(&self, graph: &SymptomGraph) -> Result<Vec<Signal>, InterviewError> {
        let mut signals = Vec::new();
        for (node_id, index) in self.answers() {
            let node = graph.node(node_id)?;
            let option = node.options.get(index).ok_or_else(|| {
                InterviewError::InvalidTransition {
                    node: node_id.to_string(),
                    index,
                    count: node.options.len(),
                }
            })?;
            signals.extend(option.signals.iter().copied());
        }
        Ok(signals)
    }

    /// Replay the answer log from the root and confirm it reproduces this state
    ///
    /// Client-held state is untrusted; a tampered score, tag set or position
    /// is rejected rather than scored.
    pub fn verify(&self, graph: &SymptomGraph) -> Result<(), InterviewError> {
        let mut current = ROOT_NODE;
        let mut score: i32 = 0;
        let mut tags = TagSet::new();

        for (node_id, index) in self.answers() {
            if node_id != current {
                return Err(InterviewError::InconsistentState(format!(
                    "answer recorded at '{}' while interview was at '{}'",
                    node_id, current
                )));
            }
            let step = graph.step(node_id, index)?;
            score = score.saturating_add(step.score_delta);
            tags.extend(step.tags);
            current = step.next;
        }

        if current != self.current_node {
            return Err(InterviewError::InconsistentState(format!(
                "log ends at '{}' but state is at '{}'",
                current, self.current_node
            )));
        }
        if score != self.score {
            return Err(InterviewError::InconsistentState(format!(
                "log scores {} but state reports {}",
                score, self.score
            )));
        }
        if tags != self.tags {
            return Err(InterviewError::InconsistentState(
                "tag set does not match answers".to_string(),
            ));
        }
        Ok(())
    }

    /// Topics already covered, so a conversational model does not re-ask them
    pub fn covered_topics(&self) -> Vec<&'static str> {
        let mut topics: Vec<&'static str> = Vec::new();
        for node in &self.visited {
            let topic = match node.as_str() {
                "cough_duration" | "hemoptysis_check" | "sputum_check" | "sputum_color" => {
                    "cough and sputum"
                }
                "fever_check" | "fever_severity" | "fever_duration" => "fever",
                "breath_context" | "breath_wheeze" | "cyanosis_check" => "breathing",
                "pain_nature" => "chest pain",
                "night_sweats_check" | "appetite_check" | "weight_loss_check" => {
                    "night sweats, appetite and weight"
                }
                "history_check" | "occupation_check" => "smoking, TB history and occupation",
                _ => continue,
            };
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::graph::TERMINAL_NODE;
    use crate::models::ClinicalTag;

    fn patient() -> Demographics {
        Demographics {
            name: Some("Asha".to_string()),
            age: Some(42),
            gender: Some("F".to_string()),
        }
    }

    #[test]
    fn test_transition_leaves_input_untouched() {
        let graph = SymptomGraph::standard();
        let start = ConversationState::new(patient(), Language::En);
        let before = start.clone();

        let next = start.transition(&graph, 0).unwrap();

        assert_eq!(start, before);
        assert_eq!(next.current_node, "cough_duration");
        assert_eq!(next.score, 5);
        assert_eq!(next.log.len(), 2);
        assert_eq!(next.log[0].role, Role::Assistant);
        assert_eq!(next.log[1].text, "Cough");
        assert_eq!(next.visited, vec!["root".to_string()]);
    }

    #[test]
    fn test_invalid_index_is_rejected() {
        let graph = SymptomGraph::standard();
        let start = ConversationState::new(patient(), Language::En);
        assert!(matches!(
            start.transition(&graph, 42),
            Err(InterviewError::InvalidTransition { index: 42, .. })
        ));
    }

    #[test]
    fn test_terminal_accepts_no_transition() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(patient(), Language::En)
            .transition(&graph, 2) // breathing
            .and_then(|s| s.transition(&graph, 2)) // at rest
            .and_then(|s| s.transition(&graph, 0)) // cyanosis yes
            .unwrap();

        assert_eq!(state.current_node, TERMINAL_NODE);
        assert!(state.is_complete(&graph).unwrap());
        assert!(state.tags.contains(&ClinicalTag::Emergency));
        assert_eq!(state.score, 10 + 30 + 100);
        assert!(matches!(
            state.transition(&graph, 0),
            Err(InterviewError::Terminal(_))
        ));
    }

    #[test]
    fn test_transition_days_uses_conditions() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(patient(), Language::En)
            .transition(&graph, 0)
            .unwrap();
        let chronic = state.transition_days(&graph, 21).unwrap();
        assert_eq!(chronic.current_node, "hemoptysis_check");
        assert!(chronic.tags.contains(&ClinicalTag::TbFlag));

        // Only duration nodes take days
        assert!(chronic.transition_days(&graph, 3).is_err());
    }

    #[test]
    fn test_verify_accepts_honest_state() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(patient(), Language::Hi)
            .transition(&graph, 1)
            .and_then(|s| s.transition_days(&graph, 9))
            .unwrap();
        assert!(state.verify(&graph).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(patient(), Language::En)
            .transition(&graph, 0)
            .unwrap();

        let mut inflated = state.clone();
        inflated.score = 95;
        assert!(matches!(
            inflated.verify(&graph),
            Err(InterviewError::InconsistentState(_))
        ));

        let mut stripped = state.clone();
        stripped.tags.insert(ClinicalTag::Critical);
        assert!(stripped.verify(&graph).is_err());

        let mut jumped = state;
        jumped.current_node = "end".to_string();
        assert!(jumped.verify(&graph).is_err());
    }

    #[test]
    fn test_signals_follow_answers() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(patient(), Language::En)
            .transition(&graph, 0)
            .and_then(|s| s.transition_days(&graph, 30))
            .and_then(|s| s.transition(&graph, 0)) // blood
            .unwrap();
        let signals = state.signals(&graph).unwrap();
        assert!(signals.contains(&Signal::CoughChronic));
        assert!(signals.contains(&Signal::BloodInSputum));
    }

    #[test]
    fn test_covered_topics_deduplicate() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(patient(), Language::En)
            .transition(&graph, 0)
            .and_then(|s| s.transition_days(&graph, 3))
            .and_then(|s| s.transition(&graph, 1)) // productive
            .unwrap();
        assert_eq!(state.covered_topics(), vec!["cough and sputum"]);
    }

    #[test]
    fn test_state_survives_json_round_trip() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(patient(), Language::En)
            .transition(&graph, 0)
            .unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert!(back.verify(&graph).is_ok());
    }
}

//! Finalized symptom assessment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_common::Demographics;

use super::checklist::SymptomChecklist;
use super::scorer::{score, SeverityBreakdown};
use crate::error::InterviewError;
use crate::interview::{ConversationState, LogEntry, SymptomGraph};
use crate::models::TagSet;

/// Immutable result of an interview or checklist, created once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAssessment {
    /// Score handed to fusion, 0-100
    pub score: u8,
    /// Graph running score clamped to 0-100 (interview path only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_score: Option<u8>,
    pub severity: SeverityBreakdown,
    pub tags: TagSet,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    pub demographics: Demographics,
    /// False when summarized before reaching the terminal node
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

pub fn clamp_score(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

impl SymptomAssessment {
    /// Finalize an interview, complete or not
    ///
    /// The state is replayed first; the fusion input is the larger of the
    /// clamped graph score and the rule-table score for the same answers.
    pub fn from_conversation(
        graph: &SymptomGraph,
        state: &ConversationState,
    ) -> Result<Self, InterviewError> {
        state.verify(graph)?;
        let checklist = SymptomChecklist::from_signals(&state.signals(graph)?);
        let severity = score(&checklist);
        let graph_score = clamp_score(state.score);

        Ok(Self {
            score: graph_score.max(severity.score),
            graph_score: Some(graph_score),
            severity,
            tags: state.tags.clone(),
            log: state.log.clone(),
            demographics: state.demographics.clone(),
            completed: state.is_complete(graph)?,
            created_at: Utc::now(),
        })
    }

    /// Assessment from the structured checklist path
    pub fn from_checklist(checklist: &SymptomChecklist, demographics: Demographics) -> Self {
        let severity = score(checklist);
        Self {
            score: severity.score,
            graph_score: None,
            severity,
            tags: checklist.tags(),
            log: Vec::new(),
            demographics,
            completed: true,
            created_at: Utc::now(),
        }
    }

    /// Score as a fraction for the fusion engine
    pub fn unit_score(&self) -> f64 {
        f64::from(self.score.min(100)) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::Language;
    use crate::scoring::{CoughDuration, FeverDuration};
    use triage_common::RiskLevel;

    fn patient() -> Demographics {
        Demographics {
            name: None,
            age: Some(30),
            gender: Some("M".to_string()),
        }
    }

    /// Walk the graph by English option label, using day counts on duration nodes
    fn walk(graph: &SymptomGraph, answers: &[&str]) -> ConversationState {
        let mut state = ConversationState::new(patient(), Language::En);
        for answer in answers {
            state = match answer.parse::<u32>() {
                Ok(days) => state.transition_days(graph, days).unwrap(),
                Err(_) => {
                    let node = graph.node(&state.current_node).unwrap();
                    let index = node
                        .options
                        .iter()
                        .position(|o| o.label.en == *answer)
                        .unwrap_or_else(|| panic!("no option '{}' at {}", answer, node.id));
                    state.transition(graph, index).unwrap()
                }
            };
        }
        state
    }

    #[test]
    fn test_checklist_and_graph_paths_agree() {
        let graph = SymptomGraph::standard();

        let cases: Vec<(Vec<&str>, SymptomChecklist)> = vec![
            (
                vec!["Cough", "21", "Yes", "Yes", "No", "No", "None", "No"],
                SymptomChecklist {
                    cough_duration: CoughDuration::Over14Days,
                    blood_in_sputum: true,
                    night_sweats: true,
                    ..Default::default()
                },
            ),
            (
                vec!["Fever", "9", "No", "No", "Yes (Clothes fit loose)", "None", "No"],
                SymptomChecklist {
                    fever_duration: FeverDuration::Over5Days,
                    weight_loss: true,
                    ..Default::default()
                },
            ),
            (
                vec!["Cough", "4", "Dry / Hacking", "No", "None", "No"],
                SymptomChecklist {
                    cough_duration: CoughDuration::UpTo14Days,
                    ..Default::default()
                },
            ),
            (
                vec!["Routine Checkup / Other", "None", "No"],
                SymptomChecklist::default(),
            ),
        ];

        for (answers, checklist) in cases {
            let state = walk(&graph, &answers);
            assert!(state.is_complete(&graph).unwrap(), "{:?} did not finish", answers);

            let from_graph = SymptomAssessment::from_conversation(&graph, &state).unwrap();
            let from_checklist = SymptomAssessment::from_checklist(&checklist, patient());

            assert_eq!(from_graph.severity.score, from_checklist.severity.score, "{:?}", answers);
            assert_eq!(
                from_graph.severity.risk_level, from_checklist.severity.risk_level,
                "{:?}",
                answers
            );
        }
    }

    #[test]
    fn test_fusion_input_is_max_of_graph_and_scorer() {
        let graph = SymptomGraph::standard();
        // Graph: 10 + 30 + 100 = 140 -> 100; scorer: dyspnea floor 75
        let state = walk(&graph, &["Difficulty Breathing", "At rest / While sitting", "Yes"]);
        let assessment = SymptomAssessment::from_conversation(&graph, &state).unwrap();
        assert_eq!(assessment.graph_score, Some(100));
        assert_eq!(assessment.severity.score, 75);
        assert_eq!(assessment.score, 100);
        assert!(assessment.completed);
    }

    #[test]
    fn test_partial_interview_is_marked_incomplete() {
        let graph = SymptomGraph::standard();
        let state = walk(&graph, &["Cough"]);
        let assessment = SymptomAssessment::from_conversation(&graph, &state).unwrap();
        assert!(!assessment.completed);
        assert_eq!(assessment.severity.risk_level, RiskLevel::Low);
        assert_eq!(assessment.log.len(), 2);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-20), 0);
        assert_eq!(clamp_score(140), 100);
        assert_eq!(clamp_score(42), 42);
    }
}

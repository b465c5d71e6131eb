//! Symptom interview: decision graph, free-text matching, conversation state

pub mod duration;
pub mod graph;
pub mod matcher;
pub mod state;

pub use duration::parse_days;
pub use graph::{
    GraphSummary, Language, NodeKind, NodePrompt, SymptomGraph, SymptomNode, SymptomOption,
    ROOT_NODE, TERMINAL_NODE,
};
pub use matcher::{match_response, normalize_input, MatchOutcome, MatchStrategy};
pub use state::{ConversationState, LogEntry, Role};

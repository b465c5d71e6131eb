//! Free-text response matcher
//!
//! Maps typed or voice-transcribed answers onto one option of the current
//! node. Strategies run in order and the first hit wins:
//!
//! 1. escape hatch: skip / unsure / no, in English and Hindi
//! 2. duration extraction on duration-typed nodes
//! 3. keyword and synonym matching on word boundaries
//!
//! `None` means the caller must re-prompt. Nothing here touches state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::duration::{apply_comparative, parse_days};
use super::graph::{SymptomNode, SymptomOption};

/// Tokens meaning "skip", "unsure" or "no"
const ESCAPE_TOKENS: &[&str] = &[
    "next",
    "skip",
    "idk",
    "dont know",
    "don't know",
    "not sure",
    "pass",
    "no",
    "nothing",
    "nahi",
    "nahin",
    "unsure",
    "na",
    "pata nahi",
    "नहीं",
    "पता नहीं",
    "छोड़ें",
];

static ESCAPE_HATCH: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = ESCAPE_TOKENS.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).expect("escape pattern compiles")
});

/// Word-boundary patterns for option terms, compiled on first use
static TERM_PATTERNS: Lazy<RwLock<HashMap<String, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Voice-dictation corrections applied before matching
static CORRECTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\btv\b", "tb"),
        (r"\bcop d\b", "copd"),
        (r"\bblood in spit\b", "hemoptysis"),
        (r"\bmore then\b", "more than"),
        (r"\bless then\b", "less than"),
        (r"\s+", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("correction pattern compiles"),
            replacement,
        )
    })
    .collect()
});

/// Which strategy produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    EscapeHatch,
    Duration,
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub option_index: usize,
    pub strategy: MatchStrategy,
    /// Day count read from the text, when the duration strategy fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

/// Lowercase, trim, and fix common dictation errors
pub fn normalize_input(raw: &str) -> String {
    let mut text = raw.trim().to_lowercase();
    for (pattern, replacement) in CORRECTIONS.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text.trim().to_string()
}

/// Match free text to one of `node`'s options
pub fn match_response(raw: &str, node: &SymptomNode) -> Option<MatchOutcome> {
    if node.is_terminal() {
        return None;
    }
    let text = normalize_input(raw);
    if text.is_empty() {
        return None;
    }

    escape_hatch(&text, node)
        .or_else(|| duration(&text, node))
        .or_else(|| keyword(&text, node))
}

/// True when `term` would trip the escape hatch
pub fn reads_as_escape(term: &str) -> bool {
    ESCAPE_HATCH.is_match(&normalize_input(term))
}

fn escape_hatch(text: &str, node: &SymptomNode) -> Option<MatchOutcome> {
    if !ESCAPE_HATCH.is_match(text) {
        return None;
    }
    let option_index = node.escape_target()?;
    Some(MatchOutcome {
        option_index,
        strategy: MatchStrategy::EscapeHatch,
        days: None,
    })
}

fn duration(text: &str, node: &SymptomNode) -> Option<MatchOutcome> {
    if !node.is_duration() {
        return None;
    }
    let days = apply_comparative(text, parse_days(text)?);
    let option_index = node.resolve_duration(days).ok()?;
    Some(MatchOutcome {
        option_index,
        strategy: MatchStrategy::Duration,
        days: Some(days),
    })
}

fn keyword(text: &str, node: &SymptomNode) -> Option<MatchOutcome> {
    node.options
        .iter()
        .position(|option| option_terms(option).any(|term| contains_term(text, &term)))
        .map(|option_index| MatchOutcome {
            option_index,
            strategy: MatchStrategy::Keyword,
            days: None,
        })
}

/// Label fragments, Hindi label, and the option's synonym list
fn option_terms(option: &SymptomOption) -> impl Iterator<Item = String> + '_ {
    let english = option.label.en.to_lowercase();
    let mut terms: Vec<String> = english
        .split(['/', '(', ')'])
        .map(str::trim)
        .filter(|part| part.chars().count() >= 2)
        .map(str::to_string)
        .collect();
    terms.push(english.trim().to_string());
    terms.push(option.label.hi.to_string());

    terms
        .into_iter()
        .chain(option.synonyms.iter().map(|s| s.to_string()))
}

/// Whole-word (or whole-phrase) containment
///
/// "yesterday" must not match "yes"; Devanagari marks count as word characters.
fn contains_term(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    if let Some(pattern) = TERM_PATTERNS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(term)
    {
        return pattern.is_match(text);
    }

    let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(term))) else {
        return false;
    };
    let found = pattern.is_match(text);
    TERM_PATTERNS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(term.to_string(), pattern);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::graph::SymptomGraph;

    fn node<'a>(graph: &'a SymptomGraph, id: &str) -> &'a SymptomNode {
        graph.node(id).unwrap()
    }

    fn matched(text: &str, graph: &SymptomGraph, id: &str) -> Option<(usize, MatchStrategy)> {
        match_response(text, node(graph, id)).map(|m| (m.option_index, m.strategy))
    }

    #[test]
    fn test_normalize_input() {
        assert_eq!(normalize_input("  Had TV before "), "had tb before");
        assert_eq!(normalize_input("COP D"), "copd");
        assert_eq!(normalize_input("Blood in spit"), "hemoptysis");
        assert_eq!(normalize_input("more then   two weeks"), "more than two weeks");
        // Only the standalone word is corrected
        assert_eq!(normalize_input("tvs"), "tvs");
    }

    #[test]
    fn test_escape_hatch_prefers_negative_option() {
        let graph = SymptomGraph::standard();
        assert_eq!(
            matched("skip", &graph, "sputum_check"),
            Some((2, MatchStrategy::EscapeHatch))
        );
        assert_eq!(
            matched("nahi", &graph, "hemoptysis_check"),
            Some((1, MatchStrategy::EscapeHatch))
        );
        assert_eq!(
            matched("पता नहीं", &graph, "sputum_color"),
            Some((4, MatchStrategy::EscapeHatch))
        );
    }

    #[test]
    fn test_escape_hatch_falls_back_to_last_option() {
        let graph = SymptomGraph::standard();
        // "Unsure / Recent" carries no negative wording; the safe exit is used
        assert_eq!(
            matched("idk", &graph, "cough_duration"),
            Some((2, MatchStrategy::EscapeHatch))
        );
    }

    #[test]
    fn test_duration_strategy() {
        let graph = SymptomGraph::standard();
        let outcome = match_response("about 3 weeks", node(&graph, "cough_duration")).unwrap();
        assert_eq!(outcome.option_index, 1);
        assert_eq!(outcome.strategy, MatchStrategy::Duration);
        assert_eq!(outcome.days, Some(21));

        assert_eq!(
            matched("since yesterday", &graph, "cough_duration"),
            Some((0, MatchStrategy::Duration))
        );
        assert_eq!(
            matched("more than 2 weeks", &graph, "cough_duration"),
            Some((1, MatchStrategy::Duration))
        );
        assert_eq!(
            matched("7 days", &graph, "fever_duration"),
            Some((1, MatchStrategy::Duration))
        );
    }

    #[test]
    fn test_duration_only_on_duration_nodes() {
        let graph = SymptomGraph::standard();
        assert_eq!(matched("3 weeks", &graph, "sputum_color"), None);
    }

    #[test]
    fn test_keyword_word_boundaries() {
        let graph = SymptomGraph::standard();
        assert_eq!(
            matched("yes it is blue", &graph, "cyanosis_check"),
            Some((0, MatchStrategy::Keyword))
        );
        // "yesterday" contains "yes" but is not the word
        assert_eq!(matched("yesterday", &graph, "fever_check"), None);
    }

    #[test]
    fn test_keyword_synonyms_and_transliteration() {
        let graph = SymptomGraph::standard();
        assert_eq!(
            matched("mujhe khansi hai", &graph, "root"),
            Some((0, MatchStrategy::Keyword))
        );
        assert_eq!(
            matched("greenish pus", &graph, "sputum_color"),
            Some((1, MatchStrategy::Keyword))
        );
        assert_eq!(
            matched("it is frothy", &graph, "sputum_color"),
            Some((3, MatchStrategy::Keyword))
        );
        assert_eq!(
            matched("हाँ", &graph, "night_sweats_check"),
            Some((0, MatchStrategy::Keyword))
        );
        assert_eq!(
            matched("I smoke bidi", &graph, "history_check"),
            Some((1, MatchStrategy::Keyword))
        );
    }

    #[test]
    fn test_positive_synonyms_are_not_escapes() {
        let graph = SymptomGraph::standard();
        assert_eq!(
            matched("poor appetite lately", &graph, "appetite_check"),
            Some((0, MatchStrategy::Keyword))
        );
        assert_eq!(
            matched("breathless even at rest", &graph, "breath_context"),
            Some((2, MatchStrategy::Keyword))
        );
        assert_eq!(
            matched("cough without phlegm", &graph, "sputum_check"),
            Some((0, MatchStrategy::Keyword))
        );
        assert!(reads_as_escape("No appetite"));
        assert!(!reads_as_escape("not hungry"));
    }

    #[test]
    fn test_term_patterns_are_reused() {
        assert!(contains_term("short of breath", "breath"));
        assert!(TERM_PATTERNS.read().unwrap().contains_key("breath"));
        // Cached pattern keeps word boundaries
        assert!(!contains_term("breathless", "breath"));
        assert!(!contains_term("anything", ""));
    }

    #[test]
    fn test_unmatched_text_returns_none() {
        let graph = SymptomGraph::standard();
        assert_eq!(matched("purple elephant", &graph, "sputum_color"), None);
        assert_eq!(matched("", &graph, "root"), None);
        assert_eq!(matched("   ", &graph, "root"), None);
    }

    #[test]
    fn test_terminal_node_never_matches() {
        let graph = SymptomGraph::standard();
        assert_eq!(matched("yes", &graph, "end"), None);
    }
}

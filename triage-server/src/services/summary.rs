//! Locally generated reports
//!
//! Used when the conversational model is unavailable, and attached to
//! every triage response. Plain text only.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use triage_common::{ImagingAssessment, ImagingClass, RiskLevel};

use crate::fusion::FusionResult;
use crate::interview::Role;
use crate::scoring::SymptomAssessment;

const RULE: &str = "-----------------------------------";

const DISCLAIMER: &str = "This screening result supports referral decisions only. \
     It is not a diagnosis and does not replace examination by a qualified clinician.";

fn percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

/// Full triage report for one screening
pub fn triage_report(
    assessment: &SymptomAssessment,
    imaging: Option<&ImagingAssessment>,
    fusion: &FusionResult,
    created_at: DateTime<Utc>,
) -> String {
    let demographics = &assessment.demographics;
    let mut report = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(report, "TRIAGE REPORT");
    let _ = writeln!(report, "{}", RULE);
    let _ = writeln!(report, "PATIENT PROFILE:");
    let _ = writeln!(report, "Name: {}", demographics.display_name());
    let _ = writeln!(
        report,
        "Age/Sex: {} / {}",
        demographics
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        demographics.gender.as_deref().unwrap_or("N/A")
    );
    let _ = writeln!(report, "Date: {}", created_at.format("%Y-%m-%d"));
    let _ = writeln!(report);

    let _ = writeln!(report, "CLINICAL SYMPTOM PROFILE");
    let _ = writeln!(report, "{}", RULE);
    if assessment.tags.is_empty() {
        let _ = writeln!(report, "- No specific red flags detected in interview.");
    } else {
        let _ = writeln!(report, "Detected clinical flags:");
        for tag in &assessment.tags {
            let _ = writeln!(report, "- {}", tag.label());
        }
    }
    for flag in &assessment.severity.red_flags {
        let _ = writeln!(report, "- Red flag: {}", flag);
    }
    let _ = writeln!(report);
    let _ = writeln!(report, "Symptom Severity Score: {}/100", assessment.score);
    let _ = writeln!(report);

    let _ = writeln!(report, "IMAGING ANALYSIS");
    let _ = writeln!(report, "{}", RULE);
    match imaging {
        Some(imaging) => {
            let label = imaging
                .label
                .clone()
                .unwrap_or_else(|| imaging.dominant_class().as_str().to_string());
            let _ = writeln!(report, "Imaging label: {}", label);
            let _ = writeln!(report, "Probability distribution:");
            let _ = writeln!(
                report,
                "- Tuberculosis (TB): {}",
                percent(imaging.probability(ImagingClass::Tb))
            );
            let _ = writeln!(
                report,
                "- Pneumonia: {}",
                percent(imaging.probability(ImagingClass::Pneumonia))
            );
            let _ = writeln!(
                report,
                "- Other abnormality: {}",
                percent(imaging.probability(ImagingClass::Abnormal))
            );
            let _ = writeln!(
                report,
                "- Normal: {}",
                percent(imaging.probability(ImagingClass::Normal))
            );
        }
        None => {
            let _ = writeln!(report, "[Imaging not performed / unavailable]");
            let _ = writeln!(report, "Analysis is based on clinical symptoms only.");
        }
    }
    let _ = writeln!(report);

    let _ = writeln!(report, "{}", RULE);
    let _ = writeln!(
        report,
        "FINAL TRIAGE ASSESSMENT: {} ({}/100, {})",
        fusion.risk_level.as_str().to_uppercase(),
        fusion.final_score,
        fusion.breakdown.mode.as_str()
    );
    if let Some(reason) = &fusion.override_reason {
        let _ = writeln!(report, "Safety override: {}", reason);
    }
    let _ = writeln!(report, "ACTION: {}", fusion.recommended_action);
    let _ = writeln!(report);
    let _ = write!(report, "{}", DISCLAIMER);

    report
}

/// Three-point interview summary used when the conversational model fails
pub fn interview_summary(assessment: &SymptomAssessment) -> String {
    let answers: Vec<(&str, &str)> = assessment
        .log
        .windows(2)
        .filter_map(|pair| match (pair[0].role, pair[1].role) {
            (Role::Assistant, Role::User) => Some((pair[0].text.as_str(), pair[1].text.as_str())),
            _ => None,
        })
        .collect();

    let chief = answers
        .first()
        .map(|(_, answer)| answer.to_string())
        .unwrap_or_else(|| "Not recorded".to_string());

    let associated = if answers.len() > 1 {
        answers[1..]
            .iter()
            .map(|(question, answer)| format!("{} {}", question, answer))
            .collect::<Vec<_>>()
            .join("; ")
    } else {
        "None recorded".to_string()
    };

    let (risk, _) = crate::fusion::band(assessment.score);
    let flags = if assessment.tags.is_empty() {
        "no clinical flags".to_string()
    } else {
        assessment
            .tags
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut summary = String::new();
    let _ = writeln!(summary, "1. Chief complaint: {}", chief);
    let _ = writeln!(summary, "2. Associated findings: {}", associated);
    let _ = write!(
        summary,
        "3. Provisional assessment: {} symptom risk (score {}/100); {}{}",
        risk,
        assessment.score,
        flags,
        if assessment.completed {
            ""
        } else {
            " (interview not completed)"
        }
    );
    summary
}

/// Message shown when the imaging classifier cannot be used
pub fn imaging_fallback_message() -> &'static str {
    "Imaging analysis is unavailable right now. Triage will continue on symptoms only; \
     a missing X-ray never lowers the risk level."
}

/// Re-prompt when a free-text answer could not be placed and no model replied
pub fn reprompt_message(question: &str) -> String {
    format!(
        "Sorry, I could not understand that answer. {} You can also reply \"skip\".",
        question
    )
}

/// True when a conversational risk hint is more urgent than the scored level
pub fn hint_escalates(hint: Option<RiskLevel>, scored: RiskLevel) -> bool {
    hint.is_some_and(|h| h > scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::fuse;
    use crate::interview::{ConversationState, Language, SymptomGraph};
    use crate::scoring::SymptomChecklist;
    use triage_common::Demographics;

    fn demographics() -> Demographics {
        Demographics {
            name: Some("Asha".to_string()),
            age: Some(34),
            gender: Some("F".to_string()),
        }
    }

    #[test]
    fn test_symptom_only_report() {
        let checklist = SymptomChecklist {
            blood_in_sputum: true,
            ..Default::default()
        };
        let assessment = SymptomAssessment::from_checklist(&checklist, demographics());
        let fusion = fuse(assessment.unit_score(), None, &assessment.tags, true);
        let report = triage_report(&assessment, None, &fusion, Utc::now());

        assert!(report.contains("Name: Asha"));
        assert!(report.contains("Age/Sex: 34 / F"));
        assert!(report.contains("Red flag: Hemoptysis"));
        assert!(report.contains("[Imaging not performed / unavailable]"));
        assert!(report.contains("FINAL TRIAGE ASSESSMENT: HIGH"));
        assert!(report.ends_with(DISCLAIMER));
    }

    #[test]
    fn test_report_with_imaging() {
        let assessment =
            SymptomAssessment::from_checklist(&SymptomChecklist::default(), Demographics::default());
        let imaging = ImagingAssessment {
            normal: 0.02,
            pneumonia: 0.01,
            tb: 0.97,
            ..Default::default()
        };
        let fusion = fuse(assessment.unit_score(), Some(&imaging), &assessment.tags, false);
        let report = triage_report(&assessment, Some(&imaging), &fusion, Utc::now());

        assert!(report.contains("Name: Anonymous"));
        assert!(report.contains("Imaging label: TB"));
        assert!(report.contains("- Tuberculosis (TB): 97.0%"));
        assert!(report.contains("Safety override: high-confidence imaging override"));
    }

    #[test]
    fn test_interview_summary_lists_answers() {
        let graph = SymptomGraph::standard();
        let state = ConversationState::new(demographics(), Language::En)
            .transition(&graph, 0)
            .unwrap();
        let assessment = SymptomAssessment::from_conversation(&graph, &state).unwrap();
        let summary = interview_summary(&assessment);

        assert!(summary.starts_with("1. Chief complaint: Cough"));
        assert!(summary.contains("2. Associated findings: None recorded"));
        assert!(summary.contains("(interview not completed)"));
    }

    #[test]
    fn test_hint_escalation() {
        assert!(hint_escalates(Some(RiskLevel::High), RiskLevel::Moderate));
        assert!(!hint_escalates(Some(RiskLevel::Low), RiskLevel::Moderate));
        assert!(!hint_escalates(None, RiskLevel::Low));
    }
}

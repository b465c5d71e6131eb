//! Fusion engine
//!
//! Merges the symptom score with the optional imaging probability vector,
//! applies the safety overrides, and bands the result. Every number that
//! leaves this module is clamped, whatever the inputs.

use serde::{Deserialize, Serialize};
use triage_common::{ImagingAssessment, RiskLevel};

use super::rules::{
    first_tag_rule, OverrideRule, IMAGING_CONFIDENCE_THRESHOLD, IMAGING_FLOOR,
};
use crate::models::TagSet;

pub const SYMPTOM_WEIGHT: f64 = 0.4;
pub const VISION_WEIGHT: f64 = 0.6;

pub const HIGH_THRESHOLD: u8 = 75;
pub const MODERATE_THRESHOLD: u8 = 40;

pub const ACTION_HIGH: &str = "Urgent referral: district hospital for specialist review";
pub const ACTION_MODERATE: &str =
    "Clinic visit within 48 hours: nearest health centre for sputum test";
pub const ACTION_LOW: &str =
    "Home observation: monitor symptoms and return if fever persists beyond 3 days";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FusionMode {
    #[serde(rename = "Symptom Only")]
    SymptomOnly,
    #[serde(rename = "Multi-Modal Fusion")]
    MultiModal,
}

impl FusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMode::SymptomOnly => "Symptom Only",
            FusionMode::MultiModal => "Multi-Modal Fusion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionBreakdown {
    pub mode: FusionMode,
    /// e.g. "20%"
    pub symptom_contribution: String,
    /// e.g. "97%", or "N/A" in symptom-only mode
    pub vision_contribution: String,
    pub dominant_factor: String,
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionResult {
    pub final_score: u8,
    pub risk_level: RiskLevel,
    pub recommended_action: String,
    /// Final score formatted with one decimal ("85.0%")
    pub confidence: String,
    pub breakdown: ContributionBreakdown,
    /// Set whenever a safety override fired
    pub override_reason: Option<String>,
    #[serde(default)]
    pub applied_rules: Vec<OverrideRule>,
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Fuse a 0-1 symptom score with optional imaging probabilities
///
/// Missing imaging always means symptom-only: an absent X-ray never drags
/// the risk down.
pub fn fuse(
    symptom_score: f64,
    vision: Option<&ImagingAssessment>,
    tags: &TagSet,
    is_symptom_only: bool,
) -> FusionResult {
    let symptom = unit(symptom_score);
    let vision = if is_symptom_only { None } else { vision };
    let anomaly = vision.map(ImagingAssessment::max_anomaly).map(unit);

    let mut fused = match anomaly {
        None => symptom,
        Some(anomaly) => SYMPTOM_WEIGHT * symptom + VISION_WEIGHT * anomaly,
    };
    let mut applied_rules = Vec::new();
    let mut override_reason: Option<&'static str> = None;

    if let Some(rule) = first_tag_rule(tags) {
        fused = rule.adjustment.apply(fused);
        applied_rules.push(rule.rule);
        override_reason = rule.rule.reason();
    }

    if let Some(anomaly) = anomaly {
        if anomaly > IMAGING_CONFIDENCE_THRESHOLD && fused < IMAGING_FLOOR {
            fused = IMAGING_FLOOR;
            applied_rules.push(OverrideRule::ImagingConfidence);
            override_reason = OverrideRule::ImagingConfidence.reason();
        }
    }

    let final_score = (unit(fused) * 100.0).round() as u8;
    let (risk_level, action) = band(final_score);
    let override_reason = override_reason.map(str::to_string);

    let dominant_factor = match anomaly {
        Some(anomaly) if anomaly >= symptom => "X-Ray Abnormalities",
        _ => "Clinical Symptoms",
    };

    FusionResult {
        final_score,
        risk_level,
        recommended_action: action.to_string(),
        confidence: format!("{:.1}%", f64::from(final_score)),
        breakdown: ContributionBreakdown {
            mode: if anomaly.is_some() {
                FusionMode::MultiModal
            } else {
                FusionMode::SymptomOnly
            },
            symptom_contribution: format!("{:.0}%", symptom * 100.0),
            vision_contribution: anomaly
                .map(|a| format!("{:.0}%", a * 100.0))
                .unwrap_or_else(|| "N/A".to_string()),
            dominant_factor: dominant_factor.to_string(),
            override_reason: override_reason.clone(),
        },
        override_reason,
        applied_rules,
    }
}

/// Final-score banding with its recommended action
pub fn band(final_score: u8) -> (RiskLevel, &'static str) {
    if final_score >= HIGH_THRESHOLD {
        (RiskLevel::High, ACTION_HIGH)
    } else if final_score >= MODERATE_THRESHOLD {
        (RiskLevel::Moderate, ACTION_MODERATE)
    } else {
        (RiskLevel::Low, ACTION_LOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClinicalTag;

    fn tags(list: &[ClinicalTag]) -> TagSet {
        list.iter().copied().collect()
    }

    fn tb_scan(tb: f64) -> ImagingAssessment {
        ImagingAssessment {
            tb,
            normal: 1.0 - tb,
            ..Default::default()
        }
    }

    #[test]
    fn test_symptom_only_passes_score_through() {
        let result = fuse(0.20, None, &TagSet::new(), true);
        assert_eq!(result.final_score, 20);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.breakdown.mode, FusionMode::SymptomOnly);
        assert_eq!(result.breakdown.vision_contribution, "N/A");
        assert!(result.override_reason.is_none());
        assert_eq!(result.recommended_action, ACTION_LOW);
    }

    #[test]
    fn test_symptom_only_ignores_supplied_imaging() {
        let scan = tb_scan(0.99);
        let result = fuse(0.20, Some(&scan), &TagSet::new(), true);
        assert_eq!(result.final_score, 20);
        assert!(result.applied_rules.is_empty());
    }

    #[test]
    fn test_confident_imaging_overrides_mild_symptoms() {
        let scan = tb_scan(0.97);
        let result = fuse(0.10, Some(&scan), &TagSet::new(), false);
        assert!(result.final_score >= 85);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(
            result.override_reason.as_deref(),
            Some("high-confidence imaging override")
        );
        assert_eq!(result.breakdown.vision_contribution, "97%");
        assert_eq!(result.breakdown.dominant_factor, "X-Ray Abnormalities");
        assert_eq!(result.breakdown.mode, FusionMode::MultiModal);
    }

    #[test]
    fn test_weighted_fusion() {
        let scan = ImagingAssessment {
            pneumonia: 0.5,
            ..Default::default()
        };
        // 0.4 * 0.5 + 0.6 * 0.5 = 0.5
        let result = fuse(0.5, Some(&scan), &TagSet::new(), false);
        assert_eq!(result.final_score, 50);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.confidence, "50.0%");
    }

    #[test]
    fn test_emergency_floor() {
        let result = fuse(0.1, None, &tags(&[ClinicalTag::Hypoxia]), true);
        assert_eq!(result.final_score, 95);
        assert_eq!(result.override_reason.as_deref(), Some("critical emergency"));
        assert_eq!(result.applied_rules, vec![OverrideRule::CriticalEmergency]);
    }

    #[test]
    fn test_critical_suppresses_tb_boost() {
        let result = fuse(
            0.1,
            None,
            &tags(&[ClinicalTag::Critical, ClinicalTag::TbFlag]),
            true,
        );
        assert_eq!(result.final_score, 80);
        assert_eq!(result.applied_rules, vec![OverrideRule::CriticalEscalation]);
        assert_eq!(
            result.override_reason.as_deref(),
            Some("critical symptom escalation")
        );
    }

    #[test]
    fn test_tb_boost_has_no_reason_and_can_stack_with_imaging() {
        let result = fuse(0.30, None, &tags(&[ClinicalTag::TbFlag]), true);
        assert_eq!(result.final_score, 40);
        assert!(result.override_reason.is_none());

        let scan = tb_scan(0.96);
        let result = fuse(0.0, Some(&scan), &tags(&[ClinicalTag::TbFlag]), false);
        assert_eq!(
            result.applied_rules,
            vec![OverrideRule::TbSensitivityBoost, OverrideRule::ImagingConfidence]
        );
        assert_eq!(result.final_score, 85);
    }

    #[test]
    fn test_final_score_always_in_range() {
        let vision_cases = [
            None,
            Some(tb_scan(0.0)),
            Some(tb_scan(1.0)),
            Some(ImagingAssessment {
                tb: f64::NAN,
                pneumonia: 7.5,
                abnormal: -3.0,
                ..Default::default()
            }),
        ];
        let tag_cases = [
            tags(&[]),
            tags(&[ClinicalTag::TbFlag]),
            tags(&[ClinicalTag::Critical]),
            tags(&[ClinicalTag::Emergency, ClinicalTag::TbHighRisk]),
        ];
        let symptom_cases = [-1.0, 0.0, 0.33, 0.745, 1.0, 4.0, f64::NAN, f64::INFINITY];

        for symptom in symptom_cases {
            for vision in &vision_cases {
                for tag_set in &tag_cases {
                    for symptom_only in [true, false] {
                        let result = fuse(symptom, vision.as_ref(), tag_set, symptom_only);
                        assert!(result.final_score <= 100);
                        if tag_set.contains(&ClinicalTag::Critical)
                            || tag_set.contains(&ClinicalTag::Emergency)
                        {
                            assert_eq!(result.risk_level, RiskLevel::High);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(band(74).0, RiskLevel::Moderate);
        assert_eq!(band(75).0, RiskLevel::High);
        assert_eq!(band(39).0, RiskLevel::Low);
        assert_eq!(band(40).0, RiskLevel::Moderate);
    }
}

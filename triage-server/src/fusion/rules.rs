//! Clinical safety override rules
//!
//! Tag rules are one ordered table: the first rule whose trigger set meets
//! the record's tags fires, and the rest are skipped. The imaging rule is
//! evaluated separately after the table.

use serde::{Deserialize, Serialize};

use crate::models::{ClinicalTag, TagSet};

/// Every rule that can alter the fused score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideRule {
    CriticalEmergency,
    CriticalEscalation,
    TbSensitivityBoost,
    ImagingConfidence,
}

impl OverrideRule {
    /// Audit text; `None` for rules that only nudge the score
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            OverrideRule::CriticalEmergency => Some("critical emergency"),
            OverrideRule::CriticalEscalation => Some("critical symptom escalation"),
            OverrideRule::TbSensitivityBoost => None,
            OverrideRule::ImagingConfidence => Some("high-confidence imaging override"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// Raise to at least this value
    Floor(f64),
    /// Add, capped at 1.0
    Boost(f64),
}

impl Adjustment {
    pub fn apply(&self, fused: f64) -> f64 {
        match *self {
            Adjustment::Floor(floor) => fused.max(floor),
            Adjustment::Boost(delta) => (fused + delta).min(1.0),
        }
    }
}

#[derive(Debug)]
pub struct TagRule {
    pub rule: OverrideRule,
    pub triggers: &'static [ClinicalTag],
    pub adjustment: Adjustment,
}

/// Tag rules in priority order; mutually exclusive
pub const TAG_RULES: &[TagRule] = &[
    TagRule {
        rule: OverrideRule::CriticalEmergency,
        triggers: &[ClinicalTag::Emergency, ClinicalTag::Hypoxia],
        adjustment: Adjustment::Floor(0.95),
    },
    TagRule {
        rule: OverrideRule::CriticalEscalation,
        triggers: &[ClinicalTag::Critical],
        adjustment: Adjustment::Floor(0.80),
    },
    TagRule {
        rule: OverrideRule::TbSensitivityBoost,
        triggers: &[ClinicalTag::TbFlag, ClinicalTag::TbHighRisk],
        adjustment: Adjustment::Boost(0.10),
    },
];

/// Imaging probability above which the imaging floor applies
pub const IMAGING_CONFIDENCE_THRESHOLD: f64 = 0.95;
pub const IMAGING_FLOOR: f64 = 0.85;

/// The single tag rule that fires for `tags`, if any
pub fn first_tag_rule(tags: &TagSet) -> Option<&'static TagRule> {
    TAG_RULES
        .iter()
        .find(|rule| rule.triggers.iter().any(|t| tags.contains(t)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[ClinicalTag]) -> TagSet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_priority_order() {
        let all = tags(&[ClinicalTag::TbFlag, ClinicalTag::Critical, ClinicalTag::Hypoxia]);
        assert_eq!(first_tag_rule(&all).unwrap().rule, OverrideRule::CriticalEmergency);

        let critical_and_tb = tags(&[ClinicalTag::TbFlag, ClinicalTag::Critical]);
        assert_eq!(
            first_tag_rule(&critical_and_tb).unwrap().rule,
            OverrideRule::CriticalEscalation
        );

        let tb = tags(&[ClinicalTag::TbHighRisk]);
        assert_eq!(first_tag_rule(&tb).unwrap().rule, OverrideRule::TbSensitivityBoost);

        assert!(first_tag_rule(&tags(&[ClinicalTag::Bacterial])).is_none());
    }

    #[test]
    fn test_adjustments() {
        assert_eq!(Adjustment::Floor(0.8).apply(0.3), 0.8);
        assert_eq!(Adjustment::Floor(0.8).apply(0.9), 0.9);
        assert!((Adjustment::Boost(0.1).apply(0.5) - 0.6).abs() < 1e-9);
        assert_eq!(Adjustment::Boost(0.1).apply(0.95), 1.0);
    }

    #[test]
    fn test_reasons() {
        assert_eq!(OverrideRule::CriticalEmergency.reason(), Some("critical emergency"));
        assert!(OverrideRule::TbSensitivityBoost.reason().is_none());
    }
}

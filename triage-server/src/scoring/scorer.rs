//! Symptom severity scorer
//!
//! Additive rule table over a [`SymptomChecklist`]. Weights are fixed and
//! order-independent; any red flag floors the score at 75 and forces High.

use serde::{Deserialize, Serialize};
use triage_common::RiskLevel;

use super::checklist::{CoughDuration, FeverDuration, SymptomChecklist};

/// Score every red flag is raised to
pub const RED_FLAG_FLOOR: u8 = 75;
pub const HIGH_THRESHOLD: u8 = 70;
pub const MODERATE_THRESHOLD: u8 = 35;

/// Signs needed for the compound bonus
const COMPOUND_MIN_SIGNS: usize = 3;
const COMPOUND_BONUS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    RedFlag,
    Moderate,
    /// Adds points only: not reported and not counted toward the compound bonus
    Minor,
}

struct Rule {
    name: &'static str,
    points: u32,
    category: Category,
    applies: fn(&SymptomChecklist) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        name: "Hemoptysis",
        points: 40,
        category: Category::RedFlag,
        applies: |c| c.blood_in_sputum,
    },
    Rule {
        name: "Dyspnea",
        points: 30,
        category: Category::RedFlag,
        applies: |c| c.difficulty_breathing,
    },
    Rule {
        name: "Severe Chest Pain",
        points: 25,
        category: Category::RedFlag,
        applies: |c| c.severe_chest_pain,
    },
    Rule {
        name: "Unexplained Weight Loss",
        points: 20,
        category: Category::RedFlag,
        applies: |c| c.weight_loss,
    },
    Rule {
        name: "Chronic Cough (>14 days)",
        points: 20,
        category: Category::Moderate,
        applies: |c| c.cough_duration == CoughDuration::Over14Days,
    },
    Rule {
        name: "Acute Cough (<=14 days)",
        points: 10,
        category: Category::Minor,
        applies: |c| c.cough_duration == CoughDuration::UpTo14Days,
    },
    Rule {
        name: "Persistent Fever (>5 days)",
        points: 20,
        category: Category::Moderate,
        applies: |c| c.fever_duration == FeverDuration::Over5Days,
    },
    Rule {
        name: "Acute Fever (<=5 days)",
        points: 10,
        category: Category::Minor,
        applies: |c| c.fever_duration == FeverDuration::UpTo5Days,
    },
    Rule {
        name: "Night Sweats",
        points: 15,
        category: Category::Moderate,
        applies: |c| c.night_sweats,
    },
];

/// Scorer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityBreakdown {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub red_flags: Vec<String>,
    pub moderate_signs: Vec<String>,
}

/// Score a checklist
pub fn score(checklist: &SymptomChecklist) -> SeverityBreakdown {
    let mut total: u32 = 0;
    let mut red_flags = Vec::new();
    let mut moderate_signs = Vec::new();

    for rule in RULES.iter().filter(|r| (r.applies)(checklist)) {
        total += rule.points;
        match rule.category {
            Category::RedFlag => red_flags.push(rule.name.to_string()),
            Category::Moderate => moderate_signs.push(rule.name.to_string()),
            Category::Minor => {}
        }
    }

    if red_flags.len() + moderate_signs.len() >= COMPOUND_MIN_SIGNS {
        total += COMPOUND_BONUS;
    }

    let mut score = total.min(100) as u8;
    let risk_level = if !red_flags.is_empty() {
        score = score.max(RED_FLAG_FLOOR);
        RiskLevel::High
    } else {
        band(score)
    };

    SeverityBreakdown {
        score,
        risk_level,
        red_flags,
        moderate_signs,
    }
}

/// Scorer banding (without the red-flag rule)
pub fn band(score: u8) -> RiskLevel {
    if score >= HIGH_THRESHOLD {
        RiskLevel::High
    } else if score >= MODERATE_THRESHOLD {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_checklist_is_low() {
        let result = score(&SymptomChecklist::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.red_flags.is_empty());
        assert!(result.moderate_signs.is_empty());
    }

    #[test]
    fn test_blood_alone_is_floored_high() {
        let result = score(&SymptomChecklist {
            blood_in_sputum: true,
            ..Default::default()
        });
        assert_eq!(result.score, 75);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.red_flags, vec!["Hemoptysis".to_string()]);
    }

    #[test]
    fn test_moderate_band() {
        // 20 + 15 = 35, two signs, no bonus
        let result = score(&SymptomChecklist {
            cough_duration: CoughDuration::Over14Days,
            night_sweats: true,
            ..Default::default()
        });
        assert_eq!(result.score, 35);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(
            result.moderate_signs,
            vec!["Chronic Cough (>14 days)".to_string(), "Night Sweats".to_string()]
        );
    }

    #[test]
    fn test_compound_bonus() {
        // 40 + 20 + 15 = 75, three signs: +10
        let result = score(&SymptomChecklist {
            blood_in_sputum: true,
            cough_duration: CoughDuration::Over14Days,
            night_sweats: true,
            ..Default::default()
        });
        assert_eq!(result.score, 85);
        assert_eq!(result.red_flags.len() + result.moderate_signs.len(), 3);
    }

    #[test]
    fn test_acute_signs_score_without_counting() {
        // 10 + 10 + 15 = 35; only night sweats is a counted sign, so no bonus
        let result = score(&SymptomChecklist {
            cough_duration: CoughDuration::UpTo14Days,
            fever_duration: FeverDuration::UpTo5Days,
            night_sweats: true,
            ..Default::default()
        });
        assert_eq!(result.score, 35);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.moderate_signs, vec!["Night Sweats".to_string()]);
    }

    #[test]
    fn test_high_without_red_flags() {
        // 20 + 20 + 15 + 10 bonus = 65; still Moderate
        let result = score(&SymptomChecklist {
            cough_duration: CoughDuration::Over14Days,
            fever_duration: FeverDuration::Over5Days,
            night_sweats: true,
            ..Default::default()
        });
        assert_eq!(result.score, 65);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_score_is_capped() {
        let result = score(&SymptomChecklist {
            cough_duration: CoughDuration::Over14Days,
            fever_duration: FeverDuration::Over5Days,
            blood_in_sputum: true,
            difficulty_breathing: true,
            severe_chest_pain: true,
            weight_loss: true,
            night_sweats: true,
        });
        assert_eq!(result.score, 100);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.red_flags.len(), 4);
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(band(34), RiskLevel::Low);
        assert_eq!(band(35), RiskLevel::Moderate);
        assert_eq!(band(69), RiskLevel::Moderate);
        assert_eq!(band(70), RiskLevel::High);
    }
}

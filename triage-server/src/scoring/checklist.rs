//! Structured symptom checklist
//!
//! The checklist is the common currency of the severity scorer. It is
//! filled either directly (the boolean/duration form that bypasses the
//! interview) or from the signals collected along an interview path, so
//! both routes score identically for identical answers.

use serde::{Deserialize, Serialize};

use crate::models::{ClinicalTag, TagSet};

/// Cough longer than this many days counts as chronic
pub const CHRONIC_COUGH_DAYS: u32 = 14;

/// Fever longer than this many days counts as persistent
pub const PERSISTENT_FEVER_DAYS: u32 = 5;

/// Observable answer facts an interview option can assert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    BloodInSputum,
    DifficultyBreathing,
    SevereChestPain,
    WeightLoss,
    CoughAcute,
    CoughChronic,
    FeverAcute,
    FeverPersistent,
    NightSweats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoughDuration {
    #[default]
    None,
    #[serde(alias = "less_than_2_weeks")]
    UpTo14Days,
    #[serde(alias = "more_than_2_weeks")]
    Over14Days,
}

impl CoughDuration {
    pub fn from_days(days: u32) -> Self {
        match days {
            0 => CoughDuration::None,
            d if d <= CHRONIC_COUGH_DAYS => CoughDuration::UpTo14Days,
            _ => CoughDuration::Over14Days,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeverDuration {
    #[default]
    None,
    #[serde(alias = "less_than_5_days")]
    UpTo5Days,
    #[serde(alias = "more_than_5_days")]
    Over5Days,
}

impl FeverDuration {
    pub fn from_days(days: u32) -> Self {
        match days {
            0 => FeverDuration::None,
            d if d <= PERSISTENT_FEVER_DAYS => FeverDuration::UpTo5Days,
            _ => FeverDuration::Over5Days,
        }
    }
}

/// Flat checklist answers; absent fields mean "no"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomChecklist {
    #[serde(default)]
    pub cough_duration: CoughDuration,
    #[serde(default)]
    pub fever_duration: FeverDuration,
    #[serde(default, deserialize_with = "yes_no::deserialize")]
    pub blood_in_sputum: bool,
    #[serde(default, deserialize_with = "yes_no::deserialize")]
    pub difficulty_breathing: bool,
    #[serde(default, deserialize_with = "yes_no::deserialize")]
    pub severe_chest_pain: bool,
    #[serde(default, deserialize_with = "yes_no::deserialize")]
    pub weight_loss: bool,
    #[serde(default, deserialize_with = "yes_no::deserialize")]
    pub night_sweats: bool,
}

impl SymptomChecklist {
    /// Build from interview signals; the more severe duration wins
    pub fn from_signals<'a>(signals: impl IntoIterator<Item = &'a Signal>) -> Self {
        let mut checklist = Self::default();
        for signal in signals {
            match signal {
                Signal::BloodInSputum => checklist.blood_in_sputum = true,
                Signal::DifficultyBreathing => checklist.difficulty_breathing = true,
                Signal::SevereChestPain => checklist.severe_chest_pain = true,
                Signal::WeightLoss => checklist.weight_loss = true,
                Signal::NightSweats => checklist.night_sweats = true,
                Signal::CoughChronic => checklist.cough_duration = CoughDuration::Over14Days,
                Signal::CoughAcute => {
                    if checklist.cough_duration == CoughDuration::None {
                        checklist.cough_duration = CoughDuration::UpTo14Days;
                    }
                }
                Signal::FeverPersistent => checklist.fever_duration = FeverDuration::Over5Days,
                Signal::FeverAcute => {
                    if checklist.fever_duration == FeverDuration::None {
                        checklist.fever_duration = FeverDuration::UpTo5Days;
                    }
                }
            }
        }
        checklist
    }

    /// Clinical tags equivalent to these answers, matching what the
    /// interview would have attached for the same findings
    pub fn tags(&self) -> TagSet {
        let mut tags = TagSet::new();
        if self.blood_in_sputum {
            tags.insert(ClinicalTag::Critical);
            tags.insert(ClinicalTag::TbHighRisk);
        }
        if self.difficulty_breathing {
            tags.insert(ClinicalTag::Dyspnea);
        }
        if self.severe_chest_pain {
            tags.insert(ClinicalTag::CardiacRedFlag);
        }
        if self.weight_loss {
            tags.insert(ClinicalTag::ChronicWasting);
        }
        if self.night_sweats {
            tags.insert(ClinicalTag::TbFlag);
        }
        match self.cough_duration {
            CoughDuration::Over14Days => {
                tags.insert(ClinicalTag::Chronic);
                tags.insert(ClinicalTag::TbFlag);
            }
            CoughDuration::UpTo14Days => {
                tags.insert(ClinicalTag::Acute);
            }
            CoughDuration::None => {}
        }
        if self.fever_duration == FeverDuration::Over5Days {
            tags.insert(ClinicalTag::PersistentFever);
        }
        tags
    }
}

/// Accepts JSON booleans as well as the "yes"/"no" strings older clients send
mod yes_no {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(b),
            Raw::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" => Ok(true),
                "no" | "n" | "false" | "" => Ok(false),
                other => Err(serde::de::Error::custom(format!(
                    "expected yes/no, got '{}'",
                    other
                ))),
            },
        }
    }
}

//! Clinical tags attached to interview answers
//!
//! A closed set: every tag the interview can emit is a variant here, and
//! the override rules in `fusion::rules` match on variants rather than on
//! free strings. Serialized as SCREAMING_SNAKE_CASE (`TB_FLAG`,
//! `CARDIAC_RED_FLAG`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicalTag {
    // Breathing
    Dyspnea,
    ModerateDyspnea,
    SevereDyspnea,
    AirwayObstruction,
    Hypoxia,
    Emergency,
    Urgent,

    // Cough and sputum
    Acute,
    Chronic,
    Critical,
    Bacterial,
    PneumoniaRisk,
    EdemaRisk,

    // Fever
    AcuteInfection,
    TbPattern,
    PersistentFever,

    // Constitutional
    TbFlag,
    TbHighRisk,
    Anorexia,
    ChronicWasting,

    // Chest pain
    Pleuritic,
    CardiacRedFlag,

    // History and exposure
    RelapseRisk,
    CopdRisk,
    OccupationalHazard,
}

/// Ordered, de-duplicated tag collection
pub type TagSet = BTreeSet<ClinicalTag>;

impl ClinicalTag {
    /// Human-readable label for reports
    pub fn label(&self) -> &'static str {
        match self {
            ClinicalTag::Dyspnea => "Breathing difficulty",
            ClinicalTag::ModerateDyspnea => "Breathless on level walking",
            ClinicalTag::SevereDyspnea => "Breathless at rest",
            ClinicalTag::AirwayObstruction => "Wheeze (airway obstruction)",
            ClinicalTag::Hypoxia => "Hypoxia",
            ClinicalTag::Emergency => "Emergency sign",
            ClinicalTag::Urgent => "Urgent",
            ClinicalTag::Acute => "Acute cough",
            ClinicalTag::Chronic => "Chronic cough",
            ClinicalTag::Critical => "Critical red flag",
            ClinicalTag::Bacterial => "Purulent sputum",
            ClinicalTag::PneumoniaRisk => "Rusty sputum (pneumonia risk)",
            ClinicalTag::EdemaRisk => "Pink frothy sputum (edema risk)",
            ClinicalTag::AcuteInfection => "High-grade fever with chills",
            ClinicalTag::TbPattern => "Evening low-grade fever",
            ClinicalTag::PersistentFever => "Persistent fever",
            ClinicalTag::TbFlag => "TB risk factor",
            ClinicalTag::TbHighRisk => "High TB risk",
            ClinicalTag::Anorexia => "Loss of appetite",
            ClinicalTag::ChronicWasting => "Unintentional weight loss",
            ClinicalTag::Pleuritic => "Pleuritic chest pain",
            ClinicalTag::CardiacRedFlag => "Crushing chest pain",
            ClinicalTag::RelapseRisk => "Previous TB treatment",
            ClinicalTag::CopdRisk => "Current smoker",
            ClinicalTag::OccupationalHazard => "Dust exposure at work",
        }
    }

    /// Tags that must never coexist with a Low verdict
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            ClinicalTag::Critical | ClinicalTag::Emergency | ClinicalTag::Hypoxia
        )
    }
}

impl std::fmt::Display for ClinicalTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Same spelling as the wire format
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        f.write_str(&s)
    }
}

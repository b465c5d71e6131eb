//! Symptom severity scoring

pub mod assessment;
pub mod checklist;
pub mod scorer;

pub use assessment::SymptomAssessment;
pub use checklist::{CoughDuration, FeverDuration, Signal, SymptomChecklist};
pub use scorer::{score, SeverityBreakdown};

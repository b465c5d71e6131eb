//! Symptom and imaging risk fusion with clinical safety overrides

pub mod engine;
pub mod rules;

pub use engine::{band, fuse, ContributionBreakdown, FusionMode, FusionResult};
pub use rules::{OverrideRule, TAG_RULES};

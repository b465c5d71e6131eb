//! # Triage Common Library
//!
//! Shared code for the pre-screening triage services:
//! - Error type and result alias
//! - Configuration loading (CLI / environment / TOML / compiled defaults)
//! - SQLite initialization and schema
//! - Shared domain types (demographics, risk levels, imaging assessments)
//! - Time and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{Demographics, ImagingAssessment, ImagingClass, RiskLevel};

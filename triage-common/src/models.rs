//! Shared domain types
//!
//! Types that cross crate boundaries: patient demographics, the graded risk
//! level, and the imaging assessment supplied by the external classifier.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Patient demographics captured at the start of an interview
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    /// Display name ("Anonymous" when not supplied)
    #[serde(default)]
    pub name: Option<String>,
    /// Age in years
    #[serde(default)]
    pub age: Option<u32>,
    /// Free-text gender as reported
    #[serde(default)]
    pub gender: Option<String>,
}

impl Demographics {
    /// Reject demographics missing the fields triage depends on
    pub fn validate(&self) -> Result<()> {
        if self.age.is_none() {
            return Err(Error::InvalidInput("Missing patient age".to_string()));
        }
        match self.gender.as_deref().map(str::trim) {
            Some(g) if !g.is_empty() => Ok(()),
            _ => Err(Error::InvalidInput("Missing patient gender".to_string())),
        }
    }

    /// Name for reports, defaulting to "Anonymous"
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => "Anonymous",
        }
    }
}

/// Graded triage urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "moderate" | "medium" => Ok(RiskLevel::Moderate),
            "high" => Ok(RiskLevel::High),
            other => Err(Error::InvalidInput(format!("Unknown risk level: {}", other))),
        }
    }
}

/// Imaging classifier output classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImagingClass {
    Normal,
    Pneumonia,
    Tb,
    Abnormal,
}

impl ImagingClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagingClass::Normal => "NORMAL",
            ImagingClass::Pneumonia => "PNEUMONIA",
            ImagingClass::Tb => "TB",
            ImagingClass::Abnormal => "ABNORMAL",
        }
    }
}

/// Probability vector returned by the external imaging classifier
///
/// Never computed locally. Missing classes deserialize as 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ImagingAssessment {
    #[serde(default)]
    pub normal: f64,
    #[serde(default)]
    pub pneumonia: f64,
    #[serde(default)]
    pub tb: f64,
    #[serde(default)]
    pub abnormal: f64,
    /// Classifier's own label, if it reported one
    #[serde(default, rename = "label", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Reference to the explanation artifact (heat map), stored elsewhere
    #[serde(default, rename = "explanation", skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Clamp a probability into [0, 1]; NaN counts as no evidence
fn unit(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

impl ImagingAssessment {
    pub fn probability(&self, class: ImagingClass) -> f64 {
        unit(match class {
            ImagingClass::Normal => self.normal,
            ImagingClass::Pneumonia => self.pneumonia,
            ImagingClass::Tb => self.tb,
            ImagingClass::Abnormal => self.abnormal,
        })
    }

    /// Highest probability among the abnormal classes; NORMAL contributes nothing
    pub fn max_anomaly(&self) -> f64 {
        [ImagingClass::Tb, ImagingClass::Pneumonia, ImagingClass::Abnormal]
            .into_iter()
            .map(|c| self.probability(c))
            .fold(0.0, f64::max)
    }

    /// Class with the highest probability (ties resolve toward NORMAL first)
    pub fn dominant_class(&self) -> ImagingClass {
        [
            ImagingClass::Normal,
            ImagingClass::Pneumonia,
            ImagingClass::Tb,
            ImagingClass::Abnormal,
        ]
        .into_iter()
        .fold((ImagingClass::Normal, f64::MIN), |best, c| {
            let p = self.probability(c);
            if p > best.1 {
                (c, p)
            } else {
                best
            }
        })
        .0
    }
}

//! # Risk Level Estimation
//!
//! Combines the classifier's probability for the chosen label with contextual
//! signals into one of five ordinal tiers. The rules run as ordered overrides:
//!
//! 1. Base tier from half-open probability bands (0.2, 0.4, 0.6, 0.8).
//! 2. Three or more plausibility warnings lift Moderate to High.
//! 3. A family history lifts Low to Moderate and Moderate to High.
//! 4. A disease-specific red flag sets any tier below Very High to exactly High.

use crate::model::DiseaseLabel;
use crate::observation::ClinicalObservation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal clinical-risk category, totally ordered from `VeryLow` to `VeryHigh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl RiskTier {
    /// The base tier for a probability.
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.2 {
            RiskTier::VeryLow
        } else if probability < 0.4 {
            RiskTier::Low
        } else if probability < 0.6 {
            RiskTier::Moderate
        } else if probability < 0.8 {
            RiskTier::High
        } else {
            RiskTier::VeryHigh
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RiskTier::VeryLow => "Very Low",
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
            RiskTier::VeryHigh => "Very High",
        }
    }

    /// A short recommendation to print alongside the tier.
    pub fn description(self) -> &'static str {
        match self {
            RiskTier::VeryLow => "No significant indicators",
            RiskTier::Low => "Routine monitoring",
            RiskTier::Moderate => "Follow-up recommended",
            RiskTier::High => "Specialist consultation advised",
            RiskTier::VeryHigh => "Prompt specialist consultation advised",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of plausibility warnings at which a Moderate tier is escalated.
pub const WARNING_ESCALATION_THRESHOLD: usize = 3;

/// Everything the estimator looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFactors {
    pub probability: f64,
    pub warning_count: usize,
    /// Raw family-history code; only `1` counts as present.
    pub family_history: i64,
    pub disease_specific_flag: bool,
}

pub fn estimate_risk_level(factors: &RiskFactors) -> RiskTier {
    let mut tier = RiskTier::from_probability(factors.probability);

    if factors.warning_count >= WARNING_ESCALATION_THRESHOLD && tier == RiskTier::Moderate {
        tier = RiskTier::High;
    }

    if factors.family_history == 1 {
        tier = match tier {
            RiskTier::Low => RiskTier::Moderate,
            RiskTier::Moderate => RiskTier::High,
            other => other,
        };
    }

    // Clamp to exactly High, not "at least High".
    if factors.disease_specific_flag && tier != RiskTier::VeryHigh {
        tier = RiskTier::High;
    }

    tier
}

/// Clinical red flags that raise the risk of a specific predicted disease.
/// Hemophilia has none.
pub fn disease_specific_flag(label: DiseaseLabel, observation: &ClinicalObservation) -> bool {
    match label {
        DiseaseLabel::Thalassemia => observation.hemoglobin < 9.0,
        DiseaseLabel::SickleCellAnemia => observation.sickled_rbc_percent > 40.0,
        DiseaseLabel::BreastCancer => {
            observation.brca1_expression < 0.3 || observation.p53_mutation == 1
        }
        DiseaseLabel::CysticFibrosis => observation.sweat_chloride > 60.0,
        DiseaseLabel::Hemophilia => false,
    }
}

//! Hard-coded domain exclusions applied on top of the classifier.
//!
//! An exclusion rule names a label and a predicate on the observation. When the
//! current arg-max is that label and the predicate holds, the label's probability
//! is zeroed and the arg-max re-selected. The classifier itself is never touched,
//! and the remaining distribution is not renormalized.

use crate::model::{ClassProbabilities, DiseaseLabel};
use crate::observation::ClinicalObservation;

/// One anatomically or biologically implausible prediction to suppress.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionRule {
    pub label: DiseaseLabel,
    pub excludes: fn(&ClinicalObservation) -> bool,
    pub reason: &'static str,
}

fn is_male(observation: &ClinicalObservation) -> bool {
    observation.gender == 1
}

pub const MALE_BREAST_CANCER: ExclusionRule = ExclusionRule {
    label: DiseaseLabel::BreastCancer,
    excludes: is_male,
    reason: "Breast Cancer is not predicted for male subjects",
};

/// The rules applied to every prediction, in order.
pub const EXCLUSION_RULES: &[ExclusionRule] = &[MALE_BREAST_CANCER];

/// The distribution and label after exclusions.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideOutcome {
    pub probabilities: ClassProbabilities,
    pub label: DiseaseLabel,
    /// Labels that were the arg-max at some point and got zeroed.
    pub suppressed: Vec<DiseaseLabel>,
}

/// Applies the built-in exclusion rules.
pub fn apply_safety_overrides(
    observation: &ClinicalObservation,
    probabilities: ClassProbabilities,
) -> OverrideOutcome {
    apply_rules(EXCLUSION_RULES, observation, probabilities)
}

pub fn apply_rules(
    rules: &[ExclusionRule],
    observation: &ClinicalObservation,
    mut probabilities: ClassProbabilities,
) -> OverrideOutcome {
    let mut label = probabilities.argmax();
    let mut suppressed = Vec::new();

    for rule in rules {
        if label == rule.label && (rule.excludes)(observation) {
            probabilities.suppress(label);
            let replacement = probabilities.argmax();
            log::warn!(
                "Safety override: {} ({} -> {replacement})",
                rule.reason,
                rule.label
            );
            suppressed.push(label);
            label = replacement;
        }
    }

    OverrideOutcome {
        probabilities,
        label,
        suppressed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_observation;

    fn breast_cancer_leading() -> ClassProbabilities {
        ClassProbabilities::new([0.10, 0.15, 0.55, 0.12, 0.08])
    }

    #[test]
    fn test_male_breast_cancer_is_suppressed() {
        let mut obs = sample_observation();
        obs.gender = 1;
        let outcome = apply_safety_overrides(&obs, breast_cancer_leading());

        assert_ne!(outcome.label, DiseaseLabel::BreastCancer);
        assert_eq!(outcome.probabilities.get(DiseaseLabel::BreastCancer), 0.0);
        // New label is the arg-max of the remaining four classes.
        assert_eq!(outcome.label, DiseaseLabel::Hemophilia);
        assert_eq!(outcome.suppressed, vec![DiseaseLabel::BreastCancer]);
        // Other classes untouched; no renormalization.
        assert_eq!(outcome.probabilities.get(DiseaseLabel::Hemophilia), 0.15);
        assert!(outcome.probabilities.sum() < 1.0);
    }

    #[test]
    fn test_female_breast_cancer_is_kept() {
        let obs = sample_observation();
        let outcome = apply_safety_overrides(&obs, breast_cancer_leading());
        assert_eq!(outcome.label, DiseaseLabel::BreastCancer);
        assert_eq!(outcome.probabilities, breast_cancer_leading());
        assert!(outcome.suppressed.is_empty());
    }

    #[test]
    fn test_rule_only_fires_on_the_arg_max() {
        let mut obs = sample_observation();
        obs.gender = 1;
        let probs = ClassProbabilities::new([0.50, 0.05, 0.30, 0.10, 0.05]);
        let outcome = apply_safety_overrides(&obs, probs);
        assert_eq!(outcome.label, DiseaseLabel::Thalassemia);
        assert_eq!(outcome.probabilities.get(DiseaseLabel::BreastCancer), 0.30);
    }

    #[test]
    fn test_additional_rules_chain() {
        fn always(_: &ClinicalObservation) -> bool {
            true
        }
        let no_hemophilia = ExclusionRule {
            label: DiseaseLabel::Hemophilia,
            excludes: always,
            reason: "test exclusion",
        };
        let mut obs = sample_observation();
        obs.gender = 1;
        let outcome = apply_rules(
            &[MALE_BREAST_CANCER, no_hemophilia],
            &obs,
            breast_cancer_leading(),
        );
        assert_eq!(outcome.label, DiseaseLabel::SickleCellAnemia);
        assert_eq!(
            outcome.suppressed,
            vec![DiseaseLabel::BreastCancer, DiseaseLabel::Hemophilia]
        );
    }
}

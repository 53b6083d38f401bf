//! # The Prediction Pipeline
//!
//! One observation in, one immutable `PredictionResult` out:
//!
//! raw observation -> plausibility check (warnings only) -> normalization ->
//! classifier -> safety override -> risk estimation.
//!
//! The only state a `Predictor` owns is the frozen classifier, which is shared
//! read-only between concurrent predictions. Persisting a result is the
//! caller's business and happens after the pipeline has returned.

use crate::model::{ClassProbabilities, Classifier, DiseaseLabel, ModelError, TrainedModel};
use crate::normalize::normalize;
use crate::observation::{ClinicalObservation, FormData, ValidationError};
use crate::plausibility;
use crate::risk::{self, RiskFactors, RiskTier};
use crate::safety;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// The outcome of one prediction. Created once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: DiseaseLabel,
    /// The (post-override) probability of `label`.
    pub probability: f64,
    pub risk_level: RiskTier,
    /// Plausibility advisories, in field order.
    pub warnings: Vec<String>,
    /// The full distribution after safety overrides. Not renormalized.
    pub probabilities: ClassProbabilities,
    /// Whether a disease-specific red flag applied to `label`.
    pub disease_specific_risk: bool,
    /// Labels removed by safety overrides.
    pub suppressed: Vec<DiseaseLabel>,
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Invalid observation: {0}")]
    Validation(#[from] ValidationError),
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),
}

/// A batch prediction that failed, located by its 1-based row and sample id.
#[derive(Error, Debug)]
#[error("Row {row} (sample '{sample_id}') could not be predicted: {source}")]
pub struct BatchPredictError {
    pub row: usize,
    pub sample_id: String,
    #[source]
    pub source: PredictError,
}

/// Runs the prediction pipeline against one frozen classifier.
#[derive(Debug)]
pub struct Predictor<C: Classifier = TrainedModel> {
    classifier: C,
}

impl Predictor<TrainedModel> {
    /// Loads the model artifact. Failure here means the service cannot run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PredictError> {
        let model = TrainedModel::load(path)?;
        Ok(Self::new(model))
    }
}

impl<C: Classifier> Predictor<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Parses a submitted form and predicts. Nothing is computed if parsing fails.
    pub fn predict_form(&self, form: &FormData) -> Result<PredictionResult, PredictError> {
        let observation = ClinicalObservation::from_form(form)?;
        self.predict(&observation)
    }

    pub fn predict(
        &self,
        observation: &ClinicalObservation,
    ) -> Result<PredictionResult, PredictError> {
        observation.validate()?;

        let warnings = plausibility::check(observation);
        let features = normalize(observation);
        let probabilities = self.classifier.predict_proba(&features)?;

        let outcome = safety::apply_safety_overrides(observation, probabilities);
        let label = outcome.label;
        let probability = outcome.probabilities.get(label);

        let disease_specific_risk = risk::disease_specific_flag(label, observation);
        let risk_level = risk::estimate_risk_level(&RiskFactors {
            probability,
            warning_count: warnings.len(),
            family_history: observation.family_history,
            disease_specific_flag: disease_specific_risk,
        });

        log::info!(
            "Predicted {label} (p = {probability:.3}), risk {risk_level}, {} warning(s)",
            warnings.len()
        );

        Ok(PredictionResult {
            label,
            probability,
            risk_level,
            warnings: warnings.iter().map(ToString::to_string).collect(),
            probabilities: outcome.probabilities,
            disease_specific_risk,
            suppressed: outcome.suppressed,
        })
    }

    /// Predicts many observations in parallel. Results keep the input order.
    pub fn predict_batch(
        &self,
        observations: &[ClinicalObservation],
    ) -> Vec<Result<PredictionResult, PredictError>> {
        observations
            .par_iter()
            .map(|observation| self.predict(observation))
            .collect()
    }

    /// Predicts a named batch. The first failure, in input order, is returned
    /// with its row number and sample id.
    pub fn predict_samples(
        &self,
        sample_ids: &[String],
        observations: &[ClinicalObservation],
    ) -> Result<Vec<PredictionResult>, BatchPredictError> {
        self.predict_batch(observations)
            .into_iter()
            .zip(sample_ids)
            .enumerate()
            .map(|(i, (result, sample_id))| {
                result.map_err(|source| BatchPredictError {
                    row: i + 1,
                    sample_id: sample_id.clone(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationField;
    use crate::test_fixtures::{
        FixedClassifier, UnavailableClassifier, sample_form, sample_observation,
    };

    #[test]
    fn test_reference_scenario_with_family_history() {
        // Hemophilia at 0.35 is Low; family history lifts it to Moderate.
        let predictor = Predictor::new(FixedClassifier([0.20, 0.35, 0.15, 0.15, 0.15]));
        let result = predictor.predict(&sample_observation()).unwrap();
        assert_eq!(result.label, DiseaseLabel::Hemophilia);
        assert_eq!(result.probability, 0.35);
        assert!(result.warnings.is_empty());
        assert!(!result.disease_specific_risk);
        assert_eq!(result.risk_level, RiskTier::Moderate);
    }

    #[test]
    fn test_red_flag_from_observation_applies() {
        // Reference observation has p53 = 1, a Breast Cancer red flag.
        let predictor = Predictor::new(FixedClassifier([0.05, 0.05, 0.85, 0.03, 0.02]));
        let result = predictor.predict(&sample_observation()).unwrap();
        assert_eq!(result.label, DiseaseLabel::BreastCancer);
        assert!(result.disease_specific_risk);
        assert_eq!(result.risk_level, RiskTier::VeryHigh);
    }

    #[test]
    fn test_override_feeds_risk_with_unnormalized_probability() {
        let predictor = Predictor::new(FixedClassifier([0.25, 0.05, 0.60, 0.05, 0.05]));
        let mut obs = sample_observation();
        obs.gender = 1;
        obs.family_history = 0;
        obs.hemoglobin = 12.0;
        let result = predictor.predict(&obs).unwrap();
        assert_eq!(result.label, DiseaseLabel::Thalassemia);
        assert_eq!(result.probability, 0.25);
        assert_eq!(result.probabilities.get(DiseaseLabel::BreastCancer), 0.0);
        assert_eq!(result.suppressed, vec![DiseaseLabel::BreastCancer]);
        assert_eq!(result.risk_level, RiskTier::Low);
    }

    #[test]
    fn test_warnings_counted_into_risk() {
        let predictor = Predictor::new(FixedClassifier([0.10, 0.50, 0.10, 0.20, 0.10]));
        let mut obs = sample_observation();
        obs.family_history = 0;
        obs.age = 130.0;
        obs.rdw_cv = 40.0;
        obs.il6_level = 1500.0;
        let result = predictor.predict(&obs).unwrap();
        assert_eq!(result.warnings.len(), 3);
        assert_eq!(result.risk_level, RiskTier::High);
    }

    #[test]
    fn test_missing_field_produces_no_result() {
        let predictor = Predictor::new(FixedClassifier([0.2; 5]));
        let mut form = sample_form();
        form.remove("age");
        match predictor.predict_form(&form) {
            Err(PredictError::Validation(ValidationError::MissingField(field))) => {
                assert_eq!(field, ObservationField::Age)
            }
            other => panic!("Expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_form_and_typed_paths_agree() {
        let predictor = Predictor::new(FixedClassifier([0.1, 0.1, 0.1, 0.6, 0.1]));
        let from_form = predictor.predict_form(&sample_form()).unwrap();
        let from_value = predictor.predict(&sample_observation()).unwrap();
        assert_eq!(from_form, from_value);
    }

    #[test]
    fn test_unavailable_model_fails_the_prediction() {
        let predictor = Predictor::new(UnavailableClassifier);
        assert!(matches!(
            predictor.predict(&sample_observation()),
            Err(PredictError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_non_finite_observation_is_rejected() {
        let predictor = Predictor::new(FixedClassifier([0.2; 5]));
        let mut obs = sample_observation();
        obs.age = f64::NAN;
        assert!(matches!(
            predictor.predict(&obs),
            Err(PredictError::Validation(ValidationError::NonFinite { .. }))
        ));
    }

    /// Fails whenever the subject is older than the age calibration window.
    struct RejectsElderly;

    impl Classifier for RejectsElderly {
        fn predict_proba(
            &self,
            features: &crate::types::FeatureVector,
        ) -> Result<ClassProbabilities, ModelError> {
            if features.get(ObservationField::Age) > 1.0 {
                Err(ModelError::InvalidOutput("age outside the model".to_string()))
            } else {
                Ok(ClassProbabilities::new([0.2; 5]))
            }
        }
    }

    #[test]
    fn test_batch_failure_names_the_sample() {
        let predictor = Predictor::new(RejectsElderly);
        let mut elderly = sample_observation();
        elderly.age = 104.0;
        let ids = vec!["P-1".to_string(), "P-2".to_string(), "P-3".to_string()];

        match predictor.predict_samples(&ids, &[sample_observation(), elderly, elderly]) {
            Err(err) => {
                assert_eq!(err.row, 2);
                assert_eq!(err.sample_id, "P-2");
                assert!(matches!(err.source, PredictError::ModelUnavailable(_)));
                assert!(err.to_string().starts_with("Row 2 (sample 'P-2')"));
            }
            Ok(results) => panic!("Expected a batch failure, got {} results", results.len()),
        }

        let ok = predictor
            .predict_samples(&ids[..1], &[sample_observation()])
            .unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn test_batch_preserves_order() {
        let predictor = Predictor::new(FixedClassifier([0.1, 0.1, 0.1, 0.1, 0.6]));
        let mut low_sweat = sample_observation();
        low_sweat.sweat_chloride = 20.0;
        let mut high_sweat = sample_observation();
        high_sweat.sweat_chloride = 95.0;

        let results = predictor.predict_batch(&[low_sweat, high_sweat, low_sweat]);
        let flags: Vec<bool> = results
            .into_iter()
            .map(|r| r.unwrap().disease_specific_risk)
            .collect();
        assert_eq!(flags, vec![false, true, false]);
    }
}

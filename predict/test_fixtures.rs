//! Test fixtures shared by the unit tests of the prediction pipeline.
//!
//! Provides the reference submission used throughout the test suite and a
//! classifier double that returns a fixed distribution, so the safety and risk
//! stages can be exercised without a model artifact.

use crate::model::{ClassProbabilities, Classifier, ModelError};
use crate::observation::{ClinicalObservation, FormData};
use crate::types::FeatureVector;

/// The reference submission: every value inside its plausible range.
pub fn sample_form() -> FormData {
    [
        ("age", "45"),
        ("gender", "0"),
        ("family_history", "1"),
        ("hemoglobin", "7"),
        ("fetal_hemoglobin", "10"),
        ("rdw_cv", "15"),
        ("serum_ferritin", "30"),
        ("brca1_expression", "0.2"),
        ("p53_mutation", "1"),
        ("sweat_chloride", "20"),
        ("sickled_rbc_percent", "5"),
        ("il6_level", "3"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn sample_observation() -> ClinicalObservation {
    ClinicalObservation {
        age: 45.0,
        gender: 0,
        family_history: 1,
        hemoglobin: 7.0,
        fetal_hemoglobin: 10.0,
        rdw_cv: 15.0,
        serum_ferritin: 30.0,
        brca1_expression: 0.2,
        p53_mutation: 1,
        sweat_chloride: 20.0,
        sickled_rbc_percent: 5.0,
        il6_level: 3.0,
    }
}

/// A classifier that ignores its input and answers with one fixed distribution.
pub struct FixedClassifier(pub [f64; 5]);

impl Classifier for FixedClassifier {
    fn predict_proba(&self, _: &FeatureVector) -> Result<ClassProbabilities, ModelError> {
        Ok(ClassProbabilities::new(self.0))
    }
}

/// A classifier whose artifact has gone away mid-process.
pub struct UnavailableClassifier;

impl Classifier for UnavailableClassifier {
    fn predict_proba(&self, _: &FeatureVector) -> Result<ClassProbabilities, ModelError> {
        Err(ModelError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "model artifact evicted",
        )))
    }
}

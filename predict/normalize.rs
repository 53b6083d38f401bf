//! Feature normalization.
//!
//! Maps a raw observation onto the scale the classifier was trained on. Each field
//! has one fixed affine transform; the constants are calibration data baked into
//! the model and are never exposed as runtime configuration. Results are not
//! clamped: a measurement outside the calibration window simply lands outside
//! [0, 1], and the plausibility checker reports it separately.

use crate::observation::{ClinicalObservation, ObservationField};
use crate::types::FeatureVector;
use ndarray::Array1;

/// The transform applied to one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    /// Already a 0/1 code.
    PassThrough,
    /// `(v - min) / (max - min)`.
    Rescale { min: f64, max: f64 },
}

impl Calibration {
    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Calibration::PassThrough => value,
            Calibration::Rescale { min, max } => (value - min) / (max - min),
        }
    }
}

/// The calibration window for each field.
pub const fn calibration(field: ObservationField) -> Calibration {
    use Calibration::{PassThrough, Rescale};
    match field {
        ObservationField::Age => Rescale { min: 0.0, max: 100.0 },
        ObservationField::Gender
        | ObservationField::FamilyHistory
        | ObservationField::P53Mutation => PassThrough,
        ObservationField::Hemoglobin => Rescale { min: 6.0, max: 9.5 },
        ObservationField::FetalHemoglobin => Rescale { min: 7.0, max: 18.0 },
        ObservationField::RdwCv => Rescale { min: 13.0, max: 21.0 },
        ObservationField::SerumFerritin => Rescale { min: 20.0, max: 60.0 },
        ObservationField::Brca1Expression => Rescale { min: 0.0, max: 0.4 },
        ObservationField::SweatChloride => Rescale { min: 30.0, max: 60.0 },
        ObservationField::SickledRbcPercent => Rescale { min: 0.0, max: 2.0 },
        ObservationField::Il6Level => Rescale { min: 1.0, max: 9.0 },
    }
}

/// Builds the feature vector for an observation, in training order.
pub fn normalize(observation: &ClinicalObservation) -> FeatureVector {
    let values = ObservationField::ALL
        .iter()
        .map(|&field| calibration(field).apply(observation.value(field)));
    let features = FeatureVector::new(Array1::from_iter(values));
    log::debug!("Normalized feature vector: {}", features.as_view());
    features
}

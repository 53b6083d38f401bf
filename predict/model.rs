use crate::observation::ObservationField;
use crate::types::FeatureVector;
use ndarray::{Array1, Array2};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the public, human-readable format of the frozen classifier
// when serialized to a TOML file.

/// The closed set of disease categories, in the classifier's class-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiseaseLabel {
    Thalassemia,
    Hemophilia,
    #[serde(rename = "Breast Cancer")]
    BreastCancer,
    #[serde(rename = "Sickle Cell Anemia")]
    SickleCellAnemia,
    #[serde(rename = "Cystic Fibrosis")]
    CysticFibrosis,
}

impl DiseaseLabel {
    pub const COUNT: usize = 5;

    /// All labels, indexed by class index.
    pub const ALL: [DiseaseLabel; DiseaseLabel::COUNT] = [
        DiseaseLabel::Thalassemia,
        DiseaseLabel::Hemophilia,
        DiseaseLabel::BreastCancer,
        DiseaseLabel::SickleCellAnemia,
        DiseaseLabel::CysticFibrosis,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            DiseaseLabel::Thalassemia => "Thalassemia",
            DiseaseLabel::Hemophilia => "Hemophilia",
            DiseaseLabel::BreastCancer => "Breast Cancer",
            DiseaseLabel::SickleCellAnemia => "Sickle Cell Anemia",
            DiseaseLabel::CysticFibrosis => "Cystic Fibrosis",
        }
    }
}

impl fmt::Display for DiseaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A probability for every disease label, indexed by class index.
///
/// After a safety override the entries may sum to less than one; the
/// distribution is left unnormalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities([f64; DiseaseLabel::COUNT]);

impl ClassProbabilities {
    /// Tolerance for the sum-to-one check on fresh classifier output.
    pub const SUM_TOLERANCE: f64 = 1e-6;

    pub fn new(values: [f64; DiseaseLabel::COUNT]) -> Self {
        Self(values)
    }

    #[inline]
    pub fn get(&self, label: DiseaseLabel) -> f64 {
        self.0[label.index()]
    }

    pub fn as_array(&self) -> &[f64; DiseaseLabel::COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (DiseaseLabel, f64)> + '_ {
        DiseaseLabel::ALL.iter().map(|&label| (label, self.get(label)))
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// The most probable label. Ties go to the lowest class index.
    pub fn argmax(&self) -> DiseaseLabel {
        let mut best = DiseaseLabel::ALL[0];
        for (label, p) in self.iter().skip(1) {
            if p > self.get(best) {
                best = label;
            }
        }
        best
    }

    /// Zeroes one class without renormalizing the rest.
    pub fn suppress(&mut self, label: DiseaseLabel) {
        self.0[label.index()] = 0.0;
    }

    /// Checks that a classifier answered with a proper distribution.
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some((label, p)) = self
            .iter()
            .find(|&(_, p)| !p.is_finite() || !(0.0..=1.0).contains(&p))
        {
            return Err(ModelError::InvalidOutput(format!(
                "probability {p} for '{label}' is not in [0, 1]"
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(ModelError::InvalidOutput(format!(
                "probabilities sum to {sum}, expected 1"
            )));
        }
        Ok(())
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(DiseaseLabel::COUNT))?;
        for (label, p) in self.iter() {
            map.serialize_entry(label.name(), &p)?;
        }
        map.end()
    }
}

/// The inference capability of a frozen, pre-trained classifier.
///
/// Implementations must be free of side effects: one instance is shared
/// read-only by every concurrent prediction.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ModelError>;
}

/// The structural description of a trained model. Both name lists are checked
/// against the pipeline's own order when the artifact is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Feature column names, in training order.
    pub feature_names: Vec<String>,
    /// Class names, in class-index order.
    pub class_labels: Vec<String>,
}

impl ModelConfig {
    /// The configuration matching this pipeline's feature and label order.
    pub fn canonical() -> Self {
        Self {
            feature_names: ObservationField::ALL
                .iter()
                .map(|field| field.feature_name().to_string())
                .collect(),
            class_labels: DiseaseLabel::ALL
                .iter()
                .map(|label| label.name().to_string())
                .collect(),
        }
    }
}

/// Multinomial logistic coefficients: one row of weights and one intercept per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxCoefficients {
    /// Shape: [n_classes, n_features].
    pub weights: Array2<f64>,
    /// Shape: [n_classes].
    pub intercepts: Array1<f64>,
}

/// The top-level, self-contained, frozen model artifact.
/// This is the structure that gets saved to and loaded from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub config: ModelConfig,
    pub coefficients: SoftmaxCoefficients,
}

/// Custom error type for model loading, saving, and inference.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("The model was trained on {found} features, but the pipeline produces {expected}.")]
    MismatchedFeatureCount { found: usize, expected: usize },
    #[error(
        "Model feature {position} is '{found}', but the pipeline produces '{expected}' at that position."
    )]
    FeatureMismatch {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("The model has {found} classes, but the label set has {expected}.")]
    MismatchedClassCount { found: usize, expected: usize },
    #[error("Model class {index} is '{found}', but the label set expects '{expected}'.")]
    ClassMismatch {
        index: usize,
        expected: &'static str,
        found: String,
    },
    #[error(
        "Internal error: weight matrix is {rows}x{cols} with {intercepts} intercepts, expected {expected_rows}x{expected_cols}."
    )]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        intercepts: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("The model parameters contain non-finite values.")]
    NonFiniteParameters,
    #[error("The classifier produced an invalid probability distribution: {0}")]
    InvalidOutput(String),
}

impl TrainedModel {
    /// Wraps raw coefficients in the canonical configuration and validates them.
    pub fn new(weights: Array2<f64>, intercepts: Array1<f64>) -> Result<Self, ModelError> {
        let model = Self {
            config: ModelConfig::canonical(),
            coefficients: SoftmaxCoefficients {
                weights,
                intercepts,
            },
        };
        model.validate()?;
        Ok(model)
    }

    /// Checks that the artifact matches the pipeline exactly: same feature order,
    /// same class order, consistent shapes, finite parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        internal::validate_names(&self.config)?;

        let weights = &self.coefficients.weights;
        let intercepts = &self.coefficients.intercepts;
        let (expected_rows, expected_cols) = (DiseaseLabel::COUNT, ObservationField::ALL.len());
        if weights.nrows() != expected_rows
            || weights.ncols() != expected_cols
            || intercepts.len() != expected_rows
        {
            return Err(ModelError::ShapeMismatch {
                rows: weights.nrows(),
                cols: weights.ncols(),
                intercepts: intercepts.len(),
                expected_rows,
                expected_cols,
            });
        }

        if weights.iter().chain(intercepts.iter()).any(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteParameters);
        }
        Ok(())
    }

    /// Saves the model to a file in a human-readable TOML format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads and validates a model from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let toml_string = fs::read_to_string(path)?;
        let model: Self = toml::from_str(&toml_string)?;
        model.validate()?;
        log::info!(
            "Loaded classifier from '{}' ({} classes x {} features)",
            path.display(),
            model.coefficients.weights.nrows(),
            model.coefficients.weights.ncols()
        );
        Ok(model)
    }
}

impl Classifier for TrainedModel {
    /// Computes `softmax(W·x + b)`.
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ModelError> {
        let weights = &self.coefficients.weights;
        if features.len() != weights.ncols() {
            return Err(ModelError::MismatchedFeatureCount {
                found: weights.ncols(),
                expected: features.len(),
            });
        }

        let eta = weights.dot(&features.as_view()) + &self.coefficients.intercepts;
        let probs = internal::softmax(&eta);
        log::debug!("Class probabilities: {probs}");

        let mut values = [0.0; DiseaseLabel::COUNT];
        for (slot, &p) in values.iter_mut().zip(probs.iter()) {
            *slot = p;
        }
        let distribution = ClassProbabilities::new(values);
        distribution.validate()?;
        Ok(distribution)
    }
}

/// Internal module for artifact-specific implementation details.
mod internal {
    use super::*;

    pub(super) fn validate_names(config: &ModelConfig) -> Result<(), ModelError> {
        if config.feature_names.len() != ObservationField::ALL.len() {
            return Err(ModelError::MismatchedFeatureCount {
                found: config.feature_names.len(),
                expected: ObservationField::ALL.len(),
            });
        }
        for (position, (field, found)) in ObservationField::ALL
            .iter()
            .zip(&config.feature_names)
            .enumerate()
        {
            if field.feature_name() != found.as_str() {
                return Err(ModelError::FeatureMismatch {
                    position,
                    expected: field.feature_name(),
                    found: found.clone(),
                });
            }
        }

        if config.class_labels.len() != DiseaseLabel::COUNT {
            return Err(ModelError::MismatchedClassCount {
                found: config.class_labels.len(),
                expected: DiseaseLabel::COUNT,
            });
        }
        for (index, (label, found)) in DiseaseLabel::ALL
            .iter()
            .zip(&config.class_labels)
            .enumerate()
        {
            if label.name() != found.as_str() {
                return Err(ModelError::ClassMismatch {
                    index,
                    expected: label.name(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }

    /// Numerically stable softmax (shifted by the maximum logit).
    ///
    /// Extreme but finite features can push a logit past `f64::MAX`. A NaN logit
    /// (opposing overflows in one row) carries no mass. When the largest logit is
    /// infinite the mass is split evenly among the entries that reach it.
    pub(super) fn softmax(eta: &Array1<f64>) -> Array1<f64> {
        let eta = eta.mapv(|e| if e.is_nan() { f64::NEG_INFINITY } else { e });
        let max = eta.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max.is_infinite() {
            let hits = eta.mapv(|e| if e == max { 1.0 } else { 0.0 });
            let count = hits.sum();
            return hits / count;
        }
        let exps = eta.mapv(|e| (e - max).exp());
        let total = exps.sum();
        exps / total
    }
}

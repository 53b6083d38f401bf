#![deny(dead_code)]
#![deny(unused_imports)]

pub mod catalog;
pub mod data;
pub mod model;
pub mod normalize;
pub mod observation;
pub mod pipeline;
pub mod plausibility;
pub mod risk;
pub mod safety;
pub mod types;

#[cfg(test)]
mod test_fixtures;

#[path = "../shared/config.rs"]
pub mod config;
#[path = "../shared/store.rs"]
pub mod store;

pub use model::{Classifier, ClassProbabilities, DiseaseLabel, ModelError, TrainedModel};
pub use observation::{ClinicalObservation, ObservationField, ValidationError};
pub use pipeline::{PredictError, PredictionResult, Predictor};
pub use risk::RiskTier;

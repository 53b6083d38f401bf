use crate::observation::ObservationField;
use ndarray::{Array1, ArrayView1};
use std::ops::Deref;

/// The normalized, classifier-ready encoding of one observation.
/// Entries follow `ObservationField::ALL`.
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector(pub Array1<f64>);

impl FeatureVector {
    pub fn new(values: Array1<f64>) -> Self {
        Self(values)
    }

    #[inline]
    pub fn get(&self, field: ObservationField) -> f64 {
        self.0[field.index()]
    }

    pub fn as_view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }
}

impl Deref for FeatureVector {
    type Target = Array1<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

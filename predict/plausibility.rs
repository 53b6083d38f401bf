//! Clinical plausibility checks.
//!
//! Every raw field is compared against a broad physiological range. A value
//! outside its range is reported, never rejected: the pipeline keeps going and
//! the warnings travel with the result (their count also feeds the risk
//! estimate).

use crate::observation::{ClinicalObservation, ObservationField};
use serde::Serialize;
use std::fmt;

/// The accepted values for one field. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ExpectedRange {
    Interval { min: f64, max: f64 },
    /// Exactly 0 or 1.
    Binary,
}

impl ExpectedRange {
    pub fn admits(self, value: f64) -> bool {
        match self {
            ExpectedRange::Interval { min, max } => (min..=max).contains(&value),
            ExpectedRange::Binary => value == 0.0 || value == 1.0,
        }
    }
}

pub const fn expected_range(field: ObservationField) -> ExpectedRange {
    use ExpectedRange::{Binary, Interval};
    match field {
        ObservationField::Age => Interval { min: 0.0, max: 120.0 },
        ObservationField::Gender
        | ObservationField::FamilyHistory
        | ObservationField::P53Mutation => Binary,
        ObservationField::Hemoglobin => Interval { min: 3.0, max: 20.0 },
        ObservationField::FetalHemoglobin => Interval { min: 0.0, max: 100.0 },
        ObservationField::RdwCv => Interval { min: 8.0, max: 30.0 },
        ObservationField::SerumFerritin => Interval { min: 1.0, max: 2000.0 },
        ObservationField::Brca1Expression => Interval { min: 0.0, max: 1.0 },
        ObservationField::SweatChloride => Interval { min: 0.0, max: 200.0 },
        ObservationField::SickledRbcPercent => Interval { min: 0.0, max: 100.0 },
        ObservationField::Il6Level => Interval { min: 0.0, max: 1000.0 },
    }
}

fn unit(field: ObservationField) -> &'static str {
    match field {
        ObservationField::Age => " years",
        ObservationField::Hemoglobin => " g/dL",
        ObservationField::FetalHemoglobin
        | ObservationField::RdwCv
        | ObservationField::SickledRbcPercent => "%",
        ObservationField::SerumFerritin => " ng/mL",
        ObservationField::SweatChloride => " mmol/L",
        ObservationField::Il6Level => " pg/mL",
        _ => "",
    }
}

/// A non-blocking advisory that a submitted value looks implausible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlausibilityWarning {
    pub field: ObservationField,
    pub value: f64,
    pub expected: ExpectedRange,
}

impl fmt::Display for PlausibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected {
            ExpectedRange::Interval { min, max } => write!(
                f,
                "{} of {} is outside the typical range ({}–{}{}); please check the entry.",
                self.field.label(),
                self.value,
                min,
                max,
                unit(self.field)
            ),
            ExpectedRange::Binary => write!(
                f,
                "{} must be 0 or 1 (found {}).",
                self.field.label(),
                self.value
            ),
        }
    }
}

/// Returns one warning per field whose value falls outside its expected range,
/// in field order. Never fails.
pub fn check(observation: &ClinicalObservation) -> Vec<PlausibilityWarning> {
    ObservationField::ALL
        .iter()
        .filter_map(|&field| {
            let value = observation.value(field);
            let expected = expected_range(field);
            if expected.admits(value) {
                None
            } else {
                Some(PlausibilityWarning {
                    field,
                    value,
                    expected,
                })
            }
        })
        .inspect(|warning| log::warn!("Plausibility: {warning}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_observation;

    #[test]
    fn test_reference_observation_is_plausible() {
        assert!(check(&sample_observation()).is_empty());
    }

    #[test]
    fn test_implausible_age_is_reported() {
        let mut obs = sample_observation();
        obs.age = 150.0;
        let warnings = check(&obs);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, ObservationField::Age);
        assert!(warnings[0].to_string().to_lowercase().contains("age"));
        assert!(warnings[0].to_string().contains("0–120 years"));

        obs.age = 30.0;
        assert!(check(&obs).iter().all(|w| w.field != ObservationField::Age));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut obs = sample_observation();
        obs.age = 120.0;
        obs.hemoglobin = 3.0;
        obs.serum_ferritin = 2000.0;
        obs.brca1_expression = 0.0;
        obs.il6_level = 1000.0;
        assert!(check(&obs).is_empty());

        obs.hemoglobin = 2.99;
        obs.serum_ferritin = 0.5;
        let fields: Vec<_> = check(&obs).into_iter().map(|w| w.field).collect();
        assert_eq!(
            fields,
            vec![ObservationField::Hemoglobin, ObservationField::SerumFerritin]
        );
    }

    #[test]
    fn test_one_warning_per_violated_field() {
        let mut obs = sample_observation();
        obs.gender = 2;
        obs.family_history = -1;
        obs.rdw_cv = 45.0;
        obs.brca1_expression = 1.4;
        obs.p53_mutation = 3;
        obs.sweat_chloride = 250.0;
        obs.sickled_rbc_percent = 101.0;
        let warnings = check(&obs);
        let fields: Vec<_> = warnings.iter().map(|w| w.field).collect();
        assert_eq!(
            fields,
            vec![
                ObservationField::Gender,
                ObservationField::FamilyHistory,
                ObservationField::RdwCv,
                ObservationField::Brca1Expression,
                ObservationField::P53Mutation,
                ObservationField::SweatChloride,
                ObservationField::SickledRbcPercent,
            ]
        );
        assert_eq!(warnings[0].to_string(), "Gender must be 0 or 1 (found 2).");
    }
}

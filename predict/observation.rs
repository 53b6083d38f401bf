//! # Clinical Observation Module
//!
//! This module is the exclusive entry point for user-submitted measurements.
//! A submission arrives as a flat mapping of form field names to raw text
//! (exactly what a web form or a TSV row provides) and leaves as a fully typed
//! `ClinicalObservation`, or as a `ValidationError` naming the offending field.
//!
//! - Strict Schema: the twelve field names are fixed. Every field is required
//!   and nothing is ever defaulted.
//! - Canonical Order: `ObservationField::ALL` is the column order the classifier
//!   was trained on. The normalizer, the plausibility checker and the model
//!   artifact validation all iterate this one array.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Raw submitted values keyed by form field name.
pub type FormData = BTreeMap<String, String>;

/// One of the twelve measurements that make up an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationField {
    Age,
    Gender,
    FamilyHistory,
    Hemoglobin,
    FetalHemoglobin,
    RdwCv,
    SerumFerritin,
    Brca1Expression,
    P53Mutation,
    SweatChloride,
    SickledRbcPercent,
    Il6Level,
}

/// How a field is typed on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A real-valued measurement, parsed as `f64`.
    Continuous,
    /// A small integer code (0/1 flags), parsed as `i64`.
    Coded,
}

impl ObservationField {
    /// All fields, in classifier training order.
    pub const ALL: [ObservationField; 12] = [
        ObservationField::Age,
        ObservationField::Gender,
        ObservationField::FamilyHistory,
        ObservationField::Hemoglobin,
        ObservationField::FetalHemoglobin,
        ObservationField::RdwCv,
        ObservationField::SerumFerritin,
        ObservationField::Brca1Expression,
        ObservationField::P53Mutation,
        ObservationField::SweatChloride,
        ObservationField::SickledRbcPercent,
        ObservationField::Il6Level,
    ];

    /// Position of this field in the feature vector.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The key used for this field in submitted forms and TSV headers.
    pub fn form_key(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::FamilyHistory => "family_history",
            Self::Hemoglobin => "hemoglobin",
            Self::FetalHemoglobin => "fetal_hemoglobin",
            Self::RdwCv => "rdw_cv",
            Self::SerumFerritin => "serum_ferritin",
            Self::Brca1Expression => "brca1_expression",
            Self::P53Mutation => "p53_mutation",
            Self::SweatChloride => "sweat_chloride",
            Self::SickledRbcPercent => "sickled_rbc_percent",
            Self::Il6Level => "il6_level",
        }
    }

    /// The column name the classifier was trained with.
    pub fn feature_name(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Gender => "Gender",
            Self::FamilyHistory => "Family_History",
            Self::Hemoglobin => "Hemoglobin",
            Self::FetalHemoglobin => "Fetal_Hemoglobin",
            Self::RdwCv => "RDW_CV",
            Self::SerumFerritin => "Serum_Ferritin",
            Self::Brca1Expression => "BRCA1_Expression",
            Self::P53Mutation => "p53_Mutation",
            Self::SweatChloride => "Sweat_Chloride",
            Self::SickledRbcPercent => "Sickled_RBC_Percent",
            Self::Il6Level => "IL6_Level",
        }
    }

    /// Human-readable name for messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Gender => "Gender",
            Self::FamilyHistory => "Family history",
            Self::Hemoglobin => "Hemoglobin",
            Self::FetalHemoglobin => "Fetal hemoglobin",
            Self::RdwCv => "RDW-CV",
            Self::SerumFerritin => "Serum ferritin",
            Self::Brca1Expression => "BRCA1 expression",
            Self::P53Mutation => "p53 mutation",
            Self::SweatChloride => "Sweat chloride",
            Self::SickledRbcPercent => "Sickled RBC",
            Self::Il6Level => "IL-6",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Gender | Self::FamilyHistory | Self::P53Mutation => FieldKind::Coded,
            _ => FieldKind::Continuous,
        }
    }
}

impl fmt::Display for ObservationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.form_key())
    }
}

/// A comprehensive error type for observation parsing failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error(
        "The required field '{0}' is missing. All twelve measurements must be provided; none are defaulted."
    )]
    MissingField(ObservationField),
    #[error("The field '{field}' could not be read as {expected_type}. (Found: '{value}')")]
    Unparseable {
        field: ObservationField,
        value: String,
        expected_type: &'static str,
    },
    #[error("The field '{field}' must be a finite number. (Found: '{value}')")]
    NonFinite {
        field: ObservationField,
        value: String,
    },
}

/// One user submission of clinical measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalObservation {
    /// Age in years.
    pub age: f64,
    /// 0 = female, 1 = male.
    pub gender: i64,
    /// 0 = no known family history, 1 = family history present.
    pub family_history: i64,
    /// Hemoglobin, g/dL.
    pub hemoglobin: f64,
    /// Fetal hemoglobin, %.
    pub fetal_hemoglobin: f64,
    /// Red cell distribution width (coefficient of variation), %.
    pub rdw_cv: f64,
    /// Serum ferritin, ng/mL.
    pub serum_ferritin: f64,
    /// BRCA1 expression, unitless (nominally 0 to 1).
    pub brca1_expression: f64,
    /// 0 = no p53 mutation detected, 1 = mutation detected.
    pub p53_mutation: i64,
    /// Sweat chloride, mmol/L.
    pub sweat_chloride: f64,
    /// Sickled red blood cells, %.
    pub sickled_rbc_percent: f64,
    /// Interleukin-6, pg/mL.
    pub il6_level: f64,
}

impl ClinicalObservation {
    /// Parses and validates a submitted form. Keys not belonging to the schema are ignored.
    pub fn from_form(form: &FormData) -> Result<Self, ValidationError> {
        let continuous = |field: ObservationField| {
            internal::parse_continuous(field, form.get(field.form_key()))
        };
        let coded =
            |field: ObservationField| internal::parse_coded(field, form.get(field.form_key()));

        Ok(Self {
            age: continuous(ObservationField::Age)?,
            gender: coded(ObservationField::Gender)?,
            family_history: coded(ObservationField::FamilyHistory)?,
            hemoglobin: continuous(ObservationField::Hemoglobin)?,
            fetal_hemoglobin: continuous(ObservationField::FetalHemoglobin)?,
            rdw_cv: continuous(ObservationField::RdwCv)?,
            serum_ferritin: continuous(ObservationField::SerumFerritin)?,
            brca1_expression: continuous(ObservationField::Brca1Expression)?,
            p53_mutation: coded(ObservationField::P53Mutation)?,
            sweat_chloride: continuous(ObservationField::SweatChloride)?,
            sickled_rbc_percent: continuous(ObservationField::SickledRbcPercent)?,
            il6_level: continuous(ObservationField::Il6Level)?,
        })
    }

    /// The raw value of a field, with integer codes widened to `f64`.
    pub fn value(&self, field: ObservationField) -> f64 {
        match field {
            ObservationField::Age => self.age,
            ObservationField::Gender => self.gender as f64,
            ObservationField::FamilyHistory => self.family_history as f64,
            ObservationField::Hemoglobin => self.hemoglobin,
            ObservationField::FetalHemoglobin => self.fetal_hemoglobin,
            ObservationField::RdwCv => self.rdw_cv,
            ObservationField::SerumFerritin => self.serum_ferritin,
            ObservationField::Brca1Expression => self.brca1_expression,
            ObservationField::P53Mutation => self.p53_mutation as f64,
            ObservationField::SweatChloride => self.sweat_chloride,
            ObservationField::SickledRbcPercent => self.sickled_rbc_percent,
            ObservationField::Il6Level => self.il6_level,
        }
    }

    /// Rejects values no parser would have produced from a valid form (NaN, infinities).
    /// Observations built in code rather than parsed go through this before prediction.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for field in ObservationField::ALL {
            let value = self.value(field);
            if !value.is_finite() {
                return Err(ValidationError::NonFinite {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Renders the observation back into form shape, e.g. for persistence.
    pub fn form_data(&self) -> FormData {
        ObservationField::ALL
            .iter()
            .map(|&field| {
                let text = match field.kind() {
                    FieldKind::Coded => format!("{}", self.value(field) as i64),
                    FieldKind::Continuous => self.value(field).to_string(),
                };
                (field.form_key().to_string(), text)
            })
            .collect()
    }
}

mod internal {
    use super::*;

    fn present(field: ObservationField, raw: Option<&String>) -> Result<&str, ValidationError> {
        match raw.map(|s| s.trim()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(ValidationError::MissingField(field)),
        }
    }

    pub(super) fn parse_continuous(
        field: ObservationField,
        raw: Option<&String>,
    ) -> Result<f64, ValidationError> {
        let text = present(field, raw)?;
        let value: f64 = text.parse().map_err(|_| ValidationError::Unparseable {
            field,
            value: text.to_string(),
            expected_type: "a decimal number",
        })?;
        if !value.is_finite() {
            return Err(ValidationError::NonFinite {
                field,
                value: text.to_string(),
            });
        }
        Ok(value)
    }

    pub(super) fn parse_coded(
        field: ObservationField,
        raw: Option<&String>,
    ) -> Result<i64, ValidationError> {
        let text = present(field, raw)?;
        text.parse().map_err(|_| ValidationError::Unparseable {
            field,
            value: text.to_string(),
            expected_type: "an integer code",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_form;

    #[test]
    fn test_parse_complete_form() {
        let obs = ClinicalObservation::from_form(&sample_form()).unwrap();
        assert_eq!(obs.age, 45.0);
        assert_eq!(obs.gender, 0);
        assert_eq!(obs.family_history, 1);
        assert_eq!(obs.brca1_expression, 0.2);
        assert_eq!(obs.p53_mutation, 1);
        assert_eq!(obs.il6_level, 3.0);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut form = sample_form();
        form.remove("age");
        match ClinicalObservation::from_form(&form) {
            Err(ValidationError::MissingField(field)) => assert_eq!(field, ObservationField::Age),
            other => panic!("Expected MissingField(age), got {:?}", other),
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut form = sample_form();
        form.insert("sweat_chloride".to_string(), "   ".to_string());
        assert_eq!(
            ClinicalObservation::from_form(&form),
            Err(ValidationError::MissingField(ObservationField::SweatChloride))
        );
    }

    #[test]
    fn test_unparseable_values() {
        let mut form = sample_form();
        form.insert("hemoglobin".to_string(), "low".to_string());
        match ClinicalObservation::from_form(&form) {
            Err(ValidationError::Unparseable { field, value, .. }) => {
                assert_eq!(field, ObservationField::Hemoglobin);
                assert_eq!(value, "low");
            }
            other => panic!("Expected Unparseable(hemoglobin), got {:?}", other),
        }

        // Coded fields are integers; a decimal spelling is not accepted.
        let mut form = sample_form();
        form.insert("gender".to_string(), "1.0".to_string());
        assert!(matches!(
            ClinicalObservation::from_form(&form),
            Err(ValidationError::Unparseable {
                field: ObservationField::Gender,
                ..
            })
        ));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut form = sample_form();
        form.insert("il6_level".to_string(), "NaN".to_string());
        assert!(matches!(
            ClinicalObservation::from_form(&form),
            Err(ValidationError::NonFinite {
                field: ObservationField::Il6Level,
                ..
            })
        ));

        let mut obs = ClinicalObservation::from_form(&sample_form()).unwrap();
        obs.rdw_cv = f64::INFINITY;
        assert!(matches!(
            obs.validate(),
            Err(ValidationError::NonFinite {
                field: ObservationField::RdwCv,
                ..
            })
        ));
    }

    #[test]
    fn test_whitespace_and_extra_keys_tolerated() {
        let mut form = sample_form();
        form.insert("age".to_string(), " 52.5 ".to_string());
        form.insert("csrf_token".to_string(), "abc".to_string());
        let obs = ClinicalObservation::from_form(&form).unwrap();
        assert_eq!(obs.age, 52.5);
    }

    #[test]
    fn test_form_data_reparses_to_same_observation() {
        let obs = ClinicalObservation::from_form(&sample_form()).unwrap();
        let form = obs.form_data();
        assert_eq!(form.len(), 12);
        assert_eq!(form["gender"], "0");
        assert_eq!(ClinicalObservation::from_form(&form).unwrap(), obs);
    }

    #[test]
    fn test_canonical_order_matches_indices() {
        for (i, field) in ObservationField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert_eq!(ObservationField::ALL[0].feature_name(), "Age");
        assert_eq!(ObservationField::ALL[11].feature_name(), "IL6_Level");
    }
}

//! Static reference information for each predictable disease.

use crate::model::DiseaseLabel;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiseaseInfo {
    pub label: DiseaseLabel,
    pub description: &'static str,
    pub inheritance_pattern: &'static str,
    pub genes_involved: &'static [&'static str],
    pub prevalence: &'static str,
    pub symptoms: &'static [&'static str],
    pub risk_factors: &'static [&'static str],
}

impl DiseaseInfo {
    /// Numeric identifier, equal to the label's class index.
    pub fn id(&self) -> usize {
        self.label.index()
    }
}

/// One entry per label, in class-index order.
pub const CATALOG: [DiseaseInfo; DiseaseLabel::COUNT] = [
    DiseaseInfo {
        label: DiseaseLabel::Thalassemia,
        description: "An inherited blood disorder in which the body makes too little of an oxygen-carrying hemoglobin chain.",
        inheritance_pattern: "Autosomal recessive",
        genes_involved: &["HBB", "HBA1", "HBA2"],
        prevalence: "Common in Mediterranean and South Asian populations",
        symptoms: &["Fatigue", "Pale skin", "Shortness of breath"],
        risk_factors: &["Family history", "Ancestry from high-prevalence regions"],
    },
    DiseaseInfo {
        label: DiseaseLabel::Hemophilia,
        description: "A clotting disorder in which blood does not coagulate normally.",
        inheritance_pattern: "X-linked recessive",
        genes_involved: &["F8", "F9"],
        prevalence: "Rare; affects mostly males",
        symptoms: &["Excessive bleeding", "Easy bruising", "Joint pain"],
        risk_factors: &["Family history", "Male sex"],
    },
    DiseaseInfo {
        label: DiseaseLabel::BreastCancer,
        description: "A cancer arising in the cells of the breast.",
        inheritance_pattern: "Multifactorial",
        genes_involved: &["BRCA1", "BRCA2"],
        prevalence: "Common worldwide",
        symptoms: &["Lump in the breast", "Change in breast shape", "Skin changes"],
        risk_factors: &["Family history", "BRCA mutations", "Age"],
    },
    DiseaseInfo {
        label: DiseaseLabel::SickleCellAnemia,
        description: "A group of inherited disorders that deform red blood cells into a sickle shape.",
        inheritance_pattern: "Autosomal recessive",
        genes_involved: &["HBB"],
        prevalence: "Common in African and Mediterranean populations",
        symptoms: &["Pain episodes", "Anemia", "Swelling of hands and feet"],
        risk_factors: &["Family history", "Ancestry from high-prevalence regions"],
    },
    DiseaseInfo {
        label: DiseaseLabel::CysticFibrosis,
        description: "A disorder that thickens secretions and damages the lungs and digestive system.",
        inheritance_pattern: "Autosomal recessive",
        genes_involved: &["CFTR"],
        prevalence: "Rare; most frequent in people of Northern European descent",
        symptoms: &["Persistent cough", "Frequent lung infections", "Poor growth"],
        risk_factors: &["Family history", "Northern European descent"],
    },
];

pub fn disease_info(label: DiseaseLabel) -> &'static DiseaseInfo {
    &CATALOG[label.index()]
}

/// Looks up an entry by its numeric id.
pub fn find(id: usize) -> Option<&'static DiseaseInfo> {
    CATALOG.get(id)
}

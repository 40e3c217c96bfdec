use serde::Serialize;

use super::domain::{DocumentKind, Documents, Modality, ValidationError};

const PRESENCIAL_BASE: &[DocumentKind] = &[
    DocumentKind::Photo,
    DocumentKind::IdentityCard,
    DocumentKind::Cuil,
    DocumentKind::BirthCertificate,
    DocumentKind::MedicalRecord,
];

const SEMIPRESENCIAL_BASE: &[DocumentKind] = &[
    DocumentKind::Photo,
    DocumentKind::IdentityCard,
    DocumentKind::Cuil,
    DocumentKind::BirthCertificate,
];

/// Entering students prove primary school completion.
const ENTRY_PROOF: &[DocumentKind] = &[
    DocumentKind::PrimarySchoolCertificate,
    DocumentKind::PartialTranscript,
];

/// Students joining a later year bring their transcript or a transfer request.
const CONTINUATION_PROOF: &[DocumentKind] = &[
    DocumentKind::PartialTranscript,
    DocumentKind::TransferRequest,
];

/// A single line of the requirements table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Document(DocumentKind),
    AnyOf(&'static [DocumentKind]),
}

impl Requirement {
    fn satisfied_by(self, documents: &Documents) -> bool {
        match self {
            Requirement::Document(kind) => documents.contains_key(&kind),
            Requirement::AnyOf(group) => group.iter().any(|kind| documents.contains_key(kind)),
        }
    }
}

/// Requirement that is still unmet, as reported to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MissingRequirement {
    Document {
        #[serde(rename = "documento")]
        document: DocumentKind,
    },
    AnyOf {
        #[serde(rename = "algunoDe")]
        alternatives: Vec<DocumentKind>,
    },
}

impl MissingRequirement {
    pub fn label(&self) -> String {
        match self {
            MissingRequirement::Document { document } => document.label().to_string(),
            MissingRequirement::AnyOf { alternatives } => {
                let names: Vec<&str> = alternatives.iter().map(|kind| kind.label()).collect();
                format!("uno de: {}", names.join(" o "))
            }
        }
    }
}

impl From<Requirement> for MissingRequirement {
    fn from(requirement: Requirement) -> Self {
        match requirement {
            Requirement::Document(document) => MissingRequirement::Document { document },
            Requirement::AnyOf(group) => MissingRequirement::AnyOf {
                alternatives: group.to_vec(),
            },
        }
    }
}

/// Outcome of comparing uploaded documents against a plan's requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    #[serde(rename = "completo")]
    pub complete: bool,
    #[serde(rename = "faltantes")]
    pub missing: Vec<MissingRequirement>,
}

/// Documents a student must present for a given modality and plan/year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementSet {
    modality: Modality,
    plan: String,
    requirements: Vec<Requirement>,
}

impl RequirementSet {
    /// Look up the decision table. Unknown plans are rejected.
    pub fn for_plan(modality: Modality, plan: &str) -> Result<Self, ValidationError> {
        let normalized = plan.trim().to_ascii_uppercase();

        let (base, proof) = match (modality, normalized.as_str()) {
            (Modality::Presencial, "1") => (PRESENCIAL_BASE, ENTRY_PROOF),
            (Modality::Presencial, "2" | "3") => (PRESENCIAL_BASE, CONTINUATION_PROOF),
            (Modality::Semipresencial, "A") => (SEMIPRESENCIAL_BASE, ENTRY_PROOF),
            (Modality::Semipresencial, "B" | "C") => (SEMIPRESENCIAL_BASE, CONTINUATION_PROOF),
            _ => {
                return Err(ValidationError::UnknownPlan {
                    modality,
                    plan: plan.trim().to_string(),
                })
            }
        };

        let requirements = base
            .iter()
            .copied()
            .map(Requirement::Document)
            .chain(std::iter::once(Requirement::AnyOf(proof)))
            .collect();

        Ok(Self {
            modality,
            plan: normalized,
            requirements,
        })
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn plan(&self) -> &str {
        &self.plan
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn check(&self, documents: &Documents) -> CompletenessReport {
        let missing: Vec<MissingRequirement> = self
            .requirements
            .iter()
            .filter(|requirement| !requirement.satisfied_by(documents))
            .map(|requirement| MissingRequirement::from(*requirement))
            .collect();

        CompletenessReport {
            complete: missing.is_empty(),
            missing,
        }
    }
}

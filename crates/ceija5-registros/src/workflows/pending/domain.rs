use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// National identity number, normalised to its digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dni(String);

impl Dni {
    /// Strip the separators people type (`30.123.456`, `30 123 456`) and require 7-8 digits.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let digits: String = raw
            .chars()
            .filter(|c| !matches!(c, '.' | '-' | ' '))
            .collect();

        if (7..=8).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(digits))
        } else {
            Err(ValidationError::InvalidDni(raw.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dni {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a pending registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationState {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "PROCESADO_Y_Completa")]
    ProcessedComplete,
    #[serde(rename = "PROCESADO_A_PENDIENTES")]
    ProcessedWithPending,
    #[serde(rename = "ANULADO")]
    Annulled,
}

impl RegistrationState {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Pending,
            Self::ProcessedComplete,
            Self::ProcessedWithPending,
            Self::Annulled,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDIENTE",
            Self::ProcessedComplete => "PROCESADO_Y_Completa",
            Self::ProcessedWithPending => "PROCESADO_A_PENDIENTES",
            Self::Annulled => "ANULADO",
        }
    }

    pub const fn is_processed(self) -> bool {
        matches!(self, Self::ProcessedComplete | Self::ProcessedWithPending)
    }

    /// Transitions only move forward; reactivating an annulled record is the one way back.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::ProcessedComplete)
                | (Self::Pending, Self::ProcessedWithPending)
                | (Self::Pending, Self::Annulled)
                | (Self::ProcessedWithPending, Self::ProcessedComplete)
                | (Self::Annulled, Self::Pending)
        )
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Enrollment track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    Presencial,
    Semipresencial,
}

impl Modality {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Presencial => "Presencial",
            Self::Semipresencial => "Semipresencial",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Uploadable document types, keyed by the form field that carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "foto")]
    Photo,
    #[serde(rename = "archivo_dni")]
    IdentityCard,
    #[serde(rename = "archivo_cuil")]
    Cuil,
    #[serde(rename = "archivo_partidaNacimiento")]
    BirthCertificate,
    #[serde(rename = "archivo_fichaMedica")]
    MedicalRecord,
    #[serde(rename = "archivo_certificadoNivelPrimario")]
    PrimarySchoolCertificate,
    #[serde(rename = "archivo_analiticoParcial")]
    PartialTranscript,
    #[serde(rename = "archivo_solicitudPase")]
    TransferRequest,
}

impl DocumentKind {
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Photo => "foto",
            Self::IdentityCard => "archivo_dni",
            Self::Cuil => "archivo_cuil",
            Self::BirthCertificate => "archivo_partidaNacimiento",
            Self::MedicalRecord => "archivo_fichaMedica",
            Self::PrimarySchoolCertificate => "archivo_certificadoNivelPrimario",
            Self::PartialTranscript => "archivo_analiticoParcial",
            Self::TransferRequest => "archivo_solicitudPase",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Photo => "Foto 4x4",
            Self::IdentityCard => "DNI",
            Self::Cuil => "CUIL",
            Self::BirthCertificate => "Partida de nacimiento",
            Self::MedicalRecord => "Ficha médica",
            Self::PrimarySchoolCertificate => "Certificado de nivel primario",
            Self::PartialTranscript => "Analítico parcial",
            Self::TransferRequest => "Solicitud de pase",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Uploaded documents: presence of a key means the file was received.
pub type Documents = BTreeMap<DocumentKind, String>;

/// Personal and enrollment fields captured by the pre-enrollment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDetails {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "modalidad")]
    pub modality: Modality,
    #[serde(rename = "planAnio")]
    pub plan: String,
    #[serde(rename = "domicilio", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl StudentDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::BlankField("nombre"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::BlankField("apellido"));
        }
        if let Some(email) = &self.email {
            let email = email.trim();
            let well_formed = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !well_formed {
                return Err(ValidationError::InvalidEmail(email.to_string()));
            }
        }
        Ok(())
    }

    /// Contact address for notifications, if the student left a usable one.
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// One administrator-granted extension of the submission deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    #[serde(rename = "fecha")]
    pub granted_at: DateTime<Utc>,
    #[serde(rename = "dias")]
    pub days: i64,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "usuario")]
    pub granted_by: String,
}

/// A registration waiting on documents or administrative processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub dni: Dni,
    #[serde(rename = "datos")]
    pub details: StudentDetails,
    #[serde(rename = "estado")]
    pub state: RegistrationState,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "archivos", default)]
    pub documents: Documents,
    #[serde(rename = "alarmaReiniciada", default)]
    pub alarm_reset: bool,
    #[serde(rename = "fechaVencimiento")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "historialExtensiones", default)]
    pub extensions: Vec<ExtensionEntry>,
    #[serde(rename = "fechaProcesado", default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(rename = "procesadoPor", default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    #[serde(rename = "motivoAnulacion", default, skip_serializing_if = "Option::is_none")]
    pub annulment_reason: Option<String>,
}

impl PendingRegistration {
    /// Total days granted through the extension history, `None` on overflow.
    pub fn extension_days(&self) -> Option<i64> {
        self.extensions
            .iter()
            .try_fold(0i64, |total, entry| total.checked_add(entry.days))
    }

    /// Merge uploaded documents, replacing paths for types already present.
    pub fn attach(&mut self, documents: Documents) {
        self.documents.extend(documents);
    }
}

/// Form submission as posted by the pre-enrollment frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSubmission {
    pub dni: String,
    #[serde(rename = "datos")]
    pub details: StudentDetails,
    #[serde(rename = "archivos", default)]
    pub documents: Documents,
    /// Original submission time, used when importing records captured elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Administrator request to extend the deadline ("reiniciar alarma").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmReset {
    #[serde(rename = "diasExtension")]
    pub days: i64,
    #[serde(rename = "motivo", default)]
    pub reason: String,
    #[serde(rename = "usuario")]
    pub requested_by: String,
}

/// Retained trace of a processed registration that was cleaned from the active list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedRegistration {
    pub dni: Dni,
    #[serde(rename = "nombreCompleto")]
    pub full_name: String,
    #[serde(rename = "modalidad")]
    pub modality: Modality,
    #[serde(rename = "estado")]
    pub state: RegistrationState,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "fechaProcesado", default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(rename = "fechaLimpieza")]
    pub cleaned_at: DateTime<Utc>,
}

impl ArchivedRegistration {
    pub fn from_record(record: &PendingRegistration, cleaned_at: DateTime<Utc>) -> Self {
        Self {
            dni: record.dni.clone(),
            full_name: record.details.full_name(),
            modality: record.details.modality,
            state: record.state,
            timestamp: record.timestamp,
            processed_at: record.processed_at,
            cleaned_at,
        }
    }

    /// Same registration: DNI plus creation instant. A DNI can be archived again after a
    /// later re-enrollment, the timestamp tells the two apart.
    pub fn describes(&self, dni: &Dni, timestamp: DateTime<Utc>) -> bool {
        &self.dni == dni && self.timestamp == timestamp
    }
}

/// Input validation failures surfaced to the caller as 422 responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("DNI '{0}' must contain 7 or 8 digits")]
    InvalidDni(String),
    #[error("field '{0}' must not be blank")]
    BlankField(&'static str),
    #[error("email '{0}' is not a valid address")]
    InvalidEmail(String),
    #[error("plan '{plan}' is not offered for modality {modality}")]
    UnknownPlan { modality: Modality, plan: String },
    #[error("extension days must be a positive integer (got {0})")]
    NonPositiveExtension(i64),
    #[error("document {0} has an empty file path")]
    BlankDocumentPath(DocumentKind),
    #[error("at least one document must be supplied")]
    NoDocuments,
}

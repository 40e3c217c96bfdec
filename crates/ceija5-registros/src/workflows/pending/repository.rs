use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ArchivedRegistration, Dni, Documents, PendingRegistration, RegistrationState, StudentDetails,
};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait RegistrationRepository: Send + Sync {
    fn insert(&self, record: PendingRegistration) -> Result<PendingRegistration, RepositoryError>;
    /// Read, change and write back one record as a single step. Nothing is written when
    /// `change` fails; a missing record surfaces as [`RepositoryError::NotFound`].
    fn modify<T, E, F>(&self, dni: &Dni, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut PendingRegistration) -> Result<T, E>,
        E: From<RepositoryError>;
    fn fetch(&self, dni: &Dni) -> Result<Option<PendingRegistration>, RepositoryError>;
    fn list(&self) -> Result<Vec<PendingRegistration>, RepositoryError>;
    /// Drop a record for good.
    fn remove(&self, dni: &Dni) -> Result<PendingRegistration, RepositoryError>;
    /// Move a record out of the active list, keeping an archive entry.
    fn archive(
        &self,
        dni: &Dni,
        cleaned_at: DateTime<Utc>,
    ) -> Result<ArchivedRegistration, RepositoryError>;
    fn archived(&self) -> Result<Vec<ArchivedRegistration>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage JSON could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound e-mail hook. Delivery is best-effort: callers treat failures as warnings.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationTemplate {
    RegistroPendiente,
    AlarmaReiniciada,
    RegistroProcesado,
    RegistroAnulado,
    RecordatorioVencimiento,
}

impl NotificationTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RegistroPendiente => "REGISTRO_PENDIENTE",
            Self::AlarmaReiniciada => "ALARMA_REINICIADA",
            Self::RegistroProcesado => "REGISTRO_PROCESADO",
            Self::RegistroAnulado => "REGISTRO_ANULADO",
            Self::RecordatorioVencimiento => "RECORDATORIO_VENCIMIENTO",
        }
    }
}

/// E-mail request handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "plantilla")]
    pub template: NotificationTemplate,
    pub dni: Dni,
    #[serde(rename = "destinatario")]
    pub recipient: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "detalles")]
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("no async runtime available to deliver notifications")]
    NoRuntime,
}

/// Downstream student-records system fed when a registration is processed.
pub trait EnrollmentGateway: Send + Sync {
    fn enroll(&self, request: EnrollmentRequest) -> Result<(), EnrollmentError>;
}

/// Student record created downstream when a registration leaves PENDIENTE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub dni: Dni,
    #[serde(rename = "datos")]
    pub details: StudentDetails,
    #[serde(rename = "estado")]
    pub state: RegistrationState,
    #[serde(rename = "archivos")]
    pub documents: Documents,
    #[serde(rename = "fechaInscripcion")]
    pub enrolled_at: DateTime<Utc>,
    #[serde(rename = "usuario")]
    pub requested_by: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("enrollment ledger unavailable: {0}")]
    Unavailable(String),
}

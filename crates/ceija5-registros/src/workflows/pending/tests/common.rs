use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::pending::domain::{
    ArchivedRegistration, Dni, DocumentKind, Documents, Modality, PendingRegistration,
    RegistrationSubmission, StudentDetails,
};
use crate::workflows::pending::expiration::ExpirationPolicy;
use crate::workflows::pending::repository::{
    EnrollmentError, EnrollmentGateway, EnrollmentRequest, Notification, NotificationDispatcher,
    NotificationError, RegistrationRepository, RepositoryError,
};
use crate::workflows::pending::{registration_router, PendingRegistrationService};

pub(super) const DNI: &str = "30123456";

pub(super) fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 24, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn details() -> StudentDetails {
    StudentDetails {
        first_name: "Ana".to_string(),
        last_name: "Pérez".to_string(),
        email: Some("ana.perez@example.com".to_string()),
        phone: Some("351 555-0101".to_string()),
        modality: Modality::Presencial,
        plan: "1".to_string(),
        address: Some("Av. Colón 1234, Córdoba".to_string()),
    }
}

pub(super) fn documents(kinds: &[DocumentKind]) -> Documents {
    kinds
        .iter()
        .map(|kind| (*kind, format!("uploads/{DNI}/{}.pdf", kind.field_name())))
        .collect()
}

/// Everything a first-year Presencial student must bring.
pub(super) fn complete_documents() -> Documents {
    documents(&[
        DocumentKind::Photo,
        DocumentKind::IdentityCard,
        DocumentKind::Cuil,
        DocumentKind::BirthCertificate,
        DocumentKind::MedicalRecord,
        DocumentKind::PrimarySchoolCertificate,
    ])
}

pub(super) fn submission() -> RegistrationSubmission {
    RegistrationSubmission {
        dni: "30.123.456".to_string(),
        details: details(),
        documents: documents(&[DocumentKind::Photo, DocumentKind::IdentityCard]),
        timestamp: None,
    }
}

pub(super) fn dni() -> Dni {
    Dni::parse(DNI).expect("valid dni")
}

pub(super) type TestService =
    PendingRegistrationService<MemoryRepository, MemoryNotifier, MemoryEnrollments>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
    Arc<MemoryEnrollments>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let enrollments = Arc::new(MemoryEnrollments::default());
    let service = PendingRegistrationService::new(
        repository.clone(),
        notifier.clone(),
        enrollments.clone(),
        ExpirationPolicy::default(),
    );
    (service, repository, notifier, enrollments)
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    pub(super) records: Mutex<Vec<PendingRegistration>>,
    pub(super) archive: Mutex<Vec<ArchivedRegistration>>,
}

impl RegistrationRepository for MemoryRepository {
    fn insert(&self, record: PendingRegistration) -> Result<PendingRegistration, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.dni == record.dni) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn modify<T, E, F>(&self, dni: &Dni, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut PendingRegistration) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| &existing.dni == dni)
            .ok_or(RepositoryError::NotFound)?;
        let mut draft = slot.clone();
        let outcome = change(&mut draft)?;
        *slot = draft;
        Ok(outcome)
    }

    fn fetch(&self, dni: &Dni) -> Result<Option<PendingRegistration>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.dni == dni).cloned())
    }

    fn list(&self) -> Result<Vec<PendingRegistration>, RepositoryError> {
        Ok(self.records.lock().expect("repository mutex poisoned").clone())
    }

    fn remove(&self, dni: &Dni) -> Result<PendingRegistration, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let index = guard
            .iter()
            .position(|record| &record.dni == dni)
            .ok_or(RepositoryError::NotFound)?;
        Ok(guard.remove(index))
    }

    fn archive(
        &self,
        dni: &Dni,
        cleaned_at: DateTime<Utc>,
    ) -> Result<ArchivedRegistration, RepositoryError> {
        let removed = self.remove(dni)?;
        let entry = ArchivedRegistration::from_record(&removed, cleaned_at);
        self.archive
            .lock()
            .expect("archive mutex poisoned")
            .push(entry.clone());
        Ok(entry)
    }

    fn archived(&self) -> Result<Vec<ArchivedRegistration>, RepositoryError> {
        Ok(self.archive.lock().expect("archive mutex poisoned").clone())
    }
}

impl MemoryRepository {
    pub(super) fn stored(&self, dni: &Dni) -> PendingRegistration {
        self.fetch(dni)
            .expect("fetch succeeds")
            .expect("record present")
    }

    pub(super) fn list_len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryNotifier {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl NotificationDispatcher for OfflineNotifier {
    fn dispatch(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryEnrollments {
    entries: Mutex<BTreeMap<Dni, EnrollmentRequest>>,
}

impl MemoryEnrollments {
    pub(super) fn entries(&self) -> BTreeMap<Dni, EnrollmentRequest> {
        self.entries.lock().expect("enrollment mutex poisoned").clone()
    }
}

impl EnrollmentGateway for MemoryEnrollments {
    fn enroll(&self, request: EnrollmentRequest) -> Result<(), EnrollmentError> {
        self.entries
            .lock()
            .expect("enrollment mutex poisoned")
            .insert(request.dni.clone(), request);
        Ok(())
    }
}

pub(super) struct RejectingEnrollments;

impl EnrollmentGateway for RejectingEnrollments {
    fn enroll(&self, _request: EnrollmentRequest) -> Result<(), EnrollmentError> {
        Err(EnrollmentError::Unavailable("alumnos ledger locked".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl RegistrationRepository for UnavailableRepository {
    fn insert(&self, _record: PendingRegistration) -> Result<PendingRegistration, RepositoryError> {
        Err(RepositoryError::Unavailable("disk offline".to_string()))
    }

    fn modify<T, E, F>(&self, _dni: &Dni, _change: F) -> Result<T, E>
    where
        F: FnOnce(&mut PendingRegistration) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("disk offline".to_string()).into())
    }

    fn fetch(&self, _dni: &Dni) -> Result<Option<PendingRegistration>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk offline".to_string()))
    }

    fn list(&self) -> Result<Vec<PendingRegistration>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk offline".to_string()))
    }

    fn remove(&self, _dni: &Dni) -> Result<PendingRegistration, RepositoryError> {
        Err(RepositoryError::Unavailable("disk offline".to_string()))
    }

    fn archive(
        &self,
        _dni: &Dni,
        _cleaned_at: DateTime<Utc>,
    ) -> Result<ArchivedRegistration, RepositoryError> {
        Err(RepositoryError::Unavailable("disk offline".to_string()))
    }

    fn archived(&self) -> Result<Vec<ArchivedRegistration>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk offline".to_string()))
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    registration_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

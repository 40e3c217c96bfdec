//! JSON-file persistence for pending registrations.
//!
//! The active list is a single JSON array. Every operation reads the file, applies the change
//! and writes it back through a temporary file and a rename. The whole read-change-write runs
//! under the store's mutex, so concurrent handlers cannot lose each other's updates.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::domain::{ArchivedRegistration, Dni, PendingRegistration};
use super::repository::{
    EnrollmentError, EnrollmentGateway, EnrollmentRequest, RegistrationRepository,
    RepositoryError,
};
use crate::config::StorageConfig;

fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RepositoryError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_str(&raw)?)
}

fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<(), RepositoryError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_string_pretty(items)?;
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, json)?;
    fs::rename(&staging, path)?;
    debug!(path = %path.display(), entries = items.len(), "store file written");
    Ok(())
}

fn acquire(lock: &Mutex<()>) -> Result<MutexGuard<'_, ()>, RepositoryError> {
    lock.lock()
        .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
}

/// Registration store backed by `Registros_Pendientes.json` and its archive file.
#[derive(Debug)]
pub struct JsonFileRepository {
    registrations_path: PathBuf,
    archive_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(registrations_path: impl Into<PathBuf>, archive_path: impl Into<PathBuf>) -> Self {
        Self {
            registrations_path: registrations_path.into(),
            archive_path: archive_path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.registrations_path(), config.archive_path())
    }

    pub fn registrations_path(&self) -> &Path {
        &self.registrations_path
    }

    fn position(records: &[PendingRegistration], dni: &Dni) -> Option<usize> {
        records.iter().position(|record| &record.dni == dni)
    }
}

impl RegistrationRepository for JsonFileRepository {
    fn insert(&self, record: PendingRegistration) -> Result<PendingRegistration, RepositoryError> {
        let _guard = acquire(&self.lock)?;
        let mut records: Vec<PendingRegistration> = read_list(&self.registrations_path)?;
        if Self::position(&records, &record.dni).is_some() {
            return Err(RepositoryError::Conflict);
        }
        records.push(record.clone());
        write_list(&self.registrations_path, &records)?;
        Ok(record)
    }

    fn modify<T, E, F>(&self, dni: &Dni, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut PendingRegistration) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let _guard = acquire(&self.lock)?;
        let mut records: Vec<PendingRegistration> = read_list(&self.registrations_path)?;
        let index = Self::position(&records, dni).ok_or(RepositoryError::NotFound)?;
        let outcome = change(&mut records[index])?;
        write_list(&self.registrations_path, &records)?;
        Ok(outcome)
    }

    fn fetch(&self, dni: &Dni) -> Result<Option<PendingRegistration>, RepositoryError> {
        let _guard = acquire(&self.lock)?;
        let records: Vec<PendingRegistration> = read_list(&self.registrations_path)?;
        Ok(records.into_iter().find(|record| &record.dni == dni))
    }

    fn list(&self) -> Result<Vec<PendingRegistration>, RepositoryError> {
        let _guard = acquire(&self.lock)?;
        read_list(&self.registrations_path)
    }

    fn remove(&self, dni: &Dni) -> Result<PendingRegistration, RepositoryError> {
        let _guard = acquire(&self.lock)?;
        let mut records: Vec<PendingRegistration> = read_list(&self.registrations_path)?;
        let index = Self::position(&records, dni).ok_or(RepositoryError::NotFound)?;
        let removed = records.remove(index);
        write_list(&self.registrations_path, &records)?;
        Ok(removed)
    }

    fn archive(
        &self,
        dni: &Dni,
        cleaned_at: DateTime<Utc>,
    ) -> Result<ArchivedRegistration, RepositoryError> {
        let _guard = acquire(&self.lock)?;
        let mut records: Vec<PendingRegistration> = read_list(&self.registrations_path)?;
        let index = Self::position(&records, dni).ok_or(RepositoryError::NotFound)?;
        let removed = records.remove(index);

        let entry = ArchivedRegistration::from_record(&removed, cleaned_at);
        let mut archive: Vec<ArchivedRegistration> = read_list(&self.archive_path)?;
        // A retry after a failed active-list write replaces the earlier entry.
        archive.retain(|existing| !existing.describes(&removed.dni, removed.timestamp));
        archive.push(entry.clone());

        // Archive first: a failure afterwards leaves the record active rather than lost.
        write_list(&self.archive_path, &archive)?;
        write_list(&self.registrations_path, &records)?;
        Ok(entry)
    }

    fn archived(&self) -> Result<Vec<ArchivedRegistration>, RepositoryError> {
        let _guard = acquire(&self.lock)?;
        read_list(&self.archive_path)
    }
}

/// Enrollment gateway that keeps the created student records in `Inscripciones.json`.
#[derive(Debug)]
pub struct JsonFileEnrollmentLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileEnrollmentLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.enrollments_path())
    }

    pub fn entries(&self) -> Result<Vec<EnrollmentRequest>, RepositoryError> {
        let _guard = acquire(&self.lock)?;
        read_list(&self.path)
    }
}

impl EnrollmentGateway for JsonFileEnrollmentLedger {
    /// Upserts by DNI so a student completing documents later updates the same entry.
    fn enroll(&self, request: EnrollmentRequest) -> Result<(), EnrollmentError> {
        let unavailable = |err: RepositoryError| EnrollmentError::Unavailable(err.to_string());

        let _guard = acquire(&self.lock).map_err(unavailable)?;
        let mut entries: Vec<EnrollmentRequest> = read_list(&self.path).map_err(unavailable)?;

        match entries.iter_mut().find(|entry| entry.dni == request.dni) {
            Some(existing) => *existing = request,
            None => entries.push(request),
        }

        write_list(&self.path, &entries).map_err(unavailable)
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    AlarmReset, Dni, Documents, ExtensionEntry, PendingRegistration, RegistrationState,
    RegistrationSubmission, StudentDetails, ValidationError,
};
use super::expiration::{
    parse_timestamp, ExpirationPolicy, ExpirationStatus, ExpirationView, InvalidDateError,
};
use super::repository::{
    EnrollmentError, EnrollmentGateway, EnrollmentRequest, Notification,
    NotificationDispatcher, NotificationTemplate, RegistrationRepository, RepositoryError,
};
use super::requirements::{CompletenessReport, RequirementSet};

/// Service composing the registration store, expiration policy, requirement table and
/// the downstream collaborators.
pub struct PendingRegistrationService<R, N, E> {
    repository: Arc<R>,
    notifier: Arc<N>,
    enrollments: Arc<E>,
    policy: ExpirationPolicy,
}

/// Registration enriched with its alarm and document status at evaluation time.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationView {
    #[serde(flatten)]
    pub registration: PendingRegistration,
    #[serde(rename = "vencimiento")]
    pub expiration: ExpirationView,
    #[serde(rename = "documentacion")]
    pub completeness: CompletenessReport,
}

/// Operation result plus the non-fatal downstream failures it ran into.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    #[serde(rename = "resultado")]
    pub value: T,
    #[serde(rename = "advertencias")]
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    fn new(value: T, warnings: Vec<String>) -> Self {
        Self { value, warnings }
    }
}

/// Administrator request to process one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub dni: String,
    pub requested_by: String,
    /// The administrator checked the paperwork and accepts the student with documents owed.
    pub admin_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessDecision {
    Completa,
    APendientes,
    SinCambios,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    #[serde(rename = "decision")]
    pub decision: ProcessDecision,
    #[serde(rename = "registro")]
    pub registration: RegistrationView,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchProcessSummary {
    #[serde(rename = "procesados")]
    pub processed: Vec<Dni>,
    #[serde(rename = "incompletos")]
    pub incomplete: Vec<Dni>,
    #[serde(rename = "errores")]
    pub failed: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionMode {
    /// Never processed: the record is gone for good.
    Eliminado,
    /// Processed: removed from the active list, archive entry kept.
    Archivado,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionResult {
    pub dni: Dni,
    #[serde(rename = "modo")]
    pub mode: DeletionMode,
}

/// Aggregate counters across the active list and the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationStatistics {
    #[serde(rename = "activos")]
    pub active: usize,
    #[serde(rename = "porEstado")]
    pub by_state: BTreeMap<&'static str, usize>,
    #[serde(rename = "porAlarma")]
    pub by_alarm: BTreeMap<&'static str, usize>,
    #[serde(rename = "archivados")]
    pub archived: usize,
    #[serde(rename = "totalProcesados")]
    pub total_processed: usize,
    #[serde(rename = "conExtension")]
    pub with_extensions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderSummary {
    #[serde(rename = "evaluados")]
    pub evaluated: usize,
    #[serde(rename = "enviados")]
    pub sent: Vec<Dni>,
    #[serde(rename = "sinEmail")]
    pub without_email: Vec<Dni>,
    #[serde(rename = "fallidos")]
    pub failed: Vec<Dni>,
}

impl<R, N, E> PendingRegistrationService<R, N, E>
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        enrollments: Arc<E>,
        policy: ExpirationPolicy,
    ) -> Self {
        Self {
            repository,
            notifier,
            enrollments,
            policy,
        }
    }

    pub fn policy(&self) -> ExpirationPolicy {
        self.policy
    }

    /// Register a form submission, merging into an existing record with the same DNI.
    pub fn submit(
        &self,
        submission: RegistrationSubmission,
        now: DateTime<Utc>,
    ) -> Result<Outcome<RegistrationView>, PendingServiceError> {
        let RegistrationSubmission {
            dni,
            details,
            documents,
            timestamp,
        } = submission;

        let dni = Dni::parse(&dni)?;
        details.validate()?;
        RequirementSet::for_plan(details.modality, &details.plan)?;
        validate_documents(&documents, false)?;

        let record = match self.merge_resubmission(&dni, &details, &documents)? {
            Some(merged) => merged,
            None => {
                let created_at = match timestamp.as_deref() {
                    Some(raw) => parse_timestamp(raw)?,
                    None => now,
                };
                let record = PendingRegistration {
                    dni: dni.clone(),
                    details: details.clone(),
                    state: RegistrationState::Pending,
                    timestamp: created_at,
                    documents: documents.clone(),
                    alarm_reset: false,
                    expires_at: self.policy.deadline(created_at, 0)?,
                    extensions: Vec::new(),
                    processed_at: None,
                    processed_by: None,
                    annulment_reason: None,
                };
                match self.repository.insert(record) {
                    Ok(stored) => {
                        info!(
                            %dni,
                            modality = %stored.details.modality,
                            "pending registration created"
                        );
                        stored
                    }
                    // Another submission for the same DNI got in first: merge into it.
                    Err(RepositoryError::Conflict) => self
                        .merge_resubmission(&dni, &details, &documents)?
                        .ok_or_else(|| PendingServiceError::NotFound(dni.clone()))?,
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let view = self.view(record, now)?;
        let warnings = self
            .notify(
                NotificationTemplate::RegistroPendiente,
                &view.registration,
                deadline_details(&view),
            )
            .into_iter()
            .collect();

        Ok(Outcome::new(view, warnings))
    }

    /// Active registrations ordered by deadline, most urgent first.
    pub fn list(&self, now: DateTime<Utc>) -> Result<Vec<RegistrationView>, PendingServiceError> {
        let mut views = self
            .repository
            .list()?
            .into_iter()
            .map(|record| self.view(record, now))
            .collect::<Result<Vec<_>, _>>()?;

        views.sort_by(|a, b| {
            a.expiration
                .deadline
                .cmp(&b.expiration.deadline)
                .then_with(|| a.registration.dni.cmp(&b.registration.dni))
        });
        Ok(views)
    }

    pub fn get(
        &self,
        dni: &str,
        now: DateTime<Utc>,
    ) -> Result<RegistrationView, PendingServiceError> {
        let record = self.load(dni)?;
        self.view(record, now)
    }

    /// Extend the deadline of a PENDIENTE registration ("reiniciar alarma").
    pub fn reset_alarm(
        &self,
        dni: &str,
        request: AlarmReset,
        now: DateTime<Utc>,
    ) -> Result<Outcome<RegistrationView>, PendingServiceError> {
        if request.days <= 0 {
            return Err(ValidationError::NonPositiveExtension(request.days).into());
        }

        let record = self.modify(dni, |record| {
            if record.state != RegistrationState::Pending {
                return Err(PendingServiceError::NotPending {
                    dni: record.dni.clone(),
                    state: record.state,
                });
            }

            let previous_deadline = record.expires_at;
            record.extensions.push(ExtensionEntry {
                granted_at: now,
                days: request.days,
                reason: request.reason.trim().to_string(),
                granted_by: request.requested_by.trim().to_string(),
            });
            let total_days = record
                .extension_days()
                .ok_or(InvalidDateError::OutOfRange)?;
            record.expires_at = self
                .policy
                .deadline(record.timestamp, total_days)?
                .max(previous_deadline);
            record.alarm_reset = true;
            Ok(record.clone())
        })?;
        info!(
            dni = %record.dni,
            days = request.days,
            by = %request.requested_by,
            deadline = %record.expires_at,
            "alarm reset"
        );

        let view = self.view(record, now)?;
        let mut details = deadline_details(&view);
        details.insert("diasExtension".to_string(), request.days.to_string());
        let warnings = self
            .notify(
                NotificationTemplate::AlarmaReiniciada,
                &view.registration,
                details,
            )
            .into_iter()
            .collect();

        Ok(Outcome::new(view, warnings))
    }

    /// Merge newly uploaded documents into a registration still owing paperwork.
    pub fn attach_documents(
        &self,
        dni: &str,
        documents: Documents,
        now: DateTime<Utc>,
    ) -> Result<RegistrationView, PendingServiceError> {
        validate_documents(&documents, true)?;

        let received: Vec<&str> = documents.keys().map(|kind| kind.field_name()).collect();
        let record = self.modify(dni, |record| {
            if !matches!(
                record.state,
                RegistrationState::Pending | RegistrationState::ProcessedWithPending
            ) {
                return Err(PendingServiceError::NotPending {
                    dni: record.dni.clone(),
                    state: record.state,
                });
            }
            record.attach(documents);
            Ok(record.clone())
        })?;
        debug!(dni = %record.dni, ?received, "documents attached");

        self.view(record, now)
    }

    /// Run the completeness check and move the registration forward when allowed.
    pub fn process(
        &self,
        command: ProcessCommand,
        now: DateTime<Utc>,
    ) -> Result<Outcome<ProcessResult>, PendingServiceError> {
        // The completeness check and the state change see the same version of the record.
        let (record, promotion) = self.modify(&command.dni, |record| {
            let report = self.completeness(record)?;
            let next = match (record.state, report.complete) {
                (RegistrationState::Pending | RegistrationState::ProcessedWithPending, true) => {
                    RegistrationState::ProcessedComplete
                }
                (RegistrationState::Pending, false) if command.admin_verified => {
                    RegistrationState::ProcessedWithPending
                }
                (RegistrationState::Pending | RegistrationState::ProcessedWithPending, false) => {
                    return Ok((record.clone(), None));
                }
                (state, _) => {
                    return Err(PendingServiceError::InvalidTransition {
                        dni: record.dni.clone(),
                        from: state,
                        to: RegistrationState::ProcessedComplete,
                    })
                }
            };
            let from = self.promote(record, next, &command.requested_by, now)?;
            Ok((record.clone(), Some(from)))
        })?;

        let Some(from) = promotion else {
            let registration = self.view(record, now)?;
            return Ok(Outcome::new(
                ProcessResult {
                    decision: ProcessDecision::SinCambios,
                    registration,
                },
                Vec::new(),
            ));
        };

        let warnings = self.announce_processed(&record, from, &command.requested_by);
        let decision = match record.state {
            RegistrationState::ProcessedComplete => ProcessDecision::Completa,
            _ => ProcessDecision::APendientes,
        };
        let registration = self.view(record, now)?;

        Ok(Outcome::new(
            ProcessResult {
                decision,
                registration,
            },
            warnings,
        ))
    }

    /// Process every registration whose documents are complete. Incomplete ones are left as is.
    pub fn process_complete(
        &self,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome<BatchProcessSummary>, PendingServiceError> {
        let mut summary = BatchProcessSummary::default();
        let mut warnings = Vec::new();

        for snapshot in self.repository.list()? {
            if !matches!(
                snapshot.state,
                RegistrationState::Pending | RegistrationState::ProcessedWithPending
            ) {
                continue;
            }

            let dni = snapshot.dni;
            let promoted: Result<_, PendingServiceError> = self.repository.modify(&dni, |record| {
                if !self.completeness(record)?.complete {
                    return Ok(None);
                }
                let from =
                    self.promote(record, RegistrationState::ProcessedComplete, requested_by, now)?;
                Ok(Some((record.clone(), from)))
            });

            match promoted {
                Ok(Some((record, from))) => {
                    warnings.append(&mut self.announce_processed(&record, from, requested_by));
                    summary.processed.push(dni);
                }
                Ok(None) => summary.incomplete.push(dni),
                Err(err) => {
                    warn!(%dni, error = %err, "batch processing skipped registration");
                    summary.failed.insert(dni.to_string(), err.to_string());
                }
            }
        }

        info!(
            processed = summary.processed.len(),
            incomplete = summary.incomplete.len(),
            failed = summary.failed.len(),
            "batch processing finished"
        );
        Ok(Outcome::new(summary, warnings))
    }

    pub fn annul(
        &self,
        dni: &str,
        reason: &str,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome<RegistrationView>, PendingServiceError> {
        let record = self.modify(dni, |record| {
            transition(record, RegistrationState::Annulled)?;
            record.annulment_reason = Some(reason.trim().to_string()).filter(|r| !r.is_empty());
            Ok(record.clone())
        })?;
        info!(dni = %record.dni, by = requested_by, "registration annulled");

        let view = self.view(record, now)?;
        let mut details = BTreeMap::new();
        if let Some(reason) = &view.registration.annulment_reason {
            details.insert("motivo".to_string(), reason.clone());
        }
        let warnings = self
            .notify(
                NotificationTemplate::RegistroAnulado,
                &view.registration,
                details,
            )
            .into_iter()
            .collect();

        Ok(Outcome::new(view, warnings))
    }

    pub fn reactivate(
        &self,
        dni: &str,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> Result<RegistrationView, PendingServiceError> {
        let record = self.modify(dni, |record| {
            transition(record, RegistrationState::Pending)?;
            record.annulment_reason = None;
            Ok(record.clone())
        })?;
        info!(dni = %record.dni, by = requested_by, "registration reactivated");
        self.view(record, now)
    }

    /// Remove unprocessed registrations for good; clean processed ones into the archive.
    pub fn delete(
        &self,
        dni: &str,
        now: DateTime<Utc>,
    ) -> Result<DeletionResult, PendingServiceError> {
        let record = self.load(dni)?;

        let mode = if record.state.is_processed() {
            self.repository.archive(&record.dni, now)?;
            DeletionMode::Archivado
        } else {
            self.repository.remove(&record.dni)?;
            DeletionMode::Eliminado
        };

        info!(dni = %record.dni, state = %record.state, ?mode, "registration deleted");
        Ok(DeletionResult {
            dni: record.dni,
            mode,
        })
    }

    pub fn statistics(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RegistrationStatistics, PendingServiceError> {
        let records = self.repository.list()?;
        let archived = self.repository.archived()?;

        let mut stats = RegistrationStatistics {
            active: records.len(),
            archived: archived.len(),
            ..Default::default()
        };
        for state in RegistrationState::ordered() {
            stats.by_state.insert(state.label(), 0);
        }
        for status in ExpirationStatus::ordered() {
            stats.by_alarm.insert(status.label(), 0);
        }

        for record in &records {
            *stats.by_state.entry(record.state.label()).or_default() += 1;
            if record.state == RegistrationState::Pending {
                let expiration = self.policy.evaluate(record, now)?;
                *stats.by_alarm.entry(expiration.status.label()).or_default() += 1;
            }
            if !record.extensions.is_empty() {
                stats.with_extensions += 1;
            }
        }

        // An entry whose registration is still active was left behind by an interrupted
        // clean-up and is already counted above.
        let archived_only = archived.iter().filter(|entry| {
            !records
                .iter()
                .any(|record| entry.describes(&record.dni, record.timestamp))
        });
        stats.total_processed = records
            .iter()
            .map(|record| record.state)
            .chain(archived_only.map(|entry| entry.state))
            .filter(|state| state.is_processed())
            .count();

        Ok(stats)
    }

    /// Remind every PENDIENTE student whose deadline is close or already gone.
    pub fn send_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReminderSummary, PendingServiceError> {
        let mut summary = ReminderSummary::default();

        for record in self.repository.list()? {
            if record.state != RegistrationState::Pending {
                continue;
            }
            summary.evaluated += 1;

            let view = self.view(record, now)?;
            if !view.expiration.status.needs_reminder() {
                continue;
            }
            if view.registration.details.contact_email().is_none() {
                summary.without_email.push(view.registration.dni.clone());
                continue;
            }

            let mut details = deadline_details(&view);
            let missing: Vec<String> = view
                .completeness
                .missing
                .iter()
                .map(|missing| missing.label())
                .collect();
            details.insert("faltantes".to_string(), missing.join(", "));

            match self.notify(
                NotificationTemplate::RecordatorioVencimiento,
                &view.registration,
                details,
            ) {
                None => summary.sent.push(view.registration.dni.clone()),
                Some(_) => summary.failed.push(view.registration.dni.clone()),
            }
        }

        info!(
            evaluated = summary.evaluated,
            sent = summary.sent.len(),
            failed = summary.failed.len(),
            "expiration reminders dispatched"
        );
        Ok(summary)
    }

    fn load(&self, raw_dni: &str) -> Result<PendingRegistration, PendingServiceError> {
        let dni = Dni::parse(raw_dni)?;
        self.repository
            .fetch(&dni)?
            .ok_or(PendingServiceError::NotFound(dni))
    }

    /// Apply `change` to the stored record in one repository step.
    fn modify<T, F>(&self, raw_dni: &str, change: F) -> Result<T, PendingServiceError>
    where
        F: FnOnce(&mut PendingRegistration) -> Result<T, PendingServiceError>,
    {
        let dni = Dni::parse(raw_dni)?;
        self.repository
            .modify(&dni, change)
            .map_err(|err| match err {
                PendingServiceError::Repository(RepositoryError::NotFound) => {
                    PendingServiceError::NotFound(dni)
                }
                other => other,
            })
    }

    /// Fold a resubmission into the stored record. `None` when the DNI is not on file yet.
    fn merge_resubmission(
        &self,
        dni: &Dni,
        details: &StudentDetails,
        documents: &Documents,
    ) -> Result<Option<PendingRegistration>, PendingServiceError> {
        let merged: Result<_, PendingServiceError> = self.repository.modify(dni, |existing| {
            if existing.state.is_processed() {
                return Err(PendingServiceError::AlreadyProcessed {
                    dni: existing.dni.clone(),
                    state: existing.state,
                });
            }
            if existing.state == RegistrationState::Annulled {
                transition(existing, RegistrationState::Pending)?;
                existing.annulment_reason = None;
                info!(%dni, "annulled registration reactivated by resubmission");
            }
            existing.details = details.clone();
            existing.attach(documents.clone());
            Ok(existing.clone())
        });

        match merged {
            Ok(record) => {
                info!(%dni, "pending registration merged with resubmission");
                Ok(Some(record))
            }
            Err(PendingServiceError::Repository(RepositoryError::NotFound)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn completeness(
        &self,
        record: &PendingRegistration,
    ) -> Result<CompletenessReport, ValidationError> {
        let requirements = RequirementSet::for_plan(record.details.modality, &record.details.plan)?;
        Ok(requirements.check(&record.documents))
    }

    fn view(
        &self,
        record: PendingRegistration,
        now: DateTime<Utc>,
    ) -> Result<RegistrationView, PendingServiceError> {
        let expiration = self.policy.evaluate(&record, now)?;
        let completeness = self.completeness(&record)?;
        Ok(RegistrationView {
            registration: record,
            expiration,
            completeness,
        })
    }

    /// Create the downstream enrollment, then move the record to `next`. Runs inside a
    /// repository step, so a failed enrollment leaves the stored state untouched. Returns the
    /// state the record left.
    fn promote(
        &self,
        record: &mut PendingRegistration,
        next: RegistrationState,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> Result<RegistrationState, PendingServiceError> {
        if !record.state.can_transition_to(next) {
            return Err(PendingServiceError::InvalidTransition {
                dni: record.dni.clone(),
                from: record.state,
                to: next,
            });
        }

        self.enrollments.enroll(EnrollmentRequest {
            dni: record.dni.clone(),
            details: record.details.clone(),
            state: next,
            documents: record.documents.clone(),
            enrolled_at: now,
            requested_by: requested_by.to_string(),
        })?;

        let from = record.state;
        record.state = next;
        record.processed_at = Some(now);
        record.processed_by = Some(requested_by.to_string());
        Ok(from)
    }

    fn announce_processed(
        &self,
        record: &PendingRegistration,
        from: RegistrationState,
        requested_by: &str,
    ) -> Vec<String> {
        info!(
            dni = %record.dni,
            %from,
            to = %record.state,
            by = requested_by,
            "registration processed"
        );

        let mut details = BTreeMap::new();
        details.insert("estado".to_string(), record.state.label().to_string());
        self.notify(NotificationTemplate::RegistroProcesado, record, details)
            .into_iter()
            .collect()
    }

    /// Best-effort e-mail. Returns the warning to surface when delivery could not be scheduled.
    fn notify(
        &self,
        template: NotificationTemplate,
        record: &PendingRegistration,
        details: BTreeMap<String, String>,
    ) -> Option<String> {
        let recipient = match record.details.contact_email() {
            Some(email) => email.to_string(),
            None => {
                debug!(dni = %record.dni, template = template.label(), "no e-mail on file");
                return None;
            }
        };

        let notification = Notification {
            template,
            dni: record.dni.clone(),
            recipient,
            name: record.details.full_name(),
            details,
        };

        match self.notifier.dispatch(notification) {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    dni = %record.dni,
                    template = template.label(),
                    error = %err,
                    "notification failed"
                );
                Some(format!(
                    "no se pudo enviar la notificación {} a {}: {err}",
                    template.label(),
                    record.dni
                ))
            }
        }
    }
}

fn transition(
    record: &mut PendingRegistration,
    next: RegistrationState,
) -> Result<(), PendingServiceError> {
    if record.state.can_transition_to(next) {
        record.state = next;
        Ok(())
    } else {
        Err(PendingServiceError::InvalidTransition {
            dni: record.dni.clone(),
            from: record.state,
            to: next,
        })
    }
}

fn validate_documents(documents: &Documents, require_any: bool) -> Result<(), ValidationError> {
    if require_any && documents.is_empty() {
        return Err(ValidationError::NoDocuments);
    }
    match documents.iter().find(|(_, path)| path.trim().is_empty()) {
        Some((kind, _)) => Err(ValidationError::BlankDocumentPath(*kind)),
        None => Ok(()),
    }
}

fn deadline_details(view: &RegistrationView) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert(
        "fechaVencimiento".to_string(),
        view.expiration.deadline.to_rfc3339(),
    );
    details.insert(
        "estadoAlarma".to_string(),
        view.expiration.status.label().to_string(),
    );
    details.insert(
        "diasRestantes".to_string(),
        view.expiration.days_remaining.to_string(),
    );
    details
}

/// Error raised by the pending registration service.
#[derive(Debug, thiserror::Error)]
pub enum PendingServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidDate(#[from] InvalidDateError),
    #[error("no pending registration for DNI {0}")]
    NotFound(Dni),
    #[error("registration {dni} was already processed ({state})")]
    AlreadyProcessed { dni: Dni, state: RegistrationState },
    #[error("registration {dni} is {state}; only pending registrations accept this action")]
    NotPending { dni: Dni, state: RegistrationState },
    #[error("registration {dni} cannot move from {from} to {to}")]
    InvalidTransition {
        dni: Dni,
        from: RegistrationState,
        to: RegistrationState,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
}

impl PendingServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidDate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) | Self::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            Self::AlreadyProcessed { .. }
            | Self::NotPending { .. }
            | Self::InvalidTransition { .. }
            | Self::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            Self::Enrollment(_) => StatusCode::BAD_GATEWAY,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

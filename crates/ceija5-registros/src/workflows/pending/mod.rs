//! Pending pre-enrollment registrations.
//!
//! A registration stays PENDIENTE while the student still owes documents. It expires one
//! window (a week unless configured longer) after submission unless an administrator
//! extends it, and leaves the pending list once processed, annulled or deleted.

pub mod domain;
pub mod expiration;
pub mod notifier;
pub mod repository;
pub mod requirements;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    AlarmReset, ArchivedRegistration, Dni, DocumentKind, Documents, ExtensionEntry, Modality,
    PendingRegistration, RegistrationState, RegistrationSubmission, StudentDetails,
    ValidationError,
};
pub use expiration::{
    parse_timestamp, ExpirationPolicy, ExpirationStatus, ExpirationView, InvalidDateError,
};
pub use notifier::WebhookNotifier;
pub use repository::{
    EnrollmentError, EnrollmentGateway, EnrollmentRequest, Notification, NotificationDispatcher,
    NotificationError, NotificationTemplate, RegistrationRepository, RepositoryError,
};
pub use requirements::{CompletenessReport, MissingRequirement, Requirement, RequirementSet};
pub use router::registration_router;
pub use service::{
    BatchProcessSummary, DeletionMode, DeletionResult, Outcome, PendingRegistrationService,
    PendingServiceError, ProcessCommand, ProcessDecision, ProcessResult, RegistrationStatistics,
    RegistrationView, ReminderSummary,
};
pub use store::{JsonFileEnrollmentLedger, JsonFileRepository};

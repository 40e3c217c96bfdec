use super::common::*;
use chrono::Duration;
use std::sync::Arc;

use crate::workflows::pending::domain::{
    AlarmReset, ArchivedRegistration, DocumentKind, Modality, RegistrationState, ValidationError,
};
use crate::workflows::pending::expiration::{ExpirationPolicy, ExpirationStatus, InvalidDateError};
use crate::workflows::pending::repository::{NotificationTemplate, RegistrationRepository};
use crate::workflows::pending::service::{
    DeletionMode, PendingRegistrationService, PendingServiceError, ProcessCommand,
    ProcessDecision,
};
use crate::workflows::pending::store::JsonFileRepository;

fn submitted_at_t(service: &TestService) {
    let mut submission = submission();
    submission.timestamp = Some(created_at().to_rfc3339());
    service
        .submit(submission, created_at())
        .expect("submission accepted");
}

fn extension(days: i64) -> AlarmReset {
    AlarmReset {
        days,
        reason: "Turno en Registro Civil".to_string(),
        requested_by: "preceptoria".to_string(),
    }
}

fn process(admin_verified: bool) -> ProcessCommand {
    ProcessCommand {
        dni: DNI.to_string(),
        requested_by: "secretaria".to_string(),
        admin_verified,
    }
}

#[test]
fn submit_creates_pending_registration_with_seven_day_deadline() {
    let (service, repository, notifier, _) = build_service();

    let outcome = service
        .submit(submission(), created_at())
        .expect("submission accepted");

    let view = outcome.value;
    assert!(outcome.warnings.is_empty());
    assert_eq!(view.registration.state, RegistrationState::Pending);
    assert_eq!(view.registration.dni.as_str(), DNI);
    assert_eq!(view.registration.timestamp, created_at());
    assert_eq!(
        view.registration.expires_at,
        created_at() + Duration::days(7)
    );
    assert_eq!(view.expiration.status, ExpirationStatus::Current);
    assert!(!view.completeness.complete);
    assert!(!view.registration.alarm_reset);

    assert_eq!(repository.list().expect("list").len(), 1);
    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].template, NotificationTemplate::RegistroPendiente);
    assert_eq!(events[0].recipient, "ana.perez@example.com");
}

#[test]
fn resubmission_merges_documents_and_keeps_original_timestamp() {
    let (service, repository, _, _) = build_service();
    submitted_at_t(&service);

    let mut again = submission();
    again.documents = documents(&[DocumentKind::Cuil]);
    again.details.phone = Some("351 555-0199".to_string());
    service
        .submit(again, created_at() + Duration::days(2))
        .expect("resubmission merges");

    let stored = repository.stored(&dni());
    assert_eq!(repository.list().expect("list").len(), 1);
    assert_eq!(stored.timestamp, created_at());
    assert_eq!(stored.documents.len(), 3);
    assert_eq!(stored.details.phone.as_deref(), Some("351 555-0199"));
}

#[test]
fn resubmission_after_processing_is_a_conflict() {
    let (service, repository, _, _) = build_service();
    let mut first = submission();
    first.documents = complete_documents();
    service.submit(first, created_at()).expect("submitted");
    service
        .process(process(false), created_at())
        .expect("processed");

    match service.submit(submission(), created_at()) {
        Err(err @ PendingServiceError::AlreadyProcessed { .. }) => {
            assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
        }
        other => panic!("expected already processed error, got {other:?}"),
    }
    assert_eq!(
        repository.stored(&dni()).state,
        RegistrationState::ProcessedComplete
    );
}

#[test]
fn resubmission_reactivates_annulled_registration() {
    let (service, repository, _, _) = build_service();
    submitted_at_t(&service);
    service
        .annul(DNI, "Duplicada", "secretaria", created_at())
        .expect("annulled");

    service
        .submit(submission(), created_at() + Duration::days(1))
        .expect("resubmission accepted");

    let stored = repository.stored(&dni());
    assert_eq!(stored.state, RegistrationState::Pending);
    assert!(stored.annulment_reason.is_none());
}

#[test]
fn submit_validates_plan_and_timestamp() {
    let (service, repository, _, _) = build_service();

    let mut wrong_plan = submission();
    wrong_plan.details.modality = Modality::Semipresencial;
    wrong_plan.details.plan = "2".to_string();
    assert!(matches!(
        service.submit(wrong_plan, created_at()),
        Err(PendingServiceError::Validation(
            ValidationError::UnknownPlan { .. }
        ))
    ));

    let mut bad_date = submission();
    bad_date.timestamp = Some("24/02/2025".to_string());
    assert!(matches!(
        service.submit(bad_date, created_at()),
        Err(PendingServiceError::InvalidDate(
            InvalidDateError::Unparseable(_)
        ))
    ));

    let mut bad_dni = submission();
    bad_dni.dni = "AB123".to_string();
    assert!(matches!(
        service.submit(bad_dni, created_at()),
        Err(PendingServiceError::Validation(ValidationError::InvalidDni(_)))
    ));

    assert!(repository.list().expect("list").is_empty());
}

#[test]
fn registration_expires_one_second_after_window() {
    let (service, _, _, _) = build_service();
    submitted_at_t(&service);

    let at_deadline = service
        .get(DNI, created_at() + Duration::days(7) - Duration::seconds(1))
        .expect("found");
    assert_eq!(at_deadline.expiration.status, ExpirationStatus::Urgent);

    let after = service
        .get(DNI, created_at() + Duration::days(7) + Duration::seconds(1))
        .expect("found");
    assert_eq!(after.expiration.status, ExpirationStatus::Expired);
    assert_eq!(after.expiration.days_remaining, 0);
}

#[test]
fn reset_alarm_rejects_non_positive_days() {
    let (service, repository, _, _) = build_service();
    submitted_at_t(&service);

    for days in [0, -3] {
        match service.reset_alarm(DNI, extension(days), created_at()) {
            Err(PendingServiceError::Validation(ValidationError::NonPositiveExtension(
                value,
            ))) => assert_eq!(value, days),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    let stored = repository.stored(&dni());
    assert!(stored.extensions.is_empty());
    assert!(!stored.alarm_reset);
}

#[test]
fn extensions_accumulate_in_history_and_deadline() {
    let (service, repository, notifier, _) = build_service();
    submitted_at_t(&service);

    let mut previous = repository.stored(&dni()).expires_at;
    for (step, days) in [3, 1, 5].into_iter().enumerate() {
        let outcome = service
            .reset_alarm(
                DNI,
                extension(days),
                created_at() + Duration::days(step as i64 + 6),
            )
            .expect("extension granted");
        let deadline = outcome.value.registration.expires_at;
        assert!(deadline >= previous, "deadline never moves backwards");
        previous = deadline;
    }

    let stored = repository.stored(&dni());
    assert!(stored.alarm_reset);
    assert_eq!(stored.extensions.len(), 3);
    assert_eq!(stored.extension_days(), Some(9));
    assert_eq!(stored.expires_at, created_at() + Duration::days(16));
    assert_eq!(stored.extensions[1].days, 1);
    assert_eq!(stored.extensions[1].granted_by, "preceptoria");

    let alarm_events = notifier
        .events()
        .into_iter()
        .filter(|event| event.template == NotificationTemplate::AlarmaReiniciada)
        .count();
    assert_eq!(alarm_events, 3);
}

#[test]
fn extension_revives_an_expired_registration() {
    let (service, _, _, _) = build_service();
    submitted_at_t(&service);
    let now = created_at() + Duration::days(8);
    assert_eq!(
        service.get(DNI, now).expect("found").expiration.status,
        ExpirationStatus::Expired
    );

    let outcome = service
        .reset_alarm(DNI, extension(5), now)
        .expect("extension granted");
    assert_eq!(outcome.value.expiration.status, ExpirationStatus::Current);
}

#[test]
fn reset_alarm_requires_known_pending_registration() {
    let (service, _, _, _) = build_service();
    match service.reset_alarm("40111222", extension(2), created_at()) {
        Err(err @ PendingServiceError::NotFound(_)) => {
            assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND)
        }
        other => panic!("expected not found, got {other:?}"),
    }

    submitted_at_t(&service);
    service
        .annul(DNI, "Baja voluntaria", "secretaria", created_at())
        .expect("annulled");
    assert!(matches!(
        service.reset_alarm(DNI, extension(2), created_at()),
        Err(PendingServiceError::NotPending {
            state: RegistrationState::Annulled,
            ..
        })
    ));
}

#[test]
fn complete_documents_process_to_completa_and_enroll() {
    let (service, repository, notifier, enrollments) = build_service();
    let mut complete = submission();
    complete.documents = complete_documents();
    service.submit(complete, created_at()).expect("submitted");

    let outcome = service
        .process(process(false), created_at() + Duration::days(1))
        .expect("processed");

    assert_eq!(outcome.value.decision, ProcessDecision::Completa);
    let stored = repository.stored(&dni());
    assert_eq!(stored.state, RegistrationState::ProcessedComplete);
    assert_eq!(stored.processed_by.as_deref(), Some("secretaria"));
    assert_eq!(stored.processed_at, Some(created_at() + Duration::days(1)));

    let entries = enrollments.entries();
    assert_eq!(
        entries.get(&dni()).map(|entry| entry.state),
        Some(RegistrationState::ProcessedComplete)
    );
    assert!(notifier
        .events()
        .iter()
        .any(|event| event.template == NotificationTemplate::RegistroProcesado));
}

#[test]
fn incomplete_documents_stay_pending_without_admin_verification() {
    let (service, repository, _, enrollments) = build_service();
    submitted_at_t(&service);

    let outcome = service
        .process(process(false), created_at())
        .expect("evaluated");

    assert_eq!(outcome.value.decision, ProcessDecision::SinCambios);
    assert!(!outcome.value.registration.completeness.missing.is_empty());
    assert_eq!(repository.stored(&dni()).state, RegistrationState::Pending);
    assert!(enrollments.entries().is_empty());
}

#[test]
fn admin_verification_moves_incomplete_to_pendientes_then_completa() {
    let (service, repository, _, enrollments) = build_service();
    submitted_at_t(&service);

    let outcome = service
        .process(process(true), created_at())
        .expect("processed with documents owed");
    assert_eq!(outcome.value.decision, ProcessDecision::APendientes);
    assert_eq!(
        repository.stored(&dni()).state,
        RegistrationState::ProcessedWithPending
    );

    let mut remaining = complete_documents();
    remaining.remove(&DocumentKind::Photo);
    remaining.remove(&DocumentKind::IdentityCard);
    let view = service
        .attach_documents(DNI, remaining, created_at() + Duration::days(3))
        .expect("documents attached");
    assert!(view.completeness.complete);

    let outcome = service
        .process(process(false), created_at() + Duration::days(3))
        .expect("processed");
    assert_eq!(outcome.value.decision, ProcessDecision::Completa);
    assert_eq!(
        enrollments.entries().get(&dni()).map(|entry| entry.state),
        Some(RegistrationState::ProcessedComplete)
    );
}

#[test]
fn enrollment_failure_leaves_state_untouched() {
    let repository = Arc::new(MemoryRepository::default());
    let service = PendingRegistrationService::new(
        repository.clone(),
        Arc::new(MemoryNotifier::default()),
        Arc::new(RejectingEnrollments),
        ExpirationPolicy::default(),
    );
    let mut complete = submission();
    complete.documents = complete_documents();
    service.submit(complete, created_at()).expect("submitted");

    match service.process(process(false), created_at()) {
        Err(err @ PendingServiceError::Enrollment(_)) => {
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY)
        }
        other => panic!("expected enrollment failure, got {other:?}"),
    }
    assert_eq!(repository.stored(&dni()).state, RegistrationState::Pending);
}

#[test]
fn notification_failures_surface_as_warnings() {
    let repository = Arc::new(MemoryRepository::default());
    let service = PendingRegistrationService::new(
        repository.clone(),
        Arc::new(OfflineNotifier),
        Arc::new(MemoryEnrollments::default()),
        ExpirationPolicy::default(),
    );

    let outcome = service
        .submit(submission(), created_at())
        .expect("submission succeeds despite mail outage");
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("REGISTRO_PENDIENTE"));

    let outcome = service
        .reset_alarm(DNI, extension(2), created_at())
        .expect("extension succeeds despite mail outage");
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(repository.stored(&dni()).extensions.len(), 1);
}

#[test]
fn students_without_email_are_not_notified() {
    let (service, _, notifier, _) = build_service();
    let mut no_email = submission();
    no_email.details.email = None;

    let outcome = service.submit(no_email, created_at()).expect("submitted");
    assert!(outcome.warnings.is_empty());
    assert!(notifier.events().is_empty());
}

#[test]
fn deleting_processed_registration_keeps_counters() {
    let (service, repository, _, _) = build_service();
    let mut complete = submission();
    complete.documents = complete_documents();
    service.submit(complete, created_at()).expect("submitted");
    service
        .process(process(false), created_at())
        .expect("processed");

    let mut other = submission();
    other.dni = "28999000".to_string();
    service.submit(other, created_at()).expect("submitted");

    let before = service.statistics(created_at()).expect("stats");
    assert_eq!(before.total_processed, 1);
    assert_eq!(before.active, 2);

    let result = service.delete(DNI, created_at()).expect("deleted");
    assert_eq!(result.mode, DeletionMode::Archivado);
    assert!(repository.fetch(&dni()).expect("fetch").is_none());

    let after = service.statistics(created_at()).expect("stats");
    assert_eq!(after.active, 1);
    assert_eq!(after.archived, 1);
    assert_eq!(after.total_processed, 1);
    assert_eq!(after.by_state.get("PROCESADO_Y_Completa"), Some(&0));
}

#[test]
fn interrupted_clean_up_is_not_counted_twice() {
    let (service, repository, _, _) = build_service();
    let mut complete = submission();
    complete.documents = complete_documents();
    service.submit(complete, created_at()).expect("submitted");
    service
        .process(process(false), created_at())
        .expect("processed");

    // Archive entry written, active-list write lost.
    let leftover = ArchivedRegistration::from_record(&repository.stored(&dni()), created_at());
    repository
        .archive
        .lock()
        .expect("archive mutex poisoned")
        .push(leftover);

    let stats = service.statistics(created_at()).expect("stats");
    assert_eq!(stats.active, 1);
    assert_eq!(stats.archived, 1);
    assert_eq!(stats.total_processed, 1);
}

#[test]
fn deleting_unprocessed_registration_is_permanent() {
    let (service, repository, _, _) = build_service();
    submitted_at_t(&service);

    let result = service.delete(DNI, created_at()).expect("deleted");
    assert_eq!(result.mode, DeletionMode::Eliminado);
    assert!(repository.list().expect("list").is_empty());
    assert!(repository.archived().expect("archive").is_empty());

    assert!(matches!(
        service.delete(DNI, created_at()),
        Err(PendingServiceError::NotFound(_))
    ));
}

#[test]
fn concurrent_extensions_on_file_store_are_all_recorded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = PendingRegistrationService::new(
        Arc::new(JsonFileRepository::new(
            dir.path().join("Registros_Pendientes.json"),
            dir.path().join("Registros_Pendientes.archivo.json"),
        )),
        Arc::new(MemoryNotifier::default()),
        Arc::new(MemoryEnrollments::default()),
        ExpirationPolicy::default(),
    );
    let mut first = submission();
    first.timestamp = Some(created_at().to_rfc3339());
    service.submit(first, created_at()).expect("submitted");

    std::thread::scope(|scope| {
        for _ in 0..16 {
            scope.spawn(|| {
                service
                    .reset_alarm(DNI, extension(1), created_at())
                    .expect("extension granted");
            });
        }
    });

    let view = service.get(DNI, created_at()).expect("found");
    assert_eq!(view.registration.extensions.len(), 16);
    assert_eq!(
        view.expiration.deadline,
        created_at() + Duration::days(7 + 16)
    );
}

#[test]
fn concurrent_attach_keeps_extensions() {
    let (service, repository, _, _) = build_service();
    submitted_at_t(&service);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..8 {
                service
                    .reset_alarm(DNI, extension(1), created_at())
                    .expect("extension granted");
            }
        });
        scope.spawn(|| {
            for _ in 0..8 {
                service
                    .attach_documents(DNI, documents(&[DocumentKind::Cuil]), created_at())
                    .expect("documents attached");
            }
        });
    });

    let stored = repository.stored(&dni());
    assert_eq!(stored.extensions.len(), 8);
    assert!(stored.documents.contains_key(&DocumentKind::Cuil));
}

#[test]
fn annul_and_reactivate_round_trip() {
    let (service, repository, notifier, _) = build_service();
    submitted_at_t(&service);

    service
        .annul(DNI, "  Documentación apócrifa ", "secretaria", created_at())
        .expect("annulled");
    let stored = repository.stored(&dni());
    assert_eq!(stored.state, RegistrationState::Annulled);
    assert_eq!(
        stored.annulment_reason.as_deref(),
        Some("Documentación apócrifa")
    );
    assert!(notifier
        .events()
        .iter()
        .any(|event| event.template == NotificationTemplate::RegistroAnulado));

    let view = service
        .reactivate(DNI, "secretaria", created_at())
        .expect("reactivated");
    assert_eq!(view.registration.state, RegistrationState::Pending);

    assert!(matches!(
        service.reactivate(DNI, "secretaria", created_at()),
        Err(PendingServiceError::InvalidTransition {
            from: RegistrationState::Pending,
            to: RegistrationState::Pending,
            ..
        })
    ));
}

#[test]
fn processed_registrations_cannot_be_annulled() {
    let (service, _, _, _) = build_service();
    let mut complete = submission();
    complete.documents = complete_documents();
    service.submit(complete, created_at()).expect("submitted");
    service
        .process(process(false), created_at())
        .expect("processed");

    assert!(matches!(
        service.annul(DNI, "error", "secretaria", created_at()),
        Err(PendingServiceError::InvalidTransition {
            from: RegistrationState::ProcessedComplete,
            to: RegistrationState::Annulled,
            ..
        })
    ));
}

#[test]
fn batch_processing_only_moves_complete_registrations() {
    let (service, repository, _, enrollments) = build_service();

    let mut complete = submission();
    complete.documents = complete_documents();
    service.submit(complete, created_at()).expect("submitted");

    let mut incomplete = submission();
    incomplete.dni = "28999000".to_string();
    service.submit(incomplete, created_at()).expect("submitted");

    let outcome = service
        .process_complete("secretaria", created_at())
        .expect("batch runs");

    assert_eq!(outcome.value.processed, vec![dni()]);
    assert_eq!(outcome.value.incomplete.len(), 1);
    assert!(outcome.value.failed.is_empty());
    assert_eq!(enrollments.entries().len(), 1);
    assert_eq!(
        repository.stored(&dni()).state,
        RegistrationState::ProcessedComplete
    );
}

#[test]
fn reminders_target_pending_registrations_near_their_deadline() {
    let (service, _, notifier, _) = build_service();
    submitted_at_t(&service);

    let mut fresh = submission();
    fresh.dni = "28999000".to_string();
    fresh.timestamp = Some((created_at() + Duration::days(5)).to_rfc3339());
    service.submit(fresh, created_at()).expect("submitted");

    let mut silent = submission();
    silent.dni = "27000111".to_string();
    silent.details.email = None;
    silent.timestamp = Some(created_at().to_rfc3339());
    service.submit(silent, created_at()).expect("submitted");

    let before = notifier.events().len();
    let summary = service
        .send_reminders(created_at() + Duration::days(6) + Duration::hours(12))
        .expect("reminders sent");

    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.sent, vec![dni()]);
    assert_eq!(summary.without_email.len(), 1);
    assert!(summary.failed.is_empty());

    let reminders: Vec<_> = notifier.events().into_iter().skip(before).collect();
    assert_eq!(reminders.len(), 1);
    assert_eq!(
        reminders[0].template,
        NotificationTemplate::RecordatorioVencimiento
    );
    assert_eq!(
        reminders[0].details.get("estadoAlarma").map(String::as_str),
        Some("URGENTE")
    );
    assert!(reminders[0].details["faltantes"].contains("CUIL"));
}

#[test]
fn list_orders_by_deadline() {
    let (service, _, _, _) = build_service();
    submitted_at_t(&service);

    let mut older = submission();
    older.dni = "28999000".to_string();
    older.timestamp = Some((created_at() - Duration::days(3)).to_rfc3339());
    service.submit(older, created_at()).expect("submitted");

    let views = service.list(created_at()).expect("list");
    let order: Vec<&str> = views
        .iter()
        .map(|view| view.registration.dni.as_str())
        .collect();
    assert_eq!(order, vec!["28999000", DNI]);
    assert_eq!(views[0].expiration.status, ExpirationStatus::Current);
    assert_eq!(views[0].expiration.days_remaining, 4);
}

#[test]
fn statistics_count_alarm_buckets_for_pending_records() {
    let (service, _, _, _) = build_service();
    submitted_at_t(&service);
    service
        .reset_alarm(DNI, extension(2), created_at())
        .expect("extended");

    let stats = service
        .statistics(created_at() + Duration::days(8) + Duration::hours(1))
        .expect("stats");
    assert_eq!(stats.by_state.get("PENDIENTE"), Some(&1));
    assert_eq!(stats.by_alarm.get("PROXIMO"), Some(&0));
    assert_eq!(stats.by_alarm.get("URGENTE"), Some(&1));
    assert_eq!(stats.with_extensions, 1);
}

#[test]
fn repository_failures_propagate() {
    let service = PendingRegistrationService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifier::default()),
        Arc::new(MemoryEnrollments::default()),
        ExpirationPolicy::default(),
    );

    match service.list(created_at()) {
        Err(err @ PendingServiceError::Repository(_)) => assert_eq!(
            err.status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        ),
        other => panic!("expected repository error, got {other:?}"),
    }
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{AlarmReset, Documents, RegistrationSubmission};
use super::repository::{EnrollmentGateway, NotificationDispatcher, RegistrationRepository};
use super::service::{PendingRegistrationService, PendingServiceError, ProcessCommand};

type SharedService<R, N, E> = Arc<PendingRegistrationService<R, N, E>>;

/// Request body, with malformed JSON kept as a rejection so it can be answered in the
/// same `{"error"}` shape as service failures.
type JsonBody<T> = Result<axum::Json<T>, JsonRejection>;

/// Body of `POST /api/registros-pendientes/procesar`. Without a DNI every complete
/// registration is processed.
#[derive(Debug, Deserialize)]
pub(crate) struct ProcessRequest {
    #[serde(default)]
    pub(crate) dni: Option<String>,
    #[serde(rename = "usuario")]
    pub(crate) requested_by: String,
    #[serde(rename = "verificadoPorAdmin", default)]
    pub(crate) admin_verified: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachRequest {
    #[serde(rename = "archivos")]
    pub(crate) documents: Documents,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnnulRequest {
    #[serde(rename = "motivo", default)]
    pub(crate) reason: String,
    #[serde(rename = "usuario")]
    pub(crate) requested_by: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReactivateRequest {
    #[serde(rename = "usuario")]
    pub(crate) requested_by: String,
}

/// Router builder exposing the pending registration endpoints consumed by the admin panel.
pub fn registration_router<R, N, E>(service: SharedService<R, N, E>) -> Router
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    Router::new()
        .route(
            "/api/registros-pendientes",
            get(list_handler::<R, N, E>).post(submit_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/procesar",
            post(process_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/estadisticas",
            get(statistics_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/recordatorios",
            post(reminders_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/:dni",
            get(get_handler::<R, N, E>).delete(delete_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/:dni/reiniciar-alarma",
            post(reset_alarm_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/:dni/archivos",
            put(attach_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/:dni/anular",
            post(annul_handler::<R, N, E>),
        )
        .route(
            "/api/registros-pendientes/:dni/reactivar",
            post(reactivate_handler::<R, N, E>),
        )
        .with_state(service)
}

fn error_response(error: PendingServiceError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        error!(error = %error, "pending registration request failed");
    }
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({
        "error": rejection.body_text(),
    });
    (rejection.status(), axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, PendingServiceError>,
) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    respond(StatusCode::OK, service.list(Utc::now()))
}

pub(crate) async fn submit_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    payload: JsonBody<RegistrationSubmission>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    let submission = match payload {
        Ok(axum::Json(submission)) => submission,
        Err(rejection) => return rejection_response(rejection),
    };
    respond(StatusCode::CREATED, service.submit(submission, Utc::now()))
}

pub(crate) async fn get_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    Path(dni): Path<String>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    respond(StatusCode::OK, service.get(&dni, Utc::now()))
}

pub(crate) async fn delete_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    Path(dni): Path<String>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    respond(StatusCode::OK, service.delete(&dni, Utc::now()))
}

pub(crate) async fn reset_alarm_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    Path(dni): Path<String>,
    payload: JsonBody<AlarmReset>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    let request = match payload {
        Ok(axum::Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    respond(
        StatusCode::OK,
        service.reset_alarm(&dni, request, Utc::now()),
    )
}

pub(crate) async fn attach_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    Path(dni): Path<String>,
    payload: JsonBody<AttachRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    let request = match payload {
        Ok(axum::Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    respond(
        StatusCode::OK,
        service.attach_documents(&dni, request.documents, Utc::now()),
    )
}

pub(crate) async fn annul_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    Path(dni): Path<String>,
    payload: JsonBody<AnnulRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    let request = match payload {
        Ok(axum::Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    respond(
        StatusCode::OK,
        service.annul(&dni, &request.reason, &request.requested_by, Utc::now()),
    )
}

pub(crate) async fn reactivate_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    Path(dni): Path<String>,
    payload: JsonBody<ReactivateRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    let request = match payload {
        Ok(axum::Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    respond(
        StatusCode::OK,
        service.reactivate(&dni, &request.requested_by, Utc::now()),
    )
}

pub(crate) async fn process_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
    payload: JsonBody<ProcessRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    let request = match payload {
        Ok(axum::Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    let now = Utc::now();
    match request.dni {
        Some(dni) => respond(
            StatusCode::OK,
            service.process(
                ProcessCommand {
                    dni,
                    requested_by: request.requested_by,
                    admin_verified: request.admin_verified,
                },
                now,
            ),
        ),
        None => respond(
            StatusCode::OK,
            service.process_complete(&request.requested_by, now),
        ),
    }
}

pub(crate) async fn statistics_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    respond(StatusCode::OK, service.statistics(Utc::now()))
}

pub(crate) async fn reminders_handler<R, N, E>(
    State(service): State<SharedService<R, N, E>>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationDispatcher + 'static,
    E: EnrollmentGateway + 'static,
{
    respond(StatusCode::OK, service.send_reminders(Utc::now()))
}

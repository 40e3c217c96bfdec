use ceija5_registros::config::AppConfig;
use ceija5_registros::error::AppError;
use ceija5_registros::workflows::pending::{
    parse_timestamp, ExpirationPolicy, JsonFileEnrollmentLedger, JsonFileRepository,
    PendingRegistrationService, WebhookNotifier,
};
use chrono::{DateTime, Utc};
use clap::Args;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store location shared by every command that opens the registration files.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct StoreArgs {
    /// Override the directory holding the registration JSON files
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

/// Load the environment configuration and apply the command-line store override.
pub(crate) fn load_config(store: &StoreArgs) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = &store.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    Ok(config)
}

pub(crate) type RegistrationService =
    PendingRegistrationService<JsonFileRepository, WebhookNotifier, JsonFileEnrollmentLedger>;

/// Wire the file-backed stores and the mail webhook from configuration.
pub(crate) fn build_service(
    config: &AppConfig,
) -> Result<(Arc<RegistrationService>, Arc<WebhookNotifier>), AppError> {
    let repository = Arc::new(JsonFileRepository::from_config(&config.storage));
    let enrollments = Arc::new(JsonFileEnrollmentLedger::from_config(&config.storage));
    let notifier = Arc::new(WebhookNotifier::from_config(&config.notifications)?);
    let policy = ExpirationPolicy::new(config.registrations.window_days);

    let service = Arc::new(PendingRegistrationService::new(
        repository,
        notifier.clone(),
        enrollments,
        policy,
    ));
    Ok((service, notifier))
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).map_err(|err| err.to_string())
}

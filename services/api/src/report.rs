use crate::infra::{build_service, load_config, parse_instant, StoreArgs};
use ceija5_registros::error::AppError;
use ceija5_registros::telemetry;
use ceija5_registros::workflows::pending::{
    RegistrationState, RegistrationStatistics, RegistrationView, ReminderSummary,
};
use chrono::{DateTime, Utc};
use clap::Args;
use std::fmt::Write;

#[derive(Args, Debug, Default)]
pub(crate) struct ExpirationReportArgs {
    /// Evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) at: Option<DateTime<Utc>>,
    /// Only list PENDIENTE registrations that are close to or past their deadline
    #[arg(long)]
    pub(crate) due_only: bool,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReminderArgs {
    /// Evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) at: Option<DateTime<Utc>>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

pub(crate) fn run_expiration_report(args: ExpirationReportArgs) -> Result<(), AppError> {
    let config = load_config(&args.store)?;
    telemetry::init_for_cli(&config.telemetry)?;
    let (service, _) = build_service(&config)?;
    let now = args.at.unwrap_or_else(Utc::now);

    let views = service.list(now)?;
    let stats = service.statistics(now)?;
    print!("{}", render_expiration_report(&views, now, args.due_only));
    print!("{}", render_statistics(&stats));
    Ok(())
}

pub(crate) async fn run_reminders(args: ReminderArgs) -> Result<(), AppError> {
    let config = load_config(&args.store)?;
    telemetry::init_for_cli(&config.telemetry)?;
    let (service, notifier) = build_service(&config)?;
    let now = args.at.unwrap_or_else(Utc::now);

    let summary = service.send_reminders(now)?;
    let undelivered = notifier.flush().await;
    if !notifier.is_enabled() {
        println!("APP_NOTIFY_URL not set: reminders were evaluated but not delivered");
    }
    print!("{}", render_reminder_summary(&summary, undelivered));
    Ok(())
}

pub(crate) fn render_expiration_report(
    views: &[RegistrationView],
    now: DateTime<Utc>,
    due_only: bool,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Registros pendientes al {}", now.format("%Y-%m-%d %H:%M UTC"));

    let rows: Vec<&RegistrationView> = views
        .iter()
        .filter(|view| {
            !due_only
                || (view.registration.state == RegistrationState::Pending
                    && view.expiration.status.needs_reminder())
        })
        .collect();

    if rows.is_empty() {
        let _ = writeln!(out, "  (sin registros)");
        return out;
    }

    for view in rows {
        let registration = &view.registration;
        let _ = writeln!(
            out,
            "- {} {} | {} {} | {} | vence {} | {} ({}d {}h)",
            registration.dni,
            registration.details.full_name(),
            registration.details.modality,
            registration.details.plan,
            registration.state,
            view.expiration.deadline.format("%Y-%m-%d %H:%M"),
            view.expiration.status.label(),
            view.expiration.days_remaining,
            view.expiration.hours_remaining % 24,
        );
        if !registration.extensions.is_empty() {
            let _ = writeln!(
                out,
                "    extensiones: {} (+{} dias)",
                registration.extensions.len(),
                registration.extension_days().unwrap_or_default()
            );
        }
        if !view.completeness.missing.is_empty() {
            let missing: Vec<String> = view
                .completeness
                .missing
                .iter()
                .map(|missing| missing.label())
                .collect();
            let _ = writeln!(out, "    faltan: {}", missing.join(", "));
        }
    }
    out
}

pub(crate) fn render_statistics(stats: &RegistrationStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\nActivos: {} | Archivados: {} | Procesados (total): {} | Con extension: {}",
        stats.active, stats.archived, stats.total_processed, stats.with_extensions
    );
    let by_state: Vec<String> = stats
        .by_state
        .iter()
        .map(|(state, count)| format!("{state}={count}"))
        .collect();
    let _ = writeln!(out, "Por estado: {}", by_state.join(" "));
    let by_alarm: Vec<String> = stats
        .by_alarm
        .iter()
        .map(|(status, count)| format!("{status}={count}"))
        .collect();
    let _ = writeln!(out, "Alarmas (pendientes): {}", by_alarm.join(" "));
    out
}

/// `undelivered` counts scheduled e-mails the webhook did not accept.
pub(crate) fn render_reminder_summary(summary: &ReminderSummary, undelivered: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Recordatorios: {} evaluados | {} enviados | {} sin email | {} fallidos",
        summary.evaluated,
        summary.sent.len().saturating_sub(undelivered),
        summary.without_email.len(),
        summary.failed.len() + undelivered
    );
    for dni in &summary.without_email {
        let _ = writeln!(out, "  - {dni}: sin email de contacto");
    }
    for dni in &summary.failed {
        let _ = writeln!(out, "  - {dni}: envio fallido");
    }
    if undelivered > 0 {
        let _ = writeln!(
            out,
            "  - {undelivered} recordatorio(s) rechazados por el webhook de correo"
        );
    }
    out
}

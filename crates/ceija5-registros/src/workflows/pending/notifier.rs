use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::repository::{Notification, NotificationDispatcher, NotificationError};
use crate::config::NotificationConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts notifications as JSON to the mail relay webhook.
///
/// Delivery is fire-and-forget: `dispatch` only schedules the request on the current tokio
/// runtime. Transport failures are logged by the spawned task and counted until the next
/// [`WebhookNotifier::flush`].
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    endpoint: Option<String>,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
    failed: Arc<AtomicUsize>,
}

impl WebhookNotifier {
    pub fn new(endpoint: Option<String>) -> Result<Self, NotificationError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| NotificationError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            in_flight: Arc::default(),
            failed: Arc::default(),
        })
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        Self::new(config.webhook_url.clone())
    }

    /// Notifier that accepts every notification without sending anything.
    pub fn disabled() -> Result<Self, NotificationError> {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Wait for every delivery scheduled so far and return how many failed since the last
    /// flush. Short-lived commands call this before exiting.
    pub async fn flush(&self) -> usize {
        let handles = match self.in_flight.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        };
        let mut aborted = 0;
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "notification task aborted");
                aborted += 1;
            }
        }
        self.failed.swap(0, Ordering::Relaxed) + aborted
    }
}

impl NotificationDispatcher for WebhookNotifier {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        let Some(endpoint) = self.endpoint.clone() else {
            debug!(
                template = notification.template.label(),
                dni = %notification.dni,
                "notification webhook disabled; skipping delivery"
            );
            return Ok(());
        };

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| NotificationError::NoRuntime)?;
        let http = self.http.clone();
        let failed = Arc::clone(&self.failed);

        let handle = runtime.spawn(async move {
            let template = notification.template.label();
            let dni = notification.dni.clone();
            let sent = http
                .post(&endpoint)
                .json(&notification)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            match sent {
                Ok(response) => {
                    debug!(template, %dni, status = %response.status(), "notification delivered")
                }
                Err(err) => {
                    warn!(template, %dni, error = %err, "notification delivery failed");
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.retain(|task| !task.is_finished());
            in_flight.push(handle);
        }
        Ok(())
    }
}

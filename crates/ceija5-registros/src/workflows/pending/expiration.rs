//! Deadline arithmetic for pending registrations.
//!
//! A registration is due `window + Σ extensions` days after it was created. The remaining
//! time at an evaluation instant drives the alarm shown to administrators.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::PendingRegistration;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

const DUE_SOON_DAYS: i64 = 3;
const URGENT_DAYS: i64 = 1;

/// Raised when a timestamp cannot be parsed or the deadline falls outside chrono's range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDateError {
    #[error("invalid date '{0}': expected an RFC 3339 timestamp")]
    Unparseable(String),
    #[error("deadline overflows the supported date range")]
    OutOfRange,
}

/// Alarm classification derived from the time left before the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpirationStatus {
    /// More than three days left.
    #[serde(rename = "VIGENTE")]
    Current,
    /// Between one and three days left.
    #[serde(rename = "PROXIMO")]
    DueSoon,
    /// Less than a day left.
    #[serde(rename = "URGENTE")]
    Urgent,
    #[serde(rename = "VENCIDO")]
    Expired,
}

impl ExpirationStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Current, Self::DueSoon, Self::Urgent, Self::Expired]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "VIGENTE",
            Self::DueSoon => "PROXIMO",
            Self::Urgent => "URGENTE",
            Self::Expired => "VENCIDO",
        }
    }

    /// Whether the student should be reminded to finish the upload.
    pub const fn needs_reminder(self) -> bool {
        !matches!(self, Self::Current)
    }
}

/// Snapshot of a registration's deadline at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpirationView {
    #[serde(rename = "fechaVencimiento")]
    pub deadline: DateTime<Utc>,
    #[serde(rename = "estadoAlarma")]
    pub status: ExpirationStatus,
    #[serde(rename = "diasRestantes")]
    pub days_remaining: i64,
    #[serde(rename = "horasRestantes")]
    pub hours_remaining: i64,
}

/// Expiration window applied to every pending registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    window_days: i64,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl ExpirationPolicy {
    /// Windows shorter than the standard seven days are raised to it.
    pub fn new(window_days: i64) -> Self {
        Self {
            window_days: window_days.max(DEFAULT_WINDOW_DAYS),
        }
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    pub fn deadline(
        &self,
        created_at: DateTime<Utc>,
        extension_days: i64,
    ) -> Result<DateTime<Utc>, InvalidDateError> {
        let total_days = self
            .window_days
            .checked_add(extension_days)
            .ok_or(InvalidDateError::OutOfRange)?;
        let offset = Duration::try_days(total_days).ok_or(InvalidDateError::OutOfRange)?;
        created_at
            .checked_add_signed(offset)
            .ok_or(InvalidDateError::OutOfRange)
    }

    pub fn classify(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> ExpirationStatus {
        let remaining = deadline.signed_duration_since(now);

        if remaining <= Duration::zero() {
            ExpirationStatus::Expired
        } else if remaining < Duration::days(URGENT_DAYS) {
            ExpirationStatus::Urgent
        } else if remaining <= Duration::days(DUE_SOON_DAYS) {
            ExpirationStatus::DueSoon
        } else {
            ExpirationStatus::Current
        }
    }

    /// Recompute the deadline from the creation time and the extension history.
    pub fn evaluate(
        &self,
        registration: &PendingRegistration,
        now: DateTime<Utc>,
    ) -> Result<ExpirationView, InvalidDateError> {
        let extension_days = registration
            .extension_days()
            .ok_or(InvalidDateError::OutOfRange)?;
        let deadline = self.deadline(registration.timestamp, extension_days)?;
        let remaining = deadline.signed_duration_since(now);

        Ok(ExpirationView {
            deadline,
            status: self.classify(deadline, now),
            days_remaining: remaining.num_days().max(0),
            hours_remaining: remaining.num_hours().max(0),
        })
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, InvalidDateError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| InvalidDateError::Unparseable(raw.to_string()))
}

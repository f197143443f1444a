//! Remote alert identity validation.
//!
//! Validation is soft: it decorates a binding with a status and reason but
//! never blocks a local write. A provider failure or missing credential
//! yields `unknown`; only a missing credential skips the validation
//! timestamp, because no call was attempted.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::{AlertProvider, ProviderError, RemoteAlert};
use crate::models::alert_binding::ValidationStatus;

/// Outcome of validating one remote alert id.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    /// Human-readable reason when status is not `valid`
    pub error: Option<String>,
    /// Recorded whenever a provider call was attempted
    pub checked_at: Option<DateTimeWithTimeZone>,
    /// The matching remote alert, when one was found
    pub alert: Option<RemoteAlert>,
    /// `Some(false)` means the provider was reachable and the alert is
    /// definitively absent
    pub found: Option<bool>,
}

impl ValidationOutcome {
    /// True when the provider answered and the alert does not exist.
    pub fn definitely_absent(&self) -> bool {
        self.found == Some(false)
    }
}

/// Check a remote alert id against the provider's alert directory.
pub async fn validate_alert(
    provider: &dyn AlertProvider,
    remote_alert_id: &str,
) -> ValidationOutcome {
    match provider.list_alerts().await {
        Ok(alerts) => {
            let now = Utc::now().fixed_offset();
            match alerts.into_iter().find(|a| a.id == remote_alert_id) {
                Some(alert) if alert.is_active => ValidationOutcome {
                    status: ValidationStatus::Valid,
                    error: None,
                    checked_at: Some(now),
                    alert: Some(alert),
                    found: Some(true),
                },
                Some(alert) => ValidationOutcome {
                    status: ValidationStatus::Invalid,
                    error: Some(format!(
                        "remote alert '{}' exists but is inactive",
                        remote_alert_id
                    )),
                    checked_at: Some(now),
                    alert: Some(alert),
                    found: Some(true),
                },
                None => ValidationOutcome {
                    status: ValidationStatus::Invalid,
                    error: Some(format!(
                        "remote alert '{}' was not found at the provider",
                        remote_alert_id
                    )),
                    checked_at: Some(now),
                    alert: None,
                    found: Some(false),
                },
            }
        }
        Err(ProviderError::MissingCredential) => ValidationOutcome {
            status: ValidationStatus::Unknown,
            error: Some("no provider credential configured".to_string()),
            checked_at: None,
            alert: None,
            found: None,
        },
        Err(err) => {
            tracing::warn!(remote_alert_id, error = %err, "Remote validation failed");
            ValidationOutcome {
                status: ValidationStatus::Unknown,
                error: Some(err.to_string()),
                checked_at: Some(Utc::now().fixed_offset()),
                alert: None,
                found: None,
            }
        }
    }
}

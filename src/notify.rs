// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Notification gateway
//!
//! [`Notifier`] sends a text message to a recipient. Adapters:
//!
//! - `TwilioNotifier` (feature `sms`): Twilio Messages REST API
//! - [`LogNotifier`]: logs and records messages without sending
//!
//! [`AlertChannel`] pairs a notifier with its recipient. It is built from
//! the environment; when settings are missing, alerting is disabled and the
//! rest of the system keeps running.

use crate::error::NotifyError;
use crate::geo::Coordinate;
use crate::risk::RiskOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Twilio account SID variable
pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
/// Twilio auth token variable
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
/// Sender number variable
pub const ENV_FROM_NUMBER: &str = "TWILIO_FROM_NUMBER";
/// Alert recipient variable
pub const ENV_RECIPIENT: &str = "MOOTRACK_ALERT_RECIPIENT";

/// Provider-assigned message id
pub type DeliveryId = String;

/// Outbound text messaging
pub trait Notifier: Send + Sync {
    /// Send `body` to `to`
    fn send(&self, body: &str, to: &str) -> Result<DeliveryId, NotifyError>;
}

/// Alert text for one animal
pub fn alert_message(
    entity_id: &str,
    location: &Coordinate,
    in_forest: bool,
    risk: &RiskOutcome,
) -> String {
    format!(
        "ALERT!\nCow: {}\nLocation: {}\nForest: {}\nLeopard Risk: {}",
        entity_id,
        location,
        if in_forest { "Yes" } else { "No" },
        risk
    )
}

fn require_env(name: &'static str) -> Result<String, NotifyError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(NotifyError::MissingSetting(name)),
    }
}

/// Twilio credentials and sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl SmsSettings {
    /// Read settings from the environment
    pub fn from_env() -> Result<Self, NotifyError> {
        Ok(Self {
            account_sid: require_env(ENV_ACCOUNT_SID)?,
            auth_token: require_env(ENV_AUTH_TOKEN)?,
            from_number: require_env(ENV_FROM_NUMBER)?,
        })
    }
}

#[cfg(feature = "sms")]
pub use twilio::TwilioNotifier;

#[cfg(feature = "sms")]
mod twilio {
    use super::{DeliveryId, Notifier, SmsSettings};
    use crate::error::NotifyError;
    use serde::Deserialize;
    use std::time::Duration;

    const API_BASE: &str = "https://api.twilio.com/2010-04-01";

    #[derive(Deserialize)]
    struct MessageResponse {
        sid: String,
    }

    /// Sends SMS through the Twilio Messages API
    pub struct TwilioNotifier {
        client: reqwest::blocking::Client,
        settings: SmsSettings,
        base_url: String,
    }

    impl TwilioNotifier {
        pub fn new(settings: SmsSettings) -> Result<Self, NotifyError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .map_err(|e| NotifyError::Transport(e.to_string()))?;
            Ok(Self {
                client,
                settings,
                base_url: API_BASE.to_string(),
            })
        }

        /// Point at a different API root (e.g. a local mock)
        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = base_url.into();
            self
        }

        fn messages_url(&self) -> String {
            format!(
                "{}/Accounts/{}/Messages.json",
                self.base_url.trim_end_matches('/'),
                self.settings.account_sid
            )
        }
    }

    impl Notifier for TwilioNotifier {
        fn send(&self, body: &str, to: &str) -> Result<DeliveryId, NotifyError> {
            let params = [
                ("To", to),
                ("From", self.settings.from_number.as_str()),
                ("Body", body),
            ];
            let response = self
                .client
                .post(self.messages_url())
                .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
                .form(&params)
                .send()
                .map_err(|e| NotifyError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            let message: MessageResponse = response
                .json()
                .map_err(|e| NotifyError::Transport(e.to_string()))?;
            Ok(message.sid)
        }
    }

}

/// Dry-run notifier: logs every message and keeps a copy
#[derive(Debug, Default)]
pub struct LogNotifier {
    counter: AtomicU64,
    sent: Mutex<Vec<(String, String)>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(recipient, body)` pairs sent so far
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl Notifier for LogNotifier {
    fn send(&self, body: &str, to: &str) -> Result<DeliveryId, NotifyError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        log::info!("[dry-run] SMS to {}:\n{}", to, body);
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((to.to_string(), body.to_string()));
        Ok(format!("dry-run-{}", n))
    }
}

/// A notifier bound to its recipient
pub struct AlertChannel {
    notifier: Box<dyn Notifier>,
    recipient: String,
}

impl AlertChannel {
    pub fn new(notifier: Box<dyn Notifier>, recipient: impl Into<String>) -> Self {
        Self {
            notifier,
            recipient: recipient.into(),
        }
    }

    /// Build from the environment, or `None` (logged) when a setting is
    /// missing. `recipient` overrides [`ENV_RECIPIENT`].
    pub fn from_env(recipient: Option<&str>) -> Option<Self> {
        let result = Self::try_from_env(recipient);
        match result {
            Ok(channel) => Some(channel),
            Err(e) => {
                log::warn!("SMS alerts disabled: {}", e);
                None
            }
        }
    }

    #[cfg(feature = "sms")]
    fn try_from_env(recipient: Option<&str>) -> Result<Self, NotifyError> {
        let recipient = match recipient {
            Some(r) if !r.trim().is_empty() => r.to_string(),
            _ => require_env(ENV_RECIPIENT)?,
        };
        let notifier = TwilioNotifier::new(SmsSettings::from_env()?)?;
        Ok(Self::new(Box::new(notifier), recipient))
    }

    #[cfg(not(feature = "sms"))]
    fn try_from_env(_recipient: Option<&str>) -> Result<Self, NotifyError> {
        Err(NotifyError::Transport(
            "built without the `sms` feature".to_string(),
        ))
    }

    /// Dry-run channel logging to `recipient`
    pub fn dry_run(recipient: impl Into<String>) -> Self {
        Self::new(Box::new(LogNotifier::new()), recipient)
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Send `body` to the bound recipient
    pub fn deliver(&self, body: &str) -> Result<DeliveryId, NotifyError> {
        self.notifier.send(body, &self.recipient)
    }
}

impl std::fmt::Debug for AlertChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertChannel")
            .field("recipient", &self.recipient)
            .finish_non_exhaustive()
    }
}

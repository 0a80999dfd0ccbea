//! Webhook alert delivery.
//!
//! Each alert is POSTed as
//! `{"alert": <rule_name>, "severity": <severity>, "details": <alert>}`
//! with the configured headers. Only HTTP 200 counts as delivered.

use std::time::Duration;

use logwarden_core::config::NotifierConfig;
use logwarden_core::error::{ConfigError, LogwardenError};
use logwarden_core::pipeline::Notifier;
use logwarden_core::types::Alert;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Notifier posting alerts to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    /// Build from `[notifier]`. An empty `webhook_url` disables delivery.
    pub fn from_config(config: &NotifierConfig) -> Result<Self, LogwardenError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let field = format!("notifier.headers.{key}");
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| invalid(&field, e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(&field, e.to_string()))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| invalid("notifier", e.to_string()))?;

        let url = Some(config.webhook_url.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_owned);
        if url.is_none() {
            tracing::info!("webhook_url not set, alert delivery disabled");
        }

        Ok(Self { client, url })
    }

    /// Whether a webhook URL is configured.
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

fn invalid(field: &str, reason: String) -> LogwardenError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// Request body sent for one alert.
pub fn webhook_payload(alert: &Alert) -> serde_json::Value {
    serde_json::json!({
        "alert": alert.rule_name,
        "severity": alert.severity,
        "details": alert,
    })
}

impl Notifier for WebhookNotifier {
    async fn deliver(&self, alert: &Alert) -> bool {
        let Some(url) = &self.url else {
            tracing::debug!(alert_id = %alert.id, "webhook disabled, alert not sent");
            return false;
        };

        match self.client.post(url).json(&webhook_payload(alert)).send().await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                tracing::warn!(
                    alert_id = %alert.id,
                    status = %response.status(),
                    "webhook rejected alert"
                );
                false
            }
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "failed to send webhook");
                false
            }
        }
    }
}

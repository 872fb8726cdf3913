/// Best-effort Slack webhook notifications

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

const WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Posts human-readable status lines to a Slack-compatible webhook.
/// Delivery is best-effort: every failure is logged and swallowed so a
/// broken webhook can never take the trading loop down with it.
#[derive(Clone)]
pub struct Notifier {
    webhook_url: Option<String>,
    client: Client,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: Client::builder()
                .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
                .build()
                .expect("failed to create webhook HTTP client"),
        }
    }

    pub async fn send(&self, message: &str) {
        let Some(url) = &self.webhook_url else {
            debug!(message, "notification webhook not configured, dropping message");
            return;
        };

        let payload = json!({ "text": message });
        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "webhook rejected notification");
            }
            Err(error) => {
                warn!(%error, "failed to deliver notification");
            }
        }
    }
}

//! Webhook delivery — POSTs outbound pushes as JSON to an external
//! endpoint (the chat service's send API, Zapier, n8n, ...).

use async_trait::async_trait;

use pingpal_core::error::{PingPalError, Result};
use pingpal_core::traits::Delivery;

pub struct WebhookDelivery {
    url: String,
    client: reqwest::Client,
}

impl WebhookDelivery {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl Delivery for WebhookDelivery {
    async fn send(&self, user_id: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "user_id": user_id,
            "text": text,
            "sent_at": chrono::Utc::now().to_rfc3339(),
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PingPalError::Delivery(format!("webhook send failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PingPalError::Delivery(format!(
                "webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

//! SendGrid mail-send transport.

use super::{EmailTransport, SendError, SenderIdentity};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// No send may hang past this; exceeding it surfaces as a network failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SendGrid v3 REST transport: one bearer-authenticated HTTPS request per
/// message, 2xx is the only success signal.
pub struct SendGridTransport {
    client: reqwest::Client,
    api_key: String,
    sender: SenderIdentity,
}

impl SendGridTransport {
    pub fn new(api_key: String, sender: SenderIdentity) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SendError::InvalidConfig(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            sender,
        })
    }
}

#[async_trait]
impl EmailTransport for SendGridTransport {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<(), SendError> {
        let mut from = json!({ "email": self.sender.address });
        if let Some(name) = &self.sender.name {
            from["name"] = json!(name);
        }

        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": from,
            "subject": subject,
            "content": [
                { "type": "text/plain", "value": text },
                { "type": "text/html", "value": html },
            ],
        });

        let response = self
            .client
            .post(SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::TransportRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

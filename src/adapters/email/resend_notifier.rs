//! Resend implementation of the `Notifier` port.
//!
//! ```ignore
//! let notifier = ResendNotifier::new(api_key, "EV Marketplace <noreply@ev.example>");
//! notifier.send(EmailMessage::new(to, subject, html)).await?;
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::ports::{EmailMessage, Notifier, NotifierError};

const DEFAULT_API_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct ResendNotifier {
    api_key: SecretString,
    from: String,
    api_base_url: String,
    http_client: reqwest::Client,
}

impl ResendNotifier {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from: from.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    fn classify(status: reqwest::StatusCode, body: &str) -> NotifierError {
        let parsed = serde_json::from_str::<ResendErrorBody>(body).ok();
        let detail = parsed
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| format!("HTTP {}", status));

        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return NotifierError::Unavailable(detail);
        }
        let invalid_to = parsed
            .and_then(|b| b.name)
            .is_some_and(|name| name == "validation_error" && detail.contains("to"));
        if invalid_to {
            NotifierError::InvalidRecipient(detail)
        } else {
            NotifierError::Rejected(detail)
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifierError> {
        if !message.to.contains('@') {
            return Err(NotifierError::InvalidRecipient(message.to));
        }

        let url = format!("{}/emails", self.api_base_url);
        let body = SendEmailRequest {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html_body,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifierError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify(status, &text));
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| NotifierError::Unavailable(format!("Unreadable Resend response: {}", e)))?;

        tracing::debug!(email_id = %sent.id, subject = %message.subject, "Email accepted by Resend");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn request_body_matches_resend_shape() {
        let body = SendEmailRequest {
            from: "EV Marketplace <noreply@ev.example>",
            to: ["buyer@ev.example"],
            subject: "Your signing code",
            html: "<p>123456</p>",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"][0], "buyer@ev.example");
        assert_eq!(json["html"], "<p>123456</p>");
    }

    #[test]
    fn server_errors_are_unavailable() {
        let err = ResendNotifier::classify(StatusCode::BAD_GATEWAY, "");
        assert!(matches!(err, NotifierError::Unavailable(_)));
    }

    #[test]
    fn validation_errors_on_recipient() {
        let body = r#"{"name": "validation_error", "message": "Invalid `to` field."}"#;
        let err = ResendNotifier::classify(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(matches!(err, NotifierError::InvalidRecipient(_)));
    }

    #[test]
    fn other_client_errors_are_rejections() {
        let body = r#"{"name": "invalid_from_address", "message": "Domain not verified"}"#;
        let err = ResendNotifier::classify(StatusCode::FORBIDDEN, body);
        assert!(matches!(err, NotifierError::Rejected(ref m) if m == "Domain not verified"));
    }

    #[tokio::test]
    async fn malformed_recipient_is_refused_locally() {
        let notifier = ResendNotifier::new("re_test", "noreply@ev.example")
            .with_base_url("http://127.0.0.1:9");
        let err = notifier
            .send(EmailMessage::new("not-an-address", "s", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifierError::InvalidRecipient(_)));
    }
}

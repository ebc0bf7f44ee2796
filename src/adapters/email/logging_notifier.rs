//! Notifier that only logs. Selected when no email provider is configured.

use async_trait::async_trait;

use crate::ports::{EmailMessage, Notifier, NotifierError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifierError> {
        // Body is omitted: it may carry a signing code
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.html_body.len(),
            "Email delivery skipped (no provider configured)"
        );
        Ok(())
    }
}

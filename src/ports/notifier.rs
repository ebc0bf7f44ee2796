//! Notifier port - outbound email.
//!
//! Delivery is fire-and-forget from the domain's point of view: callers log
//! a failure and carry on.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("Recipient address rejected: {0}")]
    InvalidRecipient(String),

    #[error("Email provider rejected the message: {0}")]
    Rejected(String),

    #[error("Email provider unreachable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifierError>;
}

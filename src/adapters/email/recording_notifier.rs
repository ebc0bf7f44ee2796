//! Notifier test double that keeps every message.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ports::{EmailMessage, Notifier, NotifierError};

/// Records sent messages; can be switched to fail every send.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails as if the provider were down.
    pub fn failing() -> Self {
        let notifier = Self::new();
        *lock(&notifier.failing) = true;
        notifier
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        lock(&self.sent).clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<EmailMessage> {
        lock(&self.sent)
            .iter()
            .filter(|m| m.to == address)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.sent).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifierError> {
        if *lock(&self.failing) {
            return Err(NotifierError::Unavailable("recording notifier set to fail".into()));
        }
        lock(&self.sent).push(message);
        Ok(())
    }
}

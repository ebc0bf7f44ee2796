//! Outbound email adapters.
//!
//! - `ResendNotifier` - Resend HTTP API
//! - `LoggingNotifier` - logs instead of sending (development)
//! - `RecordingNotifier` - keeps messages in memory (tests)

mod logging_notifier;
mod recording_notifier;
mod resend_notifier;

pub use logging_notifier::LoggingNotifier;
pub use recording_notifier::RecordingNotifier;
pub use resend_notifier::ResendNotifier;

//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port: hosted checkout sessions,
//! subscription lookups and webhook verification.
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay (5-minute window)
//! - Secrets are held in `secrecy::SecretString`

mod mock_payment_gateway;
mod stripe_gateway;
mod webhook_types;

pub use mock_payment_gateway::MockPaymentGateway;
pub use stripe_gateway::{StripeConfig, StripeGateway};
pub use webhook_types::{
    hex_encode, parse_event, SignatureHeader, SignatureParseError, StripeCheckoutSession,
    StripeInvoice, StripeSubscription, StripeWebhookEvent,
};

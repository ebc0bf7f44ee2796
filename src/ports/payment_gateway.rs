//! Payment gateway port.
//!
//! Hosted checkout creation, subscription lookups and webhook verification.
//! The gateway is the source of truth for payment state; the purchase ledger
//! caches only the last payload and the subscription id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode, ListingId, Timestamp, UserId, VipPlanId};
use crate::domain::vip::{BillingInterval, OrderCode};

/// Metadata key carrying the order code on checkout sessions.
pub const METADATA_ORDER_CODE: &str = "orderCode";
/// Metadata key carrying the promoted period length.
pub const METADATA_DURATION_DAYS: &str = "durationDays";

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    ///
    /// `request.idempotency_key` must be forwarded so a retried call cannot
    /// open a second session for the same order.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Look up a subscription's current billing state.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, PaymentError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Errors
    ///
    /// - `InvalidWebhook` for a bad or stale signature, or an unparseable body
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, PaymentError>;
}

/// Charge once, or start a recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// One purchasable line on the checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineItem {
    /// A price already configured at the gateway.
    Price { price_id: String, quantity: u32 },

    /// Price data supplied inline.
    Inline {
        name: String,
        unit_amount: i64,
        currency: String,
        recurring: Option<(BillingInterval, u32)>,
        quantity: u32,
    },
}

/// Metadata echoed back on the completed checkout event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub order_code: OrderCode,
    pub user_id: UserId,
    pub plan_id: VipPlanId,
    pub listing_id: ListingId,
    pub purchase_type: String,
    pub duration_days: i64,
}

impl CheckoutMetadata {
    /// Key/value pairs as sent to the gateway.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (METADATA_ORDER_CODE, self.order_code.to_string()),
            ("userId", self.user_id.to_string()),
            ("planId", self.plan_id.to_string()),
            ("postId", self.listing_id.to_string()),
            ("type", self.purchase_type.clone()),
            (METADATA_DURATION_DAYS, self.duration_days.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub mode: CheckoutMode,
    pub line_items: Vec<LineItem>,
    pub metadata: CheckoutMetadata,
    pub idempotency_key: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Gateway subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    Unknown,
}

impl SubscriptionStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "unpaid" => SubscriptionStatus::Unpaid,
            "incomplete" => SubscriptionStatus::Incomplete,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Unknown,
        }
    }

    /// Statuses that end the promotion immediately.
    pub fn is_lapsed(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Canceled | SubscriptionStatus::PastDue | SubscriptionStatus::Unpaid
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
}

/// A verified webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub id: String,
    pub event_type: GatewayEventType,
    pub data: GatewayEventData,

    /// The event body as received, cached on the ledger row.
    pub raw: JsonValue,

    /// When the event occurred (Unix timestamp).
    pub created_at: i64,

    pub livemode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventType {
    CheckoutSessionCompleted,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentFailed,
    Other(String),
}

impl GatewayEventType {
    pub fn parse(value: &str) -> Self {
        match value {
            "checkout.session.completed" => GatewayEventType::CheckoutSessionCompleted,
            "customer.subscription.updated" => GatewayEventType::SubscriptionUpdated,
            "customer.subscription.deleted" => GatewayEventType::SubscriptionDeleted,
            "invoice.payment_failed" => GatewayEventType::InvoicePaymentFailed,
            other => GatewayEventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayEventType::CheckoutSessionCompleted => "checkout.session.completed",
            GatewayEventType::SubscriptionUpdated => "customer.subscription.updated",
            GatewayEventType::SubscriptionDeleted => "customer.subscription.deleted",
            GatewayEventType::InvoicePaymentFailed => "invoice.payment_failed",
            GatewayEventType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventData {
    Checkout {
        session_id: String,
        subscription_id: Option<String>,
        metadata: HashMap<String, String>,
    },
    Subscription(SubscriptionSnapshot),
    Invoice {
        invoice_id: String,
        subscription_id: Option<String>,
    },
    Other,
}

impl GatewayEventData {
    /// Order code from checkout metadata, if present and well-formed.
    pub fn order_code(&self) -> Option<OrderCode> {
        match self {
            GatewayEventData::Checkout { metadata, .. } => metadata
                .get(METADATA_ORDER_CODE)
                .and_then(|code| OrderCode::parse(code.as_str()).ok()),
            _ => None,
        }
    }

    /// Subscription id the event refers to, whatever its shape.
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            GatewayEventData::Checkout {
                subscription_id, ..
            }
            | GatewayEventData::Invoice {
                subscription_id, ..
            } => subscription_id.as_deref(),
            GatewayEventData::Subscription(snapshot) => Some(snapshot.id.as_str()),
            GatewayEventData::Other => None,
        }
    }
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,

    /// Gateway's own error code, when it sent one.
    pub provider_code: Option<String>,

    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// True when the gateway rejected what we sent rather than failing itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self.code, PaymentErrorCode::InvalidRequest)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::InvalidWebhook => ErrorCode::InvalidWebhookSignature,
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::PaymentGatewayError,
        };
        DomainError::new(code, err.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    InvalidWebhook,
    ProviderError,
    Unknown,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn event_types_parse_known_and_unknown() {
        assert_eq!(
            GatewayEventType::parse("invoice.payment_failed"),
            GatewayEventType::InvoicePaymentFailed
        );
        let other = GatewayEventType::parse("charge.refunded");
        assert_eq!(other.as_str(), "charge.refunded");
    }

    #[test]
    fn checkout_metadata_uses_gateway_keys() {
        let metadata = CheckoutMetadata {
            order_code: OrderCode::parse("VIP1700000000000123").unwrap(),
            user_id: UserId::new(5).unwrap(),
            plan_id: VipPlanId::new(2).unwrap(),
            listing_id: ListingId::new(9).unwrap(),
            purchase_type: "vip".to_string(),
            duration_days: 30,
        };
        let pairs: HashMap<_, _> = metadata.to_pairs().into_iter().collect();
        assert_eq!(pairs["orderCode"], "VIP1700000000000123");
        assert_eq!(pairs["postId"], "9");
        assert_eq!(pairs["durationDays"], "30");
    }

    #[test]
    fn order_code_read_from_checkout_metadata() {
        let mut metadata = HashMap::new();
        metadata.insert("orderCode".to_string(), "VIP1700000000000123".to_string());
        let data = GatewayEventData::Checkout {
            session_id: "cs_1".to_string(),
            subscription_id: Some("sub_1".to_string()),
            metadata,
        };
        assert_eq!(data.order_code().unwrap().as_str(), "VIP1700000000000123");
        assert_eq!(data.subscription_id(), Some("sub_1"));
    }

    #[test]
    fn lapsed_statuses() {
        assert!(SubscriptionStatus::parse("past_due").is_lapsed());
        assert!(SubscriptionStatus::parse("unpaid").is_lapsed());
        assert!(!SubscriptionStatus::parse("active").is_lapsed());
        assert_eq!(SubscriptionStatus::parse("weird"), SubscriptionStatus::Unknown);
    }

    #[test]
    fn invalid_webhook_maps_to_signature_code() {
        let err: DomainError = PaymentError::invalid_webhook("bad sig").into();
        assert_eq!(err.code, ErrorCode::InvalidWebhookSignature);
        assert!(PaymentError::network("reset").retryable);
        assert!(PaymentError::invalid_request("bad price").is_client_error());
    }
}

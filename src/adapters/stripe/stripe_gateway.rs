//! Stripe implementation of the `PaymentGateway` port.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay protection
//! - Secrets held in `secrecy::SecretString`
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret);
//! let gateway = StripeGateway::new(config);
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    CheckoutMode, CheckoutRequest, CheckoutSession, GatewayEvent, LineItem, PaymentError,
    PaymentErrorCode, PaymentGateway, SubscriptionSnapshot,
};

use super::webhook_types::{
    parse_event, SignatureHeader, StripeCheckoutSession, StripeErrorBody,
    StripeSubscription,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

#[derive(Clone)]
pub struct StripeConfig {
    api_key: SecretString,
    webhook_secret: SecretString,
    api_base_url: String,
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            require_livemode: false,
        }
    }

    /// Points the client at a different host (stripe-mock, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Rejects test-mode events.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn verify_signature(&self, payload: &[u8], header: &SignatureHeader) -> Result<(), PaymentError> {
        // 1. Validate timestamp
        let now = Timestamp::now().as_unix_secs();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from the future"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        // 2. Compute expected signature over "<t>.<payload>"
        let mut mac = HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
            .map_err(|e| PaymentError::provider(format!("Invalid webhook secret: {}", e)))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        // 3. Constant-time comparison against every v1 entry
        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| bool::from(expected.as_slice().ct_eq(provided.as_slice())));

        if !matched {
            tracing::warn!(
                event_timestamp = header.timestamp,
                candidates = header.v1_signatures.len(),
                "Invalid webhook signature"
            );
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), request.mode.as_str().into()),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
            (
                "client_reference_id".into(),
                request.metadata.order_code.to_string(),
            ),
        ];

        if let Some(email) = &request.customer_email {
            params.push(("customer_email".into(), email.clone()));
        }

        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            match item {
                LineItem::Price { price_id, quantity } => {
                    params.push((format!("{}[price]", prefix), price_id.clone()));
                    params.push((format!("{}[quantity]", prefix), quantity.to_string()));
                }
                LineItem::Inline {
                    name,
                    unit_amount,
                    currency,
                    recurring,
                    quantity,
                } => {
                    params.push((format!("{}[price_data][currency]", prefix), currency.clone()));
                    params.push((
                        format!("{}[price_data][unit_amount]", prefix),
                        unit_amount.to_string(),
                    ));
                    params.push((
                        format!("{}[price_data][product_data][name]", prefix),
                        name.clone(),
                    ));
                    if let Some((interval, count)) = recurring {
                        params.push((
                            format!("{}[price_data][recurring][interval]", prefix),
                            interval.as_str().into(),
                        ));
                        params.push((
                            format!("{}[price_data][recurring][interval_count]", prefix),
                            count.to_string(),
                        ));
                    }
                    params.push((format!("{}[quantity]", prefix), quantity.to_string()));
                }
            }
        }

        for (key, value) in request.metadata.to_pairs() {
            params.push((format!("metadata[{}]", key), value.clone()));
            // Subscriptions carry the same metadata so later events can be traced
            if request.mode == CheckoutMode::Subscription {
                params.push((format!("subscription_data[metadata][{}]", key), value));
            }
        }

        params
    }

    async fn error_from_response(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<StripeErrorBody>(&body).ok();

        let message = parsed
            .as_ref()
            .and_then(|b| b.error.message.clone())
            .unwrap_or_else(|| format!("Stripe API error ({})", status));

        let code = match status.as_u16() {
            401 | 403 => PaymentErrorCode::AuthenticationError,
            404 => PaymentErrorCode::NotFound,
            429 => PaymentErrorCode::RateLimitExceeded,
            400 | 402 => PaymentErrorCode::InvalidRequest,
            _ => PaymentErrorCode::ProviderError,
        };

        tracing::error!(status = %status, error = %message, "Stripe API call failed");

        let error = PaymentError::new(code, message);
        match parsed.and_then(|b| b.error.code.or(b.error.error_type)) {
            Some(provider_code) => error.with_provider_code(provider_code),
            None => error,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = Self::checkout_form(&request);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Stripe returned a session without a URL"))?;

        tracing::info!(
            session_id = %session.id,
            order_code = %request.metadata.order_code,
            "Checkout session created"
        );

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let subscription: StripeSubscription = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        Ok(Some(subscription.into_snapshot()))
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, PaymentError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        // 2. Verify signature (includes timestamp validation)
        self.verify_signature(payload, &header)?;

        // 3. Parse and convert event
        let event = parse_event(payload)?;

        if self.config.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Rejected test mode event");
            return Err(PaymentError::invalid_webhook(
                "Test mode events not allowed in production",
            ));
        }

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type.as_str(),
            "Webhook signature verified"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::super::webhook_types::hex_encode;
    use super::*;
    use crate::domain::foundation::{ListingId, UserId, VipPlanId};
    use crate::domain::vip::{BillingInterval, OrderCode};
    use crate::ports::{CheckoutMetadata, GatewayEventType};

    const SECRET: &str = "whsec_test_secret";

    fn gateway() -> StripeGateway {
        StripeGateway::new(StripeConfig::new("sk_test_key", SECRET))
    }

    fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        format!("t={},v1={}", timestamp, hex_encode(&mac.finalize().into_bytes()))
    }

    fn checkout_request(mode: CheckoutMode, line_item: LineItem) -> CheckoutRequest {
        CheckoutRequest {
            mode,
            line_items: vec![line_item],
            metadata: CheckoutMetadata {
                order_code: OrderCode::parse("VIP1704067200000123").unwrap(),
                user_id: UserId::new(5).unwrap(),
                plan_id: VipPlanId::new(2).unwrap(),
                listing_id: ListingId::new(9).unwrap(),
                purchase_type: "vip".into(),
                duration_days: 30,
            },
            idempotency_key: "VIP1704067200000123".into(),
            success_url: "https://ev.example/vip/success".into(),
            cancel_url: "https://ev.example/vip/cancel".into(),
            customer_email: None,
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_defaults_and_overrides() {
        let config = StripeConfig::new("key", "secret");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(!config.require_livemode);

        let config = config
            .with_base_url("http://localhost:12111")
            .with_require_livemode(true);
        assert_eq!(config.api_base_url, "http://localhost:12111");
        assert!(config.require_livemode);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Form Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn one_time_checkout_uses_inline_price() {
        let request = checkout_request(
            CheckoutMode::Payment,
            LineItem::Inline {
                name: "VIP Gold".into(),
                unit_amount: 199_000,
                currency: "vnd".into(),
                recurring: None,
                quantity: 1,
            },
        );

        let params = StripeGateway::checkout_form(&request);

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("199000"));
        assert_eq!(param(&params, "metadata[orderCode]"), Some("VIP1704067200000123"));
        assert_eq!(param(&params, "metadata[postId]"), Some("9"));
        assert!(param(&params, "subscription_data[metadata][orderCode]").is_none());
    }

    #[test]
    fn subscription_checkout_copies_metadata_to_subscription() {
        let request = checkout_request(
            CheckoutMode::Subscription,
            LineItem::Inline {
                name: "VIP Diamond".into(),
                unit_amount: 499_000,
                currency: "vnd".into(),
                recurring: Some((BillingInterval::Month, 1)),
                quantity: 1,
            },
        );

        let params = StripeGateway::checkout_form(&request);

        assert_eq!(param(&params, "mode"), Some("subscription"));
        assert_eq!(
            param(&params, "line_items[0][price_data][recurring][interval]"),
            Some("month")
        );
        assert_eq!(
            param(&params, "subscription_data[metadata][orderCode]"),
            Some("VIP1704067200000123")
        );
    }

    #[test]
    fn catalogue_price_is_referenced_by_id() {
        let request = checkout_request(
            CheckoutMode::Payment,
            LineItem::Price {
                price_id: "price_123".into(),
                quantity: 1,
            },
        );

        let params = StripeGateway::checkout_form(&request);

        assert_eq!(param(&params, "line_items[0][price]"), Some("price_123"));
        assert!(param(&params, "line_items[0][price_data][currency]").is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn verify_signature_valid() {
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = Timestamp::now().as_unix_secs();
        let header = SignatureHeader::parse(&sign(SECRET, timestamp, payload)).unwrap();

        assert!(gateway().verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_wrong_secret() {
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = Timestamp::now().as_unix_secs();
        let header = SignatureHeader::parse(&sign("whsec_other", timestamp, payload)).unwrap();

        let err = gateway()
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[test]
    fn verify_signature_accepts_any_matching_v1() {
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = Timestamp::now().as_unix_secs();
        let good = sign(SECRET, timestamp, payload);
        let good_sig = good.split_once(",v1=").unwrap().1;
        let header_value = format!("t={},v1={},v1={}", timestamp, "00".repeat(32), good_sig);
        let header = SignatureHeader::parse(&header_value).unwrap();

        assert!(gateway().verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_expired_timestamp() {
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = Timestamp::now().as_unix_secs() - 600;
        let header = SignatureHeader::parse(&sign(SECRET, timestamp, payload)).unwrap();

        let err = gateway()
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();
        assert!(err.message.contains("too old"));
    }

    #[test]
    fn verify_signature_future_timestamp() {
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = Timestamp::now().as_unix_secs() + 120;
        let header = SignatureHeader::parse(&sign(SECRET, timestamp, payload)).unwrap();

        let err = gateway()
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();
        assert!(err.message.contains("future"));
    }

    #[test]
    fn verify_signature_small_future_tolerance() {
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = Timestamp::now().as_unix_secs() + 30;
        let header = SignatureHeader::parse(&sign(SECRET, timestamp, payload)).unwrap();

        assert!(gateway().verify_signature(payload.as_bytes(), &header).is_ok());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // verify_webhook Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn verify_webhook_full_flow() {
        let payload = r#"{
            "id": "evt_123",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "livemode": false,
            "data": {"object": {"id": "cs_1", "metadata": {"orderCode": "VIP1704067200000123"}}}
        }"#;
        let signature = sign(SECRET, Timestamp::now().as_unix_secs(), payload);

        let event = gateway()
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap();

        assert_eq!(event.id, "evt_123");
        assert_eq!(event.event_type, GatewayEventType::CheckoutSessionCompleted);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_bad_header() {
        let err = gateway()
            .verify_webhook(b"{}", "garbage")
            .await
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_test_mode_when_live_required() {
        let gateway = StripeGateway::new(
            StripeConfig::new("sk_live_key", SECRET).with_require_livemode(true),
        );
        let payload = r#"{"id": "evt_1", "type": "charge.refunded", "created": 1, "livemode": false, "data": {"object": {}}}"#;
        let signature = sign(SECRET, Timestamp::now().as_unix_secs(), payload);

        let err = gateway
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap_err();
        assert!(err.message.contains("Test mode"));
    }
}

//! Stripe wire types and event parsing.
//!
//! These mirror the JSON Stripe sends in API responses and webhook payloads.
//! `parse_event` turns a payload into the gateway-neutral `GatewayEvent`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    GatewayEvent, GatewayEventData, GatewayEventType, PaymentError, SubscriptionSnapshot,
    SubscriptionStatus,
};

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    MissingHeader,
    MissingTimestamp,
    MissingV1Signature,
    InvalidTimestamp,
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed `Stripe-Signature` header: `t=<ts>,v1=<hex>[,v1=<hex>...]`.
///
/// Stripe sends one `v1` entry per active signing secret, so several may be
/// present while a secret is being rolled.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex_decode(value).ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Objects
// ════════════════════════════════════════════════════════════════════════════════

/// Webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    pub object: JsonValue,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    pub id: String,

    /// Hosted checkout page; absent on completed sessions.
    pub url: Option<String>,

    pub subscription: Option<String>,

    pub payment_status: Option<String>,

    pub client_reference_id: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    pub id: String,

    pub status: String,

    /// Top-level on older API versions, per item on newer ones.
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub id: String,

    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.items.data.iter().filter_map(|i| i.current_period_end).max())
    }

    pub fn into_snapshot(self) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            current_period_end: self.period_end().and_then(Timestamp::from_unix_secs),
            status: SubscriptionStatus::parse(&self.status),
            cancel_at_period_end: self.cancel_at_period_end,
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoice {
    pub id: String,

    /// Top-level on older API versions.
    pub subscription: Option<String>,

    /// Newer API versions nest it under `parent.subscription_details`.
    pub parent: Option<JsonValue>,
}

impl StripeInvoice {
    pub fn subscription_id(&self) -> Option<String> {
        self.subscription.clone().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|p| p.pointer("/subscription_details/subscription"))
                .and_then(JsonValue::as_str)
                .map(String::from)
        })
    }
}

/// Body of a Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,

    pub code: Option<String>,

    pub message: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Conversion
// ════════════════════════════════════════════════════════════════════════════════

/// Parses a webhook payload into a `GatewayEvent`.
///
/// Does not check the signature; callers verify it first.
pub fn parse_event(payload: &[u8]) -> Result<GatewayEvent, PaymentError> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse webhook payload");
        PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
    })?;

    let event_type = GatewayEventType::parse(&event.event_type);
    let data = extract_event_data(&event)?;

    Ok(GatewayEvent {
        id: event.id,
        event_type,
        data,
        raw: event.data.object,
        created_at: event.created,
        livemode: event.livemode,
    })
}

fn extract_event_data(event: &StripeWebhookEvent) -> Result<GatewayEventData, PaymentError> {
    let object = event.data.object.clone();

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSession = serde_json::from_value(object).map_err(|e| {
                PaymentError::invalid_webhook(format!("Invalid checkout session: {}", e))
            })?;

            let mut metadata = session.metadata;
            if let Some(reference) = session.client_reference_id {
                metadata
                    .entry(crate::ports::METADATA_ORDER_CODE.to_string())
                    .or_insert(reference);
            }

            Ok(GatewayEventData::Checkout {
                session_id: session.id,
                subscription_id: session.subscription,
                metadata,
            })
        }

        s if s.starts_with("customer.subscription.") => {
            let sub: StripeSubscription = serde_json::from_value(object).map_err(|e| {
                PaymentError::invalid_webhook(format!("Invalid subscription: {}", e))
            })?;
            Ok(GatewayEventData::Subscription(sub.into_snapshot()))
        }

        s if s.starts_with("invoice.") => {
            let invoice: StripeInvoice = serde_json::from_value(object).map_err(|e| {
                PaymentError::invalid_webhook(format!("Invalid invoice: {}", e))
            })?;
            Ok(GatewayEventData::Invoice {
                subscription_id: invoice.subscription_id(),
                invoice_id: invoice.id,
            })
        }

        _ => Ok(GatewayEventData::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // SignatureHeader Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_signature_header_valid() {
        let parsed = SignatureHeader::parse("t=1704067200,v1=5d41402abc4b2a76b9719d911017c592").unwrap();
        assert_eq!(parsed.timestamp, 1704067200);
        assert_eq!(hex_encode(&parsed.v1_signatures[0]), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn parse_signature_header_keeps_every_v1() {
        let parsed = SignatureHeader::parse("t=1,v1=aabb,v0=ccdd,v1=eeff").unwrap();
        assert_eq!(parsed.v1_signatures.len(), 2);
    }

    #[test]
    fn parse_signature_header_errors() {
        assert_eq!(
            SignatureHeader::parse("").unwrap_err(),
            SignatureParseError::MissingHeader
        );
        assert_eq!(
            SignatureHeader::parse("v1=aabb").unwrap_err(),
            SignatureParseError::MissingTimestamp
        );
        assert_eq!(
            SignatureHeader::parse("t=1,v0=aabb").unwrap_err(),
            SignatureParseError::MissingV1Signature
        );
        assert_eq!(
            SignatureHeader::parse("t=soon,v1=aabb").unwrap_err(),
            SignatureParseError::InvalidTimestamp
        );
        assert_eq!(
            SignatureHeader::parse("t=1,v1=abc").unwrap_err(),
            SignatureParseError::InvalidSignatureFormat
        );
        assert_eq!(
            SignatureHeader::parse("t=1,v1=zz").unwrap_err(),
            SignatureParseError::InvalidSignatureFormat
        );
    }

    #[test]
    fn hex_encode_bytes() {
        assert_eq!(hex_encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(hex_decode("00ff10"), Some(vec![0x00, 0xff, 0x10]));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_checkout_completed_reads_order_code() {
        let payload = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "livemode": false,
            "data": {"object": {
                "id": "cs_1",
                "subscription": "sub_1",
                "payment_status": "paid",
                "metadata": {"orderCode": "VIP1704067200000123", "postId": "9"}
            }}
        }"#;

        let event = parse_event(payload).unwrap();

        assert_eq!(event.event_type, GatewayEventType::CheckoutSessionCompleted);
        assert_eq!(event.data.order_code().unwrap().as_str(), "VIP1704067200000123");
        assert_eq!(event.data.subscription_id(), Some("sub_1"));
        assert_eq!(event.raw["id"], "cs_1");
    }

    #[test]
    fn parse_checkout_falls_back_to_client_reference() {
        let payload = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1,
            "data": {"object": {"id": "cs_1", "client_reference_id": "VIP1704067200000123"}}
        }"#;

        let event = parse_event(payload).unwrap();
        assert_eq!(event.data.order_code().unwrap().as_str(), "VIP1704067200000123");
    }

    #[test]
    fn parse_subscription_reads_item_period_end() {
        let payload = br#"{
            "id": "evt_2",
            "type": "customer.subscription.updated",
            "created": 1,
            "data": {"object": {
                "id": "sub_1",
                "status": "active",
                "cancel_at_period_end": true,
                "items": {"data": [{"id": "si_1", "current_period_end": 1706745600}]}
            }}
        }"#;

        let event = parse_event(payload).unwrap();

        match event.data {
            GatewayEventData::Subscription(snapshot) => {
                assert_eq!(snapshot.id, "sub_1");
                assert_eq!(snapshot.status, SubscriptionStatus::Active);
                assert!(snapshot.cancel_at_period_end);
                assert_eq!(
                    snapshot.current_period_end.map(|t| t.as_unix_secs()),
                    Some(1706745600)
                );
            }
            other => panic!("Expected subscription data, got {:?}", other),
        }
    }

    #[test]
    fn parse_invoice_reads_nested_subscription() {
        let payload = br#"{
            "id": "evt_3",
            "type": "invoice.payment_failed",
            "created": 1,
            "data": {"object": {
                "id": "in_1",
                "parent": {"subscription_details": {"subscription": "sub_9"}}
            }}
        }"#;

        let event = parse_event(payload).unwrap();
        assert_eq!(event.event_type, GatewayEventType::InvoicePaymentFailed);
        assert_eq!(event.data.subscription_id(), Some("sub_9"));
    }

    #[test]
    fn parse_unknown_event_type() {
        let payload = br#"{"id": "evt_4", "type": "charge.refunded", "created": 1, "data": {"object": {}}}"#;
        let event = parse_event(payload).unwrap();
        assert_eq!(event.event_type.as_str(), "charge.refunded");
        assert_eq!(event.data, GatewayEventData::Other);
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = parse_event(b"not json").unwrap_err();
        assert!(err.message.contains("Invalid JSON"));
    }
}

//! Mock payment gateway for tests and local runs.
//!
//! - Pre-configured subscriptions for `get_subscription`
//! - Error injection, per method or for the next call
//! - Checkout request and call tracking
//! - Queued webhook events, or Stripe-shaped JSON parsed like the real adapter

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::domain::vip::OrderCode;
use crate::ports::{
    CheckoutRequest, CheckoutSession, GatewayEvent, GatewayEventData, GatewayEventType,
    PaymentError, PaymentGateway, SubscriptionSnapshot, METADATA_ORDER_CODE,
};

use super::webhook_types::parse_event;

/// Mock payment gateway.
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.set_method_error("create_checkout_session", PaymentError::network("down"));
/// gateway.queue_webhook_event(MockPaymentGateway::checkout_completed_event(&code, None));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<String, SubscriptionSnapshot>,
    queued_events: VecDeque<GatewayEvent>,
    checkout_requests: Vec<CheckoutRequest>,
    next_error: Option<PaymentError>,
    method_errors: HashMap<String, PaymentError>,
    call_log: Vec<String>,
    reject_webhooks: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose webhook verification always fails.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.state().reject_webhooks = true;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_subscription(&self, subscription: SubscriptionSnapshot) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Next `verify_webhook` returns this event instead of parsing the payload.
    pub fn queue_webhook_event(&self, event: GatewayEvent) {
        self.state().queued_events.push_back(event);
    }

    /// Error returned by the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Error returned by every call to one method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().call_log.iter().filter(|m| *m == method).count()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_call(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();
        state.call_log.push(method.to_string());

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event Builders
    // ════════════════════════════════════════════════════════════════════════════

    pub fn checkout_completed_event(
        order_code: &OrderCode,
        subscription_id: Option<&str>,
    ) -> GatewayEvent {
        let session_id = format!("cs_mock_{}", Uuid::new_v4().simple());
        let mut metadata = HashMap::new();
        metadata.insert(METADATA_ORDER_CODE.to_string(), order_code.to_string());

        GatewayEvent {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            event_type: GatewayEventType::CheckoutSessionCompleted,
            raw: json!({
                "id": session_id,
                "subscription": subscription_id,
                "metadata": { METADATA_ORDER_CODE: order_code.as_str() },
            }),
            data: GatewayEventData::Checkout {
                session_id,
                subscription_id: subscription_id.map(String::from),
                metadata,
            },
            created_at: Timestamp::now().as_unix_secs(),
            livemode: false,
        }
    }

    pub fn subscription_event(
        event_type: GatewayEventType,
        subscription: SubscriptionSnapshot,
    ) -> GatewayEvent {
        GatewayEvent {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            event_type,
            raw: json!({ "id": subscription.id, "status": format!("{:?}", subscription.status) }),
            data: GatewayEventData::Subscription(subscription),
            created_at: Timestamp::now().as_unix_secs(),
            livemode: false,
        }
    }

    pub fn invoice_payment_failed_event(subscription_id: &str) -> GatewayEvent {
        let invoice_id = format!("in_mock_{}", Uuid::new_v4().simple());
        GatewayEvent {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            event_type: GatewayEventType::InvoicePaymentFailed,
            raw: json!({ "id": invoice_id, "subscription": subscription_id }),
            data: GatewayEventData::Invoice {
                invoice_id,
                subscription_id: Some(subscription_id.to_string()),
            },
            created_at: Timestamp::now().as_unix_secs(),
            livemode: false,
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.state().checkout_requests.push(request);
        self.begin_call("create_checkout_session")?;

        let id = format!("cs_mock_{}", Uuid::new_v4().simple());
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, PaymentError> {
        self.begin_call("get_subscription")?;
        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        _signature: &str,
    ) -> Result<GatewayEvent, PaymentError> {
        self.begin_call("verify_webhook")?;

        let queued = {
            let mut state = self.state();
            if state.reject_webhooks {
                return Err(PaymentError::invalid_webhook("Invalid signature"));
            }
            state.queued_events.pop_front()
        };

        match queued {
            Some(event) => Ok(event),
            None => parse_event(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PaymentErrorCode, SubscriptionStatus};

    #[tokio::test]
    async fn rejecting_gateway_fails_verification() {
        let gateway = MockPaymentGateway::rejecting_webhooks();
        let err = gateway.verify_webhook(b"{}", "t=1,v1=00").await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[tokio::test]
    async fn queued_events_are_returned_in_order() {
        let gateway = MockPaymentGateway::new();
        let code = OrderCode::parse("VIP1704067200000123").unwrap();
        gateway.queue_webhook_event(MockPaymentGateway::checkout_completed_event(&code, None));
        gateway.queue_webhook_event(MockPaymentGateway::invoice_payment_failed_event("sub_1"));

        let first = gateway.verify_webhook(b"", "").await.unwrap();
        let second = gateway.verify_webhook(b"", "").await.unwrap();

        assert_eq!(first.data.order_code(), Some(code));
        assert_eq!(second.event_type, GatewayEventType::InvoicePaymentFailed);
    }

    #[tokio::test]
    async fn unqueued_payload_is_parsed() {
        let gateway = MockPaymentGateway::new();
        let payload = br#"{"id": "evt_1", "type": "charge.refunded", "created": 1, "data": {"object": {}}}"#;

        let event = gateway.verify_webhook(payload, "").await.unwrap();
        assert_eq!(event.id, "evt_1");
    }

    #[tokio::test]
    async fn method_error_affects_only_that_method() {
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error("get_subscription", PaymentError::network("timeout"));

        assert!(gateway.get_subscription("sub_1").await.is_err());
        assert!(gateway.verify_webhook(br#"{"id":"e","type":"x","created":1,"data":{"object":{}}}"#, "").await.is_ok());
        assert_eq!(gateway.call_count("get_subscription"), 1);
    }

    #[tokio::test]
    async fn subscriptions_are_looked_up_by_id() {
        let gateway = MockPaymentGateway::new();
        gateway.add_subscription(SubscriptionSnapshot {
            id: "sub_1".into(),
            status: SubscriptionStatus::Active,
            current_period_end: None,
            cancel_at_period_end: false,
        });

        assert!(gateway.get_subscription("sub_1").await.unwrap().is_some());
        assert!(gateway.get_subscription("sub_2").await.unwrap().is_none());
    }
}

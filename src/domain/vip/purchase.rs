//! VIP purchase ledger row.
//!
//! One row per checkout attempt, keyed by an order code that doubles as the
//! gateway idempotency key. Rows leave `Pending` exactly once.

use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    DomainError, ErrorCode, ListingId, StateMachine, Timestamp, UserId, ValidationError,
    VipPlanId, VipPurchaseId,
};

/// Payment provider recorded on ledger rows.
pub const PROVIDER_STRIPE: &str = "stripe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseStatus {
    Pending,
    Paid,
    Canceled,
    Failed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "PENDING",
            PurchaseStatus::Paid => "PAID",
            PurchaseStatus::Canceled => "CANCELED",
            PurchaseStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(PurchaseStatus::Pending),
            "PAID" => Ok(PurchaseStatus::Paid),
            "CANCELED" | "CANCELLED" => Ok(PurchaseStatus::Canceled),
            "FAILED" => Ok(PurchaseStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown purchase status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PurchaseStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PurchaseStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Failed) | (Pending, Canceled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PurchaseStatus::*;
        match self {
            Pending => vec![Paid, Failed, Canceled],
            Paid | Failed | Canceled => vec![],
        }
    }
}

/// Order code: `VIP` + unix milliseconds + three random digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    pub const PREFIX: &'static str = "VIP";

    pub fn generate(now: Timestamp) -> Self {
        let suffix: u16 = OsRng.gen_range(0..1000);
        Self(format!("{}{}{:03}", Self::PREFIX, now.as_unix_millis(), suffix))
    }

    /// # Errors
    ///
    /// - `InvalidFormat` unless `VIP` followed by at least four digits
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let digits = value.strip_prefix(Self::PREFIX).unwrap_or("");
        if digits.len() < 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "order_code",
                format!("'{}' is not a VIP order code", value),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VipPurchase {
    id: VipPurchaseId,
    order_code: OrderCode,
    user_id: UserId,
    listing_id: ListingId,
    plan_id: VipPlanId,
    amount: i64,
    currency: String,
    status: PurchaseStatus,
    provider: String,
    checkout_session_id: Option<String>,
    checkout_url: Option<String>,
    external_subscription_id: Option<String>,
    raw_payload: Option<JsonValue>,
    failure_reason: Option<String>,
    paid_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl VipPurchase {
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        id: VipPurchaseId,
        order_code: OrderCode,
        user_id: UserId,
        listing_id: ListingId,
        plan_id: VipPlanId,
        amount: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            order_code,
            user_id,
            listing_id,
            plan_id,
            amount,
            currency: currency.into(),
            status: PurchaseStatus::Pending,
            provider: PROVIDER_STRIPE.to_string(),
            checkout_session_id: None,
            checkout_url: None,
            external_subscription_id: None,
            raw_payload: None,
            failure_reason: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitute a ledger row from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: VipPurchaseId,
        order_code: OrderCode,
        user_id: UserId,
        listing_id: ListingId,
        plan_id: VipPlanId,
        amount: i64,
        currency: String,
        status: PurchaseStatus,
        provider: String,
        checkout_session_id: Option<String>,
        checkout_url: Option<String>,
        external_subscription_id: Option<String>,
        raw_payload: Option<JsonValue>,
        failure_reason: Option<String>,
        paid_at: Option<Timestamp>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            order_code,
            user_id,
            listing_id,
            plan_id,
            amount,
            currency,
            status,
            provider,
            checkout_session_id,
            checkout_url,
            external_subscription_id,
            raw_payload,
            failure_reason,
            paid_at,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &VipPurchaseId {
        &self.id
    }

    pub fn order_code(&self) -> &OrderCode {
        &self.order_code
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn listing_id(&self) -> ListingId {
        self.listing_id
    }

    pub fn plan_id(&self) -> VipPlanId {
        self.plan_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn checkout_session_id(&self) -> Option<&str> {
        self.checkout_session_id.as_deref()
    }

    pub fn checkout_url(&self) -> Option<&str> {
        self.checkout_url.as_deref()
    }

    pub fn external_subscription_id(&self) -> Option<&str> {
        self.external_subscription_id.as_deref()
    }

    pub fn raw_payload(&self) -> Option<&JsonValue> {
        self.raw_payload.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn paid_at(&self) -> Option<Timestamp> {
        self.paid_at
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == PurchaseStatus::Pending
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Records the hosted checkout the buyer is redirected to.
    pub fn attach_checkout(
        &mut self,
        session_id: impl Into<String>,
        url: impl Into<String>,
        now: Timestamp,
    ) {
        self.checkout_session_id = Some(session_id.into());
        self.checkout_url = Some(url.into());
        self.updated_at = now;
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` unless pending
    pub fn mark_paid(
        &mut self,
        raw_payload: JsonValue,
        external_subscription_id: Option<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(PurchaseStatus::Paid)?;
        self.raw_payload = Some(raw_payload);
        if external_subscription_id.is_some() {
            self.external_subscription_id = external_subscription_id;
        }
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` unless pending
    pub fn mark_failed(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(PurchaseStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` unless pending
    pub fn mark_canceled(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(PurchaseStatus::Canceled)?;
        self.updated_at = now;
        Ok(())
    }

    /// Replaces the cached gateway payload on a settled row.
    pub fn record_payload(&mut self, raw_payload: JsonValue, now: Timestamp) {
        self.raw_payload = Some(raw_payload);
        self.updated_at = now;
    }

    fn transition_to(&mut self, target: PurchaseStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot move purchase {} from {} to {}",
                    self.order_code, self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

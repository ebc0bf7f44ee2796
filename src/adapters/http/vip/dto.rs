//! HTTP DTOs for VIP endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::vip::{CreateVipCheckoutResult, WebhookOutcome};
use crate::domain::foundation::{ListingId, VipPlanId};
use crate::domain::vip::{OrderCode, PurchaseStatus, VipPlan};

/// Request to promote a listing with a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVipCheckoutRequest {
    pub listing_id: ListingId,
    pub plan_id: VipPlanId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub order_code: OrderCode,
    pub checkout_url: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PurchaseStatus,
    /// True when an open checkout for the same listing was returned.
    pub reused: bool,
}

impl From<CreateVipCheckoutResult> for CheckoutResponse {
    fn from(result: CreateVipCheckoutResult) -> Self {
        Self {
            order_code: result.order_code().clone(),
            checkout_url: result.checkout_url().map(str::to_string),
            amount: result.purchase.amount(),
            currency: result.purchase.currency().to_string(),
            status: result.purchase.status(),
            reused: result.reused,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VipPlanListResponse {
    pub plans: Vec<VipPlan>,
}

/// Acknowledgement sent for every verified webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: String,
}

impl From<&WebhookOutcome> for WebhookAck {
    fn from(outcome: &WebhookOutcome) -> Self {
        Self {
            received: true,
            outcome: outcome.label().to_string(),
        }
    }
}

//! VIP domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{domain_event, EventId, ListingId, Timestamp, VipPlanId};
use crate::domain::listing::VipTier;

use super::OrderCode;

/// Published when a paid checkout promotes a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipActivated {
    pub event_id: EventId,
    pub listing_id: ListingId,
    pub order_code: OrderCode,
    pub plan_id: VipPlanId,
    pub tier: Option<VipTier>,
    pub expires_at: Timestamp,
    pub activated_at: Timestamp,
}

domain_event!(
    VipActivated,
    event_type = "vip.activated",
    aggregate_id = listing_id,
    aggregate_type = "Listing",
    occurred_at = activated_at,
    event_id = event_id
);

/// Why a listing lost its VIP promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipEndReason {
    SubscriptionDeleted,
    PaymentFailed,
    SubscriptionLapsed,
    Expired,
}

/// Published when a listing's VIP promotion ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipDeactivated {
    pub event_id: EventId,
    pub listing_id: ListingId,
    pub reason: VipEndReason,
    pub deactivated_at: Timestamp,
}

domain_event!(
    VipDeactivated,
    event_type = "vip.deactivated",
    aggregate_id = listing_id,
    aggregate_type = "Listing",
    occurred_at = deactivated_at,
    event_id = event_id
);

//! CreateVipCheckoutHandler - starts a hosted checkout to promote a listing.
//!
//! The ledger row is written before the gateway is called, so every
//! checkout the buyer can reach has an order code the webhook can settle.

use std::sync::Arc;

use crate::domain::foundation::{
    Actor, ErrorCode, ListingId, Timestamp, UserId, VipPlanId, VipPurchaseId,
};
use crate::domain::listing::Listing;
use crate::domain::vip::{OrderCode, PlanBilling, VipError, VipPlan, VipPurchase};
use crate::ports::{
    CheckoutMetadata, CheckoutMode, CheckoutRequest, LineItem, ListingRepository,
    PaymentGateway, UserDirectory, VipPlanRepository, VipPurchaseRepository,
};

use super::VipSettings;

/// Metadata `type` sent with every VIP checkout.
pub const VIP_PURCHASE_TYPE: &str = "vip_listing";

#[derive(Debug, Clone)]
pub struct CreateVipCheckoutCommand {
    pub actor: Actor,
    pub listing_id: ListingId,
    pub plan_id: VipPlanId,
}

#[derive(Debug, Clone)]
pub struct CreateVipCheckoutResult {
    pub purchase: VipPurchase,
    /// True when an existing pending checkout was returned.
    pub reused: bool,
}

impl CreateVipCheckoutResult {
    pub fn order_code(&self) -> &OrderCode {
        self.purchase.order_code()
    }

    pub fn checkout_url(&self) -> Option<&str> {
        self.purchase.checkout_url()
    }
}

pub struct CreateVipCheckoutHandler {
    listings: Arc<dyn ListingRepository>,
    plans: Arc<dyn VipPlanRepository>,
    purchases: Arc<dyn VipPurchaseRepository>,
    users: Arc<dyn UserDirectory>,
    gateway: Arc<dyn PaymentGateway>,
    settings: VipSettings,
}

impl CreateVipCheckoutHandler {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        plans: Arc<dyn VipPlanRepository>,
        purchases: Arc<dyn VipPurchaseRepository>,
        users: Arc<dyn UserDirectory>,
        gateway: Arc<dyn PaymentGateway>,
        settings: VipSettings,
    ) -> Self {
        Self {
            listings,
            plans,
            purchases,
            users,
            gateway,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateVipCheckoutCommand,
    ) -> Result<CreateVipCheckoutResult, VipError> {
        let user_id = cmd.actor.id;
        let now = Timestamp::now();

        // 1. Listing ownership
        let listing = self
            .listings
            .find_by_id(cmd.listing_id)
            .await?
            .ok_or_else(|| VipError::not_found("listing", cmd.listing_id))?;
        if listing.owner_id != user_id {
            return Err(VipError::forbidden("You can only promote your own listings"));
        }

        // 2. Plan
        let plan = self
            .plans
            .find_by_id(cmd.plan_id)
            .await?
            .ok_or_else(|| VipError::not_found("vip_plan", cmd.plan_id))?;
        if !plan.active {
            return Err(VipError::validation("plan_id", "This VIP plan is no longer offered"));
        }

        // 3. Listing state
        ensure_promotable(&listing, now)?;

        // 4. An open checkout is handed back instead of duplicated
        if let Some(existing) = self.purchases.find_pending_for(user_id, listing.id).await? {
            tracing::info!(order_code = %existing.order_code(), "Reusing pending VIP checkout");
            return Ok(CreateVipCheckoutResult {
                purchase: existing,
                reused: true,
            });
        }

        // 5. Ledger row first
        let mut purchase = VipPurchase::pending(
            VipPurchaseId::new(),
            OrderCode::generate(now),
            user_id,
            listing.id,
            plan.id,
            plan.amount,
            self.currency_for(&plan),
            now,
        );
        if let Err(e) = self.purchases.save(&purchase).await {
            if e.code == ErrorCode::PendingPurchaseExists {
                return self.lost_race(user_id, listing.id).await;
            }
            return Err(e.into());
        }

        // 6. Hosted checkout
        let request = self.checkout_request(&plan, &purchase).await;
        match self.gateway.create_checkout_session(request).await {
            Ok(session) => {
                // 7. Remember where the buyer pays
                purchase.attach_checkout(session.id, session.url, Timestamp::now());
                self.purchases.update(&purchase).await?;

                tracing::info!(
                    order_code = %purchase.order_code(),
                    listing_id = %listing.id,
                    plan_id = %plan.id,
                    "VIP checkout created"
                );
                Ok(CreateVipCheckoutResult {
                    purchase,
                    reused: false,
                })
            }
            Err(e) => {
                // 8. A failed row no longer blocks a retry
                tracing::warn!(order_code = %purchase.order_code(), error = %e, "Checkout session creation failed");
                purchase.mark_failed(e.to_string(), Timestamp::now())?;
                if let Err(update_err) = self.purchases.update(&purchase).await {
                    tracing::error!(
                        order_code = %purchase.order_code(),
                        error = %update_err,
                        "Failed to mark VIP purchase as failed"
                    );
                }

                if e.is_client_error() {
                    Err(VipError::gateway(e.message, true))
                } else {
                    Err(VipError::gateway("Payment provider unavailable", false))
                }
            }
        }
    }

    async fn lost_race(
        &self,
        user_id: UserId,
        listing_id: ListingId,
    ) -> Result<CreateVipCheckoutResult, VipError> {
        let existing = self
            .purchases
            .find_pending_for(user_id, listing_id)
            .await?
            .ok_or_else(|| VipError::conflict("A checkout for this listing is already in progress"))?;
        Ok(CreateVipCheckoutResult {
            purchase: existing,
            reused: true,
        })
    }

    fn currency_for(&self, plan: &VipPlan) -> String {
        if plan.currency.trim().is_empty() {
            self.settings.currency.clone()
        } else {
            plan.currency.to_lowercase()
        }
    }

    async fn checkout_request(&self, plan: &VipPlan, purchase: &VipPurchase) -> CheckoutRequest {
        let mode = if plan.billing.is_subscription() {
            CheckoutMode::Subscription
        } else {
            CheckoutMode::Payment
        };

        let line_item = match &plan.external_price_id {
            Some(price_id) => LineItem::Price {
                price_id: price_id.clone(),
                quantity: 1,
            },
            None => LineItem::Inline {
                name: plan.name.clone(),
                unit_amount: plan.amount,
                currency: purchase.currency().to_string(),
                recurring: match plan.billing {
                    PlanBilling::Subscription {
                        interval,
                        interval_count,
                    } => Some((interval, interval_count)),
                    PlanBilling::OneTime { .. } => None,
                },
                quantity: 1,
            },
        };

        let customer_email = match self.users.find_user(purchase.user_id()).await {
            Ok(user) => user.map(|u| u.email),
            Err(e) => {
                tracing::warn!(user_id = %purchase.user_id(), error = %e, "Could not load buyer email for checkout");
                None
            }
        };

        CheckoutRequest {
            mode,
            line_items: vec![line_item],
            metadata: CheckoutMetadata {
                order_code: purchase.order_code().clone(),
                user_id: purchase.user_id(),
                plan_id: plan.id,
                listing_id: purchase.listing_id(),
                purchase_type: VIP_PURCHASE_TYPE.to_string(),
                duration_days: plan.billing.nominal_days(),
            },
            idempotency_key: purchase.order_code().to_string(),
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
            customer_email,
        }
    }
}

fn ensure_promotable(listing: &Listing, now: Timestamp) -> Result<(), VipError> {
    if listing.is_sold() {
        return Err(VipError::conflict("This listing has already been sold"));
    }
    if listing.is_active || listing.is_vip_effective(now) {
        return Err(VipError::conflict("This listing is already published"));
    }
    Ok(())
}

//! HandleVipWebhookHandler - reconciles payment gateway events with the
//! purchase ledger and listing VIP state.
//!
//! Only a bad signature is rejected. Every other outcome, including internal
//! failures, is acknowledged so the gateway stops retrying; failures are
//! logged at error level for manual reconciliation.

use std::sync::Arc;

use crate::domain::foundation::{EventEnvelope, EventId, ListingId, Timestamp};
use crate::domain::listing::VipGrant;
use crate::domain::vip::{
    OrderCode, VipActivated, VipDeactivated, VipEndReason, VipError, VipPlan, VipPurchase,
};
use crate::ports::{
    EventPublisher, GatewayEvent, GatewayEventData, GatewayEventType, ListingRepository,
    PaymentGateway, SubscriptionSnapshot, SubscriptionStatus, VipPlanRepository,
    VipPurchaseRepository, METADATA_DURATION_DAYS,
};

use super::VipSettings;

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Activated {
        order_code: OrderCode,
        listing_id: ListingId,
        expires_at: Timestamp,
    },
    /// The ledger row was settled as failed (listing gone or changed hands).
    PurchaseFailed { order_code: OrderCode },
    /// The ledger row was already settled.
    Duplicate { order_code: OrderCode },
    Deactivated {
        listing_id: ListingId,
        reason: VipEndReason,
    },
    ExpiryCapped {
        listing_id: ListingId,
        expires_at: Timestamp,
    },
    Renewed {
        listing_id: ListingId,
        expires_at: Timestamp,
    },
    Ignored(&'static str),
    /// Processing failed after verification; needs manual reconciliation.
    Failed(String),
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Activated { .. } => "activated",
            WebhookOutcome::PurchaseFailed { .. } => "purchase_failed",
            WebhookOutcome::Duplicate { .. } => "duplicate",
            WebhookOutcome::Deactivated { .. } => "deactivated",
            WebhookOutcome::ExpiryCapped { .. } => "expiry_capped",
            WebhookOutcome::Renewed { .. } => "renewed",
            WebhookOutcome::Ignored(_) => "ignored",
            WebhookOutcome::Failed(_) => "failed",
        }
    }
}

pub struct HandleVipWebhookHandler {
    purchases: Arc<dyn VipPurchaseRepository>,
    listings: Arc<dyn ListingRepository>,
    plans: Arc<dyn VipPlanRepository>,
    gateway: Arc<dyn PaymentGateway>,
    publisher: Arc<dyn EventPublisher>,
    settings: VipSettings,
}

impl HandleVipWebhookHandler {
    pub fn new(
        purchases: Arc<dyn VipPurchaseRepository>,
        listings: Arc<dyn ListingRepository>,
        plans: Arc<dyn VipPlanRepository>,
        gateway: Arc<dyn PaymentGateway>,
        publisher: Arc<dyn EventPublisher>,
        settings: VipSettings,
    ) -> Self {
        Self {
            purchases,
            listings,
            plans,
            gateway,
            publisher,
            settings,
        }
    }

    /// # Errors
    ///
    /// - `InvalidWebhookSignature` if the payload fails verification
    pub async fn handle(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome, VipError> {
        let event = self
            .gateway
            .verify_webhook(payload, signature)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected payment webhook");
                VipError::invalid_signature(e.message)
            })?;

        if self.settings.require_livemode && !event.livemode {
            tracing::info!(event_id = %event.id, "Ignoring test-mode payment event");
            return Ok(WebhookOutcome::Ignored("test-mode event"));
        }

        let outcome = match self.dispatch(&event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = event.event_type.as_str(),
                    error = %e,
                    reconcile = "manual",
                    "Payment webhook processing failed"
                );
                WebhookOutcome::Failed(e.message())
            }
        };

        tracing::info!(
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            outcome = outcome.label(),
            "Payment webhook processed"
        );
        Ok(outcome)
    }

    async fn dispatch(&self, event: &GatewayEvent) -> Result<WebhookOutcome, VipError> {
        match &event.event_type {
            GatewayEventType::CheckoutSessionCompleted => self.on_checkout_completed(event).await,
            GatewayEventType::SubscriptionDeleted => {
                self.on_subscription_ended(event, VipEndReason::SubscriptionDeleted)
                    .await
            }
            GatewayEventType::InvoicePaymentFailed => {
                self.on_subscription_ended(event, VipEndReason::PaymentFailed)
                    .await
            }
            GatewayEventType::SubscriptionUpdated => match &event.data {
                GatewayEventData::Subscription(snapshot) => {
                    self.on_subscription_updated(event, snapshot).await
                }
                _ => Ok(WebhookOutcome::Ignored("subscription event without subscription")),
            },
            GatewayEventType::Other(_) => Ok(WebhookOutcome::Ignored("unhandled event type")),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // checkout.session.completed
    // ════════════════════════════════════════════════════════════════════════════

    async fn on_checkout_completed(&self, event: &GatewayEvent) -> Result<WebhookOutcome, VipError> {
        let now = Timestamp::now();

        // 1. Ledger row by order code; anything settled is a replay
        let Some(order_code) = event.data.order_code() else {
            return Ok(WebhookOutcome::Ignored("checkout without order code"));
        };
        let Some(mut purchase) = self.purchases.find_by_order_code(&order_code).await? else {
            tracing::warn!(order_code = %order_code, "Checkout completed for unknown order code");
            return Ok(WebhookOutcome::Ignored("unknown order code"));
        };
        if !purchase.is_pending() {
            return Ok(WebhookOutcome::Duplicate { order_code });
        }

        // 2. The listing must still belong to the payer
        let listing = self
            .listings
            .find_by_id(purchase.listing_id())
            .await?
            .filter(|l| l.owner_id == purchase.user_id());
        let Some(mut listing) = listing else {
            purchase.mark_failed("Listing missing or owner changed", now)?;
            self.purchases.update(&purchase).await?;
            tracing::warn!(order_code = %order_code, "Paid checkout could not be applied to its listing");
            return Ok(WebhookOutcome::PurchaseFailed { order_code });
        };

        // 3. Settle the ledger row
        let subscription_id = event.data.subscription_id().map(String::from);
        purchase.mark_paid(event.raw.clone(), subscription_id.clone(), now)?;
        self.purchases.update(&purchase).await?;

        // 4. Work out the paid period
        let plan = match self.plans.find_by_id(purchase.plan_id()).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(plan_id = %purchase.plan_id(), error = %e, "Plan lookup failed during activation");
                None
            }
        };
        let expires_at = self
            .paid_until(plan.as_ref(), subscription_id.as_deref(), &event.data, now)
            .await;
        let (tier, priority) = plan
            .as_ref()
            .map(|p| (p.tier(), p.priority))
            .unwrap_or((None, 0));

        // 5. Promote the listing
        listing.activate_vip(
            VipGrant {
                tier,
                priority,
                expires_at,
                plan_id: purchase.plan_id(),
            },
            now,
        );
        self.listings.update(&listing).await?;

        tracing::info!(
            order_code = %order_code,
            listing_id = %listing.id,
            tier = tier.map_or("none", |t| t.as_str()),
            expires_at = %expires_at,
            "VIP activated"
        );

        // 6. Post-commit event
        let activated = VipActivated {
            event_id: EventId::new(),
            listing_id: listing.id,
            order_code: order_code.clone(),
            plan_id: purchase.plan_id(),
            tier,
            expires_at,
            activated_at: now,
        };
        self.publish(EventEnvelope::from_event(&activated), &purchase).await;

        Ok(WebhookOutcome::Activated {
            order_code,
            listing_id: listing.id,
            expires_at,
        })
    }

    /// Subscription plans end at the gateway's period end, one-time plans
    /// after their duration. Without a plan the checkout metadata decides.
    async fn paid_until(
        &self,
        plan: Option<&VipPlan>,
        subscription_id: Option<&str>,
        data: &GatewayEventData,
        now: Timestamp,
    ) -> Timestamp {
        match plan {
            Some(plan) if plan.billing.is_subscription() => {
                if let Some(id) = subscription_id {
                    match self.gateway.get_subscription(id).await {
                        Ok(Some(SubscriptionSnapshot {
                            current_period_end: Some(end),
                            ..
                        })) => return end,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(subscription_id = id, error = %e, "Subscription lookup failed; using plan interval");
                        }
                    }
                }
                plan.billing.period_end(now)
            }
            Some(plan) => plan.billing.period_end(now),
            None => now.add_days(self.metadata_duration_days(data)),
        }
    }

    fn metadata_duration_days(&self, data: &GatewayEventData) -> i64 {
        let from_metadata = match data {
            GatewayEventData::Checkout { metadata, .. } => metadata
                .get(METADATA_DURATION_DAYS)
                .and_then(|days| days.trim().parse::<i64>().ok())
                .filter(|days| *days > 0),
            _ => None,
        };
        from_metadata.unwrap_or(self.settings.default_duration_days)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription lifecycle
    // ════════════════════════════════════════════════════════════════════════════

    async fn on_subscription_ended(
        &self,
        event: &GatewayEvent,
        reason: VipEndReason,
    ) -> Result<WebhookOutcome, VipError> {
        let Some(subscription_id) = event.data.subscription_id() else {
            return Ok(WebhookOutcome::Ignored("event without subscription"));
        };
        let Some(purchase) = self.settled_purchase(event, subscription_id).await? else {
            return Ok(WebhookOutcome::Ignored("no paid purchase for subscription"));
        };
        self.deactivate(&purchase, reason).await
    }

    async fn on_subscription_updated(
        &self,
        event: &GatewayEvent,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<WebhookOutcome, VipError> {
        let Some(purchase) = self.settled_purchase(event, &snapshot.id).await? else {
            return Ok(WebhookOutcome::Ignored("no paid purchase for subscription"));
        };

        if snapshot.status.is_lapsed() {
            return self.deactivate(&purchase, VipEndReason::SubscriptionLapsed).await;
        }
        if snapshot.status != SubscriptionStatus::Active {
            return Ok(WebhookOutcome::Ignored("subscription status needs no action"));
        }
        let Some(period_end) = snapshot.current_period_end else {
            return Ok(WebhookOutcome::Ignored("active subscription without period end"));
        };

        let now = Timestamp::now();
        let Some(mut listing) = self.listings.find_by_id(purchase.listing_id()).await? else {
            return Ok(WebhookOutcome::Ignored("listing no longer exists"));
        };

        let outcome = if snapshot.cancel_at_period_end {
            listing.cap_vip_expiry(period_end, now);
            WebhookOutcome::ExpiryCapped {
                listing_id: listing.id,
                expires_at: listing.vip_expires_at.unwrap_or(period_end),
            }
        } else {
            listing.renew_vip(period_end, now);
            WebhookOutcome::Renewed {
                listing_id: listing.id,
                expires_at: period_end,
            }
        };
        self.listings.update(&listing).await?;

        tracing::info!(
            listing_id = %listing.id,
            subscription_id = %snapshot.id,
            outcome = outcome.label(),
            "VIP subscription updated"
        );
        Ok(outcome)
    }

    /// The paid ledger row for a subscription, with the event payload cached.
    async fn settled_purchase(
        &self,
        event: &GatewayEvent,
        subscription_id: &str,
    ) -> Result<Option<VipPurchase>, VipError> {
        let Some(mut purchase) = self
            .purchases
            .find_paid_by_subscription_id(subscription_id)
            .await?
        else {
            tracing::warn!(subscription_id, "No paid VIP purchase for subscription");
            return Ok(None);
        };
        purchase.record_payload(event.raw.clone(), Timestamp::now());
        self.purchases.update(&purchase).await?;
        Ok(Some(purchase))
    }

    async fn deactivate(
        &self,
        purchase: &VipPurchase,
        reason: VipEndReason,
    ) -> Result<WebhookOutcome, VipError> {
        let now = Timestamp::now();
        let Some(mut listing) = self.listings.find_by_id(purchase.listing_id()).await? else {
            return Ok(WebhookOutcome::Ignored("listing no longer exists"));
        };

        listing.deactivate_vip(now);
        self.listings.update(&listing).await?;
        tracing::info!(listing_id = %listing.id, reason = ?reason, "VIP deactivated");

        let deactivated = VipDeactivated {
            event_id: EventId::new(),
            listing_id: listing.id,
            reason,
            deactivated_at: now,
        };
        self.publish(EventEnvelope::from_event(&deactivated), purchase).await;

        Ok(WebhookOutcome::Deactivated {
            listing_id: listing.id,
            reason,
        })
    }

    async fn publish(&self, envelope: EventEnvelope, purchase: &VipPurchase) {
        let event_type = envelope.event_type.clone();
        let envelope = envelope.with_user_id(purchase.user_id().to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(order_code = %purchase.order_code(), error = %e, "Failed to publish {}", event_type);
        }
    }
}

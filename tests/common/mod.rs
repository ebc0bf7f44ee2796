//! Shared marketplace seed for integration tests.
//!
//! Users: admin 1, buyer 5, staff 7, other staff 8, seller 9.
//! Listings owned by the seller: published vehicle 42, unpublished vehicle 43.
//! Plans: Gold one-time 30 days (1), Diamond monthly subscription (2).

#![allow(dead_code)]

use std::sync::Arc;

use ev_marketplace::adapters::email::RecordingNotifier;
use ev_marketplace::adapters::events::InMemoryEventBus;
use ev_marketplace::adapters::http::AppState;
use ev_marketplace::adapters::memory::InMemoryMarketplaceStore;
use ev_marketplace::adapters::stripe::MockPaymentGateway;
use ev_marketplace::application::handlers::listing::ListingSaleStatusSync;
use ev_marketplace::domain::contract::CONTRACT_SIGNED_EVENT;
use ev_marketplace::domain::foundation::{Actor, ListingId, Role, Timestamp, UserId, VipPlanId};
use ev_marketplace::domain::listing::{Listing, ListingCategory};
use ev_marketplace::domain::vip::{BillingInterval, PlanBilling, VipPlan};
use ev_marketplace::ports::{EventSubscriber, UserProfile};

pub const ADMIN: i64 = 1;
pub const BUYER: i64 = 5;
pub const STAFF: i64 = 7;
pub const OTHER_STAFF: i64 = 8;
pub const SELLER: i64 = 9;

pub const VEHICLE: i64 = 42;
pub const UNPUBLISHED_VEHICLE: i64 = 43;

pub const GOLD_30_DAYS: i64 = 1;
pub const DIAMOND_MONTHLY: i64 = 2;

pub fn user(id: i64) -> UserId {
    UserId::new(id).unwrap()
}

pub fn listing_id(id: i64) -> ListingId {
    ListingId::new(id).unwrap()
}

pub fn plan_id(id: i64) -> VipPlanId {
    VipPlanId::new(id).unwrap()
}

pub fn admin() -> Actor {
    Actor::admin(user(ADMIN))
}

pub fn staff() -> Actor {
    Actor::staff(user(STAFF))
}

pub fn buyer() -> Actor {
    Actor::customer(user(BUYER))
}

pub fn seller() -> Actor {
    Actor::customer(user(SELLER))
}

pub struct Marketplace {
    pub store: Arc<InMemoryMarketplaceStore>,
    pub bus: Arc<InMemoryEventBus>,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: Arc<MockPaymentGateway>,
}

impl Marketplace {
    pub fn new() -> Self {
        Self::with_gateway(MockPaymentGateway::new())
    }

    pub fn with_gateway(gateway: MockPaymentGateway) -> Self {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        for (id, role) in [
            (ADMIN, Role::Admin),
            (BUYER, Role::Customer),
            (STAFF, Role::Staff),
            (OTHER_STAFF, Role::Staff),
            (SELLER, Role::Customer),
        ] {
            store.add_user(UserProfile {
                id: user(id),
                email: format!("user{}@evmarket.test", id),
                full_name: format!("User {}", id),
                role,
            });
        }

        let mut vehicle = Listing::draft(
            listing_id(VEHICLE),
            user(SELLER),
            "VinFast VF e34 2022",
            ListingCategory::Vehicle,
            450_000_000,
        );
        vehicle.is_active = true;
        vehicle.published_at = Some(Timestamp::now());
        store.add_listing(vehicle);

        store.add_listing(Listing::draft(
            listing_id(UNPUBLISHED_VEHICLE),
            user(SELLER),
            "VinFast VF5 Plus 2024",
            ListingCategory::Vehicle,
            480_000_000,
        ));

        store.add_plan(VipPlan {
            id: plan_id(GOLD_30_DAYS),
            name: "Gold 30 days".to_string(),
            slug: "gold".to_string(),
            billing: PlanBilling::one_time(30).unwrap(),
            amount: 150_000,
            currency: "vnd".to_string(),
            priority: 20,
            active: true,
            external_product_id: None,
            external_price_id: None,
        });
        store.add_plan(VipPlan {
            id: plan_id(DIAMOND_MONTHLY),
            name: "Diamond monthly".to_string(),
            slug: "diamond".to_string(),
            billing: PlanBilling::subscription(BillingInterval::Month, 1).unwrap(),
            amount: 400_000,
            currency: "vnd".to_string(),
            priority: 50,
            active: true,
            external_product_id: Some("prod_diamond".to_string()),
            external_price_id: Some("price_diamond".to_string()),
        });

        let bus = Arc::new(InMemoryEventBus::new());
        bus.subscribe(
            CONTRACT_SIGNED_EVENT,
            Arc::new(ListingSaleStatusSync::new(store.clone())),
        );

        Self {
            store,
            bus,
            notifier: Arc::new(RecordingNotifier::new()),
            gateway: Arc::new(gateway),
        }
    }

    pub fn state(&self) -> AppState {
        AppState::from_store(
            self.store.clone(),
            self.gateway.clone(),
            self.notifier.clone(),
            self.bus.clone(),
        )
    }

    pub fn listing(&self, id: i64) -> Listing {
        self.store.listing(listing_id(id)).unwrap()
    }
}

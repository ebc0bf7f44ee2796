//! Shared fixture for handler tests.
//!
//! Seeds a small marketplace: one admin, two staff members, a buyer, a
//! seller, four of the seller's listings (two published vehicles, an
//! unpublished vehicle and a battery) and three VIP plans.

use std::sync::Arc;

use crate::adapters::email::RecordingNotifier;
use crate::adapters::events::InMemoryEventBus;
use crate::adapters::memory::InMemoryMarketplaceStore;
use crate::adapters::stripe::MockPaymentGateway;
use crate::domain::contract::{
    Contract, ContractTerms, FeeKind, FeeResponsibility, FeeSchedule, OtpPolicy, Party,
    PurchaseRequest,
};
use crate::domain::foundation::{
    Actor, ContractId, ListingId, PurchaseRequestId, Role, Timestamp, UserId, VipPlanId,
};
use crate::domain::listing::{Listing, ListingCategory};
use crate::domain::vip::{BillingInterval, PlanBilling, VipPlan};
use crate::ports::{ContractRepository, PurchaseRequestRepository, UserProfile};

use super::contract::ContractMailer;

pub const ADMIN: i64 = 1;
pub const STAFF: i64 = 2;
pub const BUYER: i64 = 3;
pub const SELLER: i64 = 4;
pub const OTHER_STAFF: i64 = 5;
pub const STRANGER: i64 = 6;

pub const VEHICLE: i64 = 100;
pub const BATTERY: i64 = 101;
pub const SECOND_VEHICLE: i64 = 102;
pub const DRAFT_VEHICLE: i64 = 103;

pub const GOLD_30_DAYS: i64 = 1;
pub const DIAMOND_MONTHLY: i64 = 2;
pub const RETIRED_PLAN: i64 = 3;

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

pub fn other_staff() -> Actor {
    Actor::staff(user(OTHER_STAFF))
}

pub fn buyer() -> Actor {
    Actor::customer(user(BUYER))
}

pub fn seller() -> Actor {
    Actor::customer(user(SELLER))
}

pub fn stranger() -> Actor {
    Actor::customer(user(STRANGER))
}

pub fn email_of(id: i64) -> String {
    format!("user{}@ev.test", id)
}

pub struct Fixture {
    pub store: Arc<InMemoryMarketplaceStore>,
    pub bus: Arc<InMemoryEventBus>,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: Arc<MockPaymentGateway>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        for (id, role) in [
            (ADMIN, Role::Admin),
            (STAFF, Role::Staff),
            (BUYER, Role::Customer),
            (SELLER, Role::Customer),
            (OTHER_STAFF, Role::Staff),
            (STRANGER, Role::Customer),
        ] {
            store.add_user(UserProfile {
                id: user(id),
                email: email_of(id),
                full_name: format!("User {}", id),
                role,
            });
        }

        let mut vehicle = Listing::draft(
            listing_id(VEHICLE),
            user(SELLER),
            "VinFast VF8 2023",
            ListingCategory::Vehicle,
            850_000_000,
        );
        vehicle.is_active = true;
        vehicle.published_at = Some(Timestamp::now());
        store.add_listing(vehicle.clone());

        let mut second = vehicle;
        second.id = listing_id(SECOND_VEHICLE);
        second.title = "Tesla Model 3 2021".to_string();
        store.add_listing(second);

        let draft = Listing::draft(
            listing_id(DRAFT_VEHICLE),
            user(SELLER),
            "Hyundai Kona Electric 2022",
            ListingCategory::Vehicle,
            620_000_000,
        );
        store.add_listing(draft);

        let mut battery = Listing::draft(
            listing_id(BATTERY),
            user(SELLER),
            "LFP pack 42 kWh",
            ListingCategory::Battery,
            60_000_000,
        );
        battery.is_active = true;
        store.add_listing(battery);

        for plan in sample_plans() {
            store.add_plan(plan);
        }

        Self {
            store,
            bus: Arc::new(InMemoryEventBus::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            gateway: Arc::new(MockPaymentGateway::new()),
        }
    }

    pub fn mailer(&self) -> Arc<ContractMailer> {
        Arc::new(ContractMailer::new(self.notifier.clone(), self.store.clone()))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Contracts at each stage
    // ════════════════════════════════════════════════════════════════════════════

    /// Pending contract between BUYER and SELLER on VEHICLE.
    pub async fn pending_contract(&self) -> Contract {
        self.pending_contract_on(VEHICLE).await
    }

    pub async fn pending_contract_on(&self, listing: i64) -> Contract {
        let contract = Contract::create(
            ContractId::new(),
            listing_id(listing),
            user(BUYER),
            user(SELLER),
            None,
            Timestamp::now(),
        )
        .unwrap();
        ContractRepository::save(self.store.as_ref(), &contract).await.unwrap();
        contract
    }

    /// Negotiating, with STAFF assigned.
    pub async fn negotiating_contract(&self) -> Contract {
        let mut contract = self.pending_contract().await;
        contract.assign_staff(user(STAFF), Timestamp::now()).unwrap();
        self.persist(&contract).await;
        contract
    }

    /// Awaiting signatures on finalized terms.
    pub async fn awaiting_sign_contract(&self) -> Contract {
        let mut contract = self.negotiating_contract().await;
        contract.finalize_terms(sample_terms(), Timestamp::now()).unwrap();
        self.persist(&contract).await;
        contract
    }

    /// Signed by both parties.
    pub async fn signed_contract(&self) -> Contract {
        let mut contract = self.awaiting_sign_contract().await;
        let policy = OtpPolicy::default();
        let now = Timestamp::now();
        let codes = contract.issue_otps(&policy, now).unwrap();
        for (party, code) in codes {
            contract.verify_otp(party, code.expose(), &policy, now).unwrap();
        }
        assert!(contract.complete_signing(now).unwrap());
        self.persist(&contract).await;
        contract
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Purchase requests
    // ════════════════════════════════════════════════════════════════════════════

    /// Pending request from BUYER on VEHICLE, created `age_days` ago with
    /// the default three-day deadline.
    pub async fn request_aged(&self, age_days: i64) -> PurchaseRequest {
        let request = PurchaseRequest::new(
            PurchaseRequestId::new(),
            user(BUYER),
            user(SELLER),
            listing_id(VEHICLE),
            Some("Still available?".to_string()),
            3,
            Timestamp::now().add_days(-age_days),
        )
        .unwrap();
        PurchaseRequestRepository::save(self.store.as_ref(), &request).await.unwrap();
        request
    }

    pub async fn pending_request(&self) -> PurchaseRequest {
        self.request_aged(0).await
    }

    pub async fn stored_request(&self, id: &PurchaseRequestId) -> PurchaseRequest {
        PurchaseRequestRepository::find_by_id(self.store.as_ref(), id)
            .await
            .unwrap()
            .unwrap()
    }

    /// Stores a contract staged by the test, replacing the stored copy.
    pub async fn persist(&self, contract: &Contract) {
        self.store.put_contract(contract);
    }

    pub async fn reload(&self, contract: &Contract) -> Contract {
        self.store.contract(contract.id()).unwrap()
    }
}

/// 500,000,000 with two fees split between the parties.
pub fn sample_terms() -> ContractTerms {
    let fees = FeeSchedule::new()
        .with(FeeKind::BrokerageFee, 5_000_000)
        .unwrap()
        .with(FeeKind::TitleTransferFee, 2_000_000)
        .unwrap();
    let responsibility = FeeResponsibility::new()
        .with(FeeKind::BrokerageFee, Party::Seller)
        .with(FeeKind::TitleTransferFee, Party::Buyer);
    ContractTerms::new(500_000_000, fees, responsibility).unwrap()
}

/// Gold for 30 days (inline price), Diamond monthly (catalogue price) and a
/// retired Silver plan.
pub fn sample_plans() -> Vec<VipPlan> {
    vec![
        VipPlan {
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
        },
        VipPlan {
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
        },
        VipPlan {
            id: plan_id(RETIRED_PLAN),
            name: "Silver 7 days".to_string(),
            slug: "silver".to_string(),
            billing: PlanBilling::one_time(7).unwrap(),
            amount: 50_000,
            currency: "vnd".to_string(),
            priority: 5,
            active: false,
            external_product_id: None,
            external_price_id: None,
        },
    ]
}

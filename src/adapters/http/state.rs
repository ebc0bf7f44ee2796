//! Shared application state for the HTTP adapters.

use std::sync::Arc;

use crate::application::handlers::contract::{
    AssignStaffHandler, CancelContractHandler, CompleteContractHandler, ContractMailer,
    CreateContractHandler, FinalizeTermsHandler, GetContractHandler, ListContractsHandler,
    RecordAppointmentHandler, SendDraftContractHandler, SendOtpHandler, StartNotarizationHandler,
    VerifyOtpHandler,
};
use crate::application::handlers::listing::ListPublicListingsHandler;
use crate::application::handlers::purchase_request::{
    AcceptPurchaseRequestHandler, CreatePurchaseRequestHandler, GetPurchaseRequestHandler,
    ListPurchaseRequestsHandler, RejectPurchaseRequestHandler, WithdrawPurchaseRequestHandler,
};
use crate::application::handlers::vip::{
    CreateVipCheckoutHandler, HandleVipWebhookHandler, ListVipPlansHandler, VipSettings,
};
use crate::domain::contract::{OtpPolicy, DEFAULT_REQUEST_TTL_DAYS};
use crate::ports::{
    ContractRepository, EventPublisher, ListingRepository, Notifier, PaymentGateway,
    PurchaseRequestRepository, UserDirectory, VipPlanRepository, VipPurchaseRepository,
};

/// Shared application state containing all dependencies.
///
/// Cloned per request; handlers are built on demand from the shared ports.
#[derive(Clone)]
pub struct AppState {
    pub contracts: Arc<dyn ContractRepository>,
    pub purchase_requests: Arc<dyn PurchaseRequestRepository>,
    pub listings: Arc<dyn ListingRepository>,
    pub vip_plans: Arc<dyn VipPlanRepository>,
    pub vip_purchases: Arc<dyn VipPurchaseRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub otp_policy: OtpPolicy,
    pub vip_settings: VipSettings,
    pub purchase_request_ttl_days: i64,
}

/// The ports a store must provide to back every route.
pub trait MarketplaceStore:
    ContractRepository
    + PurchaseRequestRepository
    + ListingRepository
    + VipPlanRepository
    + VipPurchaseRepository
    + UserDirectory
    + 'static
{
}

impl<T> MarketplaceStore for T where
    T: ContractRepository
        + PurchaseRequestRepository
        + ListingRepository
        + VipPlanRepository
        + VipPurchaseRepository
        + UserDirectory
        + 'static
{
}

impl AppState {
    /// State whose repositories all live in one store, as in tests and local runs.
    pub fn from_store<S: MarketplaceStore>(
        store: Arc<S>,
        payment_gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            contracts: store.clone(),
            purchase_requests: store.clone(),
            listings: store.clone(),
            vip_plans: store.clone(),
            vip_purchases: store.clone(),
            users: store,
            payment_gateway,
            notifier,
            event_publisher,
            otp_policy: OtpPolicy::default(),
            vip_settings: VipSettings::default(),
            purchase_request_ttl_days: DEFAULT_REQUEST_TTL_DAYS,
        }
    }

    pub fn with_otp_policy(mut self, policy: OtpPolicy) -> Self {
        self.otp_policy = policy;
        self
    }

    pub fn with_vip_settings(mut self, settings: VipSettings) -> Self {
        self.vip_settings = settings;
        self
    }

    pub fn with_purchase_request_ttl_days(mut self, days: i64) -> Self {
        self.purchase_request_ttl_days = days;
        self
    }

    fn mailer(&self) -> Arc<ContractMailer> {
        Arc::new(ContractMailer::new(self.notifier.clone(), self.users.clone()))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Contract handlers
    // ════════════════════════════════════════════════════════════════════════════

    pub fn create_contract_handler(&self) -> CreateContractHandler {
        CreateContractHandler::new(
            self.contracts.clone(),
            self.listings.clone(),
            self.event_publisher.clone(),
            self.mailer(),
        )
    }

    pub fn assign_staff_handler(&self) -> AssignStaffHandler {
        AssignStaffHandler::new(
            self.contracts.clone(),
            self.users.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn record_appointment_handler(&self) -> RecordAppointmentHandler {
        RecordAppointmentHandler::new(self.contracts.clone())
    }

    pub fn finalize_terms_handler(&self) -> FinalizeTermsHandler {
        FinalizeTermsHandler::new(self.contracts.clone(), self.event_publisher.clone())
    }

    pub fn send_draft_handler(&self) -> SendDraftContractHandler {
        SendDraftContractHandler::new(self.contracts.clone(), self.mailer())
    }

    pub fn send_otp_handler(&self) -> SendOtpHandler {
        SendOtpHandler::new(self.contracts.clone(), self.mailer(), self.otp_policy)
    }

    pub fn verify_otp_handler(&self) -> VerifyOtpHandler {
        VerifyOtpHandler::new(
            self.contracts.clone(),
            self.event_publisher.clone(),
            self.otp_policy,
        )
    }

    pub fn start_notarization_handler(&self) -> StartNotarizationHandler {
        StartNotarizationHandler::new(self.contracts.clone())
    }

    pub fn complete_contract_handler(&self) -> CompleteContractHandler {
        CompleteContractHandler::new(
            self.contracts.clone(),
            self.event_publisher.clone(),
            self.mailer(),
        )
    }

    pub fn cancel_contract_handler(&self) -> CancelContractHandler {
        CancelContractHandler::new(self.contracts.clone(), self.event_publisher.clone())
    }

    pub fn get_contract_handler(&self) -> GetContractHandler {
        GetContractHandler::new(self.contracts.clone())
    }

    pub fn list_contracts_handler(&self) -> ListContractsHandler {
        ListContractsHandler::new(self.contracts.clone())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Purchase request handlers
    // ════════════════════════════════════════════════════════════════════════════

    pub fn create_purchase_request_handler(&self) -> CreatePurchaseRequestHandler {
        CreatePurchaseRequestHandler::new(
            self.purchase_requests.clone(),
            self.listings.clone(),
            self.mailer(),
        )
        .with_ttl_days(self.purchase_request_ttl_days)
    }

    pub fn accept_purchase_request_handler(&self) -> AcceptPurchaseRequestHandler {
        AcceptPurchaseRequestHandler::new(
            self.purchase_requests.clone(),
            self.contracts.clone(),
            self.listings.clone(),
            self.event_publisher.clone(),
            self.mailer(),
        )
    }

    pub fn reject_purchase_request_handler(&self) -> RejectPurchaseRequestHandler {
        RejectPurchaseRequestHandler::new(self.purchase_requests.clone(), self.mailer())
    }

    pub fn withdraw_purchase_request_handler(&self) -> WithdrawPurchaseRequestHandler {
        WithdrawPurchaseRequestHandler::new(self.purchase_requests.clone())
    }

    pub fn get_purchase_request_handler(&self) -> GetPurchaseRequestHandler {
        GetPurchaseRequestHandler::new(self.purchase_requests.clone())
    }

    pub fn list_purchase_requests_handler(&self) -> ListPurchaseRequestsHandler {
        ListPurchaseRequestsHandler::new(self.purchase_requests.clone())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // VIP and listing handlers
    // ════════════════════════════════════════════════════════════════════════════

    pub fn vip_checkout_handler(&self) -> CreateVipCheckoutHandler {
        CreateVipCheckoutHandler::new(
            self.listings.clone(),
            self.vip_plans.clone(),
            self.vip_purchases.clone(),
            self.users.clone(),
            self.payment_gateway.clone(),
            self.vip_settings.clone(),
        )
    }

    pub fn vip_webhook_handler(&self) -> HandleVipWebhookHandler {
        HandleVipWebhookHandler::new(
            self.vip_purchases.clone(),
            self.listings.clone(),
            self.vip_plans.clone(),
            self.payment_gateway.clone(),
            self.event_publisher.clone(),
            self.vip_settings.clone(),
        )
    }

    pub fn list_vip_plans_handler(&self) -> ListVipPlansHandler {
        ListVipPlansHandler::new(self.vip_plans.clone())
    }

    pub fn list_public_listings_handler(&self) -> ListPublicListingsHandler {
        ListPublicListingsHandler::new(self.listings.clone())
    }
}

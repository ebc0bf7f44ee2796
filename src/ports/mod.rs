//! Ports - interfaces between the application core and the outside world.
//!
//! Each port is an async trait implemented by one or more adapters.
//!
//! # Repositories
//!
//! - `ContractRepository`, `PurchaseRequestRepository`
//! - `ListingRepository`, `VipPlanRepository`, `VipPurchaseRepository`
//! - `UserDirectory` - read-only user lookups
//!
//! # External services
//!
//! - `PaymentGateway` - checkout, subscriptions, webhooks
//! - `Notifier` - outbound email
//! - `SessionValidator` - bearer token verification
//!
//! # Events
//!
//! - `EventPublisher`, `EventSubscriber`, `EventHandler`

mod contract_repository;
mod event_publisher;
mod event_subscriber;
mod listing_repository;
mod notifier;
mod payment_gateway;
mod purchase_request_repository;
mod session_validator;
mod user_directory;
mod vip_plan_repository;
mod vip_purchase_repository;

pub use contract_repository::{ContractRepository, ContractScope};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use listing_repository::ListingRepository;
pub use notifier::{EmailMessage, Notifier, NotifierError};
pub use payment_gateway::{
    CheckoutMetadata, CheckoutMode, CheckoutRequest, CheckoutSession, GatewayEvent,
    GatewayEventData, GatewayEventType, LineItem, PaymentError, PaymentErrorCode, PaymentGateway,
    SubscriptionSnapshot, SubscriptionStatus, METADATA_DURATION_DAYS, METADATA_ORDER_CODE,
};
pub use purchase_request_repository::{PurchaseRequestRepository, PurchaseRequestScope};
pub use session_validator::SessionValidator;
pub use user_directory::{UserDirectory, UserProfile};
pub use vip_plan_repository::VipPlanRepository;
pub use vip_purchase_repository::VipPurchaseRepository;

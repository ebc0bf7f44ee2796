//! PostgreSQL adapters - sqlx implementations of the repository ports.
//!
//! - `PostgresContractRepository`
//! - `PostgresPurchaseRequestRepository` - owns the accept transaction
//! - `PostgresListingRepository`, `PostgresVipPlanRepository`
//! - `PostgresVipPurchaseRepository` - the VIP ledger
//! - `PostgresUserDirectory`

mod contract_repository;
mod listing_repository;
mod mapping;
mod purchase_request_repository;
mod user_directory;
mod vip_plan_repository;
mod vip_purchase_repository;

pub use contract_repository::PostgresContractRepository;
pub use listing_repository::PostgresListingRepository;
pub use purchase_request_repository::PostgresPurchaseRequestRepository;
pub use user_directory::PostgresUserDirectory;
pub use vip_plan_repository::PostgresVipPlanRepository;
pub use vip_purchase_repository::PostgresVipPurchaseRepository;

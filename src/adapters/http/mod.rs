//! HTTP adapters - REST API over the marketplace handlers.
//!
//! Each area has its own module with DTOs, handlers and routes; `router`
//! assembles them under `/api`.

pub mod contract;
pub mod error;
pub mod listing;
pub mod middleware;
pub mod purchase_request;
pub mod router;
pub mod state;
pub mod vip;

pub use error::{ContractApiError, ErrorResponse, VipApiError};
pub use router::{api_routes, app_router};
pub use state::{AppState, MarketplaceStore};

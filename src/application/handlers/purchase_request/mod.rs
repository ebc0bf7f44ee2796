//! Purchase request handlers.
//!
//! A buyer's request to purchase a listing, decided by the seller or the
//! back office. Acceptance opens the contract.
//!
//! Every handler that loads a request expires it first when its deadline
//! has passed; `ExpirePurchaseRequestsHandler` sweeps the rest.

mod accept_purchase_request;
mod create_purchase_request;
mod expire_purchase_requests;
mod get_purchase_request;
mod list_purchase_requests;
mod loading;
mod reject_purchase_request;
mod withdraw_purchase_request;

// Commands
pub use accept_purchase_request::{
    AcceptPurchaseRequestCommand, AcceptPurchaseRequestHandler, AcceptPurchaseRequestResult,
};
pub use create_purchase_request::{CreatePurchaseRequestCommand, CreatePurchaseRequestHandler};
pub use expire_purchase_requests::ExpirePurchaseRequestsHandler;
pub use reject_purchase_request::{RejectPurchaseRequestCommand, RejectPurchaseRequestHandler};
pub use withdraw_purchase_request::{
    WithdrawPurchaseRequestCommand, WithdrawPurchaseRequestHandler,
};

// Queries
pub use get_purchase_request::{GetPurchaseRequestHandler, GetPurchaseRequestQuery};
pub use list_purchase_requests::{ListPurchaseRequestsHandler, ListPurchaseRequestsQuery};

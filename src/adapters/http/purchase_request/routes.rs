//! Axum router configuration for purchase request endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{
    accept_purchase_request, create_purchase_request, get_purchase_request,
    list_purchase_requests, reject_purchase_request, withdraw_purchase_request,
};

/// Create the purchase request router, mounted at `/api/purchase-requests`.
///
/// # Routes
/// - `GET /`, `POST /`
/// - `GET /:id`
/// - `POST /:id/accept` - Seller or back office
/// - `POST /:id/reject` - Seller or back office
/// - `POST /:id/withdraw` - Buyer
pub fn purchase_request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_requests).post(create_purchase_request))
        .route("/:id", get(get_purchase_request))
        .route("/:id/accept", post(accept_purchase_request))
        .route("/:id/reject", post(reject_purchase_request))
        .route("/:id/withdraw", post(withdraw_purchase_request))
}

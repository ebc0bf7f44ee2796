//! Axum router configuration for VIP endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{create_checkout, handle_stripe_webhook, list_plans};

/// Create the VIP router, mounted at `/api/vip`.
///
/// # Routes
/// - `GET /plans` - Public plan catalogue
/// - `POST /checkout` - Requires authentication
pub fn vip_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/checkout", post(create_checkout))
}

/// Create the webhook router, mounted at `/api/webhooks`.
///
/// Kept apart from the VIP routes because deliveries carry no bearer token;
/// they are verified by signature.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

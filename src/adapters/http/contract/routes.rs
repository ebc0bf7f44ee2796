//! Axum router configuration for contract endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{
    assign_staff, cancel_contract, complete_contract, create_contract, finalize_terms,
    get_contract, list_contracts, record_appointment, send_draft, send_otp, start_notarization,
    verify_otp,
};

/// Create the contract API router, mounted at `/api/contracts`.
///
/// # Routes
///
/// ## Parties and back office
/// - `GET /` - Contracts visible to the caller
/// - `POST /` - Open a contract on a listing (buyer)
/// - `GET /:id` - One contract
/// - `POST /:id/otp/verify` - Sign with a code (buyer or seller)
///
/// ## Assigned staff or admin
/// - `POST /:id/assign-staff`
/// - `POST /:id/appointment`
/// - `POST /:id/terms`
/// - `POST /:id/draft`
/// - `POST /:id/otp`
/// - `POST /:id/notarize`
/// - `POST /:id/complete`
/// - `POST /:id/cancel`
pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route("/:id", get(get_contract))
        .route("/:id/assign-staff", post(assign_staff))
        .route("/:id/appointment", post(record_appointment))
        .route("/:id/terms", post(finalize_terms))
        .route("/:id/draft", post(send_draft))
        .route("/:id/otp", post(send_otp))
        .route("/:id/otp/verify", post(verify_otp))
        .route("/:id/notarize", post(start_notarization))
        .route("/:id/complete", post(complete_contract))
        .route("/:id/cancel", post(cancel_contract))
}

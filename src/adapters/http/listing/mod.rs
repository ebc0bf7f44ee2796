//! HTTP adapter for the public listing feed.

use axum::extract::{Json, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::adapters::http::error::ContractApiError;
use crate::adapters::http::state::AppState;
use crate::application::handlers::listing::PublicListing;

#[derive(Debug, Clone, Serialize)]
pub struct ListingFeedResponse {
    pub listings: Vec<PublicListing>,
}

/// GET /api/listings - Public listings, effective VIP first
pub async fn list_public_listings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ContractApiError> {
    let listings = state.list_public_listings_handler().handle().await?;
    Ok(Json(ListingFeedResponse { listings }))
}

/// Create the listing router, mounted at `/api/listings`.
pub fn listing_routes() -> Router<AppState> {
    Router::new().route("/", get(list_public_listings))
}

//! HTTP handlers for VIP endpoints and the payment webhook.

use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::http::error::VipApiError;
use crate::adapters::http::middleware::RequireActor;
use crate::adapters::http::state::AppState;
use crate::application::handlers::vip::CreateVipCheckoutCommand;
use crate::domain::vip::VipError;

use super::dto::{CheckoutResponse, CreateVipCheckoutRequest, VipPlanListResponse, WebhookAck};

/// Header carrying the Stripe webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// GET /api/vip/plans - Active plans, highest priority first
pub async fn list_plans(State(state): State<AppState>) -> Result<impl IntoResponse, VipApiError> {
    let plans = state.list_vip_plans_handler().handle().await?;
    Ok(Json(VipPlanListResponse { plans }))
}

/// POST /api/vip/checkout - Start (or resume) a hosted checkout for a listing
pub async fn create_checkout(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Json(request): Json<CreateVipCheckoutRequest>,
) -> Result<impl IntoResponse, VipApiError> {
    let cmd = CreateVipCheckoutCommand {
        actor,
        listing_id: request.listing_id,
        plan_id: request.plan_id,
    };
    let result = state.vip_checkout_handler().handle(cmd).await?;
    let status = if result.reused {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(CheckoutResponse::from(result))))
}

/// POST /api/webhooks/stripe - Payment gateway events
///
/// Only a signature failure is rejected; every verified delivery is
/// acknowledged so the gateway stops retrying.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, VipApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Payment webhook without signature header");
            VipError::invalid_signature("Missing Stripe-Signature header")
        })?;

    let outcome = state.vip_webhook_handler().handle(&body, signature).await?;

    Ok(Json(WebhookAck::from(&outcome)))
}

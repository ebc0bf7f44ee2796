//! HTTP handlers for purchase request endpoints.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ContractApiError;
use crate::adapters::http::middleware::RequireActor;
use crate::adapters::http::state::AppState;
use crate::application::handlers::purchase_request::{
    AcceptPurchaseRequestCommand, CreatePurchaseRequestCommand, GetPurchaseRequestQuery,
    ListPurchaseRequestsQuery, RejectPurchaseRequestCommand, WithdrawPurchaseRequestCommand,
};
use crate::domain::contract::{ContractError, ContractView};
use crate::domain::foundation::PurchaseRequestId;

use super::dto::{
    AcceptedResponse, CreatePurchaseRequestRequest, PurchaseRequestListResponse,
    PurchaseRequestResponse, PurchaseRequestView, RejectPurchaseRequestRequest,
};

fn parse_request_id(raw: &str) -> Result<PurchaseRequestId, ContractApiError> {
    raw.parse::<PurchaseRequestId>().map_err(|_| {
        ContractApiError(ContractError::validation(
            "purchase_request_id",
            format!("'{}' is not a valid id", raw),
        ))
    })
}

/// GET /api/purchase-requests - Requests the caller sent or received
pub async fn list_purchase_requests(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
) -> Result<impl IntoResponse, ContractApiError> {
    let requests = state
        .list_purchase_requests_handler()
        .handle(ListPurchaseRequestsQuery { actor })
        .await?;
    Ok(Json(PurchaseRequestListResponse {
        purchase_requests: requests.iter().map(PurchaseRequestView::from).collect(),
    }))
}

/// GET /api/purchase-requests/:id
pub async fn get_purchase_request(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let query = GetPurchaseRequestQuery {
        actor,
        request_id: parse_request_id(&id)?,
    };
    let request = state.get_purchase_request_handler().handle(query).await?;
    Ok(Json(PurchaseRequestResponse::from(&request)))
}

/// POST /api/purchase-requests - Ask to buy a listing
pub async fn create_purchase_request(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Json(request): Json<CreatePurchaseRequestRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = CreatePurchaseRequestCommand {
        actor,
        listing_id: request.listing_id,
        message: request.message,
    };
    let created = state.create_purchase_request_handler().handle(cmd).await?;
    Ok((StatusCode::CREATED, Json(PurchaseRequestResponse::from(&created))))
}

/// POST /api/purchase-requests/:id/accept - Accept and open the contract
pub async fn accept_purchase_request(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = AcceptPurchaseRequestCommand {
        actor,
        request_id: parse_request_id(&id)?,
    };
    let result = state.accept_purchase_request_handler().handle(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(AcceptedResponse {
            purchase_request: PurchaseRequestView::from(&result.request),
            contract: ContractView::from(&result.contract),
        }),
    ))
}

/// POST /api/purchase-requests/:id/reject
pub async fn reject_purchase_request(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    Json(request): Json<RejectPurchaseRequestRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = RejectPurchaseRequestCommand {
        actor,
        request_id: parse_request_id(&id)?,
        reason: request.reason,
    };
    let rejected = state.reject_purchase_request_handler().handle(cmd).await?;
    Ok(Json(PurchaseRequestResponse::from(&rejected)))
}

/// POST /api/purchase-requests/:id/withdraw - Buyer takes the request back
pub async fn withdraw_purchase_request(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = WithdrawPurchaseRequestCommand {
        actor,
        request_id: parse_request_id(&id)?,
    };
    let withdrawn = state.withdraw_purchase_request_handler().handle(cmd).await?;
    Ok(Json(PurchaseRequestResponse::from(&withdrawn)))
}

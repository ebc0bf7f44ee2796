//! HTTP handlers for contract endpoints.
//!
//! These handlers connect axum routes to the contract command/query handlers.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ContractApiError;
use crate::adapters::http::middleware::RequireActor;
use crate::adapters::http::state::AppState;
use crate::application::handlers::contract::{
    AssignStaffCommand, CancelContractCommand, CompleteContractCommand, CreateContractCommand,
    FinalizeTermsCommand, GetContractQuery, ListContractsQuery, RecordAppointmentCommand,
    SendDraftContractCommand, SendOtpCommand, StartNotarizationCommand, VerifyOtpCommand,
};
use crate::domain::contract::{Contract, ContractError, ContractView};
use crate::domain::foundation::ContractId;

use super::dto::{
    AssignStaffRequest, CancelContractRequest, ContractListResponse, ContractResponse,
    CreateContractRequest, DraftSentResponse, FinalizeTermsRequest, OtpSentResponse,
    OtpVerifiedResponse, RecordAppointmentRequest, VerifyOtpRequest,
};

fn parse_contract_id(raw: &str) -> Result<ContractId, ContractApiError> {
    raw.parse::<ContractId>().map_err(|_| {
        ContractApiError(ContractError::validation(
            "contract_id",
            format!("'{}' is not a valid id", raw),
        ))
    })
}

fn contract_response(contract: &Contract) -> Json<ContractResponse> {
    Json(ContractResponse {
        contract: ContractView::from(contract),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/contracts - Contracts visible to the caller
pub async fn list_contracts(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
) -> Result<impl IntoResponse, ContractApiError> {
    let contracts = state
        .list_contracts_handler()
        .handle(ListContractsQuery { actor })
        .await?;
    Ok(Json(ContractListResponse { contracts }))
}

/// GET /api/contracts/:id - One contract, signing codes redacted
pub async fn get_contract(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let query = GetContractQuery {
        actor,
        contract_id: parse_contract_id(&id)?,
    };
    let contract = state.get_contract_handler().handle(query).await?;
    Ok(Json(ContractResponse { contract }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/contracts - Open a contract on a listing as its buyer
pub async fn create_contract(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Json(request): Json<CreateContractRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = CreateContractCommand {
        actor,
        listing_id: request.listing_id,
    };
    let result = state.create_contract_handler().handle(cmd).await?;
    Ok((StatusCode::CREATED, contract_response(&result.contract)))
}

/// POST /api/contracts/:id/assign-staff - Assign or reassign the mediating staff member
pub async fn assign_staff(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    Json(request): Json<AssignStaffRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = AssignStaffCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
        staff_id: request.staff_id,
    };
    let result = state.assign_staff_handler().handle(cmd).await?;
    Ok(contract_response(&result.contract))
}

/// POST /api/contracts/:id/appointment - Record the meeting between the parties
pub async fn record_appointment(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    Json(request): Json<RecordAppointmentRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = RecordAppointmentCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
        scheduled_at: request.scheduled_at,
        place: request.place,
        note: request.note,
    };
    let contract = state.record_appointment_handler().handle(cmd).await?;
    Ok(contract_response(&contract))
}

/// POST /api/contracts/:id/terms - Finalize price and fees
pub async fn finalize_terms(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    Json(request): Json<FinalizeTermsRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = FinalizeTermsCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
        agreed_price: request.agreed_price,
        fees: request.fees,
        responsibility: request.responsibility,
    };
    let contract = state.finalize_terms_handler().handle(cmd).await?;
    Ok(contract_response(&contract))
}

/// POST /api/contracts/:id/draft - Email the draft to both parties
pub async fn send_draft(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = SendDraftContractCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
    };
    let result = state.send_draft_handler().handle(cmd).await?;
    Ok(Json(DraftSentResponse {
        delivered: result.delivered,
    }))
}

/// POST /api/contracts/:id/otp - Issue signing codes to parties who have not signed
pub async fn send_otp(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = SendOtpCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
    };
    let result = state.send_otp_handler().handle(cmd).await?;
    Ok(Json(OtpSentResponse::from(result)))
}

/// POST /api/contracts/:id/otp/verify - Sign as the calling party
pub async fn verify_otp(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = VerifyOtpCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
        code: request.code,
    };
    let result = state.verify_otp_handler().handle(cmd).await?;
    Ok(Json(OtpVerifiedResponse::from(result)))
}

/// POST /api/contracts/:id/notarize - Move a signed contract to notarization
pub async fn start_notarization(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = StartNotarizationCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
    };
    let contract = state.start_notarization_handler().handle(cmd).await?;
    Ok(contract_response(&contract))
}

/// POST /api/contracts/:id/complete - Close out a notarized sale
pub async fn complete_contract(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = CompleteContractCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
    };
    let contract = state.complete_contract_handler().handle(cmd).await?;
    Ok(contract_response(&contract))
}

/// POST /api/contracts/:id/cancel - Cancel with a reason
pub async fn cancel_contract(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    Json(request): Json<CancelContractRequest>,
) -> Result<impl IntoResponse, ContractApiError> {
    let cmd = CancelContractCommand {
        actor,
        contract_id: parse_contract_id(&id)?,
        reason: request.reason,
    };
    let contract = state.cancel_contract_handler().handle(cmd).await?;
    Ok(contract_response(&contract))
}

//! Error responses for the HTTP adapters.
//!
//! Every failure leaves the service as `{ "code": "...", "message": "..." }`.
//! Infrastructure failures are logged with their detail and answered with a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::contract::ContractError;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::domain::vip::VipError;

const GENERIC_MESSAGE: &str = "An internal error occurred";

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

fn respond(status: StatusCode, code: ErrorCode, message: String) -> Response {
    (status, Json(ErrorResponse::new(code.to_string(), message))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Contracts and purchase requests
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts contract errors to HTTP responses.
#[derive(Debug)]
pub struct ContractApiError(pub ContractError);

impl From<ContractError> for ContractApiError {
    fn from(err: ContractError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ContractApiError {
    fn from(err: DomainError) -> Self {
        Self(ContractError::from(err))
    }
}

impl From<ValidationError> for ContractApiError {
    fn from(err: ValidationError) -> Self {
        Self(ContractError::from(err))
    }
}

impl IntoResponse for ContractApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ContractError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            ContractError::Forbidden(_) => StatusCode::FORBIDDEN,
            ContractError::NotFound { .. } => StatusCode::NOT_FOUND,
            ContractError::Conflict { .. } | ContractError::InvalidState(_) => StatusCode::CONFLICT,
            ContractError::InvalidOtp | ContractError::OtpExpired => StatusCode::BAD_REQUEST,
            ContractError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            ContractError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Contract request failed");
                return respond(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    GENERIC_MESSAGE.to_string(),
                );
            }
        };
        respond(status, self.0.code(), self.0.message())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// VIP checkout and reconciliation
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts VIP errors to HTTP responses.
#[derive(Debug)]
pub struct VipApiError(pub VipError);

impl From<VipError> for VipApiError {
    fn from(err: VipError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for VipApiError {
    fn from(err: DomainError) -> Self {
        Self(VipError::from(err))
    }
}

impl From<ValidationError> for VipApiError {
    fn from(err: ValidationError) -> Self {
        Self(VipError::from(err))
    }
}

impl IntoResponse for VipApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VipError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            VipError::Forbidden(_) => StatusCode::FORBIDDEN,
            VipError::NotFound { .. } => StatusCode::NOT_FOUND,
            VipError::Conflict { .. } | VipError::InvalidState(_) => StatusCode::CONFLICT,
            VipError::Gateway {
                client_error: true, ..
            } => StatusCode::BAD_REQUEST,
            VipError::Gateway { message, .. } => {
                tracing::warn!(error = %message, "Payment gateway call failed");
                StatusCode::BAD_GATEWAY
            }
            VipError::InvalidWebhookSignature(_) => StatusCode::BAD_REQUEST,
            VipError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "VIP request failed");
                return respond(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    GENERIC_MESSAGE.to_string(),
                );
            }
        };
        respond(status, self.0.code(), self.0.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> ErrorResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn contract_errors_map_to_statuses() {
        let cases = [
            (ContractError::validation("reason", "required"), StatusCode::BAD_REQUEST),
            (ContractError::forbidden("not yours"), StatusCode::FORBIDDEN),
            (ContractError::not_found("contract", "c-1"), StatusCode::NOT_FOUND),
            (
                ContractError::conflict(ErrorCode::ContractExists, "exists"),
                StatusCode::CONFLICT,
            ),
            (ContractError::invalid_state("pending"), StatusCode::CONFLICT),
            (ContractError::InvalidOtp, StatusCode::BAD_REQUEST),
            (ContractError::OtpExpired, StatusCode::BAD_REQUEST),
            (ContractError::TooManyAttempts, StatusCode::TOO_MANY_REQUESTS),
        ];
        for (err, status) in cases {
            assert_eq!(ContractApiError(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn contract_not_found_uses_specific_code() {
        let response = ContractApiError(ContractError::not_found("contract", "c-1")).into_response();
        let body = body_of(response).await;
        assert_eq!(body.code, ErrorCode::ContractNotFound.to_string());
    }

    #[tokio::test]
    async fn infrastructure_detail_is_not_leaked() {
        let response =
            ContractApiError(ContractError::infrastructure("pool timed out on 10.0.0.4")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body.message, GENERIC_MESSAGE);
    }

    #[test]
    fn gateway_errors_split_on_client_fault() {
        let client = VipApiError(VipError::gateway("No such price", true)).into_response();
        let upstream = VipApiError(VipError::gateway("timeout", false)).into_response();
        assert_eq!(client.status(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn bad_webhook_signature_is_400() {
        let response = VipApiError(VipError::invalid_signature("mismatch")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

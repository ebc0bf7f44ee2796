//! VIP checkout and reconciliation errors.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 400 |
//! | Forbidden | 403 |
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | InvalidState | 409 |
//! | Gateway (client input) | 400 |
//! | Gateway | 502 |
//! | InvalidWebhookSignature | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VipError {
    ValidationFailed { field: String, message: String },

    Forbidden(String),

    NotFound { resource: &'static str, id: String },

    Conflict { code: ErrorCode, message: String },

    InvalidState(String),

    /// The payment gateway refused or failed the call.
    ///
    /// `client_error` is true when the gateway blamed the request itself.
    Gateway { message: String, client_error: bool },

    InvalidWebhookSignature(String),

    Infrastructure(String),
}

impl VipError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        VipError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        VipError::Forbidden(message.into())
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        VipError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        VipError::Conflict {
            code: ErrorCode::Conflict,
            message: message.into(),
        }
    }

    pub fn gateway(message: impl Into<String>, client_error: bool) -> Self {
        VipError::Gateway {
            message: message.into(),
            client_error,
        }
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        VipError::InvalidWebhookSignature(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        VipError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            VipError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            VipError::Forbidden(_) => ErrorCode::Forbidden,
            VipError::NotFound { resource, .. } => match *resource {
                "listing" => ErrorCode::ListingNotFound,
                "vip_plan" => ErrorCode::VipPlanNotFound,
                "vip_purchase" => ErrorCode::VipPurchaseNotFound,
                _ => ErrorCode::NotFound,
            },
            VipError::Conflict { code, .. } => *code,
            VipError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            VipError::Gateway { .. } => ErrorCode::PaymentGatewayError,
            VipError::InvalidWebhookSignature(_) => ErrorCode::InvalidWebhookSignature,
            VipError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            VipError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            VipError::Forbidden(message) => message.clone(),
            VipError::NotFound { resource, id } => {
                format!("{} not found: {}", resource.replace('_', " "), id)
            }
            VipError::Conflict { message, .. } => message.clone(),
            VipError::InvalidState(message) => message.clone(),
            VipError::Gateway { message, .. } => format!("Payment gateway error: {}", message),
            VipError::InvalidWebhookSignature(message) => {
                format!("Invalid webhook signature: {}", message)
            }
            VipError::Infrastructure(message) => format!("Error: {}", message),
        }
    }
}

impl std::fmt::Display for VipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for VipError {}

impl From<DomainError> for VipError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => VipError::ValidationFailed {
                field: err.detail("field").unwrap_or("request").to_string(),
                message: err.message,
            },
            ErrorCode::Forbidden | ErrorCode::Unauthorized => VipError::Forbidden(err.message),
            ErrorCode::ListingNotFound => VipError::NotFound {
                resource: "listing",
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            ErrorCode::VipPlanNotFound => VipError::NotFound {
                resource: "vip_plan",
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            ErrorCode::VipPurchaseNotFound => VipError::NotFound {
                resource: "vip_purchase",
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            code @ (ErrorCode::Conflict | ErrorCode::PendingPurchaseExists) => VipError::Conflict {
                code,
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => VipError::InvalidState(err.message),
            ErrorCode::PaymentGatewayError => VipError::Gateway {
                message: err.message,
                client_error: false,
            },
            ErrorCode::InvalidWebhookSignature => VipError::InvalidWebhookSignature(err.message),
            _ => VipError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for VipError {
    fn from(err: ValidationError) -> Self {
        VipError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<VipError> for DomainError {
    fn from(err: VipError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_purchase_conflict_keeps_code() {
        let err: VipError = DomainError::new(ErrorCode::PendingPurchaseExists, "dup").into();
        assert_eq!(err.code(), ErrorCode::PendingPurchaseExists);
    }

    #[test]
    fn gateway_message_is_prefixed() {
        let err = VipError::gateway("card declined", true);
        assert_eq!(err.message(), "Payment gateway error: card declined");
        assert_eq!(err.code(), ErrorCode::PaymentGatewayError);
    }

    #[test]
    fn plan_not_found_maps_code() {
        let err = VipError::not_found("vip_plan", 4);
        assert_eq!(err.code(), ErrorCode::VipPlanNotFound);
        assert_eq!(err.message(), "vip plan not found: 4");
    }

    #[test]
    fn unknown_codes_become_infrastructure() {
        let err: VipError = DomainError::database("timeout").into();
        assert!(matches!(err, VipError::Infrastructure(_)));
    }
}

//! Contract-specific error types.
//!
//! Covers contracts and the purchase requests that feed them.
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
//! | InvalidOtp / OtpExpired | 400 |
//! | TooManyAttempts | 429 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Contract-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Input failed validation.
    ValidationFailed { field: String, message: String },

    /// The actor may not perform this operation.
    Forbidden(String),

    /// A referenced resource does not exist.
    NotFound { resource: &'static str, id: String },

    /// The operation collides with existing state.
    Conflict { code: ErrorCode, message: String },

    /// The entity is not in a status that allows the operation.
    InvalidState(String),

    /// The submitted signing code is wrong or none is outstanding.
    InvalidOtp,

    /// The signing code has expired.
    OtpExpired,

    /// The attempt limit for the current code is spent.
    TooManyAttempts,

    /// Infrastructure error.
    Infrastructure(String),
}

impl ContractError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ContractError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ContractError::Forbidden(message.into())
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        ContractError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn conflict(code: ErrorCode, message: impl Into<String>) -> Self {
        ContractError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ContractError::InvalidState(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        ContractError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ContractError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ContractError::Forbidden(_) => ErrorCode::Forbidden,
            ContractError::NotFound { resource, .. } => match *resource {
                "contract" => ErrorCode::ContractNotFound,
                "purchase_request" => ErrorCode::PurchaseRequestNotFound,
                "listing" => ErrorCode::ListingNotFound,
                "user" => ErrorCode::UserNotFound,
                _ => ErrorCode::NotFound,
            },
            ContractError::Conflict { code, .. } => *code,
            ContractError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            ContractError::InvalidOtp => ErrorCode::InvalidOtp,
            ContractError::OtpExpired => ErrorCode::OtpExpired,
            ContractError::TooManyAttempts => ErrorCode::OtpAttemptsExceeded,
            ContractError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            ContractError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ContractError::Forbidden(message) => message.clone(),
            ContractError::NotFound { resource, id } => {
                format!("{} not found: {}", resource.replace('_', " "), id)
            }
            ContractError::Conflict { message, .. } => message.clone(),
            ContractError::InvalidState(message) => message.clone(),
            ContractError::InvalidOtp => "The signing code is incorrect".to_string(),
            ContractError::OtpExpired => {
                "The signing code has expired; ask staff to send a new one".to_string()
            }
            ContractError::TooManyAttempts => {
                "Too many attempts for this signing code; ask staff to send a new one".to_string()
            }
            ContractError::Infrastructure(message) => format!("Error: {}", message),
        }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ContractError {}

impl From<DomainError> for ContractError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => ContractError::ValidationFailed {
                field: err.detail("field").unwrap_or("request").to_string(),
                message: err.message,
            },
            ErrorCode::Forbidden | ErrorCode::Unauthorized => ContractError::Forbidden(err.message),
            ErrorCode::ContractNotFound => ContractError::NotFound {
                resource: "contract",
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            ErrorCode::PurchaseRequestNotFound => ContractError::NotFound {
                resource: "purchase_request",
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            ErrorCode::ListingNotFound => ContractError::NotFound {
                resource: "listing",
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            ErrorCode::UserNotFound => ContractError::NotFound {
                resource: "user",
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            code @ (ErrorCode::Conflict
            | ErrorCode::ContractExists
            | ErrorCode::PurchaseRequestExists
            | ErrorCode::StaffAlreadyAssigned
            | ErrorCode::AlreadySigned) => ContractError::Conflict {
                code,
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => ContractError::InvalidState(err.message),
            ErrorCode::InvalidOtp => ContractError::InvalidOtp,
            ErrorCode::OtpExpired => ContractError::OtpExpired,
            ErrorCode::OtpAttemptsExceeded => ContractError::TooManyAttempts,
            _ => ContractError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for ContractError {
    fn from(err: ValidationError) -> Self {
        ContractError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ContractError> for DomainError {
    fn from(err: ContractError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

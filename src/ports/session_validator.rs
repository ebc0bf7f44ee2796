//! Session validation port for bearer tokens.
//!
//! Tokens are issued elsewhere; this service only verifies them and maps
//! their claims to an `Actor`.
//!
//! Implementations MUST validate issuer, audience and expiry.

use async_trait::async_trait;

use crate::domain::foundation::{Actor, AuthError};

/// Validates access tokens and extracts the caller.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for malformed tokens or bad signatures
/// - `AuthError::TokenExpired` for expired tokens
/// - `AuthError::InvalidClaims` when subject or role cannot be mapped
/// - `AuthError::ServiceUnavailable` for transient failures
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<Actor, AuthError>;
}

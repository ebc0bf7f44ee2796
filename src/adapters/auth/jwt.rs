//! HS256 JWT session validator.
//!
//! Verifies bearer tokens issued by the marketplace's account service and
//! maps their claims to an `Actor`. Token issuance happens elsewhere.
//!
//! # Security
//!
//! - **Issuer (iss)** must match the configured issuer
//! - **Audience (aud)** must contain the configured audience
//! - **Expiry (exp)** must be in the future
//!
//! ```ignore
//! let validator = JwtSessionValidator::new(JwtConfig::new(secret, "ev-accounts", "ev-marketplace"));
//! let actor = validator.validate("eyJ...").await?;
//! ```

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Actor, AuthError, Role, UserId};
use crate::ports::SessionValidator;

#[derive(Clone)]
pub struct JwtConfig {
    secret: SecretString,
    issuer: String,
    audience: String,
}

impl JwtConfig {
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }
}

/// Claims carried by marketplace access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Numeric user id, as a string or a number.
    pub sub: SubjectClaim,

    /// `admin`, `staff` or `customer` (`user` is accepted for customers).
    pub role: String,

    pub iss: String,

    pub aud: String,

    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectClaim {
    Number(i64),
    Text(String),
}

impl SubjectClaim {
    fn to_user_id(&self) -> Result<UserId, AuthError> {
        let raw = match self {
            SubjectClaim::Number(n) => *n,
            SubjectClaim::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| AuthError::InvalidClaims(format!("sub is not a user id: {}", s)))?,
        };
        UserId::new(raw).map_err(|e| AuthError::InvalidClaims(e.to_string()))
    }
}

pub struct JwtSessionValidator {
    config: JwtConfig,
}

impl JwtSessionValidator {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<Actor, AuthError> {
        let key = DecodingKey::from_secret(self.config.secret.expose_secret().as_bytes());

        let data = decode::<AccessClaims>(token, &key, &self.validation()).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!(error = %e, "Token issued for another service");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "Token rejected");
                    AuthError::InvalidToken
                }
            }
        })?;

        let claims = data.claims;
        let id = claims.sub.to_user_id()?;
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| AuthError::InvalidClaims(format!("unknown role: {}", claims.role)))?;

        Ok(Actor::new(id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret-at-least-32-bytes-long!!";

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(JwtConfig::new(SECRET, "ev-accounts", "ev-marketplace"))
    }

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(sub: serde_json::Value, role: &str, exp_offset_secs: i64) -> serde_json::Value {
        json!({
            "sub": sub,
            "role": role,
            "iss": "ev-accounts",
            "aud": "ev-marketplace",
            "exp": Timestamp::now().as_unix_secs() + exp_offset_secs,
        })
    }

    #[tokio::test]
    async fn valid_token_yields_actor() {
        let actor = validator()
            .validate(&token(claims(json!("42"), "staff", 600), SECRET))
            .await
            .unwrap();
        assert_eq!(actor, Actor::staff(UserId::new(42).unwrap()));
    }

    #[tokio::test]
    async fn numeric_subject_and_legacy_user_role() {
        let actor = validator()
            .validate(&token(claims(json!(7), "user", 600), SECRET))
            .await
            .unwrap();
        assert_eq!(actor.role, Role::Customer);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let err = validator()
            .validate(&token(claims(json!("42"), "admin", -3600), SECRET))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let err = validator()
            .validate(&token(claims(json!("42"), "admin", 600), "another-secret-entirely-0000000"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let mut c = claims(json!("42"), "admin", 600);
        c["aud"] = json!("other-service");
        let err = validator().validate(&token(c, SECRET)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn unknown_role_is_invalid_claims() {
        let err = validator()
            .validate(&token(claims(json!("42"), "superuser", 600), SECRET))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaims(_)));
    }

    #[tokio::test]
    async fn non_numeric_subject_is_invalid_claims() {
        let err = validator()
            .validate(&token(claims(json!("user-abc"), "customer", 600), SECRET))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaims(_)));
    }
}

//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that validates Bearer tokens and injects the `Actor` into extensions
//! - `RequireActor` - Extractor that requires an authenticated caller
//! - `OptionalActor` - Extractor for routes open to guests
//!
//! # Architecture
//!
//! The middleware only talks to the `SessionValidator` port. Token issuance
//! happens in the accounts service; this crate verifies and maps roles.
//!
//! ```text
//! Request → auth_middleware → injects Actor into extensions
//!                                      ↓
//!                              Handler → RequireActor extractor reads from extensions
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{Actor, AuthError};
use crate::ports::SessionValidator;

/// Auth middleware state - wraps the session validator.
pub type AuthState = Arc<dyn SessionValidator>;

/// Authentication middleware that validates Bearer tokens.
///
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the `SessionValidator` port
/// 3. On success, injects the `Actor` into request extensions
/// 4. On missing token, continues without injecting (the webhook and the public feed need no caller)
/// 5. On invalid token, returns 401 Unauthorized
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return next.run(request).await;
    };

    match validator.validate(token).await {
        Ok(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(e) => {
            let (status, message) = match &e {
                AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
                AuthError::InvalidClaims(reason) => {
                    tracing::warn!(reason = %reason, "Rejected token with unmappable claims");
                    (StatusCode::UNAUTHORIZED, "Authentication failed")
                }
                AuthError::ServiceUnavailable(msg) => {
                    tracing::error!("Auth service unavailable: {}", msg);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Authentication service unavailable",
                    )
                }
            };

            (
                status,
                Json(serde_json::json!({
                    "code": "AUTH_ERROR",
                    "message": message
                })),
            )
                .into_response()
        }
    }
}

/// Extractor that requires an authenticated caller.
///
/// Returns 401 when the middleware did not inject an `Actor`.
#[derive(Debug, Clone, Copy)]
pub struct RequireActor(pub Actor);

impl<S> axum::extract::FromRequestParts<S> for RequireActor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<Actor>()
                .copied()
                .map(RequireActor)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Extractor for optional authentication.
#[derive(Debug, Clone, Copy)]
pub struct OptionalActor(pub Option<Actor>);

impl<S> axum::extract::FromRequestParts<S> for OptionalActor
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { Ok(OptionalActor(parts.extensions.get::<Actor>().copied())) })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No valid authentication token was provided.
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Unauthenticated => (StatusCode::UNAUTHORIZED, "Authentication required"),
        };

        (
            status,
            Json(serde_json::json!({
                "code": "UNAUTHENTICATED",
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::domain::foundation::UserId;
    use axum::extract::FromRequestParts;
    use axum::http::Request;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn staff_actor() -> Actor {
        Actor::staff(UserId::new(2).unwrap())
    }

    async fn whoami(OptionalActor(actor): OptionalActor) -> String {
        match actor {
            Some(a) => format!("{}:{}", a.role, a.id),
            None => "guest".to_string(),
        }
    }

    fn app(validator: MockSessionValidator) -> Router {
        let state: AuthState = Arc::new(validator);
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state, auth_middleware))
    }

    async fn call(router: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_token_injects_actor() {
        let router = app(MockSessionValidator::new().with_actor("staff-token", staff_actor()));
        let (status, body) = call(router, Some("Bearer staff-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "staff:2");
    }

    #[tokio::test]
    async fn missing_token_continues_as_guest() {
        let (status, body) = call(app(MockSessionValidator::new()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "guest");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_treated_as_missing() {
        let (status, body) = call(app(MockSessionValidator::new()), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "guest");
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let (status, body) = call(app(MockSessionValidator::new()), Some("Bearer nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("AUTH_ERROR"));
    }

    #[tokio::test]
    async fn unavailable_backend_returns_503() {
        let validator = MockSessionValidator::new()
            .with_error(AuthError::ServiceUnavailable("keys not loaded".to_string()));
        let (status, _) = call(app(validator), Some("Bearer anything")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Extractor Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn require_actor_extracts_from_extensions() {
        let mut request: Request<()> = Request::builder().uri("/test").body(()).unwrap();
        request.extensions_mut().insert(staff_actor());
        let (mut parts, _body) = request.into_parts();

        let RequireActor(actor) = RequireActor::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(actor, staff_actor());
    }

    #[tokio::test]
    async fn require_actor_fails_without_actor() {
        let request: Request<()> = Request::builder().uri("/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = RequireActor::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }

    #[test]
    fn auth_rejection_returns_401() {
        let response = AuthRejection::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn auth_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthState>();
        assert_send_sync::<RequireActor>();
    }
}

//! Top-level router assembly.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::contract::contract_routes;
use super::listing::listing_routes;
use super::middleware::{auth_middleware, AuthState};
use super::purchase_request::purchase_request_routes;
use super::state::AppState;
use super::vip::{vip_routes, webhook_routes};

/// Every API route under `/api`, with the auth middleware applied.
///
/// Tokens are optional at the middleware; routes that need a caller use the
/// `RequireActor` extractor.
pub fn api_routes(state: AppState, validator: AuthState) -> Router {
    let api = Router::new()
        .nest("/contracts", contract_routes())
        .nest("/purchase-requests", purchase_request_routes())
        .nest("/vip", vip_routes())
        .nest("/listings", listing_routes())
        .nest("/webhooks", webhook_routes())
        .layer(middleware::from_fn_with_state(validator, auth_middleware))
        .with_state(state);

    Router::new().nest("/api", api)
}

/// The served application: API routes plus tracing, request ids, CORS and
/// the request timeout.
pub fn app_router(state: AppState, validator: AuthState, server: &ServerConfig) -> Router {
    api_routes(state, validator)
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(allowed)
    }
}

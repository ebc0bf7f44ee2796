//! HTTP middleware for axum.
//!
//! - `auth` - Bearer token verification and the `Actor` extractors

pub mod auth;

pub use auth::{auth_middleware, AuthRejection, AuthState, OptionalActor, RequireActor};

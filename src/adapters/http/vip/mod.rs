//! HTTP adapter for VIP listing promotion.
//!
//! - `GET /api/vip/plans`
//! - `POST /api/vip/checkout`
//! - `POST /api/webhooks/stripe`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{vip_routes, webhook_routes};

//! HTTP adapter for purchase requests.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::purchase_request_routes;

//! HTTP adapter for contract endpoints.
//!
//! - `GET|POST /api/contracts`
//! - `GET /api/contracts/:id`
//! - `POST /api/contracts/:id/{assign-staff,appointment,terms,draft,otp,otp/verify,notarize,complete,cancel}`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::contract_routes;

//! EV Marketplace - backend for trading electric vehicles and batteries.
//!
//! This crate implements the staff-mediated sale contract (negotiation and
//! dual OTP signing), the purchase request flow that opens contracts, and
//! paid VIP promotion of listings reconciled from payment webhooks.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

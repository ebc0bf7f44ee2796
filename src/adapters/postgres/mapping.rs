//! Shared row conversion and error mapping for the Postgres adapters.

use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::str::FromStr;

use crate::domain::foundation::{
    DomainError, ErrorCode, ListingId, Timestamp, UserId, VipPlanId,
};

/// Partial unique indexes that encode business rules, and the conflict
/// code each one surfaces as.
const CONSTRAINT_CODES: &[(&str, ErrorCode, &str)] = &[
    (
        "contracts_active_buyer_listing_key",
        ErrorCode::ContractExists,
        "An active contract already exists for this buyer and listing",
    ),
    (
        "purchase_requests_pending_key",
        ErrorCode::PurchaseRequestExists,
        "A pending purchase request already exists for this listing",
    ),
    (
        "vip_purchases_pending_key",
        ErrorCode::PendingPurchaseExists,
        "A pending VIP purchase already exists for this listing",
    ),
    (
        "vip_purchases_order_code_key",
        ErrorCode::Conflict,
        "Order code already exists",
    ),
];

/// Maps a failed write, turning known unique violations into conflicts.
pub(super) fn write_error(action: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if let Some(constraint) = db_err.constraint() {
            if let Some((_, code, message)) =
                CONSTRAINT_CODES.iter().find(|(name, _, _)| *name == constraint)
            {
                return DomainError::new(*code, *message).with_detail("constraint", constraint);
            }
            if constraint.ends_with("_pkey") {
                return DomainError::new(ErrorCode::Conflict, format!("{}: duplicate id", action));
            }
        }
    }
    DomainError::database(format!("Failed to {}: {}", action, e))
}

pub(super) fn read_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

/// A stored value that no longer parses into its domain type.
pub(super) fn corrupt(column: &str, e: impl Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, e),
    )
}

pub(super) fn parse_text<T>(column: &str, raw: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e| corrupt(column, e))
}

pub(super) fn user_id(column: &str, raw: i64) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| corrupt(column, e))
}

pub(super) fn listing_id(raw: i64) -> Result<ListingId, DomainError> {
    ListingId::new(raw).map_err(|e| corrupt("listing_id", e))
}

pub(super) fn plan_id(column: &str, raw: i64) -> Result<VipPlanId, DomainError> {
    VipPlanId::new(raw).map_err(|e| corrupt(column, e))
}

pub(super) fn ts(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_datetime(dt)
}

pub(super) fn opt_ts(dt: Option<DateTime<Utc>>) -> Option<Timestamp> {
    dt.map(Timestamp::from_datetime)
}

pub(super) fn db_ts(ts: Timestamp) -> DateTime<Utc> {
    *ts.as_datetime()
}

pub(super) fn db_opt_ts(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(db_ts)
}

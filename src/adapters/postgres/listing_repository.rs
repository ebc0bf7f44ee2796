//! PostgreSQL implementation of ListingRepository.
//!
//! Only sale and VIP state is written back; titles and prices belong to the
//! listing editor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::mapping::{
    db_opt_ts, db_ts, listing_id, opt_ts, parse_text, plan_id, read_error, ts, user_id,
    write_error,
};
use crate::domain::foundation::{DomainError, ErrorCode, ListingId, Timestamp};
use crate::domain::listing::{Listing, ListingCategory, SaleStatus, VerifyStatus, VipTier};
use crate::ports::ListingRepository;

const SELECT_LISTING: &str = r#"
    SELECT id, owner_id, title, category, price, is_active, sale_status, verify_status,
           published_at, paid_at, is_vip, vip_tier, vip_priority, vip_expires_at,
           vip_plan_id, updated_at
    FROM listings
"#;

pub struct PostgresListingRepository {
    pool: PgPool,
}

impl PostgresListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: i64,
    owner_id: i64,
    title: String,
    category: String,
    price: i64,
    is_active: bool,
    sale_status: String,
    verify_status: String,
    published_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    is_vip: bool,
    vip_tier: Option<String>,
    vip_priority: i32,
    vip_expires_at: Option<DateTime<Utc>>,
    vip_plan_id: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = DomainError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Listing {
            id: listing_id(row.id)?,
            owner_id: user_id("owner_id", row.owner_id)?,
            title: row.title,
            category: parse_text::<ListingCategory>("category", &row.category)?,
            price: row.price,
            is_active: row.is_active,
            sale_status: parse_text::<SaleStatus>("sale_status", &row.sale_status)?,
            verify_status: parse_text::<VerifyStatus>("verify_status", &row.verify_status)?,
            published_at: opt_ts(row.published_at),
            paid_at: opt_ts(row.paid_at),
            is_vip: row.is_vip,
            vip_tier: row
                .vip_tier
                .as_deref()
                .map(|raw| parse_text::<VipTier>("vip_tier", raw))
                .transpose()?,
            vip_priority: row.vip_priority,
            vip_expires_at: opt_ts(row.vip_expires_at),
            vip_plan_id: row
                .vip_plan_id
                .map(|id| plan_id("vip_plan_id", id))
                .transpose()?,
            updated_at: ts(row.updated_at),
        })
    }
}

#[async_trait]
impl ListingRepository for PostgresListingRepository {
    async fn find_by_id(&self, id: ListingId) -> Result<Option<Listing>, DomainError> {
        let row: Option<ListingRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_LISTING))
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| read_error("find listing", e))?;

        row.map(Listing::try_from).transpose()
    }

    async fn update(&self, listing: &Listing) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE listings SET
                is_active = $2,
                sale_status = $3,
                verify_status = $4,
                published_at = $5,
                paid_at = $6,
                is_vip = $7,
                vip_tier = $8,
                vip_priority = $9,
                vip_expires_at = $10,
                vip_plan_id = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(listing.id.as_i64())
        .bind(listing.is_active)
        .bind(listing.sale_status.as_str())
        .bind(listing.verify_status.as_str())
        .bind(db_opt_ts(listing.published_at))
        .bind(db_opt_ts(listing.paid_at))
        .bind(listing.is_vip)
        .bind(listing.vip_tier.map(|t| t.as_str()))
        .bind(listing.vip_priority)
        .bind(db_opt_ts(listing.vip_expires_at))
        .bind(listing.vip_plan_id.map(|id| id.as_i64()))
        .bind(db_ts(listing.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update listing", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ListingNotFound,
                format!("Listing not found: {}", listing.id),
            )
            .with_detail("id", listing.id.to_string()));
        }
        Ok(())
    }

    async fn list_public(&self) -> Result<Vec<Listing>, DomainError> {
        // Final ordering happens in the ranking policy, which knows the clock.
        let rows: Vec<ListingRow> = sqlx::query_as(&format!(
            "{} WHERE is_active AND sale_status = 'available'",
            SELECT_LISTING
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("list public listings", e))?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    async fn find_lapsed_vip(&self, now: Timestamp) -> Result<Vec<Listing>, DomainError> {
        let rows: Vec<ListingRow> = sqlx::query_as(&format!(
            "{} WHERE is_vip AND (vip_expires_at IS NULL OR vip_expires_at <= $1)",
            SELECT_LISTING
        ))
        .bind(db_ts(now))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("find lapsed VIP listings", e))?;

        rows.into_iter().map(Listing::try_from).collect()
    }
}

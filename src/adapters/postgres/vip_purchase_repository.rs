//! PostgreSQL implementation of VipPurchaseRepository.
//!
//! The order code is unique, and a partial unique index allows a single
//! `PENDING` row per user and listing. Both surface as conflicts so the
//! checkout handler can fall back to the row that won.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::mapping::{
    corrupt, db_opt_ts, db_ts, listing_id, opt_ts, parse_text, plan_id, read_error, ts, user_id,
    write_error,
};
use crate::domain::foundation::{DomainError, ErrorCode, ListingId, UserId, VipPurchaseId};
use crate::domain::vip::{OrderCode, PurchaseStatus, VipPurchase};
use crate::ports::VipPurchaseRepository;

const SELECT_PURCHASE: &str = r#"
    SELECT id, order_code, user_id, listing_id, plan_id, amount, currency, status, provider,
           checkout_session_id, checkout_url, external_subscription_id, raw_payload,
           failure_reason, paid_at, created_at, updated_at
    FROM vip_purchases
"#;

pub struct PostgresVipPurchaseRepository {
    pool: PgPool,
}

impl PostgresVipPurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VipPurchaseRow {
    id: Uuid,
    order_code: String,
    user_id: i64,
    listing_id: i64,
    plan_id: i64,
    amount: i64,
    currency: String,
    status: String,
    provider: String,
    checkout_session_id: Option<String>,
    checkout_url: Option<String>,
    external_subscription_id: Option<String>,
    raw_payload: Option<JsonValue>,
    failure_reason: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VipPurchaseRow> for VipPurchase {
    type Error = DomainError;

    fn try_from(row: VipPurchaseRow) -> Result<Self, Self::Error> {
        Ok(VipPurchase::reconstitute(
            VipPurchaseId::from_uuid(row.id),
            OrderCode::parse(row.order_code).map_err(|e| corrupt("order_code", e))?,
            user_id("user_id", row.user_id)?,
            listing_id(row.listing_id)?,
            plan_id("plan_id", row.plan_id)?,
            row.amount,
            row.currency,
            parse_text::<PurchaseStatus>("status", &row.status)?,
            row.provider,
            row.checkout_session_id,
            row.checkout_url,
            row.external_subscription_id,
            row.raw_payload,
            row.failure_reason,
            opt_ts(row.paid_at),
            ts(row.created_at),
            ts(row.updated_at),
        ))
    }
}

#[async_trait]
impl VipPurchaseRepository for PostgresVipPurchaseRepository {
    async fn save(&self, purchase: &VipPurchase) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO vip_purchases (
                id, order_code, user_id, listing_id, plan_id, amount, currency, status,
                provider, checkout_session_id, checkout_url, external_subscription_id,
                raw_payload, failure_reason, paid_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(*purchase.id().as_uuid())
        .bind(purchase.order_code().as_str())
        .bind(purchase.user_id().as_i64())
        .bind(purchase.listing_id().as_i64())
        .bind(purchase.plan_id().as_i64())
        .bind(purchase.amount())
        .bind(purchase.currency())
        .bind(purchase.status().as_str())
        .bind(purchase.provider())
        .bind(purchase.checkout_session_id())
        .bind(purchase.checkout_url())
        .bind(purchase.external_subscription_id())
        .bind(purchase.raw_payload())
        .bind(purchase.failure_reason())
        .bind(db_opt_ts(purchase.paid_at()))
        .bind(db_ts(purchase.created_at()))
        .bind(db_ts(purchase.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("save VIP purchase", e))?;

        Ok(())
    }

    async fn update(&self, purchase: &VipPurchase) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE vip_purchases SET
                status = $2,
                checkout_session_id = $3,
                checkout_url = $4,
                external_subscription_id = $5,
                raw_payload = $6,
                failure_reason = $7,
                paid_at = $8,
                updated_at = $9
            WHERE order_code = $1
            "#,
        )
        .bind(purchase.order_code().as_str())
        .bind(purchase.status().as_str())
        .bind(purchase.checkout_session_id())
        .bind(purchase.checkout_url())
        .bind(purchase.external_subscription_id())
        .bind(purchase.raw_payload())
        .bind(purchase.failure_reason())
        .bind(db_opt_ts(purchase.paid_at()))
        .bind(db_ts(purchase.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update VIP purchase", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::VipPurchaseNotFound,
                format!("VIP purchase not found: {}", purchase.order_code()),
            )
            .with_detail("id", purchase.order_code().to_string()));
        }
        Ok(())
    }

    async fn find_by_order_code(
        &self,
        code: &OrderCode,
    ) -> Result<Option<VipPurchase>, DomainError> {
        let row: Option<VipPurchaseRow> =
            sqlx::query_as(&format!("{} WHERE order_code = $1", SELECT_PURCHASE))
                .bind(code.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| read_error("find VIP purchase", e))?;

        row.map(VipPurchase::try_from).transpose()
    }

    async fn find_pending_for(
        &self,
        user_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<VipPurchase>, DomainError> {
        let row: Option<VipPurchaseRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 AND listing_id = $2 AND status = 'PENDING'",
            SELECT_PURCHASE
        ))
        .bind(user_id.as_i64())
        .bind(listing_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error("find pending VIP purchase", e))?;

        row.map(VipPurchase::try_from).transpose()
    }

    async fn find_paid_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<VipPurchase>, DomainError> {
        let row: Option<VipPurchaseRow> = sqlx::query_as(&format!(
            "{} WHERE external_subscription_id = $1 AND status = 'PAID' \
             ORDER BY paid_at DESC NULLS LAST LIMIT 1",
            SELECT_PURCHASE
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error("find VIP purchase by subscription", e))?;

        row.map(VipPurchase::try_from).transpose()
    }
}

//! PostgreSQL implementation of PurchaseRequestRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::contract_repository::insert_contract;
use super::mapping::{
    db_ts, listing_id, parse_text, read_error, ts, user_id, write_error,
};
use crate::domain::contract::{Contract, PurchaseRequest, PurchaseRequestStatus};
use crate::domain::foundation::{
    ContractId, DomainError, ErrorCode, ListingId, PurchaseRequestId, Timestamp, UserId,
};
use crate::ports::{PurchaseRequestRepository, PurchaseRequestScope};

const SELECT_REQUEST: &str = r#"
    SELECT id, buyer_id, seller_id, listing_id, message, status, handled_by,
           reject_reason, contract_id, expires_at, created_at, updated_at
    FROM purchase_requests
"#;

pub struct PostgresPurchaseRequestRepository {
    pool: PgPool,
}

impl PostgresPurchaseRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRequestRow {
    id: Uuid,
    buyer_id: i64,
    seller_id: i64,
    listing_id: i64,
    message: Option<String>,
    status: String,
    handled_by: Option<i64>,
    reject_reason: Option<String>,
    contract_id: Option<Uuid>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRequestRow> for PurchaseRequest {
    type Error = DomainError;

    fn try_from(row: PurchaseRequestRow) -> Result<Self, Self::Error> {
        Ok(PurchaseRequest::reconstitute(
            PurchaseRequestId::from_uuid(row.id),
            user_id("buyer_id", row.buyer_id)?,
            user_id("seller_id", row.seller_id)?,
            listing_id(row.listing_id)?,
            row.message,
            parse_text::<PurchaseRequestStatus>("status", &row.status)?,
            row.handled_by.map(|id| user_id("handled_by", id)).transpose()?,
            row.reject_reason,
            row.contract_id.map(ContractId::from_uuid),
            ts(row.expires_at),
            ts(row.created_at),
            ts(row.updated_at),
        ))
    }
}

fn not_found(id: &PurchaseRequestId) -> DomainError {
    DomainError::new(
        ErrorCode::PurchaseRequestNotFound,
        format!("Purchase request not found: {}", id),
    )
    .with_detail("id", id.to_string())
}

#[async_trait]
impl PurchaseRequestRepository for PostgresPurchaseRequestRepository {
    async fn save(&self, request: &PurchaseRequest) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO purchase_requests (
                id, buyer_id, seller_id, listing_id, message, status, handled_by,
                reject_reason, contract_id, expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*request.id().as_uuid())
        .bind(request.buyer_id().as_i64())
        .bind(request.seller_id().as_i64())
        .bind(request.listing_id().as_i64())
        .bind(request.message())
        .bind(request.status().as_str())
        .bind(request.handled_by().map(|id| id.as_i64()))
        .bind(request.reject_reason())
        .bind(request.contract_id().map(|id| *id.as_uuid()))
        .bind(db_ts(request.expires_at()))
        .bind(db_ts(request.created_at()))
        .bind(db_ts(request.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("save purchase request", e))?;

        Ok(())
    }

    async fn update(&self, request: &PurchaseRequest) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_requests SET
                status = $2,
                handled_by = $3,
                reject_reason = $4,
                contract_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*request.id().as_uuid())
        .bind(request.status().as_str())
        .bind(request.handled_by().map(|id| id.as_i64()))
        .bind(request.reject_reason())
        .bind(request.contract_id().map(|id| *id.as_uuid()))
        .bind(db_ts(request.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update purchase request", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(request.id()));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequest>, DomainError> {
        let row: Option<PurchaseRequestRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_REQUEST))
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| read_error("find purchase request", e))?;

        row.map(PurchaseRequest::try_from).transpose()
    }

    async fn find_pending_for(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<PurchaseRequest>, DomainError> {
        let row: Option<PurchaseRequestRow> = sqlx::query_as(&format!(
            "{} WHERE buyer_id = $1 AND listing_id = $2 AND status = 'pending'",
            SELECT_REQUEST
        ))
        .bind(buyer_id.as_i64())
        .bind(listing_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error("find pending purchase request", e))?;

        row.map(PurchaseRequest::try_from).transpose()
    }

    async fn list(&self, scope: PurchaseRequestScope) -> Result<Vec<PurchaseRequest>, DomainError> {
        let rows: Vec<PurchaseRequestRow> = match scope {
            PurchaseRequestScope::All => {
                sqlx::query_as::<_, PurchaseRequestRow>(&format!(
                    "{} ORDER BY created_at DESC",
                    SELECT_REQUEST
                ))
                .fetch_all(&self.pool)
                .await
            }
            PurchaseRequestScope::Involving(user_id) => {
                sqlx::query_as::<_, PurchaseRequestRow>(&format!(
                    "{} WHERE buyer_id = $1 OR seller_id = $1 ORDER BY created_at DESC",
                    SELECT_REQUEST
                ))
                .bind(user_id.as_i64())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| read_error("list purchase requests", e))?;

        rows.into_iter().map(PurchaseRequest::try_from).collect()
    }

    async fn find_overdue(&self, now: Timestamp) -> Result<Vec<PurchaseRequest>, DomainError> {
        let rows: Vec<PurchaseRequestRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'pending' AND expires_at <= $1 ORDER BY expires_at",
            SELECT_REQUEST
        ))
        .bind(db_ts(now))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("find overdue purchase requests", e))?;

        rows.into_iter().map(PurchaseRequest::try_from).collect()
    }

    async fn accept_into_contract(
        &self,
        request: &PurchaseRequest,
        contract: &Contract,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| read_error("begin accept transaction", e))?;

        // 1. Lock the request and make sure nobody decided it meanwhile
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM purchase_requests WHERE id = $1 FOR UPDATE")
                .bind(*request.id().as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| read_error("lock purchase request", e))?;

        match status.as_deref() {
            None => return Err(not_found(request.id())),
            Some("pending") => {}
            Some(_) => {
                return Err(DomainError::new(
                    ErrorCode::Conflict,
                    "Purchase request was decided concurrently",
                ))
            }
        }

        // 2. Contract first; the active-pair index may refuse it
        insert_contract(&mut *tx, contract).await?;

        // 3. Record the decision
        sqlx::query(
            r#"
            UPDATE purchase_requests SET
                status = $2, handled_by = $3, contract_id = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(*request.id().as_uuid())
        .bind(request.status().as_str())
        .bind(request.handled_by().map(|id| id.as_i64()))
        .bind(request.contract_id().map(|id| *id.as_uuid()))
        .bind(db_ts(request.updated_at()))
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("accept purchase request", e))?;

        tx.commit()
            .await
            .map_err(|e| write_error("commit accept transaction", e))?;

        tracing::debug!(
            request_id = %request.id(),
            contract_id = %contract.id(),
            "Purchase request accepted into contract"
        );
        Ok(())
    }
}

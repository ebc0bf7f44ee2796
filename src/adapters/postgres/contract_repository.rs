//! PostgreSQL implementation of ContractRepository.
//!
//! Terms are stored as JSONB fee maps next to scalar columns; each party's
//! signing state is flattened into `<party>_otp*` columns. The active-pair
//! rule is a partial unique index, so a racing second contract surfaces as
//! `ContractExists`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgExecutor};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::mapping::{
    corrupt, db_opt_ts, db_ts, listing_id, opt_ts, parse_text, read_error, ts, user_id,
    write_error,
};
use crate::domain::contract::{
    Appointment, Contract, ContractSnapshot, ContractStatus, ContractTerms, FeeResponsibility,
    FeeSchedule, OtpChallenge, OtpCode, Party, PartySigning,
};
use crate::domain::foundation::{
    ContractId, DomainError, ErrorCode, ListingId, PurchaseRequestId, Timestamp, UserId,
};
use crate::ports::{ContractRepository, ContractScope};

const SELECT_CONTRACT: &str = r#"
    SELECT id, purchase_request_id, listing_id, buyer_id, seller_id, staff_id, status,
           agreed_price, fees, fee_responsibility,
           appointment_at, appointment_place, appointment_note,
           buyer_otp, buyer_otp_expires_at, buyer_otp_attempts, buyer_signed_at,
           seller_otp, seller_otp_expires_at, seller_otp_attempts, seller_signed_at,
           signed_at, completed_at, cancelled_at, cancel_reason, created_at, updated_at,
           version
    FROM contracts
"#;

pub struct PostgresContractRepository {
    pool: PgPool,
}

impl PostgresContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContractRow {
    id: Uuid,
    purchase_request_id: Option<Uuid>,
    listing_id: i64,
    buyer_id: i64,
    seller_id: i64,
    staff_id: Option<i64>,
    status: String,
    agreed_price: Option<i64>,
    fees: Option<Json<FeeSchedule>>,
    fee_responsibility: Option<Json<FeeResponsibility>>,
    appointment_at: Option<DateTime<Utc>>,
    appointment_place: Option<String>,
    appointment_note: Option<String>,
    buyer_otp: Option<String>,
    buyer_otp_expires_at: Option<DateTime<Utc>>,
    buyer_otp_attempts: i32,
    buyer_signed_at: Option<DateTime<Utc>>,
    seller_otp: Option<String>,
    seller_otp_expires_at: Option<DateTime<Utc>>,
    seller_otp_attempts: i32,
    seller_signed_at: Option<DateTime<Utc>>,
    signed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

/// Signing columns of one party. Static names only, safe to splice into SQL.
struct SigningColumns {
    otp: &'static str,
    expires_at: &'static str,
    attempts: &'static str,
    signed_at: &'static str,
}

fn party_columns(party: Party) -> SigningColumns {
    match party {
        Party::Buyer => SigningColumns {
            otp: "buyer_otp",
            expires_at: "buyer_otp_expires_at",
            attempts: "buyer_otp_attempts",
            signed_at: "buyer_signed_at",
        },
        Party::Seller => SigningColumns {
            otp: "seller_otp",
            expires_at: "seller_otp_expires_at",
            attempts: "seller_otp_attempts",
            signed_at: "seller_signed_at",
        },
    }
}

fn signing_from_columns(
    party: Party,
    code: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    attempts: i32,
    signed_at: Option<DateTime<Utc>>,
) -> Result<PartySigning, DomainError> {
    let column = format!("{}_otp", party);
    let challenge = match (code, expires_at) {
        (Some(code), Some(expires_at)) => {
            let code = OtpCode::from_stored(code).map_err(|e| corrupt(&column, e))?;
            Some(OtpChallenge::new(code, ts(expires_at)))
        }
        (None, _) => None,
        (Some(_), None) => return Err(corrupt(&column, "code without expiry")),
    };
    let attempts = u32::try_from(attempts).map_err(|e| corrupt(&column, e))?;
    Ok(PartySigning::reconstitute(challenge, attempts, opt_ts(signed_at)))
}

impl TryFrom<ContractRow> for Contract {
    type Error = DomainError;

    fn try_from(row: ContractRow) -> Result<Self, Self::Error> {
        let terms = row.agreed_price.map(|agreed_price| ContractTerms {
            agreed_price,
            fees: row.fees.map(|j| j.0).unwrap_or_default(),
            responsibility: row.fee_responsibility.map(|j| j.0).unwrap_or_default(),
        });

        let appointment = match (row.appointment_at, row.appointment_place) {
            (Some(at), Some(place)) => Some(Appointment {
                scheduled_at: ts(at),
                place,
                note: row.appointment_note,
            }),
            _ => None,
        };

        Ok(Contract::reconstitute(ContractSnapshot {
            id: ContractId::from_uuid(row.id),
            purchase_request_id: row.purchase_request_id.map(PurchaseRequestId::from_uuid),
            listing_id: listing_id(row.listing_id)?,
            buyer_id: user_id("buyer_id", row.buyer_id)?,
            seller_id: user_id("seller_id", row.seller_id)?,
            staff_id: row.staff_id.map(|id| user_id("staff_id", id)).transpose()?,
            terms,
            appointment,
            buyer_signing: signing_from_columns(
                Party::Buyer,
                row.buyer_otp,
                row.buyer_otp_expires_at,
                row.buyer_otp_attempts,
                row.buyer_signed_at,
            )?,
            seller_signing: signing_from_columns(
                Party::Seller,
                row.seller_otp,
                row.seller_otp_expires_at,
                row.seller_otp_attempts,
                row.seller_signed_at,
            )?,
            status: parse_text::<ContractStatus>("status", &row.status)?,
            signed_at: opt_ts(row.signed_at),
            completed_at: opt_ts(row.completed_at),
            cancelled_at: opt_ts(row.cancelled_at),
            cancel_reason: row.cancel_reason,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
            version: row.version,
        }))
    }
}

/// Binds every column in `SELECT_CONTRACT` order as `$1..$27`.
fn bind_contract<'q>(
    query: Query<'q, Postgres, PgArguments>,
    contract: &Contract,
) -> Query<'q, Postgres, PgArguments> {
    let terms = contract.terms();
    let appointment = contract.appointment();
    let signing_columns = |party: Party| {
        let signing = contract.signing(party);
        (
            signing.challenge().map(|c| c.code().expose().to_string()),
            signing.challenge().map(|c| db_ts(c.expires_at())),
            i32::try_from(signing.attempts()).unwrap_or(i32::MAX),
            db_opt_ts(signing.signed_at()),
        )
    };
    let (buyer_otp, buyer_otp_expires_at, buyer_attempts, buyer_signed_at) =
        signing_columns(Party::Buyer);
    let (seller_otp, seller_otp_expires_at, seller_attempts, seller_signed_at) =
        signing_columns(Party::Seller);

    query
        .bind(*contract.id().as_uuid())
        .bind(contract.purchase_request_id().map(|id| *id.as_uuid()))
        .bind(contract.listing_id().as_i64())
        .bind(contract.buyer_id().as_i64())
        .bind(contract.seller_id().as_i64())
        .bind(contract.staff_id().map(|id| id.as_i64()))
        .bind(contract.status().as_str())
        .bind(terms.map(|t| t.agreed_price))
        .bind(terms.map(|t| Json(t.fees.clone())))
        .bind(terms.map(|t| Json(t.responsibility.clone())))
        .bind(appointment.map(|a| db_ts(a.scheduled_at)))
        .bind(appointment.map(|a| a.place.clone()))
        .bind(appointment.and_then(|a| a.note.clone()))
        .bind(buyer_otp)
        .bind(buyer_otp_expires_at)
        .bind(buyer_attempts)
        .bind(buyer_signed_at)
        .bind(seller_otp)
        .bind(seller_otp_expires_at)
        .bind(seller_attempts)
        .bind(seller_signed_at)
        .bind(db_opt_ts(contract.signed_at()))
        .bind(db_opt_ts(contract.completed_at()))
        .bind(db_opt_ts(contract.cancelled_at()))
        .bind(contract.cancel_reason().map(str::to_string))
        .bind(db_ts(contract.created_at()))
        .bind(db_ts(contract.updated_at()))
}

/// Inserts a contract on any executor, so the purchase-request adapter can
/// run it inside its accept transaction.
pub(super) async fn insert_contract<'e, E>(executor: E, contract: &Contract) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    let query = sqlx::query(
        r#"
        INSERT INTO contracts (
            id, purchase_request_id, listing_id, buyer_id, seller_id, staff_id, status,
            agreed_price, fees, fee_responsibility,
            appointment_at, appointment_place, appointment_note,
            buyer_otp, buyer_otp_expires_at, buyer_otp_attempts, buyer_signed_at,
            seller_otp, seller_otp_expires_at, seller_otp_attempts, seller_signed_at,
            signed_at, completed_at, cancelled_at, cancel_reason, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
        )
        "#,
    );

    bind_contract(query, contract)
        .execute(executor)
        .await
        .map_err(|e| write_error("save contract", e))?;
    Ok(())
}

#[async_trait]
impl ContractRepository for PostgresContractRepository {
    async fn save(&self, contract: &Contract) -> Result<(), DomainError> {
        insert_contract(&self.pool, contract).await
    }

    async fn update(&self, contract: &Contract) -> Result<(), DomainError> {
        // Identity columns are rewritten with their unchanged values.
        let query = sqlx::query(
            r#"
            UPDATE contracts SET
                purchase_request_id = $2, listing_id = $3, buyer_id = $4, seller_id = $5,
                staff_id = $6, status = $7,
                agreed_price = $8, fees = $9, fee_responsibility = $10,
                appointment_at = $11, appointment_place = $12, appointment_note = $13,
                buyer_otp = $14, buyer_otp_expires_at = $15, buyer_otp_attempts = $16,
                buyer_signed_at = $17,
                seller_otp = $18, seller_otp_expires_at = $19, seller_otp_attempts = $20,
                seller_signed_at = $21,
                signed_at = $22, completed_at = $23, cancelled_at = $24, cancel_reason = $25,
                created_at = $26, updated_at = $27,
                version = version + 1
            WHERE id = $1 AND version = $28
            "#,
        );

        let result = bind_contract(query, contract)
            .bind(contract.version())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("update contract", e))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Tell a version mismatch apart from a missing row
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM contracts WHERE id = $1)",
        )
        .bind(*contract.id().as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| read_error("check contract", e))?;

        let err = if exists {
            DomainError::new(
                ErrorCode::Conflict,
                format!("Contract {} was changed by another request", contract.id()),
            )
        } else {
            DomainError::new(
                ErrorCode::ContractNotFound,
                format!("Contract not found: {}", contract.id()),
            )
        };
        Err(err.with_detail("id", contract.id().to_string()))
    }

    async fn record_otp_attempt(
        &self,
        id: &ContractId,
        party: Party,
    ) -> Result<Option<u32>, DomainError> {
        let columns = party_columns(party);
        let attempts = sqlx::query_scalar::<_, i32>(&format!(
            "UPDATE contracts SET {attempts} = {attempts} + 1, version = version + 1 \
             WHERE id = $1 AND status = 'awaiting_sign' \
             AND {otp} IS NOT NULL AND {signed_at} IS NULL \
             RETURNING {attempts}",
            attempts = columns.attempts,
            otp = columns.otp,
            signed_at = columns.signed_at,
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error("count signing attempt", e))?;

        attempts
            .map(|n| u32::try_from(n).map_err(|e| corrupt(columns.attempts, e)))
            .transpose()
    }

    async fn record_signature(
        &self,
        id: &ContractId,
        party: Party,
        code: &OtpCode,
        signed_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let columns = party_columns(party);
        let result = sqlx::query(&format!(
            "UPDATE contracts SET {signed_at} = $2, {otp} = NULL, {expires_at} = NULL, \
             {attempts} = 0, updated_at = $2, version = version + 1 \
             WHERE id = $1 AND status = 'awaiting_sign' \
             AND {signed_at} IS NULL AND {otp} = $3",
            signed_at = columns.signed_at,
            otp = columns.otp,
            expires_at = columns.expires_at,
            attempts = columns.attempts,
        ))
        .bind(*id.as_uuid())
        .bind(db_ts(signed_at))
        .bind(code.expose())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("record signature", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, DomainError> {
        let row: Option<ContractRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_CONTRACT))
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| read_error("find contract", e))?;

        row.map(Contract::try_from).transpose()
    }

    async fn find_active_for(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<Contract>, DomainError> {
        let row: Option<ContractRow> = sqlx::query_as(&format!(
            "{} WHERE buyer_id = $1 AND listing_id = $2 \
             AND status NOT IN ('completed', 'cancelled') LIMIT 1",
            SELECT_CONTRACT
        ))
        .bind(buyer_id.as_i64())
        .bind(listing_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error("find active contract", e))?;

        row.map(Contract::try_from).transpose()
    }

    async fn list(&self, scope: ContractScope) -> Result<Vec<Contract>, DomainError> {
        let rows: Vec<ContractRow> = match scope {
            ContractScope::All => {
                sqlx::query_as::<_, ContractRow>(&format!("{} ORDER BY created_at DESC", SELECT_CONTRACT))
                    .fetch_all(&self.pool)
                    .await
            }
            ContractScope::AssignedTo(staff_id) => {
                sqlx::query_as::<_, ContractRow>(&format!(
                    "{} WHERE staff_id = $1 ORDER BY created_at DESC",
                    SELECT_CONTRACT
                ))
                .bind(staff_id.as_i64())
                .fetch_all(&self.pool)
                .await
            }
            ContractScope::PartyOf(user_id) => {
                sqlx::query_as::<_, ContractRow>(&format!(
                    "{} WHERE buyer_id = $1 OR seller_id = $1 ORDER BY created_at DESC",
                    SELECT_CONTRACT
                ))
                .bind(user_id.as_i64())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| read_error("list contracts", e))?;

        rows.into_iter().map(Contract::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::FeeKind;

    fn row() -> ContractRow {
        let now = Utc::now();
        ContractRow {
            id: Uuid::new_v4(),
            purchase_request_id: None,
            listing_id: 100,
            buyer_id: 3,
            seller_id: 4,
            staff_id: Some(2),
            status: "awaiting_sign".to_string(),
            agreed_price: Some(450_000_000),
            fees: Some(Json(
                FeeSchedule::new()
                    .with(FeeKind::BrokerageFee, 5_000_000)
                    .unwrap(),
            )),
            fee_responsibility: Some(Json(
                FeeResponsibility::new().with(FeeKind::BrokerageFee, Party::Seller),
            )),
            appointment_at: Some(now),
            appointment_place: Some("Showroom D7".to_string()),
            appointment_note: None,
            buyer_otp: Some("042917".to_string()),
            buyer_otp_expires_at: Some(now),
            buyer_otp_attempts: 2,
            buyer_signed_at: None,
            seller_otp: None,
            seller_otp_expires_at: None,
            seller_otp_attempts: 0,
            seller_signed_at: Some(now),
            signed_at: None,
            completed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            version: 7,
        }
    }

    #[test]
    fn row_rebuilds_terms_and_signing_state() {
        let contract = Contract::try_from(row()).unwrap();

        assert_eq!(contract.status(), ContractStatus::AwaitingSign);
        assert_eq!(contract.staff_id().map(|id| id.as_i64()), Some(2));
        let terms = contract.terms().unwrap();
        assert_eq!(terms.agreed_price, 450_000_000);
        assert_eq!(terms.fees.amount(FeeKind::BrokerageFee), 5_000_000);
        assert_eq!(
            terms.responsibility.party_for(FeeKind::BrokerageFee),
            Some(Party::Seller)
        );
        assert_eq!(contract.appointment().unwrap().place, "Showroom D7");

        let buyer = contract.signing(Party::Buyer);
        assert!(buyer.has_pending_code());
        assert_eq!(buyer.attempts(), 2);
        assert!(contract.signing(Party::Seller).is_signed());
        assert_eq!(contract.version(), 7);
    }

    #[test]
    fn party_columns_name_only_that_party() {
        let seller = party_columns(Party::Seller);
        for column in [seller.otp, seller.expires_at, seller.attempts, seller.signed_at] {
            assert!(column.starts_with("seller_"));
        }
        assert_eq!(party_columns(Party::Buyer).attempts, "buyer_otp_attempts");
    }

    #[test]
    fn contract_without_price_has_no_terms() {
        let contract = Contract::try_from(ContractRow {
            agreed_price: None,
            fees: None,
            fee_responsibility: None,
            ..row()
        })
        .unwrap();
        assert!(contract.terms().is_none());
    }

    #[test]
    fn malformed_stored_code_is_rejected() {
        let err = Contract::try_from(ContractRow {
            buyer_otp: Some("12ab".to_string()),
            ..row()
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("buyer_otp"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Contract::try_from(ContractRow {
            status: "archived".to_string(),
            ..row()
        })
        .is_err());
    }
}

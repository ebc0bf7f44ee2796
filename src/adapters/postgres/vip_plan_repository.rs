//! PostgreSQL implementation of VipPlanRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::mapping::{corrupt, parse_text, plan_id, read_error};
use crate::domain::foundation::{DomainError, VipPlanId};
use crate::domain::vip::{BillingInterval, PlanBilling, VipPlan};
use crate::ports::VipPlanRepository;

const SELECT_PLAN: &str = r#"
    SELECT id, name, slug, billing_type, duration_days, billing_interval, interval_count,
           amount, currency, priority, active, external_product_id, external_price_id
    FROM vip_plans
"#;

pub struct PostgresVipPlanRepository {
    pool: PgPool,
}

impl PostgresVipPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VipPlanRow {
    id: i64,
    name: String,
    slug: String,
    billing_type: String,
    duration_days: Option<i32>,
    billing_interval: Option<String>,
    interval_count: Option<i32>,
    amount: i64,
    currency: String,
    priority: i32,
    active: bool,
    external_product_id: Option<String>,
    external_price_id: Option<String>,
}

fn positive(column: &str, value: Option<i32>) -> Result<u32, DomainError> {
    value
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| corrupt(column, "missing or not positive"))
}

fn billing_from_columns(row: &VipPlanRow) -> Result<PlanBilling, DomainError> {
    let billing = match row.billing_type.as_str() {
        "one_time" => PlanBilling::one_time(positive("duration_days", row.duration_days)?),
        "subscription" => {
            let interval = row
                .billing_interval
                .as_deref()
                .ok_or_else(|| corrupt("billing_interval", "missing for subscription"))?;
            PlanBilling::subscription(
                parse_text::<BillingInterval>("billing_interval", interval)?,
                positive("interval_count", row.interval_count)?,
            )
        }
        other => return Err(corrupt("billing_type", other)),
    };
    billing.map_err(|e| corrupt("billing", e))
}

impl TryFrom<VipPlanRow> for VipPlan {
    type Error = DomainError;

    fn try_from(row: VipPlanRow) -> Result<Self, Self::Error> {
        let billing = billing_from_columns(&row)?;
        Ok(VipPlan {
            id: plan_id("id", row.id)?,
            name: row.name,
            slug: row.slug,
            billing,
            amount: row.amount,
            currency: row.currency,
            priority: row.priority,
            active: row.active,
            external_product_id: row.external_product_id,
            external_price_id: row.external_price_id,
        })
    }
}

#[async_trait]
impl VipPlanRepository for PostgresVipPlanRepository {
    async fn find_by_id(&self, id: VipPlanId) -> Result<Option<VipPlan>, DomainError> {
        let row: Option<VipPlanRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_PLAN))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error("find VIP plan", e))?;

        row.map(VipPlan::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<VipPlan>, DomainError> {
        let rows: Vec<VipPlanRow> = sqlx::query_as(&format!(
            "{} WHERE active ORDER BY priority DESC, id ASC",
            SELECT_PLAN
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("list VIP plans", e))?;

        rows.into_iter().map(VipPlan::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(billing_type: &str) -> VipPlanRow {
        VipPlanRow {
            id: 2,
            name: "Diamond monthly".to_string(),
            slug: "diamond".to_string(),
            billing_type: billing_type.to_string(),
            duration_days: None,
            billing_interval: Some("month".to_string()),
            interval_count: Some(1),
            amount: 400_000,
            currency: "vnd".to_string(),
            priority: 50,
            active: true,
            external_product_id: None,
            external_price_id: Some("price_diamond".to_string()),
        }
    }

    #[test]
    fn subscription_row_builds_subscription_billing() {
        let plan = VipPlan::try_from(row("subscription")).unwrap();
        assert_eq!(
            plan.billing,
            PlanBilling::subscription(BillingInterval::Month, 1).unwrap()
        );
        assert_eq!(plan.external_price_id.as_deref(), Some("price_diamond"));
    }

    #[test]
    fn one_time_row_needs_positive_duration() {
        let plan = VipPlan::try_from(VipPlanRow {
            duration_days: Some(30),
            ..row("one_time")
        })
        .unwrap();
        assert_eq!(plan.billing.nominal_days(), 30);

        assert!(VipPlan::try_from(VipPlanRow {
            duration_days: Some(0),
            ..row("one_time")
        })
        .is_err());
    }

    #[test]
    fn subscription_without_interval_is_corrupt() {
        assert!(VipPlan::try_from(VipPlanRow {
            billing_interval: None,
            ..row("subscription")
        })
        .is_err());
        assert!(VipPlan::try_from(row("lifetime")).is_err());
    }
}

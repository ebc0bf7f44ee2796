//! VIP plan catalogue entry.

use crate::domain::foundation::{Timestamp, ValidationError, VipPlanId};
use crate::domain::listing::VipTier;
use chrono::Months;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Billing period unit of a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Day => "day",
            BillingInterval::Week => "week",
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(BillingInterval::Day),
            "week" => Ok(BillingInterval::Week),
            "month" => Ok(BillingInterval::Month),
            "year" => Ok(BillingInterval::Year),
            other => Err(ValidationError::invalid_format(
                "interval",
                format!("unknown billing interval '{}'", other),
            )),
        }
    }
}

/// How a plan is charged: once for a fixed number of days, or recurring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanBilling {
    OneTime {
        duration_days: u32,
    },
    Subscription {
        interval: BillingInterval,
        interval_count: u32,
    },
}

impl PlanBilling {
    /// # Errors
    ///
    /// - `OutOfRange` for a zero duration or interval count
    pub fn one_time(duration_days: u32) -> Result<Self, ValidationError> {
        if duration_days == 0 {
            return Err(ValidationError::out_of_range("duration_days", 1, 3650, 0));
        }
        Ok(PlanBilling::OneTime { duration_days })
    }

    /// # Errors
    ///
    /// - `OutOfRange` for a zero interval count
    pub fn subscription(interval: BillingInterval, interval_count: u32) -> Result<Self, ValidationError> {
        if interval_count == 0 {
            return Err(ValidationError::out_of_range("interval_count", 1, 365, 0));
        }
        Ok(PlanBilling::Subscription {
            interval,
            interval_count,
        })
    }

    pub fn is_subscription(&self) -> bool {
        matches!(self, PlanBilling::Subscription { .. })
    }

    /// End of the first paid period starting at `start`.
    pub fn period_end(&self, start: Timestamp) -> Timestamp {
        match *self {
            PlanBilling::OneTime { duration_days } => start.add_days(i64::from(duration_days)),
            PlanBilling::Subscription {
                interval,
                interval_count,
            } => {
                let count = i64::from(interval_count);
                match interval {
                    BillingInterval::Day => start.add_days(count),
                    BillingInterval::Week => start.add_days(count * 7),
                    BillingInterval::Month | BillingInterval::Year => {
                        let months = if interval == BillingInterval::Year {
                            interval_count.saturating_mul(12)
                        } else {
                            interval_count
                        };
                        start
                            .as_datetime()
                            .checked_add_months(Months::new(months))
                            .map(Timestamp::from_datetime)
                            .unwrap_or_else(|| start.add_days(count * 30))
                    }
                }
            }
        }
    }

    /// Nominal length in days, reported to the gateway as metadata.
    pub fn nominal_days(&self) -> i64 {
        match *self {
            PlanBilling::OneTime { duration_days } => i64::from(duration_days),
            PlanBilling::Subscription {
                interval,
                interval_count,
            } => {
                let unit = match interval {
                    BillingInterval::Day => 1,
                    BillingInterval::Week => 7,
                    BillingInterval::Month => 30,
                    BillingInterval::Year => 365,
                };
                unit * i64::from(interval_count)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipPlan {
    pub id: VipPlanId,
    pub name: String,
    pub slug: String,
    pub billing: PlanBilling,
    pub amount: i64,
    pub currency: String,
    pub priority: i32,
    pub active: bool,
    pub external_product_id: Option<String>,
    pub external_price_id: Option<String>,
}

impl VipPlan {
    pub fn tier(&self) -> Option<VipTier> {
        VipTier::from_slug(&self.slug)
    }
}

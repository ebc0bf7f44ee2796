//! Listing (post) entity as seen by contracts and VIP reconciliation.
//!
//! Listings are created and edited elsewhere; this service only reads them
//! and mutates their sale and VIP state.
//!
//! # Effective VIP
//!
//! The stored `is_vip` flag can lag behind its expiry until the sweep runs.
//! Read paths use `is_vip_effective(now)`, which also requires
//! `vip_expires_at` to be in the future.

use crate::domain::foundation::{ListingId, Timestamp, UserId, ValidationError, VipPlanId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! text_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ValidationError::invalid_format(
                        $field,
                        format!("unknown value '{}'", other),
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingCategory {
    Vehicle,
    Battery,
}

text_enum!(ListingCategory, "category", { Vehicle => "vehicle", Battery => "battery" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Available,
    Sold,
}

text_enum!(SaleStatus, "sale_status", { Available => "available", Sold => "sold" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    Verify,
    Nonverify,
}

text_enum!(VerifyStatus, "verify_status", { Verify => "verify", Nonverify => "nonverify" });

/// VIP promotion tier, derived from the purchased plan's slug. A listing
/// without one carries `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VipTier {
    Diamond,
    Gold,
    Silver,
}

text_enum!(VipTier, "vip_tier", {
    Diamond => "diamond",
    Gold => "gold",
    Silver => "silver",
});

impl VipTier {
    /// Maps a plan slug to its tier; unknown slugs carry no tier.
    pub fn from_slug(slug: &str) -> Option<Self> {
        slug.trim().to_lowercase().parse().ok()
    }
}

/// What a successful VIP payment grants a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VipGrant {
    pub tier: Option<VipTier>,
    pub priority: i32,
    pub expires_at: Timestamp,
    pub plan_id: VipPlanId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: UserId,
    pub title: String,
    pub category: ListingCategory,
    pub price: i64,
    pub is_active: bool,
    pub sale_status: SaleStatus,
    pub verify_status: VerifyStatus,
    pub published_at: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,
    pub is_vip: bool,
    pub vip_tier: Option<VipTier>,
    pub vip_priority: i32,
    pub vip_expires_at: Option<Timestamp>,
    pub vip_plan_id: Option<VipPlanId>,
    pub updated_at: Timestamp,
}

impl Listing {
    /// A fresh, unpublished listing. Used by seeding and tests.
    pub fn draft(
        id: ListingId,
        owner_id: UserId,
        title: impl Into<String>,
        category: ListingCategory,
        price: i64,
    ) -> Self {
        Self {
            id,
            owner_id,
            title: title.into(),
            category,
            price,
            is_active: false,
            sale_status: SaleStatus::Available,
            verify_status: VerifyStatus::Nonverify,
            published_at: None,
            paid_at: None,
            is_vip: false,
            vip_tier: None,
            vip_priority: 0,
            vip_expires_at: None,
            vip_plan_id: None,
            updated_at: Timestamp::now(),
        }
    }

    pub fn is_sold(&self) -> bool {
        self.sale_status == SaleStatus::Sold
    }

    pub fn is_battery(&self) -> bool {
        self.category == ListingCategory::Battery
    }

    /// True while the VIP flag is set and its expiry is still ahead.
    pub fn is_vip_effective(&self, now: Timestamp) -> bool {
        self.is_vip && self.vip_expires_at.is_some_and(|exp| now.is_before(&exp))
    }

    /// Ranking weight: the VIP priority while effective, otherwise zero.
    pub fn effective_priority(&self, now: Timestamp) -> i32 {
        if self.is_vip_effective(now) {
            self.vip_priority.max(0)
        } else {
            0
        }
    }

    /// Listed publicly: active and still for sale.
    pub fn is_public(&self) -> bool {
        self.is_active && !self.is_sold()
    }

    /// Publishes the listing with the paid VIP grant.
    pub fn activate_vip(&mut self, grant: VipGrant, now: Timestamp) {
        self.is_vip = true;
        self.vip_tier = grant.tier;
        self.vip_priority = grant.priority.max(0);
        self.vip_expires_at = Some(grant.expires_at);
        self.vip_plan_id = Some(grant.plan_id);
        self.is_active = true;
        self.verify_status = VerifyStatus::Nonverify;
        self.published_at = Some(now);
        self.paid_at = Some(now);
        self.updated_at = now;
    }

    /// Takes the listing down after the promotion ended or payment lapsed.
    pub fn deactivate_vip(&mut self, now: Timestamp) {
        self.is_vip = false;
        self.vip_tier = None;
        self.vip_priority = 0;
        self.is_active = false;
        self.updated_at = now;
    }

    /// Keeps VIP until `period_end` at the latest (cancel at period end).
    pub fn cap_vip_expiry(&mut self, period_end: Timestamp, now: Timestamp) {
        let capped = match self.vip_expires_at {
            Some(current) if current.is_before(&period_end) => current,
            _ => period_end,
        };
        self.vip_expires_at = Some(capped);
        self.updated_at = now;
    }

    /// Extends VIP to the new billing period's end.
    pub fn renew_vip(&mut self, period_end: Timestamp, now: Timestamp) {
        self.is_vip = true;
        self.vip_expires_at = Some(period_end);
        self.updated_at = now;
    }

    /// Clears VIP state if it has lapsed. Returns true if anything changed.
    pub fn expire_vip_if_lapsed(&mut self, now: Timestamp) -> bool {
        let lapsed = self.is_vip && self.vip_expires_at.map_or(true, |exp| !now.is_before(&exp));
        if lapsed {
            self.deactivate_vip(now);
        }
        lapsed
    }

    /// Marks the listing sold. Returns false if it already was.
    pub fn mark_sold(&mut self, now: Timestamp) -> bool {
        if self.is_sold() {
            return false;
        }
        self.sale_status = SaleStatus::Sold;
        self.updated_at = now;
        true
    }
}

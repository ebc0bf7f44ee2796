//! Contract and purchase-request status state machines.
//!
//! `can_transition_to` is the single transition table for each lifecycle.
//! Operation-specific guards (who may act, which fields must be present)
//! live on the aggregates.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a sale contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Created, waiting for an admin to assign staff.
    Pending,

    /// Staff assigned; appointment and terms are being worked out.
    Negotiating,

    /// Terms are final; parties sign with one-time codes.
    AwaitingSign,

    /// Both parties have signed.
    Signed,

    /// Paperwork is with the notary.
    Notarizing,

    /// Transaction closed.
    Completed,

    /// Abandoned before completion.
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Negotiating => "negotiating",
            ContractStatus::AwaitingSign => "awaiting_sign",
            ContractStatus::Signed => "signed",
            ContractStatus::Notarizing => "notarizing",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses that block a second contract for the same buyer and listing.
    pub const ACTIVE: [ContractStatus; 5] = [
        ContractStatus::Pending,
        ContractStatus::Negotiating,
        ContractStatus::AwaitingSign,
        ContractStatus::Signed,
        ContractStatus::Notarizing,
    ];

    /// Returns true for any status that is not completed or cancelled.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContractStatus::Pending),
            "negotiating" => Ok(ContractStatus::Negotiating),
            "awaiting_sign" => Ok(ContractStatus::AwaitingSign),
            "signed" => Ok(ContractStatus::Signed),
            "notarizing" => Ok(ContractStatus::Notarizing),
            "completed" => Ok(ContractStatus::Completed),
            "cancelled" => Ok(ContractStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown contract status '{}'", other),
            )),
        }
    }
}

impl StateMachine for ContractStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ContractStatus::*;
        matches!(
            (self, target),
            // Staff assignment and appointment
            (Pending, Negotiating)
                | (Negotiating, Negotiating)
            // Terms finalized (re-finalizing stays in place)
                | (Negotiating, AwaitingSign)
                | (AwaitingSign, AwaitingSign)
            // Both parties signed
                | (AwaitingSign, Signed)
            // Notarization and completion
                | (Signed, Notarizing)
                | (Signed, Completed)
                | (Notarizing, Completed)
            // Cancellation from any open state
                | (Pending, Cancelled)
                | (Negotiating, Cancelled)
                | (AwaitingSign, Cancelled)
                | (Signed, Cancelled)
                | (Notarizing, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ContractStatus::*;
        match self {
            Pending => vec![Negotiating, Cancelled],
            Negotiating => vec![Negotiating, AwaitingSign, Cancelled],
            AwaitingSign => vec![AwaitingSign, Signed, Cancelled],
            Signed => vec![Notarizing, Completed, Cancelled],
            Notarizing => vec![Completed, Cancelled],
            Completed | Cancelled => vec![],
        }
    }
}

/// Lifecycle status of a buyer's purchase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    Expired,
}

impl PurchaseRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseRequestStatus::Pending => "pending",
            PurchaseRequestStatus::Accepted => "accepted",
            PurchaseRequestStatus::Rejected => "rejected",
            PurchaseRequestStatus::Withdrawn => "withdrawn",
            PurchaseRequestStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for PurchaseRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseRequestStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PurchaseRequestStatus::Pending),
            "accepted" => Ok(PurchaseRequestStatus::Accepted),
            "rejected" => Ok(PurchaseRequestStatus::Rejected),
            "withdrawn" => Ok(PurchaseRequestStatus::Withdrawn),
            "expired" => Ok(PurchaseRequestStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown purchase request status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PurchaseRequestStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PurchaseRequestStatus::*;
        matches!(
            (self, target),
            (Pending, Accepted) | (Pending, Rejected) | (Pending, Withdrawn) | (Pending, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PurchaseRequestStatus::*;
        match self {
            Pending => vec![Accepted, Rejected, Withdrawn, Expired],
            Accepted | Rejected | Withdrawn | Expired => vec![],
        }
    }
}

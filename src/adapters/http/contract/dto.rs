//! HTTP DTOs for contract endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::handlers::contract::{SendOtpResult, VerifyOtpResult};
use crate::domain::contract::{AmountInput, ContractView, Party};
use crate::domain::foundation::{ListingId, Timestamp, UserId};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to open a contract directly on a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContractRequest {
    pub listing_id: ListingId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignStaffRequest {
    pub staff_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordAppointmentRequest {
    pub scheduled_at: Timestamp,
    pub place: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Agreed price plus fees keyed by fee kind.
///
/// Amounts may be numbers or strings with grouping separators.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeTermsRequest {
    pub agreed_price: AmountInput,
    #[serde(default)]
    pub fees: BTreeMap<String, AmountInput>,
    /// Fee kind to `buyer` or `seller`.
    #[serde(default)]
    pub responsibility: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpRequest {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelContractRequest {
    pub reason: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct ContractResponse {
    pub contract: ContractView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractListResponse {
    pub contracts: Vec<ContractView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftSentResponse {
    pub delivered: usize,
}

/// Codes went out by email; only their deadline is reported.
#[derive(Debug, Clone, Serialize)]
pub struct OtpSentResponse {
    pub contract: ContractView,
    pub issued_to: Vec<Party>,
    pub expires_at: Timestamp,
}

impl From<SendOtpResult> for OtpSentResponse {
    fn from(result: SendOtpResult) -> Self {
        Self {
            contract: ContractView::from(&result.contract),
            issued_to: result.issued_to,
            expires_at: result.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpVerifiedResponse {
    pub contract: ContractView,
    pub signed_as: Party,
    pub contract_signed: bool,
}

impl From<VerifyOtpResult> for OtpVerifiedResponse {
    fn from(result: VerifyOtpResult) -> Self {
        Self {
            contract: ContractView::from(&result.contract),
            signed_as: result.signed_as,
            contract_signed: result.contract_signed,
        }
    }
}

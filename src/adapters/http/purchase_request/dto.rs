//! HTTP DTOs for purchase request endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::contract::{ContractView, PurchaseRequest, PurchaseRequestStatus};
use crate::domain::foundation::{ContractId, ListingId, PurchaseRequestId, Timestamp, UserId};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchaseRequestRequest {
    pub listing_id: ListingId,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectPurchaseRequestRequest {
    pub reason: String,
}

/// A purchase request as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequestView {
    pub id: PurchaseRequestId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub listing_id: ListingId,
    pub message: Option<String>,
    pub status: PurchaseRequestStatus,
    pub handled_by: Option<UserId>,
    pub reject_reason: Option<String>,
    pub contract_id: Option<ContractId>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&PurchaseRequest> for PurchaseRequestView {
    fn from(request: &PurchaseRequest) -> Self {
        Self {
            id: *request.id(),
            buyer_id: request.buyer_id(),
            seller_id: request.seller_id(),
            listing_id: request.listing_id(),
            message: request.message().map(str::to_string),
            status: request.status(),
            handled_by: request.handled_by(),
            reject_reason: request.reject_reason().map(str::to_string),
            contract_id: request.contract_id().copied(),
            expires_at: request.expires_at(),
            created_at: request.created_at(),
            updated_at: request.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequestResponse {
    pub purchase_request: PurchaseRequestView,
}

impl From<&PurchaseRequest> for PurchaseRequestResponse {
    fn from(request: &PurchaseRequest) -> Self {
        Self {
            purchase_request: PurchaseRequestView::from(request),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequestListResponse {
    pub purchase_requests: Vec<PurchaseRequestView>,
}

/// Acceptance returns the request and the contract it opened.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedResponse {
    pub purchase_request: PurchaseRequestView,
    pub contract: ContractView,
}

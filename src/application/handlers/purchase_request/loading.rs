//! Request loading with lazy expiry.

use crate::domain::contract::{ContractError, PurchaseRequest};
use crate::domain::foundation::{PurchaseRequestId, Timestamp};
use crate::ports::PurchaseRequestRepository;

/// Loads a request, first expiring and persisting it if its deadline passed.
///
/// Callers then act on the returned request; the domain refuses any
/// transition out of `expired`.
pub(crate) async fn load_request(
    requests: &dyn PurchaseRequestRepository,
    id: &PurchaseRequestId,
    now: Timestamp,
) -> Result<PurchaseRequest, ContractError> {
    let mut request = requests
        .find_by_id(id)
        .await?
        .ok_or_else(|| ContractError::not_found("purchase_request", id))?;

    expire_and_persist(requests, &mut request, now).await?;
    Ok(request)
}

/// Returns true if the request was overdue and is now stored as expired.
pub(crate) async fn expire_and_persist(
    requests: &dyn PurchaseRequestRepository,
    request: &mut PurchaseRequest,
    now: Timestamp,
) -> Result<bool, ContractError> {
    if !request.expire_if_overdue(now) {
        return Ok(false);
    }
    requests.update(request).await?;
    tracing::info!(request_id = %request.id(), "Purchase request expired");
    Ok(true)
}

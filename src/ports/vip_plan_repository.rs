//! VIP plan catalogue port (read-only).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, VipPlanId};
use crate::domain::vip::VipPlan;

#[async_trait]
pub trait VipPlanRepository: Send + Sync {
    async fn find_by_id(&self, id: VipPlanId) -> Result<Option<VipPlan>, DomainError>;

    /// Plans open for purchase, by priority descending.
    async fn list_active(&self) -> Result<Vec<VipPlan>, DomainError>;
}

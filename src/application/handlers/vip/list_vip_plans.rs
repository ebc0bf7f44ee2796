//! ListVipPlansHandler - Query handler for the plans on offer.

use std::sync::Arc;

use crate::domain::vip::{VipError, VipPlan};
use crate::ports::VipPlanRepository;

pub struct ListVipPlansHandler {
    plans: Arc<dyn VipPlanRepository>,
}

impl ListVipPlansHandler {
    pub fn new(plans: Arc<dyn VipPlanRepository>) -> Self {
        Self { plans }
    }

    pub async fn handle(&self) -> Result<Vec<VipPlan>, VipError> {
        Ok(self.plans.list_active().await?)
    }
}

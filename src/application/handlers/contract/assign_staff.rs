//! AssignStaffHandler - Command handler for assigning the mediating staff member.

use std::sync::Arc;

use crate::domain::contract::{Contract, ContractError, StaffAssigned};
use crate::domain::foundation::{
    Actor, ContractId, EventEnvelope, EventId, Role, Timestamp, UserId,
};
use crate::ports::{ContractRepository, EventPublisher, UserDirectory};

use super::guards::load_contract;

/// Command to assign (or reassign) staff to a contract.
#[derive(Debug, Clone)]
pub struct AssignStaffCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
    pub staff_id: UserId,
}

#[derive(Debug, Clone)]
pub struct AssignStaffResult {
    pub contract: Contract,
    pub previous_staff_id: Option<UserId>,
}

/// Admin-only. Moves a pending contract into negotiation.
pub struct AssignStaffHandler {
    contracts: Arc<dyn ContractRepository>,
    users: Arc<dyn UserDirectory>,
    publisher: Arc<dyn EventPublisher>,
}

impl AssignStaffHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        users: Arc<dyn UserDirectory>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            contracts,
            users,
            publisher,
        }
    }

    pub async fn handle(&self, cmd: AssignStaffCommand) -> Result<AssignStaffResult, ContractError> {
        // 1. Only admins assign staff
        if !cmd.actor.is_admin() {
            return Err(ContractError::forbidden("Only an admin may assign staff"));
        }

        // 2. Target must be a staff member
        let target = self
            .users
            .find_user(cmd.staff_id)
            .await?
            .ok_or_else(|| ContractError::not_found("user", cmd.staff_id))?;
        if target.role != Role::Staff {
            return Err(ContractError::validation(
                "staff_id",
                format!("User {} is not a staff member", cmd.staff_id),
            ));
        }

        // 3. Assign and persist
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        let now = Timestamp::now();
        let previous_staff_id = contract.assign_staff(cmd.staff_id, now)?;
        self.contracts.update(&contract).await?;

        tracing::info!(
            contract_id = %contract.id(),
            staff_id = %cmd.staff_id,
            status = %contract.status(),
            "Staff assigned to contract"
        );

        // 4. Publish
        let event = StaffAssigned {
            event_id: EventId::new(),
            contract_id: *contract.id(),
            staff_id: cmd.staff_id,
            previous_staff_id,
            assigned_by: cmd.actor.id,
            assigned_at: now,
        };
        let envelope = EventEnvelope::from_event(&event).with_user_id(cmd.actor.id.to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(contract_id = %contract.id(), error = %e, "Failed to publish contract.staff_assigned");
        }

        Ok(AssignStaffResult {
            contract,
            previous_staff_id,
        })
    }
}

//! CancelContractHandler - Command handler for abandoning a contract.

use std::sync::Arc;

use crate::domain::contract::{Contract, ContractCancelled, ContractError};
use crate::domain::foundation::{Actor, ContractId, EventEnvelope, EventId, Timestamp};
use crate::ports::{ContractRepository, EventPublisher};

use super::guards::load_contract;

#[derive(Debug, Clone)]
pub struct CancelContractCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
    pub reason: String,
}

/// Any admin, or the assigned staff member. A reason is required.
pub struct CancelContractHandler {
    contracts: Arc<dyn ContractRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl CancelContractHandler {
    pub fn new(contracts: Arc<dyn ContractRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            contracts,
            publisher,
        }
    }

    pub async fn handle(&self, cmd: CancelContractCommand) -> Result<Contract, ContractError> {
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        if !(cmd.actor.is_admin() || contract.is_assigned_staff(&cmd.actor)) {
            return Err(ContractError::forbidden(
                "Only an admin or the assigned staff member may cancel this contract",
            ));
        }

        let now = Timestamp::now();
        let previous = contract.status();
        contract.cancel(&cmd.reason, now)?;
        self.contracts.update(&contract).await?;

        tracing::info!(
            contract_id = %contract.id(),
            from = %previous,
            cancelled_by = %cmd.actor.id,
            "Contract cancelled"
        );

        let event = ContractCancelled {
            event_id: EventId::new(),
            contract_id: *contract.id(),
            cancelled_by: cmd.actor.id,
            reason: contract.cancel_reason().unwrap_or_default().to_string(),
            cancelled_at: now,
        };
        let envelope = EventEnvelope::from_event(&event).with_user_id(cmd.actor.id.to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(contract_id = %contract.id(), error = %e, "Failed to publish contract.cancelled");
        }

        Ok(contract)
    }
}

//! CompleteContractHandler - Command handler for closing a signed contract.

use std::sync::Arc;

use crate::domain::contract::{Contract, ContractCompleted, ContractError};
use crate::domain::foundation::{Actor, ContractId, EventEnvelope, EventId, Timestamp};
use crate::ports::{ContractRepository, EventPublisher};

use super::guards::load_contract;
use super::notifications::{contract_completed, ContractMailer};

#[derive(Debug, Clone)]
pub struct CompleteContractCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
}

/// Assigned staff only. Sends the final contract to both parties.
pub struct CompleteContractHandler {
    contracts: Arc<dyn ContractRepository>,
    publisher: Arc<dyn EventPublisher>,
    mailer: Arc<ContractMailer>,
}

impl CompleteContractHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        publisher: Arc<dyn EventPublisher>,
        mailer: Arc<ContractMailer>,
    ) -> Self {
        Self {
            contracts,
            publisher,
            mailer,
        }
    }

    pub async fn handle(&self, cmd: CompleteContractCommand) -> Result<Contract, ContractError> {
        // 1. Load and authorize
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        contract.authorize_assigned_staff(&cmd.actor)?;

        // 2. Complete and persist
        let now = Timestamp::now();
        contract.complete(now)?;
        self.contracts.update(&contract).await?;

        tracing::info!(contract_id = %contract.id(), "Contract completed");

        // 3. Post-commit
        let event = ContractCompleted {
            event_id: EventId::new(),
            contract_id: *contract.id(),
            listing_id: contract.listing_id(),
            completed_by: cmd.actor.id,
            completed_at: now,
        };
        let envelope = EventEnvelope::from_event(&event).with_user_id(cmd.actor.id.to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(contract_id = %contract.id(), error = %e, "Failed to publish contract.completed");
        }

        let (subject, body) = contract_completed(&contract);
        self.mailer.send_to_parties(&contract, &subject, body).await;

        Ok(contract)
    }
}

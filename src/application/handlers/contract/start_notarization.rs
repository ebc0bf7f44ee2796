//! StartNotarizationHandler - Command handler for moving a signed contract to the notary.

use std::sync::Arc;

use crate::domain::contract::{Contract, ContractError};
use crate::domain::foundation::{Actor, ContractId, Timestamp};
use crate::ports::ContractRepository;

use super::guards::load_contract;

#[derive(Debug, Clone)]
pub struct StartNotarizationCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
}

pub struct StartNotarizationHandler {
    contracts: Arc<dyn ContractRepository>,
}

impl StartNotarizationHandler {
    pub fn new(contracts: Arc<dyn ContractRepository>) -> Self {
        Self { contracts }
    }

    pub async fn handle(&self, cmd: StartNotarizationCommand) -> Result<Contract, ContractError> {
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        contract.authorize_assigned_staff(&cmd.actor)?;

        contract.start_notarization(Timestamp::now())?;
        self.contracts.update(&contract).await?;

        tracing::info!(contract_id = %contract.id(), "Notarization started");
        Ok(contract)
    }
}

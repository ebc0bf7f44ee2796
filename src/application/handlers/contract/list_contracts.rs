//! ListContractsHandler - Query handler for the contracts an actor can see.

use std::sync::Arc;

use crate::domain::contract::{ContractError, ContractView};
use crate::domain::foundation::{Actor, Role};
use crate::ports::{ContractRepository, ContractScope};

#[derive(Debug, Clone)]
pub struct ListContractsQuery {
    pub actor: Actor,
}

/// Admins see all contracts, staff see their assignments, customers see
/// contracts they are a party to.
pub struct ListContractsHandler {
    contracts: Arc<dyn ContractRepository>,
}

impl ListContractsHandler {
    pub fn new(contracts: Arc<dyn ContractRepository>) -> Self {
        Self { contracts }
    }

    pub async fn handle(&self, query: ListContractsQuery) -> Result<Vec<ContractView>, ContractError> {
        let scope = match query.actor.role {
            Role::Admin => ContractScope::All,
            Role::Staff => ContractScope::AssignedTo(query.actor.id),
            Role::Customer => ContractScope::PartyOf(query.actor.id),
        };

        let contracts = self.contracts.list(scope).await?;
        Ok(contracts.iter().map(ContractView::from).collect())
    }
}

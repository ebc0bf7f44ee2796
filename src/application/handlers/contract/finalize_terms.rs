//! FinalizeTermsHandler - Command handler for fixing price and fees.
//!
//! Amounts arrive as JSON numbers or as strings with grouping separators
//! ("1.500.000", "1,500,000"). Fee keys must name one of the five fee kinds
//! and responsibilities must be "buyer" or "seller".

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::contract::{
    AmountInput, Contract, ContractError, ContractTerms, FeeKind, FeeResponsibility, FeeSchedule,
    TermsFinalized,
};
use crate::domain::foundation::{Actor, ContractId, EventEnvelope, EventId, Timestamp};
use crate::ports::{ContractRepository, EventPublisher};

use super::guards::load_contract;

#[derive(Debug, Clone)]
pub struct FinalizeTermsCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
    pub agreed_price: AmountInput,
    pub fees: BTreeMap<String, AmountInput>,
    pub responsibility: BTreeMap<String, String>,
}

/// Assigned staff only. Moves the contract to awaiting signatures.
pub struct FinalizeTermsHandler {
    contracts: Arc<dyn ContractRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl FinalizeTermsHandler {
    pub fn new(contracts: Arc<dyn ContractRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            contracts,
            publisher,
        }
    }

    pub async fn handle(&self, cmd: FinalizeTermsCommand) -> Result<Contract, ContractError> {
        // 1. Authorize before parsing anything
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        contract.authorize_assigned_staff(&cmd.actor)?;

        // 2. Parse terms
        let terms = parse_terms(&cmd)?;
        let agreed_price = terms.agreed_price;
        let total_fees = terms.fees.total();

        // 3. Apply and persist
        let now = Timestamp::now();
        contract.finalize_terms(terms, now)?;
        self.contracts.update(&contract).await?;

        tracing::info!(
            contract_id = %contract.id(),
            agreed_price,
            total_fees,
            "Contract terms finalized"
        );

        // 4. Publish
        let event = TermsFinalized {
            event_id: EventId::new(),
            contract_id: *contract.id(),
            agreed_price,
            total_fees,
            finalized_by: cmd.actor.id,
            finalized_at: now,
        };
        let envelope = EventEnvelope::from_event(&event).with_user_id(cmd.actor.id.to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(contract_id = %contract.id(), error = %e, "Failed to publish contract.terms_finalized");
        }

        Ok(contract)
    }
}

fn parse_terms(cmd: &FinalizeTermsCommand) -> Result<ContractTerms, ContractError> {
    let agreed_price = cmd.agreed_price.parse("agreed_price")?;

    let mut fees = FeeSchedule::new();
    for (key, amount) in &cmd.fees {
        let kind: FeeKind = key.parse().map_err(|_| {
            ContractError::validation("fees", format!("unknown fee kind '{}'", key))
        })?;
        fees.set(kind, amount.parse(kind.as_str())?)?;
    }

    let responsibility = FeeResponsibility::from_raw(
        cmd.responsibility
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    )?;

    Ok(ContractTerms::new(agreed_price, fees, responsibility)?)
}

//! SendDraftContractHandler - emails the finalized terms to both parties.

use std::sync::Arc;

use crate::domain::contract::{ContractError, ContractStatus};
use crate::domain::foundation::{Actor, ContractId};
use crate::ports::ContractRepository;

use super::guards::load_contract;
use super::notifications::{draft_terms, ContractMailer};

#[derive(Debug, Clone)]
pub struct SendDraftContractCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendDraftContractResult {
    /// How many of the two parties the provider accepted mail for.
    pub delivered: usize,
}

/// Assigned staff only, while awaiting signatures. Changes no state.
pub struct SendDraftContractHandler {
    contracts: Arc<dyn ContractRepository>,
    mailer: Arc<ContractMailer>,
}

impl SendDraftContractHandler {
    pub fn new(contracts: Arc<dyn ContractRepository>, mailer: Arc<ContractMailer>) -> Self {
        Self { contracts, mailer }
    }

    pub async fn handle(
        &self,
        cmd: SendDraftContractCommand,
    ) -> Result<SendDraftContractResult, ContractError> {
        let contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        contract.authorize_assigned_staff(&cmd.actor)?;

        if contract.status() != ContractStatus::AwaitingSign {
            return Err(ContractError::invalid_state(format!(
                "Cannot send a draft for a contract that is {}",
                contract.status()
            )));
        }

        let (subject, body) = draft_terms(&contract);
        let delivered = self.mailer.send_to_parties(&contract, &subject, body).await;

        tracing::info!(contract_id = %contract.id(), delivered, "Draft contract sent");
        Ok(SendDraftContractResult { delivered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{email_of, staff, Fixture, BUYER, SELLER};
    use crate::domain::foundation::ErrorCode;

    #[tokio::test]
    async fn emails_terms_to_both_parties() {
        let fixture = Fixture::new();
        let contract = fixture.awaiting_sign_contract().await;
        let handler = SendDraftContractHandler::new(fixture.store.clone(), fixture.mailer());

        let result = handler
            .handle(SendDraftContractCommand {
                actor: staff(),
                contract_id: *contract.id(),
            })
            .await
            .unwrap();

        assert_eq!(result.delivered, 2);
        let to_buyer = fixture.notifier.sent_to(&email_of(BUYER));
        assert!(to_buyer[0].html_body.contains("500,000,000"));
        assert_eq!(fixture.notifier.sent_to(&email_of(SELLER)).len(), 1);
        assert_eq!(fixture.reload(&contract).await.status(), ContractStatus::AwaitingSign);
    }

    #[tokio::test]
    async fn refused_before_terms_are_final() {
        let fixture = Fixture::new();
        let contract = fixture.negotiating_contract().await;
        let handler = SendDraftContractHandler::new(fixture.store.clone(), fixture.mailer());

        let err = handler
            .handle(SendDraftContractCommand {
                actor: staff(),
                contract_id: *contract.id(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
        assert!(fixture.notifier.sent().is_empty());
    }
}

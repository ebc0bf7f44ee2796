//! GetContractHandler - Query handler for a single contract.

use std::sync::Arc;

use crate::domain::contract::{ContractError, ContractView};
use crate::domain::foundation::{Actor, ContractId};
use crate::ports::ContractRepository;

use super::guards::load_contract;

#[derive(Debug, Clone)]
pub struct GetContractQuery {
    pub actor: Actor,
    pub contract_id: ContractId,
}

/// Buyer, seller, assigned staff or any admin.
pub struct GetContractHandler {
    contracts: Arc<dyn ContractRepository>,
}

impl GetContractHandler {
    pub fn new(contracts: Arc<dyn ContractRepository>) -> Self {
        Self { contracts }
    }

    pub async fn handle(&self, query: GetContractQuery) -> Result<ContractView, ContractError> {
        let contract = load_contract(self.contracts.as_ref(), &query.contract_id).await?;
        contract.authorize_view(&query.actor)?;
        Ok(ContractView::from(&contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        admin, buyer, other_staff, seller, staff, stranger, Fixture,
    };
    use crate::domain::contract::OtpPolicy;
    use crate::domain::foundation::{ErrorCode, Timestamp};

    #[tokio::test]
    async fn participants_and_admin_can_view() {
        let fixture = Fixture::new();
        let contract = fixture.negotiating_contract().await;
        let handler = GetContractHandler::new(fixture.store.clone());

        for actor in [buyer(), seller(), staff(), admin()] {
            let view = handler
                .handle(GetContractQuery {
                    actor,
                    contract_id: *contract.id(),
                })
                .await
                .unwrap();
            assert_eq!(view.id, *contract.id());
        }
    }

    #[tokio::test]
    async fn outsiders_are_forbidden() {
        let fixture = Fixture::new();
        let contract = fixture.negotiating_contract().await;
        let handler = GetContractHandler::new(fixture.store.clone());

        for actor in [stranger(), other_staff()] {
            let err = handler
                .handle(GetContractQuery {
                    actor,
                    contract_id: *contract.id(),
                })
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::Forbidden);
        }
    }

    #[tokio::test]
    async fn view_never_contains_codes() {
        let fixture = Fixture::new();
        let mut contract = fixture.awaiting_sign_contract().await;
        let codes = contract.issue_otps(&OtpPolicy::default(), Timestamp::now()).unwrap();
        fixture.persist(&contract).await;
        let handler = GetContractHandler::new(fixture.store.clone());

        let view = handler
            .handle(GetContractQuery {
                actor: admin(),
                contract_id: *contract.id(),
            })
            .await
            .unwrap();
        let json = serde_json::to_string(&view).unwrap();

        assert!(view.buyer.otp_pending);
        for (_, code) in codes {
            assert!(!json.contains(&format!("\"{}\"", code.expose())));
        }
    }

    #[tokio::test]
    async fn unknown_contract_is_not_found() {
        let fixture = Fixture::new();
        let handler = GetContractHandler::new(fixture.store.clone());

        let err = handler
            .handle(GetContractQuery {
                actor: admin(),
                contract_id: ContractId::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ContractNotFound);
    }
}

//! SendOtpHandler - issues signing codes and emails each party its own.

use std::sync::Arc;

use crate::domain::contract::{Contract, ContractError, OtpPolicy, Party};
use crate::domain::foundation::{Actor, ContractId, Timestamp};
use crate::ports::ContractRepository;

use super::guards::load_contract;
use super::notifications::{signing_code, ContractMailer};

#[derive(Debug, Clone)]
pub struct SendOtpCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
}

#[derive(Debug, Clone)]
pub struct SendOtpResult {
    pub contract: Contract,
    /// Parties that received a fresh code (those not yet signed).
    pub issued_to: Vec<Party>,
    pub expires_at: Timestamp,
}

/// Assigned staff or any admin.
///
/// The codes themselves never leave this handler except by email.
pub struct SendOtpHandler {
    contracts: Arc<dyn ContractRepository>,
    mailer: Arc<ContractMailer>,
    policy: OtpPolicy,
}

impl SendOtpHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        mailer: Arc<ContractMailer>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            contracts,
            mailer,
            policy,
        }
    }

    pub async fn handle(&self, cmd: SendOtpCommand) -> Result<SendOtpResult, ContractError> {
        // 1. Load and authorize
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        if !(cmd.actor.is_admin() || contract.is_assigned_staff(&cmd.actor)) {
            return Err(ContractError::forbidden(
                "Only the assigned staff member or an admin may send signing codes",
            ));
        }

        // 2. Issue and persist before anything is delivered
        let now = Timestamp::now();
        let issued = contract.issue_otps(&self.policy, now)?;
        self.contracts.update(&contract).await?;

        let expires_at = now.add_minutes(self.policy.ttl_minutes);
        tracing::info!(
            contract_id = %contract.id(),
            codes = issued.len(),
            "Signing codes issued"
        );

        // 3. Deliver each code to its own party
        let mut issued_to = Vec::with_capacity(issued.len());
        for (party, code) in issued {
            let (subject, body) = signing_code(&contract, &code, expires_at);
            self.mailer
                .send_to(contract.party_user(party), &subject, body)
                .await;
            issued_to.push(party);
        }

        Ok(SendOtpResult {
            contract,
            issued_to,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        admin, buyer, email_of, other_staff, staff, Fixture, BUYER, SELLER,
    };
    use crate::domain::foundation::ErrorCode;

    fn handler(fixture: &Fixture) -> SendOtpHandler {
        SendOtpHandler::new(fixture.store.clone(), fixture.mailer(), OtpPolicy::default())
    }

    fn command(actor: Actor, contract: &Contract) -> SendOtpCommand {
        SendOtpCommand {
            actor,
            contract_id: *contract.id(),
        }
    }

    fn code_in(body: &str) -> String {
        body.split("<strong>")
            .filter_map(|chunk| chunk.split("</strong>").next())
            .find(|text| text.len() == 6 && text.chars().all(|c| c.is_ascii_digit()))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn each_party_gets_a_distinct_code() {
        let fixture = Fixture::new();
        let contract = fixture.awaiting_sign_contract().await;

        let result = handler(&fixture).handle(command(staff(), &contract)).await.unwrap();

        assert_eq!(result.issued_to, vec![Party::Buyer, Party::Seller]);
        let buyer_mail = &fixture.notifier.sent_to(&email_of(BUYER))[0];
        let seller_mail = &fixture.notifier.sent_to(&email_of(SELLER))[0];
        assert_ne!(code_in(&buyer_mail.html_body), code_in(&seller_mail.html_body));

        let stored = fixture.reload(&contract).await;
        assert!(stored.signing(Party::Buyer).has_pending_code());
        assert!(stored.signing(Party::Seller).has_pending_code());
    }

    #[tokio::test]
    async fn admin_may_send_codes() {
        let fixture = Fixture::new();
        let contract = fixture.awaiting_sign_contract().await;

        assert!(handler(&fixture).handle(command(admin(), &contract)).await.is_ok());
    }

    #[tokio::test]
    async fn unassigned_staff_and_parties_are_forbidden() {
        let fixture = Fixture::new();
        let contract = fixture.awaiting_sign_contract().await;

        for actor in [other_staff(), buyer()] {
            let err = handler(&fixture).handle(command(actor, &contract)).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::Forbidden);
        }
    }

    #[tokio::test]
    async fn signed_party_gets_no_new_code() {
        let fixture = Fixture::new();
        let mut contract = fixture.awaiting_sign_contract().await;
        let policy = OtpPolicy::default();
        let codes = contract.issue_otps(&policy, Timestamp::now()).unwrap();
        let (_, buyer_code) = codes.iter().find(|(p, _)| *p == Party::Buyer).unwrap();
        contract
            .verify_otp(Party::Buyer, buyer_code.expose(), &policy, Timestamp::now())
            .unwrap();
        fixture.persist(&contract).await;

        let result = handler(&fixture).handle(command(staff(), &contract)).await.unwrap();
        assert_eq!(result.issued_to, vec![Party::Seller]);
    }

    #[tokio::test]
    async fn requires_awaiting_sign() {
        let fixture = Fixture::new();
        let contract = fixture.negotiating_contract().await;

        let err = handler(&fixture).handle(command(staff(), &contract)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    }

    #[tokio::test]
    async fn codes_are_issued_even_if_email_fails() {
        let fixture = Fixture::new();
        let contract = fixture.awaiting_sign_contract().await;
        let mailer = Arc::new(ContractMailer::new(
            Arc::new(crate::adapters::email::RecordingNotifier::failing()),
            fixture.store.clone(),
        ));
        let handler = SendOtpHandler::new(fixture.store.clone(), mailer, OtpPolicy::default());

        let result = handler.handle(command(staff(), &contract)).await.unwrap();
        assert_eq!(result.issued_to.len(), 2);
    }
}

//! VerifyOtpHandler - a party signs by submitting its code.
//!
//! Every submission is counted in storage before it is judged, and the limit
//! is checked against the count storage returns, so concurrent guesses add
//! up. A correct code writes only the submitting party's signature. The
//! contract is then reloaded and `complete_signing` decides on the fresh
//! state whether both parties have now signed; if the other party's request
//! stored the contract in between, the decision is retaken on a new reload.

use std::sync::Arc;

use crate::domain::contract::{Contract, ContractError, ContractSigned, OtpPolicy, Party};
use crate::domain::foundation::{Actor, ContractId, ErrorCode, EventEnvelope, EventId, Timestamp};
use crate::ports::{ContractRepository, EventPublisher};

use super::guards::load_contract;

#[derive(Clone)]
pub struct VerifyOtpCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
    pub code: String,
}

impl std::fmt::Debug for VerifyOtpCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyOtpCommand")
            .field("actor", &self.actor)
            .field("contract_id", &self.contract_id)
            .field("code", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct VerifyOtpResult {
    pub contract: Contract,
    pub signed_as: Party,
    /// True when this signature completed the pair.
    pub contract_signed: bool,
}

/// Reloads allowed when the signed transition loses a version race.
const SIGNED_TRANSITION_RETRIES: usize = 3;

/// Buyer or seller of the contract only.
pub struct VerifyOtpHandler {
    contracts: Arc<dyn ContractRepository>,
    publisher: Arc<dyn EventPublisher>,
    policy: OtpPolicy,
}

impl VerifyOtpHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        publisher: Arc<dyn EventPublisher>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            contracts,
            publisher,
            policy,
        }
    }

    pub async fn handle(&self, cmd: VerifyOtpCommand) -> Result<VerifyOtpResult, ContractError> {
        // 1. Load and resolve the actor's side
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        let party = contract.authorize_party(&cmd.actor)?;
        let issued = contract.signing_code(party)?.clone();

        // 2. Count the attempt in storage, then judge against that count
        let Some(attempt) = self.contracts.record_otp_attempt(&cmd.contract_id, party).await?
        else {
            return Err(self.stale_submission(&cmd.contract_id, party).await);
        };

        let now = Timestamp::now();
        if let Err(e) = contract.verify_counted_otp(party, cmd.code.trim(), attempt, &self.policy, now) {
            tracing::info!(
                contract_id = %contract.id(),
                party = %party,
                attempts = attempt,
                reason = %e.code,
                "Signing code rejected"
            );
            return Err(e.into());
        }

        // 3. Store this party's signature, guarded by the code it answered
        let stored = self
            .contracts
            .record_signature(&cmd.contract_id, party, &issued, now)
            .await?;
        if !stored {
            return Err(self.stale_submission(&cmd.contract_id, party).await);
        }

        tracing::info!(contract_id = %contract.id(), party = %party, "Party signed contract");

        // 4. Reload and decide on fresh state
        let (contract, contract_signed) = self.complete_signing(&cmd.contract_id).await?;
        if contract_signed {
            tracing::info!(contract_id = %contract.id(), "Contract signed by both parties");
            self.publish_signed(&contract, &cmd.actor).await;
        }

        Ok(VerifyOtpResult {
            contract,
            signed_as: party,
            contract_signed,
        })
    }

    /// Moves a freshly loaded contract to signed if both signatures are in.
    ///
    /// Exactly one of two racing signers wins the versioned update; the
    /// loser reloads, sees the contract already signed and reports false.
    async fn complete_signing(&self, id: &ContractId) -> Result<(Contract, bool), ContractError> {
        let mut retries = SIGNED_TRANSITION_RETRIES;
        loop {
            let mut contract = load_contract(self.contracts.as_ref(), id).await?;
            if !contract.complete_signing(Timestamp::now())? {
                return Ok((contract, false));
            }
            match self.contracts.update(&contract).await {
                Ok(()) => return Ok((contract, true)),
                Err(e) if e.code == ErrorCode::Conflict && retries > 0 => {
                    retries -= 1;
                    tracing::debug!(contract_id = %id, "Contract changed before signing completed, reloading");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Explains a guarded write that matched nothing: the contract moved on
    /// after this request loaded it.
    async fn stale_submission(&self, id: &ContractId, party: Party) -> ContractError {
        let fresh = match load_contract(self.contracts.as_ref(), id).await {
            Ok(fresh) => fresh,
            Err(e) => return e,
        };
        let refused = fresh.signing_code(party).err();
        match refused {
            Some(e) => e.into(),
            // A new code was issued; the submitted one answered the old.
            None => ContractError::InvalidOtp,
        }
    }

    /// Post-commit: subscribers mark the listing sold.
    async fn publish_signed(&self, contract: &Contract, actor: &Actor) {
        let Some(signed_at) = contract.signed_at() else {
            return;
        };
        let event = ContractSigned {
            event_id: EventId::new(),
            contract_id: *contract.id(),
            listing_id: contract.listing_id(),
            buyer_id: contract.buyer_id(),
            seller_id: contract.seller_id(),
            signed_at,
        };
        let envelope = EventEnvelope::from_event(&event).with_user_id(actor.id.to_string());
        if let Err(e) = self.publisher.publish(envelope).await {
            tracing::warn!(
                contract_id = %contract.id(),
                listing_id = %contract.listing_id(),
                error = %e,
                "Post-signing hooks failed"
            );
        }
    }
}

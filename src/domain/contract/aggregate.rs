//! Contract aggregate entity.
//!
//! A contract binds a buyer and a seller to the sale of one listing. Staff
//! mediate it from negotiation through dual one-time-code signing to
//! completion.
//!
//! # Invariants
//!
//! - `buyer_id != seller_id`, and neither changes after creation
//! - status only moves through `ContractStatus::can_transition_to`
//! - outstanding codes are cleared once used, on cancellation and on signing
//! - completed and cancelled contracts are immutable

use crate::domain::foundation::{
    Actor, ContractId, DomainError, ErrorCode, ListingId, PurchaseRequestId, StateMachine,
    Timestamp, UserId,
};

use super::{
    ContractStatus, FeeResponsibility, FeeSchedule, OtpCode, OtpPolicy, OtpRejection, Party,
    PartySigning,
};

/// Where and when buyer, seller and staff meet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub scheduled_at: Timestamp,
    pub place: String,
    pub note: Option<String>,
}

impl Appointment {
    /// # Errors
    ///
    /// - `ValidationFailed` if the place is blank
    pub fn new(
        scheduled_at: Timestamp,
        place: impl Into<String>,
        note: Option<String>,
    ) -> Result<Self, DomainError> {
        let place = place.into().trim().to_string();
        if place.is_empty() {
            return Err(DomainError::validation("place", "Appointment place is required"));
        }
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(Self {
            scheduled_at,
            place,
            note,
        })
    }
}

/// Price and fees agreed during negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTerms {
    pub agreed_price: i64,
    pub fees: FeeSchedule,
    pub responsibility: FeeResponsibility,
}

impl ContractTerms {
    /// # Errors
    ///
    /// - `ValidationFailed` if the agreed price is not positive
    pub fn new(
        agreed_price: i64,
        fees: FeeSchedule,
        responsibility: FeeResponsibility,
    ) -> Result<Self, DomainError> {
        if agreed_price <= 0 {
            return Err(DomainError::validation(
                "agreed_price",
                "Agreed price must be greater than zero",
            ));
        }
        Ok(Self {
            agreed_price,
            fees,
            responsibility,
        })
    }
}

/// Full persisted state, used to rebuild a contract from storage.
#[derive(Debug, Clone)]
pub struct ContractSnapshot {
    pub id: ContractId,
    pub purchase_request_id: Option<PurchaseRequestId>,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub staff_id: Option<UserId>,
    pub terms: Option<ContractTerms>,
    pub appointment: Option<Appointment>,
    pub buyer_signing: PartySigning,
    pub seller_signing: PartySigning,
    pub status: ContractStatus,
    pub signed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancel_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: i64,
}

/// Contract aggregate. Not `Serialize`; use `ContractView` for output.
#[derive(Debug, Clone)]
pub struct Contract {
    id: ContractId,
    purchase_request_id: Option<PurchaseRequestId>,
    listing_id: ListingId,
    buyer_id: UserId,
    seller_id: UserId,
    staff_id: Option<UserId>,
    terms: Option<ContractTerms>,
    appointment: Option<Appointment>,
    buyer_signing: PartySigning,
    seller_signing: PartySigning,
    status: ContractStatus,
    signed_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    cancelled_at: Option<Timestamp>,
    cancel_reason: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
    /// Bumped by every stored write; `update` refuses a stale copy.
    version: i64,
}

impl Contract {
    /// Opens a pending contract between a buyer and the listing's seller.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if buyer and seller are the same user
    pub fn create(
        id: ContractId,
        listing_id: ListingId,
        buyer_id: UserId,
        seller_id: UserId,
        purchase_request_id: Option<PurchaseRequestId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if buyer_id == seller_id {
            return Err(DomainError::validation(
                "buyer_id",
                "Buyer and seller must be different users",
            ));
        }

        Ok(Self {
            id,
            purchase_request_id,
            listing_id,
            buyer_id,
            seller_id,
            staff_id: None,
            terms: None,
            appointment: None,
            buyer_signing: PartySigning::default(),
            seller_signing: PartySigning::default(),
            status: ContractStatus::Pending,
            signed_at: None,
            completed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Reconstitute a contract from persistence (no validation).
    pub fn reconstitute(snapshot: ContractSnapshot) -> Self {
        Self {
            id: snapshot.id,
            purchase_request_id: snapshot.purchase_request_id,
            listing_id: snapshot.listing_id,
            buyer_id: snapshot.buyer_id,
            seller_id: snapshot.seller_id,
            staff_id: snapshot.staff_id,
            terms: snapshot.terms,
            appointment: snapshot.appointment,
            buyer_signing: snapshot.buyer_signing,
            seller_signing: snapshot.seller_signing,
            status: snapshot.status,
            signed_at: snapshot.signed_at,
            completed_at: snapshot.completed_at,
            cancelled_at: snapshot.cancelled_at,
            cancel_reason: snapshot.cancel_reason,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            version: snapshot.version,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ContractId {
        &self.id
    }

    pub fn purchase_request_id(&self) -> Option<&PurchaseRequestId> {
        self.purchase_request_id.as_ref()
    }

    pub fn listing_id(&self) -> ListingId {
        self.listing_id
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn staff_id(&self) -> Option<UserId> {
        self.staff_id
    }

    pub fn terms(&self) -> Option<&ContractTerms> {
        self.terms.as_ref()
    }

    pub fn appointment(&self) -> Option<&Appointment> {
        self.appointment.as_ref()
    }

    pub fn status(&self) -> ContractStatus {
        self.status
    }

    pub fn signing(&self, party: Party) -> &PartySigning {
        match party {
            Party::Buyer => &self.buyer_signing,
            Party::Seller => &self.seller_signing,
        }
    }

    pub fn party_user(&self, party: Party) -> UserId {
        match party {
            Party::Buyer => self.buyer_id,
            Party::Seller => self.seller_id,
        }
    }

    pub fn signed_at(&self) -> Option<Timestamp> {
        self.signed_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<Timestamp> {
        self.cancelled_at
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn both_signed(&self) -> bool {
        self.buyer_signing.is_signed() && self.seller_signing.is_signed()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns which side of the contract a user is on, if any.
    pub fn party_of(&self, user_id: UserId) -> Option<Party> {
        if user_id == self.buyer_id {
            Some(Party::Buyer)
        } else if user_id == self.seller_id {
            Some(Party::Seller)
        } else {
            None
        }
    }

    pub fn is_assigned_staff(&self, actor: &Actor) -> bool {
        actor.is_staff() && self.staff_id == Some(actor.id)
    }

    /// Buyer, seller, assigned staff and any admin may read a contract.
    pub fn can_view(&self, actor: &Actor) -> bool {
        actor.is_admin() || self.is_assigned_staff(actor) || self.party_of(actor.id).is_some()
    }

    /// # Errors
    ///
    /// - `Forbidden` unless the actor may read this contract
    pub fn authorize_view(&self, actor: &Actor) -> Result<(), DomainError> {
        if self.can_view(actor) {
            Ok(())
        } else {
            Err(forbidden("You are not a participant in this contract"))
        }
    }

    /// # Errors
    ///
    /// - `Forbidden` unless the actor is the staff member assigned here
    pub fn authorize_assigned_staff(&self, actor: &Actor) -> Result<(), DomainError> {
        if self.is_assigned_staff(actor) {
            Ok(())
        } else {
            Err(forbidden("Only the staff member assigned to this contract may do this"))
        }
    }

    /// # Errors
    ///
    /// - `Forbidden` unless the actor is the buyer or the seller
    pub fn authorize_party(&self, actor: &Actor) -> Result<Party, DomainError> {
        self.party_of(actor.id)
            .ok_or_else(|| forbidden("Only the buyer or seller may sign this contract"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Assigns (or replaces) the mediating staff member.
    ///
    /// Returns the previously assigned staff member, if any.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless pending or negotiating
    /// - `StaffAlreadyAssigned` if this staff member already holds it
    pub fn assign_staff(
        &mut self,
        staff_id: UserId,
        now: Timestamp,
    ) -> Result<Option<UserId>, DomainError> {
        self.ensure_status(
            &[ContractStatus::Pending, ContractStatus::Negotiating],
            "assign staff to",
        )?;
        if self.staff_id == Some(staff_id) {
            return Err(DomainError::new(
                ErrorCode::StaffAlreadyAssigned,
                format!("Staff {} is already assigned to this contract", staff_id),
            ));
        }

        self.transition_to(ContractStatus::Negotiating)?;
        let previous = self.staff_id.replace(staff_id);
        self.updated_at = now;
        Ok(previous)
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` unless negotiating
    pub fn record_appointment(
        &mut self,
        appointment: Appointment,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_status(&[ContractStatus::Negotiating], "record an appointment on")?;
        self.transition_to(ContractStatus::Negotiating)?;
        self.appointment = Some(appointment);
        self.updated_at = now;
        Ok(())
    }

    /// Fixes price and fees and opens signing.
    ///
    /// Finalizing again while awaiting signatures invalidates outstanding
    /// codes and any partial signature: parties must sign the new terms.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless negotiating or awaiting signatures
    pub fn finalize_terms(&mut self, terms: ContractTerms, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_status(
            &[ContractStatus::Negotiating, ContractStatus::AwaitingSign],
            "finalize terms of",
        )?;
        self.transition_to(ContractStatus::AwaitingSign)?;
        self.terms = Some(terms);
        self.buyer_signing.reset();
        self.seller_signing.reset();
        self.updated_at = now;
        Ok(())
    }

    /// Issues a fresh code to every party that has not signed yet.
    ///
    /// Codes are independent and never equal to each other. Returns the
    /// issued codes so the caller can deliver them.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless awaiting signatures
    pub fn issue_otps(
        &mut self,
        policy: &OtpPolicy,
        now: Timestamp,
    ) -> Result<Vec<(Party, OtpCode)>, DomainError> {
        self.ensure_status(&[ContractStatus::AwaitingSign], "send signing codes for")?;
        self.transition_to(ContractStatus::AwaitingSign)?;

        let expires_at = now.add_minutes(policy.ttl_minutes);
        let mut issued: Vec<(Party, OtpCode)> = Vec::with_capacity(2);

        for party in [Party::Buyer, Party::Seller] {
            if self.signing(party).is_signed() {
                continue;
            }
            let code = loop {
                let candidate = OtpCode::generate();
                if issued.iter().all(|(_, other)| other != &candidate) {
                    break candidate;
                }
            };
            self.signing_mut(party).issue(code.clone(), expires_at);
            issued.push((party, code));
        }

        self.updated_at = now;
        Ok(issued)
    }

    /// The code this party must answer.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless awaiting signatures
    /// - `AlreadySigned` if this party has already signed
    /// - `InvalidOtp` when no code is outstanding
    pub fn signing_code(&self, party: Party) -> Result<&OtpCode, DomainError> {
        self.ensure_status(&[ContractStatus::AwaitingSign], "sign")?;
        let signing = self.signing(party);
        if signing.is_signed() {
            return Err(DomainError::new(
                ErrorCode::AlreadySigned,
                format!("The {} has already signed this contract", party),
            ));
        }
        signing
            .challenge()
            .map(|challenge| challenge.code())
            .ok_or_else(|| {
                DomainError::new(ErrorCode::InvalidOtp, "No signing code is outstanding for you")
            })
    }

    /// Checks a party's submitted code, counting the attempt on this copy.
    ///
    /// Only safe for a single writer; concurrent submissions must count
    /// through storage and use `verify_counted_otp`.
    ///
    /// # Errors
    ///
    /// See `verify_counted_otp`.
    pub fn verify_otp(
        &mut self,
        party: Party,
        candidate: &str,
        policy: &OtpPolicy,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.signing_code(party)?;
        let attempt = self
            .signing_mut(party)
            .count_attempt()
            .ok_or_else(|| rejection_error(OtpRejection::NotIssued))?;
        self.verify_counted_otp(party, candidate, attempt, policy, now)
    }

    /// Checks a party's submitted code against an attempt number that
    /// storage has already counted.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless awaiting signatures
    /// - `AlreadySigned` if this party has already signed
    /// - `OtpAttemptsExceeded` past the attempt limit, even for a correct code
    /// - `OtpExpired` if the code's window has closed
    /// - `InvalidOtp` for a wrong code or when none is outstanding
    pub fn verify_counted_otp(
        &mut self,
        party: Party,
        candidate: &str,
        attempt: u32,
        policy: &OtpPolicy,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.signing_code(party)?;
        let outcome = self.signing_mut(party).judge(candidate, attempt, now, policy);
        self.updated_at = now;
        outcome.map_err(rejection_error)
    }

    /// Counts one submission for a party with an outstanding code.
    ///
    /// Storage adapters call this under their own lock; returns `None` when
    /// the party cannot sign any more.
    pub(crate) fn count_otp_attempt(&mut self, party: Party) -> Option<u32> {
        self.signing_code(party).ok()?;
        let attempt = self.signing_mut(party).count_attempt()?;
        self.version += 1;
        Some(attempt)
    }

    /// Stores a party's signature if `code` is still the one it was issued.
    pub(crate) fn record_signature(&mut self, party: Party, code: &OtpCode, now: Timestamp) -> bool {
        if self.status != ContractStatus::AwaitingSign || !self.signing_mut(party).sign_with(code, now) {
            return false;
        }
        self.updated_at = now;
        self.version += 1;
        true
    }

    /// Marks a copy as the next stored version.
    pub(crate) fn advance_version(&mut self) {
        self.version += 1;
    }

    /// Moves to signed once both parties have signed.
    ///
    /// Call on a freshly loaded contract. Returns true if the status changed.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the transition table refuses it
    pub fn complete_signing(&mut self, now: Timestamp) -> Result<bool, DomainError> {
        if self.status != ContractStatus::AwaitingSign || !self.both_signed() {
            return Ok(false);
        }
        self.transition_to(ContractStatus::Signed)?;
        self.buyer_signing.clear_code();
        self.seller_signing.clear_code();
        self.signed_at = Some(now);
        self.updated_at = now;
        Ok(true)
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` unless signed by both parties
    pub fn start_notarization(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_both_signed("notarize")?;
        self.transition_to(ContractStatus::Notarizing)?;
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// - `InvalidStateTransition` unless signed or notarizing, with both signatures
    pub fn complete(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_both_signed("complete")?;
        self.transition_to(ContractStatus::Completed)?;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// # Errors
    ///
    /// - `ValidationFailed` if the reason is blank
    /// - `InvalidStateTransition` if already completed or cancelled
    pub fn cancel(&mut self, reason: &str, now: Timestamp) -> Result<(), DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason", "A cancellation reason is required"));
        }
        self.transition_to(ContractStatus::Cancelled)?;
        self.buyer_signing.clear_code();
        self.seller_signing.clear_code();
        self.cancel_reason = Some(reason.to_string());
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn signing_mut(&mut self, party: Party) -> &mut PartySigning {
        match party {
            Party::Buyer => &mut self.buyer_signing,
            Party::Seller => &mut self.seller_signing,
        }
    }

    fn ensure_status(&self, allowed: &[ContractStatus], action: &str) -> Result<(), DomainError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(invalid_state(self.status, action))
        }
    }

    fn ensure_both_signed(&self, action: &str) -> Result<(), DomainError> {
        if self.both_signed() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot {} a contract before both parties have signed", action),
            ))
        }
    }

    fn transition_to(&mut self, target: ContractStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot move contract from {} to {}", self.status, target),
            )
        })?;
        Ok(())
    }
}

fn rejection_error(rejection: OtpRejection) -> DomainError {
    match rejection {
        OtpRejection::NotIssued => {
            DomainError::new(ErrorCode::InvalidOtp, "No signing code is outstanding for you")
        }
        OtpRejection::TooManyAttempts => DomainError::new(
            ErrorCode::OtpAttemptsExceeded,
            "Too many attempts for this signing code",
        ),
        OtpRejection::Expired => DomainError::new(ErrorCode::OtpExpired, "The signing code has expired"),
        OtpRejection::Mismatch => DomainError::new(ErrorCode::InvalidOtp, "The signing code is incorrect"),
    }
}

fn forbidden(message: &str) -> DomainError {
    DomainError::new(ErrorCode::Forbidden, message)
}

fn invalid_state(status: ContractStatus, action: &str) -> DomainError {
    DomainError::new(
        ErrorCode::InvalidStateTransition,
        format!("Cannot {} a contract in {} status", action, status),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::FeeKind;

    fn uid(n: i64) -> UserId {
        UserId::new(n).unwrap()
    }

    fn pending() -> Contract {
        Contract::create(
            ContractId::new(),
            ListingId::new(7).unwrap(),
            uid(1),
            uid(2),
            None,
            Timestamp::now(),
        )
        .unwrap()
    }

    fn terms() -> ContractTerms {
        let fees = FeeSchedule::new().with(FeeKind::BrokerageFee, 500_000).unwrap();
        let who = FeeResponsibility::new().with(FeeKind::BrokerageFee, Party::Seller);
        ContractTerms::new(425_000_000, fees, who).unwrap()
    }

    fn awaiting_sign() -> Contract {
        let mut c = pending();
        let now = Timestamp::now();
        c.assign_staff(uid(9), now).unwrap();
        c.finalize_terms(terms(), now).unwrap();
        c
    }

    fn code_for(issued: &[(Party, OtpCode)], party: Party) -> String {
        issued
            .iter()
            .find(|(p, _)| *p == party)
            .map(|(_, c)| c.expose().to_string())
            .unwrap()
    }

    #[test]
    fn create_rejects_self_dealing() {
        let err = Contract::create(
            ContractId::new(),
            ListingId::new(7).unwrap(),
            uid(1),
            uid(1),
            None,
            Timestamp::now(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn assign_staff_moves_to_negotiating() {
        let mut c = pending();
        let previous = c.assign_staff(uid(9), Timestamp::now()).unwrap();
        assert_eq!(previous, None);
        assert_eq!(c.status(), ContractStatus::Negotiating);
        assert_eq!(c.staff_id(), Some(uid(9)));
    }

    #[test]
    fn assigning_same_staff_twice_conflicts() {
        let mut c = pending();
        c.assign_staff(uid(9), Timestamp::now()).unwrap();
        let err = c.assign_staff(uid(9), Timestamp::now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::StaffAlreadyAssigned);
    }

    #[test]
    fn reassigning_replaces_staff() {
        let mut c = pending();
        c.assign_staff(uid(9), Timestamp::now()).unwrap();
        let previous = c.assign_staff(uid(10), Timestamp::now()).unwrap();
        assert_eq!(previous, Some(uid(9)));
        assert_eq!(c.staff_id(), Some(uid(10)));
    }

    #[test]
    fn appointment_requires_negotiation() {
        let mut c = pending();
        let appt = Appointment::new(Timestamp::now(), "Showroom", None).unwrap();
        let err = c.record_appointment(appt, Timestamp::now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn appointment_place_must_not_be_blank() {
        assert!(Appointment::new(Timestamp::now(), "  ", None).is_err());
    }

    #[test]
    fn terms_require_positive_price() {
        let err = ContractTerms::new(0, FeeSchedule::new(), FeeResponsibility::new()).unwrap_err();
        assert_eq!(err.detail("field"), Some("agreed_price"));
    }

    #[test]
    fn pending_contract_cannot_finalize() {
        let mut c = pending();
        assert!(c.finalize_terms(terms(), Timestamp::now()).is_err());
    }

    #[test]
    fn issued_codes_differ_between_parties() {
        let mut c = awaiting_sign();
        let issued = c.issue_otps(&OtpPolicy::default(), Timestamp::now()).unwrap();
        assert_eq!(issued.len(), 2);
        assert_ne!(code_for(&issued, Party::Buyer), code_for(&issued, Party::Seller));
        assert!(c.signing(Party::Buyer).has_pending_code());
        assert!(c.signing(Party::Seller).has_pending_code());
    }

    #[test]
    fn codes_expire_after_policy_ttl() {
        let mut c = awaiting_sign();
        let now = Timestamp::now();
        c.issue_otps(&OtpPolicy::default(), now).unwrap();
        let expires = c.signing(Party::Buyer).challenge().unwrap().expires_at();
        assert_eq!(expires.duration_since(&now).num_minutes(), 10);
    }

    #[test]
    fn signing_both_parties_then_complete_signing() {
        let mut c = awaiting_sign();
        let policy = OtpPolicy::default();
        let now = Timestamp::now();
        let issued = c.issue_otps(&policy, now).unwrap();

        c.verify_otp(Party::Buyer, &code_for(&issued, Party::Buyer), &policy, now)
            .unwrap();
        assert!(!c.complete_signing(now).unwrap());

        c.verify_otp(Party::Seller, &code_for(&issued, Party::Seller), &policy, now)
            .unwrap();
        assert!(c.complete_signing(now).unwrap());
        assert_eq!(c.status(), ContractStatus::Signed);
        assert_eq!(c.signed_at(), Some(now));
        assert!(!c.signing(Party::Buyer).has_pending_code());
    }

    #[test]
    fn reissue_only_targets_unsigned_party() {
        let mut c = awaiting_sign();
        let policy = OtpPolicy::default();
        let now = Timestamp::now();
        let issued = c.issue_otps(&policy, now).unwrap();
        c.verify_otp(Party::Buyer, &code_for(&issued, Party::Buyer), &policy, now)
            .unwrap();

        let reissued = c.issue_otps(&policy, now).unwrap();
        assert_eq!(reissued.len(), 1);
        assert_eq!(reissued[0].0, Party::Seller);
    }

    #[test]
    fn signed_party_cannot_sign_again() {
        let mut c = awaiting_sign();
        let policy = OtpPolicy::default();
        let now = Timestamp::now();
        let issued = c.issue_otps(&policy, now).unwrap();
        let buyer_code = code_for(&issued, Party::Buyer);
        c.verify_otp(Party::Buyer, &buyer_code, &policy, now).unwrap();
        let err = c.verify_otp(Party::Buyer, &buyer_code, &policy, now).unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadySigned);
    }

    #[test]
    fn counted_attempt_past_limit_locks_out() {
        let mut c = awaiting_sign();
        let policy = OtpPolicy::default();
        let now = Timestamp::now();
        let issued = c.issue_otps(&policy, now).unwrap();
        let buyer_code = code_for(&issued, Party::Buyer);

        let err = c
            .verify_counted_otp(Party::Buyer, &buyer_code, policy.max_attempts + 1, &policy, now)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OtpAttemptsExceeded);
        assert!(!c.signing(Party::Buyer).is_signed());
    }

    #[test]
    fn storage_writes_bump_version() {
        let mut c = awaiting_sign();
        let policy = OtpPolicy::default();
        let now = Timestamp::now();
        let issued = c.issue_otps(&policy, now).unwrap();
        assert_eq!(c.version(), 0);

        assert_eq!(c.count_otp_attempt(Party::Seller), Some(1));
        assert_eq!(c.version(), 1);

        let seller_code = OtpCode::from_stored(&code_for(&issued, Party::Seller)).unwrap();
        assert!(c.record_signature(Party::Seller, &seller_code, now));
        assert_eq!(c.version(), 2);
        assert!(c.signing(Party::Seller).is_signed());

        assert_eq!(c.count_otp_attempt(Party::Seller), None);
        assert!(!c.record_signature(Party::Seller, &seller_code, now));
        assert_eq!(c.version(), 2);
    }

    #[test]
    fn signing_code_explains_why_a_party_cannot_sign() {
        let c = awaiting_sign();
        let err = c.signing_code(Party::Buyer).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOtp);

        let err = pending().signing_code(Party::Buyer).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn refinalizing_clears_partial_signatures() {
        let mut c = awaiting_sign();
        let policy = OtpPolicy::default();
        let now = Timestamp::now();
        let issued = c.issue_otps(&policy, now).unwrap();
        c.verify_otp(Party::Buyer, &code_for(&issued, Party::Buyer), &policy, now)
            .unwrap();

        c.finalize_terms(terms(), now).unwrap();

        assert!(!c.signing(Party::Buyer).is_signed());
        assert!(!c.signing(Party::Seller).has_pending_code());
    }

    #[test]
    fn notarize_and_complete_require_signatures() {
        let mut c = awaiting_sign();
        assert!(c.start_notarization(Timestamp::now()).is_err());
        assert!(c.complete(Timestamp::now()).is_err());
    }

    #[test]
    fn cancel_requires_reason_and_clears_codes() {
        let mut c = awaiting_sign();
        c.issue_otps(&OtpPolicy::default(), Timestamp::now()).unwrap();
        assert!(c.cancel("   ", Timestamp::now()).is_err());

        c.cancel("Buyer withdrew", Timestamp::now()).unwrap();
        assert_eq!(c.status(), ContractStatus::Cancelled);
        assert_eq!(c.cancel_reason(), Some("Buyer withdrew"));
        assert!(!c.signing(Party::Buyer).has_pending_code());
        assert!(c.cancel("again", Timestamp::now()).is_err());
    }

    #[test]
    fn viewing_rules() {
        let mut c = pending();
        c.assign_staff(uid(9), Timestamp::now()).unwrap();
        assert!(c.can_view(&Actor::customer(uid(1))));
        assert!(c.can_view(&Actor::customer(uid(2))));
        assert!(c.can_view(&Actor::staff(uid(9))));
        assert!(c.can_view(&Actor::admin(uid(99))));
        assert!(!c.can_view(&Actor::staff(uid(10))));
        assert!(!c.can_view(&Actor::customer(uid(3))));
    }

    #[test]
    fn only_parties_can_sign() {
        let c = pending();
        assert_eq!(c.authorize_party(&Actor::customer(uid(2))).unwrap(), Party::Seller);
        assert!(c.authorize_party(&Actor::staff(uid(9))).is_err());
    }
}

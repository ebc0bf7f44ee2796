//! One-time signing codes.
//!
//! Each party receives an independent 6-digit code drawn from the OS RNG.
//! Codes are compared in constant time, never serialized, and redacted from
//! `Debug` output. A party gets a bounded number of attempts per issuance.

use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Number of digits in a signing code.
pub const OTP_LENGTH: usize = 6;

/// A 6-digit one-time code. Deliberately not `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Draws a fresh code from the operating system RNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Draws a code from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value: u32 = rng.gen_range(0..1_000_000);
        Self(format!("{:06}", value))
    }

    /// Rebuilds a code loaded from storage.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` unless the value is exactly six ASCII digits
    pub fn from_stored(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.len() != OTP_LENGTH || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "otp",
                "stored code is not six digits",
            ));
        }
        Ok(Self(value))
    }

    /// Constant-time comparison against a submitted code.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.len() != self.0.len() {
            return false;
        }
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Exposes the digits for delivery and persistence only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// Lifetime and attempt limits for signing codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub ttl_minutes: i64,
    pub max_attempts: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl_minutes: 10,
            max_attempts: 5,
        }
    }
}

/// An outstanding code and when it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    code: OtpCode,
    expires_at: Timestamp,
}

impl OtpChallenge {
    pub fn new(code: OtpCode, expires_at: Timestamp) -> Self {
        Self { code, expires_at }
    }

    pub fn code(&self) -> &OtpCode {
        &self.code
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        !now.is_before(&self.expires_at)
    }
}

/// Why a submitted code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    /// No code is outstanding for this party.
    NotIssued,
    /// The attempt limit for this issuance is spent.
    TooManyAttempts,
    Expired,
    Mismatch,
}

/// Signing state of one party.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartySigning {
    challenge: Option<OtpChallenge>,
    attempts: u32,
    signed_at: Option<Timestamp>,
}

impl PartySigning {
    pub fn reconstitute(
        challenge: Option<OtpChallenge>,
        attempts: u32,
        signed_at: Option<Timestamp>,
    ) -> Self {
        Self {
            challenge,
            attempts,
            signed_at,
        }
    }

    pub fn challenge(&self) -> Option<&OtpChallenge> {
        self.challenge.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn signed_at(&self) -> Option<Timestamp> {
        self.signed_at
    }

    pub fn is_signed(&self) -> bool {
        self.signed_at.is_some()
    }

    pub fn has_pending_code(&self) -> bool {
        self.challenge.is_some()
    }

    /// Installs a new code and resets the attempt counter.
    pub(crate) fn issue(&mut self, code: OtpCode, expires_at: Timestamp) {
        self.challenge = Some(OtpChallenge::new(code, expires_at));
        self.attempts = 0;
    }

    /// Records one submission against the local counter. Handlers count
    /// through `ContractRepository::record_otp_attempt` and call `judge`.
    pub(crate) fn submit(
        &mut self,
        candidate: &str,
        now: Timestamp,
        policy: &OtpPolicy,
    ) -> Result<(), OtpRejection> {
        let attempt = self.count_attempt().ok_or(OtpRejection::NotIssued)?;
        self.judge(candidate, attempt, now, policy)
    }

    /// Bumps the attempt counter of the outstanding code.
    ///
    /// Returns the new count, or `None` when no code is outstanding.
    pub(crate) fn count_attempt(&mut self) -> Option<u32> {
        self.challenge.as_ref()?;
        self.attempts = self.attempts.saturating_add(1);
        Some(self.attempts)
    }

    /// Decides a submission whose attempt number has already been counted.
    ///
    /// `attempt` is the counter value after this submission, so the limit
    /// holds across concurrent submissions that each counted their own.
    pub(crate) fn judge(
        &mut self,
        candidate: &str,
        attempt: u32,
        now: Timestamp,
        policy: &OtpPolicy,
    ) -> Result<(), OtpRejection> {
        let challenge = match &self.challenge {
            Some(challenge) => challenge.clone(),
            None => return Err(OtpRejection::NotIssued),
        };

        self.attempts = self.attempts.max(attempt);

        if attempt > policy.max_attempts {
            return Err(OtpRejection::TooManyAttempts);
        }
        if challenge.is_expired(now) {
            return Err(OtpRejection::Expired);
        }
        if !challenge.code().matches(candidate) {
            return Err(OtpRejection::Mismatch);
        }

        self.sign(now);
        Ok(())
    }

    /// Marks the party signed if `code` is still the outstanding one.
    pub(crate) fn sign_with(&mut self, code: &OtpCode, now: Timestamp) -> bool {
        let answered = self.challenge.as_ref().is_some_and(|c| c.code() == code);
        if !answered || self.is_signed() {
            return false;
        }
        self.sign(now);
        true
    }

    fn sign(&mut self, now: Timestamp) {
        self.signed_at = Some(now);
        self.clear_code();
    }

    /// Drops any outstanding code.
    pub(crate) fn clear_code(&mut self) {
        self.challenge = None;
        self.attempts = 0;
    }

    /// Drops the code and any signature (terms changed under the party).
    pub(crate) fn reset(&mut self) {
        self.clear_code();
        self.signed_at = None;
    }
}

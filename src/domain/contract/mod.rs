//! Contract module - staff-mediated sale contracts and the purchase
//! requests that open them.
//!
//! # Module Structure
//!
//! - `aggregate` - Contract aggregate with the signing workflow
//! - `purchase_request` - Buyer purchase requests
//! - `status` - Status state machines
//! - `fees` - Itemized fees and amount parsing
//! - `otp` - One-time signing codes
//! - `view` - Sanitized output projection
//! - `events` - Domain events
//! - `errors` - Module error type

mod aggregate;
mod errors;
mod events;
mod fees;
mod otp;
mod purchase_request;
mod status;
mod view;

pub use aggregate::{Appointment, Contract, ContractSnapshot, ContractTerms};
pub use errors::ContractError;
pub use events::{
    ContractCancelled, ContractCompleted, ContractCreated, ContractSigned, StaffAssigned,
    TermsFinalized, CONTRACT_SIGNED_EVENT,
};
pub use fees::{parse_amount, AmountInput, FeeKind, FeeResponsibility, FeeSchedule, Party};
pub use otp::{OtpChallenge, OtpCode, OtpPolicy, OtpRejection, PartySigning, OTP_LENGTH};
pub use purchase_request::{PurchaseRequest, DEFAULT_REQUEST_TTL_DAYS, MAX_MESSAGE_LENGTH};
pub use status::{ContractStatus, PurchaseRequestStatus};
pub use view::{AppointmentView, ContractView, PartySigningView};

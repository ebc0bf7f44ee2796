//! Contract handlers.
//!
//! Command and query handlers for the staff-mediated sale contract:
//!
//! ## Commands
//! - Opening a contract directly on a listing
//! - Staff assignment, appointment and terms (negotiation)
//! - Draft delivery, signing codes and signature verification
//! - Notarization, completion and cancellation
//!
//! ## Queries
//! - Get a contract (sanitized view)
//! - List the contracts an actor may see

mod assign_staff;
mod cancel_contract;
mod complete_contract;
mod create_contract;
mod finalize_terms;
mod get_contract;
pub(crate) mod guards;
mod list_contracts;
mod notifications;
mod record_appointment;
mod send_draft_contract;
mod send_otp;
mod start_notarization;
mod verify_otp;

pub use notifications::ContractMailer;
pub(crate) use notifications::{
    contract_opened, purchase_request_received, purchase_request_rejected,
};

// Commands
pub use assign_staff::{AssignStaffCommand, AssignStaffHandler, AssignStaffResult};
pub use cancel_contract::{CancelContractCommand, CancelContractHandler};
pub use complete_contract::{CompleteContractCommand, CompleteContractHandler};
pub use create_contract::{CreateContractCommand, CreateContractHandler, CreateContractResult};
pub use finalize_terms::{FinalizeTermsCommand, FinalizeTermsHandler};
pub use record_appointment::{RecordAppointmentCommand, RecordAppointmentHandler};
pub use send_draft_contract::{
    SendDraftContractCommand, SendDraftContractHandler, SendDraftContractResult,
};
pub use send_otp::{SendOtpCommand, SendOtpHandler, SendOtpResult};
pub use start_notarization::{StartNotarizationCommand, StartNotarizationHandler};
pub use verify_otp::{VerifyOtpCommand, VerifyOtpHandler, VerifyOtpResult};

// Queries
pub use get_contract::{GetContractHandler, GetContractQuery};
pub use list_contracts::{ListContractsHandler, ListContractsQuery};

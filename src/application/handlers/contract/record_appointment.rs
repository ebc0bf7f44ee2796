//! RecordAppointmentHandler - Command handler for scheduling the meeting.

use std::sync::Arc;

use crate::domain::contract::{Appointment, Contract, ContractError};
use crate::domain::foundation::{Actor, ContractId, Timestamp};
use crate::ports::ContractRepository;

use super::guards::load_contract;

#[derive(Debug, Clone)]
pub struct RecordAppointmentCommand {
    pub actor: Actor,
    pub contract_id: ContractId,
    pub scheduled_at: Timestamp,
    pub place: String,
    pub note: Option<String>,
}

/// Assigned staff only. Re-recording replaces the previous appointment.
pub struct RecordAppointmentHandler {
    contracts: Arc<dyn ContractRepository>,
}

impl RecordAppointmentHandler {
    pub fn new(contracts: Arc<dyn ContractRepository>) -> Self {
        Self { contracts }
    }

    pub async fn handle(&self, cmd: RecordAppointmentCommand) -> Result<Contract, ContractError> {
        let mut contract = load_contract(self.contracts.as_ref(), &cmd.contract_id).await?;
        contract.authorize_assigned_staff(&cmd.actor)?;

        let appointment = Appointment::new(cmd.scheduled_at, cmd.place, cmd.note)?;
        contract.record_appointment(appointment, Timestamp::now())?;
        self.contracts.update(&contract).await?;

        tracing::info!(contract_id = %contract.id(), scheduled_at = %cmd.scheduled_at, "Appointment recorded");
        Ok(contract)
    }
}

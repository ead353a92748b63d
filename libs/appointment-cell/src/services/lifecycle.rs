use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentParty, AppointmentStatus, UpdateAppointmentRequest,
};

/// Owns the appointment state machine and the per-party permission rules.
/// Pure logic, no I/O; the booking service consults it before every mutation.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed. `rejected` and
    /// `completed` are terminal; an appointment never returns to `pending`.
    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        new: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition {} -> {}", current, new);

        if !self.valid_transitions(current).contains(&new) {
            warn!("Invalid status transition attempted: {} -> {}", current, new);
            return Err(AppointmentError::InvalidTransition { from: current, to: new });
        }

        Ok(())
    }

    /// All valid next statuses for a given current status. `approved ->
    /// rejected` stays open so a mistaken approval can be corrected.
    pub fn valid_transitions(&self, current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Approved,
                AppointmentStatus::Rejected,
            ],
            AppointmentStatus::Approved => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Rejected,
            ],
            // Terminal states
            AppointmentStatus::Rejected => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    /// Resolve the caller's relationship to an appointment. Exactly the
    /// appointment's patient, its assigned doctor, and admins are parties;
    /// everyone else is rejected. `appointment.doctor_id` is a profile id,
    /// not an auth id, so the doctor party is matched against the profile's
    /// `user_id` link, which the caller supplies.
    pub fn resolve_party(
        &self,
        appointment: &Appointment,
        user: &User,
        doctor_user_id: Option<Uuid>,
    ) -> Result<AppointmentParty, AppointmentError> {
        if user.is_admin() {
            return Ok(AppointmentParty::Admin);
        }

        let caller_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppointmentError::Validation("Invalid caller id".to_string()))?;

        if appointment.patient_id == caller_id {
            return Ok(AppointmentParty::Patient);
        }
        if doctor_user_id == Some(caller_id) {
            return Ok(AppointmentParty::Doctor);
        }

        warn!(
            "User {} is neither patient nor doctor on appointment {}",
            user.id, appointment.id
        );
        Err(AppointmentError::Forbidden)
    }

    /// Field-level permissions for an update: doctors and admins may change
    /// status and doctor-authored fields; the patient may only touch notes.
    pub fn authorize_update(
        &self,
        party: AppointmentParty,
        request: &UpdateAppointmentRequest,
    ) -> Result<(), AppointmentError> {
        match party {
            AppointmentParty::Doctor | AppointmentParty::Admin => Ok(()),
            AppointmentParty::Patient => {
                if request.status.is_some() || request.prescription.is_some() {
                    warn!("Patient attempted to update status or prescription");
                    return Err(AppointmentError::Forbidden);
                }
                Ok(())
            }
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

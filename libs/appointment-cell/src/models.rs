use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::Slot;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booking of one (doctor, date, slot) tuple by one patient. Never
/// hard-deleted; it persists indefinitely as an audit record. Patient and
/// doctor references are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// Calendar date only; the time of day lives in `slot`.
    pub date: NaiveDate,
    pub slot: Slot,
    pub status: AppointmentStatus,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this appointment currently occupies its slot for
    /// future-booking purposes.
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    /// Live statuses occupy their (doctor, date, slot) key; a rejected
    /// appointment frees its slot, a completed one stays excluded for its
    /// (past) day.
    pub fn is_live(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Rejected | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Metadata for a file attached to an appointment. The blob itself lives in
/// the external upload collaborator; documents are append-only and never
/// mutated or removed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub filename: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot: Slot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

/// Metadata handed over by the external upload collaborator once the blob is
/// stored. Both fields are required; the engine records them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendDocumentRequest {
    pub url: Option<String>,
    pub filename: Option<String>,
}

// ==============================================================================
// AUTHORIZATION MODEL
// ==============================================================================

/// The caller's relationship to a specific appointment, resolved by the
/// lifecycle service. Anyone who is none of these gets `Forbidden`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentParty {
    Patient,
    Doctor,
    Admin,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Caller is not a party to this appointment")]
    Forbidden,

    #[error("Doctor not found or not approved")]
    DoctorNotEligible,

    #[error("This time slot is already booked")]
    SlotConflict,

    #[error("Slot {0} is not offered by this doctor")]
    InvalidSlot(Slot),

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment was modified concurrently")]
    ConcurrentUpdate,

    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

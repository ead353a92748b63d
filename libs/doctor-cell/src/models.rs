use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub specialty: String,
    pub experience: Option<String>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub consultation_fee: f64,
    pub is_approved: bool,
    /// Explicit per-doctor bookable windows. `None` means the doctor uses the
    /// standard daily grid.
    pub available_time_slots: Option<Vec<TimeWindow>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A start/end pair of bookable start-of-slot times within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

// ==============================================================================
// SLOT MODEL
// ==============================================================================

/// A canonical time-of-day value from the daily grid, carried as an `HH:MM`
/// string. Slots are values, not stored entities; ordering is whatever order
/// the grid emits them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub String);

impl Slot {
    pub fn from_time(time: NaiveTime) -> Self {
        Slot(time.format("%H:%M").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Slot {
    fn from(value: &str) -> Self {
        Slot(value.to_string())
    }
}

// ==============================================================================
// QUERY / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorFilterQuery {
    pub specialty: Option<String>,
    pub min_fee: Option<f64>,
    pub max_fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaySlotsQuery {
    pub date: chrono::NaiveDate,
}

/// Month is ONE-based (1 = January .. 12 = December), applied uniformly
/// across every availability endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthAvailabilityQuery {
    pub year: i32,
    pub month: u32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Database error: {0}")]
    Database(String),
}

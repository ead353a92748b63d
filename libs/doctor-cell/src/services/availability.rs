use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DoctorError, Slot};
use crate::services::doctor::DoctorService;
use crate::services::slot_grid::SlotGrid;

/// Availability is always computed against UTC calendar days: an appointment
/// belongs to the day its date-only column names, nothing else. A "live"
/// appointment (pending or approved) occupies its slot and rejected frees it.
/// In the day view a completed appointment also stays excluded, so same-day
/// corrections cannot produce a double entry on the slot.
pub struct AvailabilityService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
}

/// Minimal projection of an appointment row used for slot arithmetic.
#[derive(Debug, Deserialize)]
struct BookedSlot {
    date: NaiveDate,
    slot: Slot,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
        }
    }

    /// Free slots for one doctor on one day, in grid order. An empty result
    /// is a fully booked day, not an error.
    pub async fn slots_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Slot>, DoctorError> {
        debug!("Calculating free slots for doctor {} on {}", doctor_id, date);

        let doctor = self.doctor_service.get_doctor(doctor_id, Some(auth_token)).await?;
        let grid = SlotGrid::daily_slots(&doctor);

        // Everything but rejected occupies its slot here
        let booked = self
            .appointments_in_range(doctor_id, date, date, "status=neq.rejected", auth_token)
            .await?;

        let available: Vec<Slot> = grid
            .into_iter()
            .filter(|slot| !booked.iter().any(|b| b.slot == *slot))
            .collect();

        debug!("{} free slots remain for doctor {} on {}", available.len(), doctor_id, date);
        Ok(available)
    }

    /// Remaining-slot counts for every day of a month, past days included so
    /// callers can render historical load. `month` is one-based (1-12).
    pub async fn availability_for_month(
        &self,
        doctor_id: Uuid,
        year: i32,
        month: u32,
        auth_token: &str,
    ) -> Result<BTreeMap<NaiveDate, i64>, DoctorError> {
        if !(1..=12).contains(&month) {
            return Err(DoctorError::InvalidMonth(month));
        }

        debug!("Calculating month availability for doctor {} in {}-{:02}", doctor_id, year, month);

        let doctor = self.doctor_service.get_doctor(doctor_id, Some(auth_token)).await?;
        let slots_per_day = SlotGrid::daily_slots(&doctor).len() as i64;

        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| DoctorError::InvalidDate(format!("{}-{:02}", year, month)))?;
        let last_day = Self::last_day_of_month(first_day);

        let booked = self
            .appointments_in_range(
                doctor_id,
                first_day,
                last_day,
                "status=in.(pending,approved)",
                auth_token,
            )
            .await?;

        let mut bookings_by_date: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for entry in &booked {
            *bookings_by_date.entry(entry.date).or_insert(0) += 1;
        }

        let availability = first_day
            .iter_days()
            .take_while(|day| day.month() == month)
            .map(|day| {
                let used = bookings_by_date.get(&day).copied().unwrap_or(0);
                (day, slots_per_day - used)
            })
            .collect();

        Ok(availability)
    }

    async fn appointments_in_range(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        status_filter: &str,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, DoctorError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=gte.{}&date=lte.{}&{}&select=date,slot",
            doctor_id, from, to, status_filter
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        let booked: Vec<BookedSlot> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedSlot>, _>>()
            .map_err(|e| DoctorError::Database(format!("Failed to parse appointments: {}", e)))?;

        Ok(booked)
    }

    fn last_day_of_month(first_day: NaiveDate) -> NaiveDate {
        let (next_year, next_month) = if first_day.month() == 12 {
            (first_day.year() + 1, 1)
        } else {
            (first_day.year(), first_day.month() + 1)
        };
        // First of the following month always exists
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .expect("valid first of month")
            .pred_opt()
            .expect("valid last of month")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_day_of_month_handles_year_rollover() {
        let dec = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(
            AvailabilityService::last_day_of_month(dec),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn last_day_of_month_handles_leap_february() {
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(
            AvailabilityService::last_day_of_month(feb),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }
}

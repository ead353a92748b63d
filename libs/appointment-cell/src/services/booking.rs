use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::{DoctorService, SlotGrid};
use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};
use shared_models::auth::User;

use crate::models::{
    AppendDocumentRequest, Appointment, AppointmentError, AppointmentParty, AppointmentStatus,
    CreateAppointmentRequest, Document, UpdateAppointmentRequest,
};
use crate::services::AppointmentLifecycleService;

/// Books, reads and mutates appointments against the record store.
///
/// Slot exclusivity is enforced twice: a pre-insert read gives a friendly
/// error in the common case, and the partial unique index on
/// (doctor_id, date, slot) over live rows settles races at write time.
pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Book a slot for the calling patient. Checks run in a fixed order so
    /// clients get the most specific error: doctor eligibility, slot
    /// membership in the doctor's grid, then slot exclusivity.
    pub async fn create_appointment(
        &self,
        user: &User,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let patient_id = parse_user_id(user)?;
        info!(
            "Creating appointment: patient={} doctor={} {} {}",
            patient_id, request.doctor_id, request.date, request.slot
        );

        // A missing doctor is a domain error; a storage fault is not
        let doctor = self
            .doctor_service
            .get_doctor(request.doctor_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => AppointmentError::DoctorNotEligible,
                other => AppointmentError::Database(other.to_string()),
            })?;

        if !doctor.is_approved {
            warn!("Booking attempt against unapproved doctor {}", doctor.id);
            return Err(AppointmentError::DoctorNotEligible);
        }

        if !SlotGrid::contains(&doctor, &request.slot) {
            return Err(AppointmentError::InvalidSlot(request.slot));
        }

        if self
            .slot_is_taken(request.doctor_id, &request, auth_token)
            .await?
        {
            return Err(AppointmentError::SlotConflict);
        }

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "date": request.date,
            "slot": request.slot,
            "status": "pending",
            "documents": [],
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let created: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| match e {
                // Lost the race: another live booking holds this key.
                SupabaseError::UniqueViolation(_) => AppointmentError::SlotConflict,
                other => AppointmentError::Database(other.to_string()),
            })?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Insert returned no row".to_string()))
    }

    /// Fetch an appointment and the caller's relationship to it. Callers who
    /// are not a party get `Forbidden` without seeing the record.
    pub async fn get_authorized(
        &self,
        appointment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<(Appointment, AppointmentParty), AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        // Doctor callers are matched through their profile's user link
        let doctor_user_id = if user.is_doctor() {
            self.doctor_user_link(appointment.doctor_id, auth_token).await?
        } else {
            None
        };

        let party = self
            .lifecycle
            .resolve_party(&appointment, user, doctor_user_id)?;
        Ok((appointment, party))
    }

    /// List the caller's appointments: a patient sees their bookings, a
    /// doctor their schedule, an admin everything. Soonest first.
    pub async fn list_for_user(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = if user.is_admin() {
            "/rest/v1/appointments?order=date.asc,slot.asc".to_string()
        } else if user.is_doctor() {
            // The appointments table references profile ids, so resolve the
            // caller's profile first; no profile means no schedule
            let caller_id = parse_user_id(user)?;
            match self
                .doctor_service
                .get_doctor_by_user(caller_id, Some(auth_token))
                .await
            {
                Ok(doctor) => format!(
                    "/rest/v1/appointments?doctor_id=eq.{}&order=date.asc,slot.asc",
                    doctor.id
                ),
                Err(DoctorError::NotFound) => return Ok(vec![]),
                Err(other) => return Err(AppointmentError::Database(other.to_string())),
            }
        } else {
            let caller_id = parse_user_id(user)?;
            format!(
                "/rest/v1/appointments?patient_id=eq.{}&order=date.asc,slot.asc",
                caller_id
            )
        };

        debug!("Listing appointments for user {}", user.id);

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    /// Apply a partial update. The lifecycle service decides which fields the
    /// caller may touch and whether a requested status change is legal.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        user: &User,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let (appointment, party) = self
            .get_authorized(appointment_id, user, auth_token)
            .await?;

        self.lifecycle.authorize_update(party, &request)?;

        let mut patch = serde_json::Map::new();
        let mut status_guard = None;
        if let Some(status) = request.status {
            self.lifecycle
                .validate_status_transition(appointment.status, status)?;
            patch.insert("status".to_string(), json!(status));
            // Filter the write on the status we validated against so two
            // racing transitions cannot both land
            status_guard = Some(appointment.status);
        }
        if let Some(prescription) = request.prescription {
            patch.insert("prescription".to_string(), json!(prescription));
        }
        if let Some(notes) = request.notes {
            patch.insert("notes".to_string(), json!(notes));
        }

        if patch.is_empty() {
            return Err(AppointmentError::Validation(
                "No updatable fields provided".to_string(),
            ));
        }
        patch.insert("updated_at".to_string(), json!(Utc::now()));

        info!("Updating appointment {} as {:?}", appointment_id, party);
        self.patch_appointment(appointment_id, status_guard, Value::Object(patch), auth_token)
            .await
    }

    /// Append upload metadata to an appointment's document list. Documents
    /// are append-only; existing entries are never rewritten.
    pub async fn append_document(
        &self,
        appointment_id: Uuid,
        user: &User,
        request: AppendDocumentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let (url, filename) = match (request.url, request.filename) {
            (Some(url), Some(filename)) => (url, filename),
            _ => return Err(AppointmentError::NoFileUploaded),
        };

        let (appointment, _party) = self
            .get_authorized(appointment_id, user, auth_token)
            .await?;

        let mut documents = appointment.documents;
        documents.push(Document {
            url,
            filename,
            uploaded_by: parse_user_id(user)?,
            uploaded_at: Utc::now(),
        });

        info!(
            "Appending document to appointment {} ({} total)",
            appointment_id,
            documents.len()
        );

        let patch = json!({
            "documents": documents,
            "updated_at": Utc::now(),
        });
        self.patch_appointment(appointment_id, None, patch, auth_token)
            .await
    }

    async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// PATCH the row, optionally guarded on its current status. A guarded
    /// write that matches zero rows means the status moved under us.
    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        status_guard: Option<AppointmentStatus>,
        patch: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        if let Some(current) = status_guard {
            path.push_str(&format!("&status=eq.{}", current));
        }

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let updated: Vec<Appointment> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(patch), Some(headers))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        updated.into_iter().next().ok_or(match status_guard {
            Some(_) => AppointmentError::ConcurrentUpdate,
            None => AppointmentError::NotFound,
        })
    }

    /// The auth identity behind a doctor profile. A vanished profile
    /// resolves no one rather than failing the read.
    async fn doctor_user_link(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Uuid>, AppointmentError> {
        match self.doctor_service.get_doctor(doctor_id, Some(auth_token)).await {
            Ok(doctor) => Ok(Some(doctor.user_id)),
            Err(DoctorError::NotFound) => Ok(None),
            Err(other) => Err(AppointmentError::Database(other.to_string())),
        }
    }

    /// Friendly-path conflict check: is there a live booking on this
    /// (doctor, date, slot) key already?
    async fn slot_is_taken(
        &self,
        doctor_id: Uuid,
        request: &CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&slot=eq.{}&status=in.(pending,approved)&select=id",
            doctor_id, request.date, request.slot
        );

        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(!existing.is_empty())
    }
}

fn parse_user_id(user: &User) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppointmentError::Validation("Invalid caller id".to_string()))
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppendDocumentRequest, AppointmentError, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::AppointmentBookingService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::Forbidden => {
            AppError::Forbidden("Not a party to this appointment".to_string())
        }
        AppointmentError::DoctorNotEligible => {
            AppError::Unprocessable("Doctor not found or not approved".to_string())
        }
        AppointmentError::SlotConflict => {
            AppError::Conflict("This time slot is already booked".to_string())
        }
        e @ AppointmentError::InvalidSlot(_) => AppError::BadRequest(e.to_string()),
        e @ AppointmentError::InvalidTransition { .. } => AppError::BadRequest(e.to_string()),
        e @ AppointmentError::ConcurrentUpdate => AppError::Conflict(e.to_string()),
        AppointmentError::NoFileUploaded => AppError::BadRequest("No file uploaded".to_string()),
        AppointmentError::Validation(msg) => AppError::BadRequest(msg),
        AppointmentError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .create_appointment(&user, request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .list_for_user(&user, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let (appointment, _party) = booking_service
        .get_authorized(appointment_id, &user, auth.token())
        .await
        .map_err(map_appointment_error)?;

    // Expand the doctor reference for detail views; a vanished profile
    // degrades to null rather than failing the read
    let doctor = DoctorService::new(&state)
        .get_doctor(appointment.doctor_id, Some(auth.token()))
        .await
        .ok();

    let mut body = json!(appointment);
    body["doctor"] = json!(doctor);
    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .update_appointment(appointment_id, &user, request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn append_document(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppendDocumentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .append_document(appointment_id, &user, request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

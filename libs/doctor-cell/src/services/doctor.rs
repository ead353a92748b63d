use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorError, DoctorFilterQuery};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch a single doctor by id.
    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    /// Fetch the doctor profile behind an auth identity. Profile ids and
    /// auth ids are distinct spaces; this is the only way to cross them.
    pub async fn get_doctor_by_user(
        &self,
        user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile for user: {}", user_id);

        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    /// List approved doctors; unapproved profiles are never schedulable and
    /// never listed.
    pub async fn list_approved(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing approved doctors");

        let path = "/rest/v1/doctors?is_approved=eq.true&order=name.asc";
        self.fetch_doctors(path).await
    }

    /// Filter approved doctors by specialty and/or consultation fee range.
    pub async fn filter(&self, query: DoctorFilterQuery) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Filtering doctors: {:?}", query);

        let mut query_parts = vec!["is_approved=eq.true".to_string()];

        if let Some(specialty) = &query.specialty {
            query_parts.push(format!("specialty=eq.{}", specialty));
        }
        if let Some(min_fee) = query.min_fee {
            query_parts.push(format!("consultation_fee=gte.{}", min_fee));
        }
        if let Some(max_fee) = query.max_fee {
            query_parts.push(format!("consultation_fee=lte.{}", max_fee));
        }

        let path = format!(
            "/rest/v1/doctors?{}&order=name.asc",
            query_parts.join("&")
        );
        self.fetch_doctors(&path).await
    }

    async fn fetch_doctors(&self, path: &str) -> Result<Vec<Doctor>, DoctorError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        let doctors: Vec<Doctor> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }
}

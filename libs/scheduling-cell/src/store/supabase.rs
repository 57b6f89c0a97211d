// libs/scheduling-cell/src/store/supabase.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentStatus, Professional, SchedulingError, Service,
};
use crate::store::{AppointmentStore, ProfessionalDirectory, ServiceCatalog};

/// Production store: services, professionals and appointments live in
/// Supabase tables, queried through the PostgREST interface.
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn persistence_error(err: anyhow::Error) -> SchedulingError {
        SchedulingError::PersistenceFailure(err.to_string())
    }

    fn parse_rows<T: serde::de::DeserializeOwned>(
        rows: Vec<Value>,
    ) -> Result<Vec<T>, SchedulingError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| {
                SchedulingError::PersistenceFailure(format!("failed to parse rows: {}", e))
            })
    }
}

#[async_trait]
impl ServiceCatalog for SupabaseStore {
    async fn find_service(
        &self,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<Service, SchedulingError> {
        debug!("Fetching service {}", service_id);

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(Self::persistence_error)?;

        let mut services: Vec<Service> = Self::parse_rows(rows)?;
        services
            .pop()
            .ok_or(SchedulingError::ServiceNotFound(service_id))
    }
}

#[async_trait]
impl ProfessionalDirectory for SupabaseStore {
    async fn find_professional(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<Professional, SchedulingError> {
        debug!("Fetching professional {}", professional_id);

        let path = format!("/rest/v1/professionals?id=eq.{}", professional_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(Self::persistence_error)?;

        let mut professionals: Vec<Professional> = Self::parse_rows(rows)?;
        professionals.pop().ok_or(SchedulingError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseStore {
    async fn list_for_professional_between(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let query_parts = vec![
            format!("professional_id=eq.{}", professional_id),
            format!("starts_at=gte.{}", urlencoding::encode(&from.to_rfc3339())),
            format!("starts_at=lt.{}", urlencoding::encode(&to.to_rfc3339())),
            "status=neq.cancelled".to_string(),
        ];

        let path = format!(
            "/rest/v1/appointments?{}&order=starts_at.asc",
            query_parts.join("&")
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(Self::persistence_error)?;

        Self::parse_rows(rows)
    }

    async fn list_for_client(
        &self,
        client_id: Uuid,
        status: Option<AppointmentStatus>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut query_parts = vec![format!("client_id=eq.{}", client_id)];

        if let Some(status) = status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = from {
            query_parts.push(format!(
                "starts_at=gte.{}",
                urlencoding::encode(&from.to_rfc3339())
            ));
        }
        if let Some(to) = to {
            query_parts.push(format!(
                "starts_at=lte.{}",
                urlencoding::encode(&to.to_rfc3339())
            ));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=starts_at.asc",
            query_parts.join("&")
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(Self::persistence_error)?;

        Self::parse_rows(rows)
    }

    async fn create_many(
        &self,
        appointments: Vec<Appointment>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Creating batch of {} appointments", appointments.len());

        // A single array POST is one insert statement, so the whole chain
        // commits or rolls back together.
        let body = serde_json::to_value(&appointments).map_err(|e| {
            SchedulingError::PersistenceFailure(format!("failed to serialize batch: {}", e))
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(Self::persistence_error)?;

        let created: Vec<Appointment> = Self::parse_rows(rows)?;
        if created.len() != appointments.len() {
            return Err(SchedulingError::PersistenceFailure(format!(
                "batch insert returned {} of {} rows",
                created.len(),
                appointments.len()
            )));
        }

        Ok(created)
    }

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(Self::persistence_error)?;

        let mut appointments: Vec<Appointment> = Self::parse_rows(rows)?;
        appointments.pop().ok_or(SchedulingError::NotFound)
    }

    async fn update(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        // Conditional write: the status filter makes the PATCH a
        // compare-and-swap, so a row that already reached a terminal status
        // is left untouched even when two transitions race.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment.id,
            AppointmentStatus::Scheduled
        );

        let body = serde_json::json!({
            "status": appointment.status.to_string(),
            "notes": appointment.notes,
            "cancellation_fee": appointment.cancellation_fee,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(Self::persistence_error)?;

        let mut updated: Vec<Appointment> = Self::parse_rows(rows)?;
        match updated.pop() {
            Some(row) => Ok(row),
            // Zero matched rows: re-read to tell a lost race from a missing
            // row.
            None => {
                let current = self.find_by_id(appointment.id, auth_token).await?;
                Err(match current.status {
                    AppointmentStatus::Cancelled => SchedulingError::AlreadyCancelled,
                    AppointmentStatus::Completed => SchedulingError::Immutable,
                    AppointmentStatus::Scheduled => SchedulingError::PersistenceFailure(
                        "conditional update matched no rows".to_string(),
                    ),
                })
            }
        }
    }
}

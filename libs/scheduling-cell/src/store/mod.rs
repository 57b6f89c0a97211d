// libs/scheduling-cell/src/store/mod.rs
//
// Collaborator seams consumed by the scheduling engine. The engine only sees
// these traits; production wires them to Supabase, tests to an in-memory store.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, Professional, SchedulingError, Service,
};

pub use memory::InMemoryStore;
pub use supabase::SupabaseStore;

/// Resolves service identifiers to immutable catalog records.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn find_service(
        &self,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<Service, SchedulingError>;
}

/// Read-only directory of the business's professionals.
#[async_trait]
pub trait ProfessionalDirectory: Send + Sync {
    async fn find_professional(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<Professional, SchedulingError>;
}

/// Durable appointment storage. `create_many` is an atomic batch: either every
/// appointment of a chained booking commits or none does.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Non-cancelled appointments of a professional with `starts_at` in
    /// `[from, to)`, ordered chronologically.
    async fn list_for_professional_between(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn list_for_client(
        &self,
        client_id: Uuid,
        status: Option<AppointmentStatus>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn create_many(
        &self,
        appointments: Vec<Appointment>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError>;

    /// Persist a status transition. Only a `Scheduled` row may be
    /// overwritten: a row that already reached a terminal status is left
    /// unchanged and reported as `AlreadyCancelled` or `Immutable`, so two
    /// racing transitions cannot both commit.
    async fn update(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError>;
}

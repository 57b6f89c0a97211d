// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// One committed unit of service delivery for a single professional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// When the booking itself was made.
    pub booked_at: DateTime<Utc>,
    /// When the client is attended.
    pub starts_at: DateTime<Utc>,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub total_value: Decimal,
    pub cancellation_fee: Decimal,
}

impl Appointment {
    /// Build a freshly scheduled appointment. Only the scheduling engine
    /// constructs appointments; everyone else goes through the store.
    pub fn scheduled(
        starts_at: DateTime<Utc>,
        client_id: Uuid,
        professional_id: Uuid,
        service_id: Uuid,
        notes: Option<String>,
        total_value: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booked_at: Utc::now(),
            starts_at,
            client_id,
            professional_id,
            service_id,
            status: AppointmentStatus::Scheduled,
            notes,
            total_value,
            cancellation_fee: Decimal::ZERO,
        }
    }

    /// The window this appointment occupies given its service duration.
    pub fn occupied_window(&self, duration_minutes: i32) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.starts_at,
            self.starts_at + Duration::minutes(duration_minutes as i64),
        )
    }

    /// Guarded transition to `Cancelled`. Terminal states stay terminal.
    pub fn cancel(&mut self, fee: Decimal) -> Result<(), SchedulingError> {
        match self.status {
            AppointmentStatus::Cancelled => Err(SchedulingError::AlreadyCancelled),
            AppointmentStatus::Completed => Err(SchedulingError::Immutable),
            AppointmentStatus::Scheduled => {
                self.status = AppointmentStatus::Cancelled;
                self.cancellation_fee = fee;
                Ok(())
            }
        }
    }

    /// Guarded transition to `Completed`.
    pub fn complete(&mut self) -> Result<(), SchedulingError> {
        match self.status {
            AppointmentStatus::Cancelled => Err(SchedulingError::AlreadyCancelled),
            AppointmentStatus::Completed => Err(SchedulingError::Immutable),
            AppointmentStatus::Scheduled => {
                self.status = AppointmentStatus::Completed;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Cancelled appointments never count towards occupancy.
    pub fn occupies_schedule(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A catalog service. Duration and price are immutable facts of the record
/// itself, not a side table keyed by display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: Uuid,
    pub name: String,
    pub specialty: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub starts_at: DateTime<Utc>,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    /// Ordered, non-empty. One appointment is created per entry.
    pub service_ids: Vec<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointments: Vec<Appointment>,
    pub total_duration_minutes: i64,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub client_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub appointment: Appointment,
    pub cancellation_fee: Decimal,
    pub free_cancellation: bool,
}

/// One bookable unit of the business day. Computed, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    /// Human-readable "HH:MM" time-of-day label.
    pub label: String,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Appointment enriched with the service and professional details a client
/// listing needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientAppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub service: ServiceDetails,
    pub professional: ProfessionalDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub name: String,
    pub price: Decimal,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalDetails {
    pub name: String,
    pub specialty: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    #[error("Cannot book an appointment in the past")]
    PastDateRejected,

    #[error("Requested time is outside business hours")]
    OutsideBusinessHours,

    #[error("Service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Requested slot is not available for this professional")]
    SlotUnavailable,

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Not found")]
    NotFound,

    #[error("Appointment does not belong to the requesting client")]
    Forbidden,

    #[error("Appointment has already been cancelled")]
    AlreadyCancelled,

    #[error("Appointment has reached a terminal status and cannot change")]
    Immutable,
}

// libs/scheduling-cell/src/services/engine.rs
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, BookingConfirmation, BookingRequest,
    CancellationOutcome, ClientAppointmentView, ClientAppointmentsQuery,
    ProfessionalDetails, SchedulingError, ServiceDetails, Slot,
};
use crate::services::calendar::BusinessCalendar;
use crate::services::cancellation::CancellationPolicy;
use crate::services::conflict::{has_conflict, TimeWindow};
use crate::services::schedule::compute_windows;
use crate::store::{AppointmentStore, ProfessionalDirectory, ServiceCatalog};

const DEFAULT_PERSISTENCE_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Orchestrates booking, cancellation and availability on top of the
/// collaborator seams. Shared process-wide so the per-professional critical
/// section actually serializes concurrent requests.
pub struct SchedulingEngine {
    catalog: Arc<dyn ServiceCatalog>,
    directory: Arc<dyn ProfessionalDirectory>,
    appointments: Arc<dyn AppointmentStore>,
    calendar: BusinessCalendar,
    policy: CancellationPolicy,
    professional_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    persistence_timeout: StdDuration,
}

impl SchedulingEngine {
    pub fn new(
        catalog: Arc<dyn ServiceCatalog>,
        directory: Arc<dyn ProfessionalDirectory>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            catalog,
            directory,
            appointments,
            calendar: BusinessCalendar::default(),
            policy: CancellationPolicy,
            professional_locks: Mutex::new(HashMap::new()),
            persistence_timeout: DEFAULT_PERSISTENCE_TIMEOUT,
        }
    }

    /// Convenience constructor for a store that implements every collaborator
    /// seam (the Supabase store and the in-memory store both do).
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ServiceCatalog + ProfessionalDirectory + AppointmentStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_persistence_timeout(mut self, timeout: StdDuration) -> Self {
        self.persistence_timeout = timeout;
        self
    }

    // ==========================================================================
    // ENGINE OPERATIONS
    // ==========================================================================

    /// Book one or more chained services with a professional. One appointment
    /// is created per service; the batch commits atomically.
    pub async fn book(
        &self,
        request: BookingRequest,
        auth_token: &str,
    ) -> Result<BookingConfirmation, SchedulingError> {
        info!(
            "Booking {} service(s) for client {} with professional {} at {}",
            request.service_ids.len(),
            request.client_id,
            request.professional_id,
            request.starts_at
        );

        self.validate_request(&request)?;

        let now = Utc::now();
        if request.starts_at <= now {
            return Err(SchedulingError::PastDateRejected);
        }

        if !self.calendar.is_within_operating_hours(request.starts_at) {
            return Err(SchedulingError::OutsideBusinessHours);
        }

        let mut services = Vec::with_capacity(request.service_ids.len());
        for service_id in &request.service_ids {
            let service = self
                .bounded(self.catalog.find_service(*service_id, auth_token))
                .await?;
            services.push(service);
        }

        let plan = compute_windows(request.starts_at, &services);
        let proposed = TimeWindow::new(
            request.starts_at,
            request.starts_at + ChronoDuration::minutes(plan.total_duration_minutes),
        );

        // Conflict check and batch insert run under the professional's lock so
        // two concurrent requests for overlapping windows cannot both pass.
        let lock = self.lock_for(request.professional_id).await;
        let _guard = lock.lock().await;

        let occupied = self
            .occupied_windows_for_day(
                request.professional_id,
                request.starts_at.date_naive(),
                auth_token,
            )
            .await?;

        if has_conflict(&occupied, &proposed) {
            warn!(
                "Slot conflict for professional {} at {}",
                request.professional_id, request.starts_at
            );
            return Err(SchedulingError::SlotUnavailable);
        }

        let mut batch = Vec::with_capacity(plan.windows.len());
        for (index, window) in plan.windows.iter().enumerate() {
            let notes = if index == 0 { request.notes.clone() } else { None };
            batch.push(Appointment::scheduled(
                window.starts_at,
                request.client_id,
                request.professional_id,
                window.service.id,
                notes,
                window.service.price,
            ));
        }

        let created = self.create_with_retry(batch, auth_token).await?;

        info!(
            "Booked {} appointment(s) for client {} ({} min, total {})",
            created.len(),
            request.client_id,
            plan.total_duration_minutes,
            plan.total_price
        );

        Ok(BookingConfirmation {
            appointments: created,
            total_duration_minutes: plan.total_duration_minutes,
            total_price: plan.total_price,
        })
    }

    /// Cancel a single appointment on behalf of its client, charging the
    /// notice-based fee.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        requesting_client_id: Uuid,
        auth_token: &str,
    ) -> Result<CancellationOutcome, SchedulingError> {
        debug!("Cancelling appointment {}", appointment_id);

        let mut appointment = self
            .bounded(self.appointments.find_by_id(appointment_id, auth_token))
            .await?;

        if appointment.client_id != requesting_client_id {
            return Err(SchedulingError::Forbidden);
        }

        match appointment.status {
            AppointmentStatus::Cancelled => return Err(SchedulingError::AlreadyCancelled),
            AppointmentStatus::Completed => return Err(SchedulingError::Immutable),
            AppointmentStatus::Scheduled => {}
        }

        let service = self
            .bounded(self.catalog.find_service(appointment.service_id, auth_token))
            .await?;

        let notice = self.policy.notice_minutes(Utc::now(), appointment.starts_at);
        let fee = self.policy.fee_for(notice, service.price);

        appointment.cancel(fee)?;

        let updated = self
            .bounded(self.appointments.update(&appointment, auth_token))
            .await?;

        info!(
            "Appointment {} cancelled with {} minutes of notice, fee {}",
            appointment_id, notice, fee
        );

        Ok(CancellationOutcome {
            appointment: updated,
            cancellation_fee: fee,
            free_cancellation: fee.is_zero(),
        })
    }

    /// Mark an appointment as attended. The completion process runs outside
    /// the engine but the transition itself goes through it.
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Completing appointment {}", appointment_id);

        let mut appointment = self
            .bounded(self.appointments.find_by_id(appointment_id, auth_token))
            .await?;

        appointment.complete()?;

        self.bounded(self.appointments.update(&appointment, auth_token))
            .await
    }

    /// Free slots of a professional's day, in chronological order.
    pub async fn list_available_slots(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Slot>, SchedulingError> {
        debug!("Listing available slots for professional {} on {}", professional_id, date);

        self.bounded(self.directory.find_professional(professional_id, auth_token))
            .await?;

        let occupied = self
            .occupied_windows_for_day(professional_id, date, auth_token)
            .await?;

        let slots = self
            .calendar
            .daily_slots(date)
            .filter(|slot| !occupied.iter().any(|window| window.contains(slot.starts_at)))
            .collect();

        Ok(slots)
    }

    /// A client's appointments, optionally filtered, enriched with service
    /// and professional details.
    pub async fn list_client_appointments(
        &self,
        client_id: Uuid,
        query: ClientAppointmentsQuery,
        auth_token: &str,
    ) -> Result<Vec<ClientAppointmentView>, SchedulingError> {
        let appointments = self
            .bounded(self.appointments.list_for_client(
                client_id,
                query.status,
                query.from_date,
                query.to_date,
                auth_token,
            ))
            .await?;

        let mut views = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            let service = self
                .bounded(self.catalog.find_service(appointment.service_id, auth_token))
                .await?;
            let professional = self
                .bounded(
                    self.directory
                        .find_professional(appointment.professional_id, auth_token),
                )
                .await?;

            views.push(ClientAppointmentView {
                appointment,
                service: ServiceDetails {
                    name: service.name,
                    price: service.price,
                    duration_minutes: service.duration_minutes,
                },
                professional: ProfessionalDetails {
                    name: professional.name,
                    specialty: professional.specialty,
                },
            });
        }

        Ok(views)
    }

    // ==========================================================================
    // PRIVATE HELPER METHODS
    // ==========================================================================

    fn validate_request(&self, request: &BookingRequest) -> Result<(), SchedulingError> {
        if request.service_ids.is_empty() {
            return Err(SchedulingError::InvalidRequest(
                "at least one service is required".to_string(),
            ));
        }
        if request.client_id.is_nil() {
            return Err(SchedulingError::InvalidRequest(
                "client identifier is required".to_string(),
            ));
        }
        if request.professional_id.is_nil() {
            return Err(SchedulingError::InvalidRequest(
                "professional identifier is required".to_string(),
            ));
        }

        Ok(())
    }

    async fn lock_for(&self, professional_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.professional_locks.lock().await;
        locks
            .entry(professional_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Occupied windows of a professional's day, each end re-derived from the
    /// service duration. The service record stays the single source of truth.
    async fn occupied_windows_for_day(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeWindow>, SchedulingError> {
        let day_start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let day_end = day_start + ChronoDuration::days(1);

        let existing = self
            .bounded(self.appointments.list_for_professional_between(
                professional_id,
                day_start,
                day_end,
                auth_token,
            ))
            .await?;

        let mut windows = Vec::with_capacity(existing.len());
        for appointment in &existing {
            let service = self
                .bounded(self.catalog.find_service(appointment.service_id, auth_token))
                .await?;
            let (start, end) = appointment.occupied_window(service.duration_minutes);
            windows.push(TimeWindow::new(start, end));
        }

        Ok(windows)
    }

    async fn create_with_retry(
        &self,
        batch: Vec<Appointment>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            match self
                .bounded(self.appointments.create_many(batch.clone(), auth_token))
                .await
            {
                Ok(created) => return Ok(created),
                Err(SchedulingError::PersistenceFailure(reason))
                    if attempt < MAX_CREATE_ATTEMPTS =>
                {
                    warn!(
                        "Batch create failed (attempt {}/{}): {}",
                        attempt, MAX_CREATE_ATTEMPTS, reason
                    );
                    tokio::time::sleep(StdDuration::from_millis(100 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(SchedulingError::PersistenceFailure(
            "batch create failed after retries".to_string(),
        ))
    }

    /// Persistence calls are the only suspension points; every one of them is
    /// bounded by the engine's timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, SchedulingError>
    where
        F: Future<Output = Result<T, SchedulingError>>,
    {
        tokio::time::timeout(self.persistence_timeout, fut)
            .await
            .map_err(|_| {
                SchedulingError::PersistenceFailure("persistence call timed out".to_string())
            })?
    }
}

// libs/scheduling-cell/src/store/memory.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, Professional, SchedulingError, Service,
};
use crate::store::{AppointmentStore, ProfessionalDirectory, ServiceCatalog};

/// In-process store used by tests and local demos. Batch creation is
/// all-or-nothing: nothing is inserted once a failure is injected.
#[derive(Default)]
pub struct InMemoryStore {
    services: RwLock<HashMap<Uuid, Service>>,
    professionals: RwLock<HashMap<Uuid, Professional>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    failing_creates: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_service(&self, service: Service) -> Service {
        self.services
            .write()
            .expect("services lock poisoned")
            .insert(service.id, service.clone());
        service
    }

    pub fn seed_professional(&self, professional: Professional) -> Professional {
        self.professionals
            .write()
            .expect("professionals lock poisoned")
            .insert(professional.id, professional.clone());
        professional
    }

    pub fn seed_appointment(&self, appointment: Appointment) -> Appointment {
        self.appointments
            .write()
            .expect("appointments lock poisoned")
            .insert(appointment.id, appointment.clone());
        appointment
    }

    /// Make the next `count` calls to `create_many` fail without inserting.
    pub fn fail_next_creates(&self, count: u32) {
        self.failing_creates.store(count, Ordering::SeqCst);
    }

    pub fn appointment_count(&self) -> usize {
        self.appointments
            .read()
            .expect("appointments lock poisoned")
            .len()
    }
}

/// The salon's standard service list with its fixed durations.
pub fn standard_catalog() -> Vec<Service> {
    let entries: [(&str, i32, Decimal); 6] = [
        ("alisamento", 30, Decimal::new(4000, 2)),
        ("corte tesoura", 60, Decimal::new(5000, 2)),
        ("corte maquina", 60, Decimal::new(4500, 2)),
        ("barba", 30, Decimal::new(2000, 2)),
        ("sobrancelha", 10, Decimal::new(1000, 2)),
        ("pintura", 120, Decimal::new(9000, 2)),
    ];

    entries
        .into_iter()
        .map(|(name, duration_minutes, price)| Service {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            duration_minutes,
        })
        .collect()
}

#[async_trait]
impl ServiceCatalog for InMemoryStore {
    async fn find_service(
        &self,
        service_id: Uuid,
        _auth_token: &str,
    ) -> Result<Service, SchedulingError> {
        self.services
            .read()
            .expect("services lock poisoned")
            .get(&service_id)
            .cloned()
            .ok_or(SchedulingError::ServiceNotFound(service_id))
    }
}

#[async_trait]
impl ProfessionalDirectory for InMemoryStore {
    async fn find_professional(
        &self,
        professional_id: Uuid,
        _auth_token: &str,
    ) -> Result<Professional, SchedulingError> {
        self.professionals
            .read()
            .expect("professionals lock poisoned")
            .get(&professional_id)
            .cloned()
            .ok_or(SchedulingError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn list_for_professional_between(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .read()
            .expect("appointments lock poisoned")
            .values()
            .filter(|apt| {
                apt.professional_id == professional_id
                    && apt.status.occupies_schedule()
                    && apt.starts_at >= from
                    && apt.starts_at < to
            })
            .cloned()
            .collect();

        matching.sort_by_key(|apt| apt.starts_at);
        Ok(matching)
    }

    async fn list_for_client(
        &self,
        client_id: Uuid,
        status: Option<AppointmentStatus>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .read()
            .expect("appointments lock poisoned")
            .values()
            .filter(|apt| apt.client_id == client_id)
            .filter(|apt| status.map_or(true, |s| apt.status == s))
            .filter(|apt| from.map_or(true, |f| apt.starts_at >= f))
            .filter(|apt| to.map_or(true, |t| apt.starts_at <= t))
            .cloned()
            .collect();

        matching.sort_by_key(|apt| apt.starts_at);
        Ok(matching)
    }

    async fn create_many(
        &self,
        appointments: Vec<Appointment>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if self
            .failing_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SchedulingError::PersistenceFailure(
                "injected store failure".to_string(),
            ));
        }

        let mut map = self.appointments.write().expect("appointments lock poisoned");
        for appointment in &appointments {
            map.insert(appointment.id, appointment.clone());
        }

        Ok(appointments)
    }

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.appointments
            .read()
            .expect("appointments lock poisoned")
            .get(&appointment_id)
            .cloned()
            .ok_or(SchedulingError::NotFound)
    }

    async fn update(
        &self,
        appointment: &Appointment,
        _auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let mut map = self.appointments.write().expect("appointments lock poisoned");

        // Terminal rows are never overwritten; the check and the write share
        // one lock so racing transitions cannot both commit.
        let stored_status = match map.get(&appointment.id) {
            Some(stored) => stored.status,
            None => return Err(SchedulingError::NotFound),
        };

        match stored_status {
            AppointmentStatus::Cancelled => Err(SchedulingError::AlreadyCancelled),
            AppointmentStatus::Completed => Err(SchedulingError::Immutable),
            AppointmentStatus::Scheduled => {
                map.insert(appointment.id, appointment.clone());
                Ok(appointment.clone())
            }
        }
    }
}

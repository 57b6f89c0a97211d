// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::engine::SchedulingEngine;

pub fn scheduling_routes(engine: Arc<SchedulingEngine>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/slots", get(handlers::list_available_slots))
        .route("/clients/{client_id}", get(handlers::get_client_appointments))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .with_state(engine)
}

use std::sync::Arc;

use axum::{routing::get, Router};

use scheduling_cell::router::scheduling_routes;
use scheduling_cell::services::engine::SchedulingEngine;

pub fn create_router(engine: Arc<SchedulingEngine>) -> Router {
    Router::new()
        .route("/", get(|| async { "Salon booking API is running!" }))
        .nest("/appointments", scheduling_routes(engine))
}

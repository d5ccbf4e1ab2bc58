use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers;
use crate::services::engine::AvailabilityEngine;

pub fn reservation_routes(engine: Arc<AvailabilityEngine>) -> Router {
    Router::new()
        .route("/", get(handlers::get_all_availability))
        .route("/confirmed", get(handlers::get_confirmed_reservations))
        .route("/{date}", get(handlers::get_availability_by_date))
        .route("/addAvailability/{date}", put(handlers::add_availability))
        .route("/reserve/{date}", put(handlers::reserve))
        .route("/confirm/{date}", put(handlers::confirm))
        .with_state(engine)
}

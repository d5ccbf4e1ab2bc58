use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use reservation_cell::api::AvailabilityEngine;
use reservation_cell::router::reservation_routes;

pub fn create_router(engine: Arc<AvailabilityEngine>) -> Router {
    Router::new()
        .route("/", get(|| async { "Reservation Manager API is running!" }))
        .nest("/reservations", reservation_routes(engine))
}

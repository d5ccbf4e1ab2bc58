// =====================================================================================
// RESERVATION CELL - PROVIDER AVAILABILITY & TWO-PHASE BOOKING
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::*;
pub use models::*;
pub use router::reservation_routes;

pub mod api {
    pub use crate::services::clock::{Clock, ManualClock, SystemClock};
    pub use crate::services::engine::AvailabilityEngine;
    pub use crate::services::maintenance::spawn_sweeper;
    pub use crate::services::time_block::BlockLayout;
}

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use tracing::error;

use shared_models::error::AppError;

use crate::models::{
    AddAvailabilityQuery, AvailableSlot, BookingQuery, ConfirmedReservation, DayAvailability, Reservation,
};
use crate::services::engine::AvailabilityEngine;
use crate::services::time_block::{is_valid_identifier, BlockLayout, KEY_DELIMITER};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Open slots for one day, sorted by time.
pub async fn get_availability_by_date(
    State(engine): State<Arc<AvailabilityEngine>>,
    Path(date): Path<String>,
) -> Result<Json<DayAvailability>, AppError> {
    let date = parse_date(&date)?;

    let open = engine.availability_for(date).await;
    if open.is_empty() {
        return Err(AppError::NotFound("No reservations available.".to_string()));
    }

    Ok(Json(DayAvailability {
        reservation_date: date,
        available_reservations: to_available_slots(engine.layout(), &open)?,
    }))
}

/// Open slots for every day that has any, sorted by date then time.
pub async fn get_all_availability(
    State(engine): State<Arc<AvailabilityEngine>>,
) -> Result<Json<Vec<DayAvailability>>, AppError> {
    let availability = engine.availability().await;

    let mut days = availability
        .iter()
        .filter(|(_, open)| !open.is_empty())
        .map(|(date, open)| {
            Ok(DayAvailability {
                reservation_date: *date,
                available_reservations: to_available_slots(engine.layout(), open)?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    if days.is_empty() {
        return Err(AppError::NotFound("No reservations available.".to_string()));
    }

    days.sort_by_key(|day| day.reservation_date);
    Ok(Json(days))
}

pub async fn add_availability(
    State(engine): State<Arc<AvailabilityEngine>>,
    Path(date): Path<String>,
    Query(query): Query<AddAvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let start = parse_time("start", &query.start)?;
    let end = parse_time("end", &query.end)?;
    validate_identifier("provider", &query.provider)?;

    engine.add_availability(&query.provider, date, start, end).await;

    Ok(Json(json!({
        "success": true,
        "message": "Availability added."
    })))
}

pub async fn reserve(
    State(engine): State<Arc<AvailabilityEngine>>,
    Path(date): Path<String>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let start = parse_time("start", &query.start)?;
    validate_identifier("provider", &query.provider)?;
    validate_identifier("patient", &query.patient)?;

    if !engine.reserve(&query.provider, &query.patient, date, start).await {
        return Err(AppError::BadRequest("Unable to book appt.".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Reserved! Remember to confirm within {} min!",
            engine.pending_ttl().num_minutes()
        )
    })))
}

pub async fn confirm(
    State(engine): State<Arc<AvailabilityEngine>>,
    Path(date): Path<String>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let start = parse_time("start", &query.start)?;
    validate_identifier("provider", &query.provider)?;
    validate_identifier("patient", &query.patient)?;

    if !engine.confirm(&query.provider, &query.patient, date, start).await {
        return Err(AppError::BadRequest("Unable to find reservation to confirm.".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Reservation confirmed!"
    })))
}

pub async fn get_confirmed_reservations(
    State(engine): State<Arc<AvailabilityEngine>>,
) -> Result<Json<BTreeMap<NaiveDate, Vec<ConfirmedReservation>>>, AppError> {
    let confirmed = engine.confirmed().await;
    let layout = engine.layout();

    let mut response = BTreeMap::new();
    for (date, reservations) in confirmed {
        let mut entries = reservations
            .iter()
            .map(|reservation| {
                Ok(ConfirmedReservation {
                    reservation_time: block_time(layout, reservation)?,
                    time_block: reservation.time_block(),
                    provider: reservation.provider().to_string(),
                    patient: reservation.patient().unwrap_or_default().to_string(),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        entries.sort_by(|a, b| {
            (a.time_block, &a.provider, &a.patient).cmp(&(b.time_block, &b.provider, &b.patient))
        });
        response.insert(date, entries);
    }

    Ok(Json(response))
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn to_available_slots(layout: &BlockLayout, open: &HashSet<Reservation>) -> Result<Vec<AvailableSlot>, AppError> {
    let mut slots = open
        .iter()
        .map(|reservation| {
            Ok(AvailableSlot {
                reservation_time: block_time(layout, reservation)?,
                provider: reservation.provider().to_string(),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    slots.sort_by(|a, b| {
        a.reservation_time
            .cmp(&b.reservation_time)
            .then_with(|| a.provider.cmp(&b.provider))
    });
    Ok(slots)
}

fn block_time(layout: &BlockLayout, reservation: &Reservation) -> Result<NaiveTime, AppError> {
    layout.block_to_time(reservation.time_block()).map_err(|e| {
        error!("Stored reservation has an unusable time block: {}", e);
        AppError::Internal("Operation failed".to_string())
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| AppError::BadRequest("Invalid date format.".to_string()))
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AppError::BadRequest(format!("Invalid {} time format.", field)))
}

fn validate_identifier(field: &str, value: &str) -> Result<(), AppError> {
    if is_valid_identifier(value) {
        return Ok(());
    }
    Err(AppError::BadRequest(format!(
        "{} must be non-empty and may not contain '{}'.",
        field, KEY_DELIMITER
    )))
}

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ==============================================================================
// CORE MODELS
// ==============================================================================

/// A bookable unit: one provider, one block, one day. Identity is the triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub day: NaiveDate,
    pub provider: String,
    pub time_block: u32,
}

/// A slot, optionally held by a patient. `patient == None` is an open slot.
///
/// Equality includes the patient, so the confirmed set for a day can hold the same
/// slot once per patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reservation {
    slot: Slot,
    patient: Option<String>,
}

impl Reservation {
    pub fn open(day: NaiveDate, provider: &str, time_block: u32) -> Self {
        Self {
            slot: Slot {
                day,
                provider: provider.to_string(),
                time_block,
            },
            patient: None,
        }
    }

    pub fn with_patient(mut self, patient: &str) -> Self {
        self.patient = Some(patient.to_string());
        self
    }

    /// Returns the reservation to the open state. The slot is untouched.
    fn clear_patient(&mut self) {
        self.patient = None;
    }

    pub fn day(&self) -> NaiveDate {
        self.slot.day
    }

    pub fn provider(&self) -> &str {
        &self.slot.provider
    }

    pub fn time_block(&self) -> u32 {
        self.slot.time_block
    }

    pub fn patient(&self) -> Option<&str> {
        self.patient.as_deref()
    }
}

/// A tentative booking. Always carries a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHold {
    reservation: Reservation,
    expires_at: NaiveDateTime,
}

impl PendingHold {
    /// Holds `reservation`'s slot for `patient` until `expires_at`.
    pub fn new(reservation: Reservation, patient: &str, expires_at: NaiveDateTime) -> Self {
        Self {
            reservation: reservation.with_patient(patient),
            expires_at,
        }
    }

    pub fn reservation(&self) -> &Reservation {
        &self.reservation
    }

    pub fn patient(&self) -> &str {
        self.reservation.patient().unwrap_or_default()
    }

    pub fn expires_at(&self) -> NaiveDateTime {
        self.expires_at
    }

    /// The held slot, back in the open state.
    pub fn release(self) -> Reservation {
        let mut reservation = self.reservation;
        reservation.clear_patient();
        reservation
    }

    pub fn into_reservation(self) -> Reservation {
        self.reservation
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at < now
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Raw query parameters; parsed and validated by the handlers.
#[derive(Debug, Clone, Deserialize)]
pub struct AddAvailabilityQuery {
    pub provider: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingQuery {
    pub provider: String,
    pub start: String,
    pub patient: String,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub reservation_time: NaiveTime,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub reservation_date: NaiveDate,
    pub available_reservations: Vec<AvailableSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedReservation {
    pub reservation_time: NaiveTime,
    pub time_block: u32,
    pub provider: String,
    pub patient: String,
}

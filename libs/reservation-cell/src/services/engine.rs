use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;

use crate::error::{ReservationError, Result};
use crate::models::{PendingHold, Reservation};
use crate::services::clock::{Clock, SystemClock};
use crate::services::maintenance::{expire_pending_holds, trim_open_slots};
use crate::services::time_block::BlockLayout;

/// Open, pending and confirmed buckets. Only ever touched under the engine lock.
#[derive(Debug, Default)]
pub struct BookingState {
    pub(crate) open: HashMap<NaiveDate, HashSet<Reservation>>,
    pub(crate) pending: HashMap<String, PendingHold>,
    pub(crate) confirmed: HashMap<NaiveDate, HashSet<Reservation>>,
}

/// Provider availability and the reserve/confirm protocol.
///
/// Expiry is lazy: stale holds and slots inside the 24-hour advance window are swept
/// at the start of every read and every `reserve`, under the same lock as the
/// operation itself. Without traffic (or [`spawn_sweeper`](crate::api::spawn_sweeper))
/// an expired hold stays in place.
pub struct AvailabilityEngine {
    layout: BlockLayout,
    pending_ttl: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<BookingState>,
}

impl fmt::Debug for AvailabilityEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityEngine")
            .field("layout", &self.layout)
            .field("pending_ttl", &self.pending_ttl)
            .finish_non_exhaustive()
    }
}

impl AvailabilityEngine {
    pub fn new(layout: BlockLayout, pending_ttl: Duration) -> Self {
        Self::with_clock(layout, pending_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(layout: BlockLayout, pending_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            layout,
            pending_ttl,
            clock,
            state: Mutex::new(BookingState::default()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let layout = BlockLayout::new(config.block_length_minutes)?;
        let pending_ttl = i64::try_from(config.pending_ttl_seconds)
            .ok()
            .filter(|seconds| *seconds > 0)
            .and_then(Duration::try_seconds)
            .ok_or(ReservationError::InvalidPendingTtl(config.pending_ttl_seconds))?;
        Ok(Self::new(layout, pending_ttl))
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn pending_ttl(&self) -> Duration {
        self.pending_ttl
    }

    /// Opens every block in `[start, end)` for `provider` on `day`.
    ///
    /// Days that are not strictly after today are ignored. For tomorrow, blocks before
    /// the current block are skipped. Re-adding an existing slot is a no-op.
    #[instrument(skip(self))]
    pub async fn add_availability(&self, provider: &str, day: NaiveDate, start: NaiveTime, end: NaiveTime) {
        let now = self.clock.now();
        let today = now.date();

        if day <= today {
            debug!(
                "Availability for provider {}, day {} was not added: date is not outside of 24hr window",
                provider, day
            );
            return;
        }

        let mut start_block = self.layout.time_to_block(start);
        let end_block = self.layout.time_to_block(end);

        if Some(day) == today.succ_opt() {
            start_block = start_block.max(self.layout.time_to_block(now.time()));
        }

        let mut state = self.state.lock().await;
        let open = state.open.entry(day).or_default();

        for block in start_block..end_block {
            if open.insert(Reservation::open(day, provider, block)) {
                debug!("Availability added for provider {}, day {}, time block {}", provider, day, block);
            }
        }
    }

    /// Open slots for `day`, empty when there are none.
    pub async fn availability_for(&self, day: NaiveDate) -> HashSet<Reservation> {
        let mut state = self.state.lock().await;
        self.run_maintenance(&mut state);

        state.open.get(&day).cloned().unwrap_or_default()
    }

    /// Every day's open slots. Days may map to an empty set once fully booked.
    pub async fn availability(&self) -> HashMap<NaiveDate, HashSet<Reservation>> {
        let mut state = self.state.lock().await;
        self.run_maintenance(&mut state);

        state.open.clone()
    }

    pub async fn confirmed(&self) -> HashMap<NaiveDate, HashSet<Reservation>> {
        self.state.lock().await.confirmed.clone()
    }

    /// Moves an open slot into a pending hold for `patient`, expiring after the TTL.
    #[instrument(skip(self))]
    pub async fn reserve(&self, provider: &str, patient: &str, day: NaiveDate, time: NaiveTime) -> bool {
        let mut guard = self.state.lock().await;
        self.run_maintenance(&mut guard);
        let state = &mut *guard;

        let open = match state.open.get_mut(&day) {
            Some(open) if !open.is_empty() => open,
            _ => {
                warn!("No reservations available on {}", day);
                return false;
            }
        };

        let block = self.layout.time_to_block(time);
        let candidate = Reservation::open(day, provider, block);
        if !open.remove(&candidate) {
            debug!("Provider {} has no open slot at block {} on {}", provider, block, day);
            return false;
        }

        let Some(expires_at) = self.clock.now().checked_add_signed(self.pending_ttl) else {
            error!("Pending TTL {} overflows the calendar, slot left open", self.pending_ttl);
            open.insert(candidate);
            return false;
        };

        let key = self.layout.key_of(day, provider, block);
        let hold = PendingHold::new(candidate, patient, expires_at);

        if let Some(replaced) = state.pending.insert(key, hold) {
            warn!(
                "Hold for patient {} on {} block {} replaced by a new reservation",
                replaced.patient(),
                day,
                block
            );
        }

        info!("Patient {} holds provider {} on {} at block {}", patient, provider, day, block);
        true
    }

    /// Turns the caller's pending hold into a confirmed booking.
    ///
    /// Fails when there is no hold, when it belongs to another patient, or when it has
    /// expired. An expired hold is released back to the open bucket here as well.
    #[instrument(skip(self))]
    pub async fn confirm(&self, provider: &str, patient: &str, day: NaiveDate, time: NaiveTime) -> bool {
        let now = self.clock.now();
        let key = self.layout.key_of(day, provider, self.layout.time_to_block(time));

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let entry = match state.pending.entry(key) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(entry) => {
                debug!("No pending reservation for {}", entry.key());
                return false;
            }
        };

        if entry.get().patient() != patient {
            warn!("Patient {} does not hold {}", patient, entry.key());
            return false;
        }

        let hold = entry.remove();

        if hold.is_expired(now) {
            warn!("Pending reservation for patient {} on {} expired at {}", patient, day, hold.expires_at());
            state.open.entry(day).or_default().insert(hold.release());
            return false;
        }

        let reservation = hold.into_reservation();

        info!("Patient {} confirmed provider {} on {} at block {}", patient, provider, day, reservation.time_block());
        state.confirmed.entry(day).or_default().insert(reservation);
        true
    }

    /// The hold on a slot, expired or not. Does not sweep.
    pub async fn pending_hold(&self, provider: &str, day: NaiveDate, time: NaiveTime) -> Option<PendingHold> {
        let key = self.layout.key_of(day, provider, self.layout.time_to_block(time));
        self.state.lock().await.pending.get(&key).cloned()
    }

    /// Runs both maintenance passes now.
    pub async fn sweep(&self) {
        let mut state = self.state.lock().await;
        self.run_maintenance(&mut state);
    }

    fn run_maintenance(&self, state: &mut BookingState) {
        let now: NaiveDateTime = self.clock.now();
        let released = expire_pending_holds(state, &self.layout, now);
        let trimmed = trim_open_slots(state, &self.layout, now);

        if released > 0 || trimmed > 0 {
            debug!("Sweep released {} expired holds and trimmed {} open slots", released, trimmed);
        }
    }
}

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::engine::{AvailabilityEngine, BookingState};
use crate::services::time_block::BlockLayout;

/// Releases expired holds back to the open bucket, but only when the slot is still more
/// than 24 hours away. Expired holds inside that window are left where they are and the
/// slot stays unbookable.
pub fn expire_pending_holds(state: &mut BookingState, layout: &BlockLayout, now: NaiveDateTime) -> usize {
    let window_end = now + Duration::days(1);

    let releasable: Vec<String> = state
        .pending
        .iter()
        .filter(|(_, hold)| hold.is_expired(now))
        .filter(|(key, hold)| {
            let reservation = hold.reservation();
            match layout.date_time_of(reservation.day(), reservation.time_block()) {
                Ok(starts_at) => starts_at > window_end,
                Err(e) => {
                    warn!("Skipping pending reservation {}: {}", key, e);
                    false
                }
            }
        })
        .map(|(key, _)| key.clone())
        .collect();

    for key in &releasable {
        if let Some(hold) = state.pending.remove(key) {
            let reservation = hold.release();
            debug!("Pending reservation {} expired, slot reopened", key);
            state.open.entry(reservation.day()).or_default().insert(reservation);
        }
    }

    releasable.len()
}

/// Drops open slots that can no longer be booked 24 hours ahead: all of today (and any
/// earlier day still lingering) and the part of tomorrow before the current block.
pub fn trim_open_slots(state: &mut BookingState, layout: &BlockLayout, now: NaiveDateTime) -> usize {
    let today = now.date();
    let mut trimmed = 0;

    state.open.retain(|day, slots| {
        if *day <= today {
            trimmed += slots.len();
            return false;
        }
        true
    });

    if let Some(tomorrow) = today.succ_opt() {
        if let Some(slots) = state.open.get_mut(&tomorrow) {
            let block_of_now = layout.time_to_block(now.time());
            let before = slots.len();
            slots.retain(|reservation| reservation.time_block() >= block_of_now);
            trimmed += before - slots.len();
        }
    }

    trimmed
}

/// Sweeps `engine` every `period` in the background. Reads and reservations sweep on
/// their own; this only shortens how long an expired hold can sit untouched.
pub fn spawn_sweeper(engine: Arc<AvailabilityEngine>, period: std::time::Duration) -> JoinHandle<()> {
    info!("Starting background sweeper every {:?}", period);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            engine.sweep().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::models::{PendingHold, Reservation};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(10, 7, 0)
            .unwrap()
    }

    fn hold(day: NaiveDate, block: u32, expires_at: NaiveDateTime) -> PendingHold {
        PendingHold::new(Reservation::open(day, "Dr. House", block), "992-GT3-RS", expires_at)
    }

    #[test]
    fn test_trim_drops_today_and_earlier() {
        let layout = BlockLayout::default();
        let today = now().date();
        let yesterday = today.pred_opt().unwrap();
        let next_week = today + Duration::days(7);

        let mut state = BookingState::default();
        for day in [yesterday, today, next_week] {
            state.open.entry(day).or_default().insert(Reservation::open(day, "Dr. House", 40));
        }

        assert_eq!(trim_open_slots(&mut state, &layout, now()), 2);
        assert!(!state.open.contains_key(&today));
        assert!(!state.open.contains_key(&yesterday));
        assert_eq!(state.open[&next_week].len(), 1);
    }

    #[test]
    fn test_trim_tomorrow_before_current_block() {
        let layout = BlockLayout::default();
        let tomorrow = now().date().succ_opt().unwrap();

        let mut state = BookingState::default();
        let open = state.open.entry(tomorrow).or_default();
        for block in 36..48 {
            open.insert(Reservation::open(tomorrow, "Dr. House", block));
        }

        // 10:07 rounds up to 10:15, block 41
        assert_eq!(trim_open_slots(&mut state, &layout, now()), 5);
        assert!(state.open[&tomorrow].iter().all(|r| r.time_block() >= 41));
        assert_eq!(state.open[&tomorrow].len(), 7);
    }

    #[test]
    fn test_expired_hold_far_out_is_released() {
        let layout = BlockLayout::default();
        let day = now().date() + Duration::days(30);

        let mut state = BookingState::default();
        state
            .pending
            .insert(layout.key_of(day, "Dr. House", 37), hold(day, 37, now() - Duration::minutes(1)));

        assert_eq!(expire_pending_holds(&mut state, &layout, now()), 1);
        assert!(state.pending.is_empty());
        assert!(state.open[&day].contains(&Reservation::open(day, "Dr. House", 37)));
    }

    #[test]
    fn test_live_hold_is_kept() {
        let layout = BlockLayout::default();
        let day = now().date() + Duration::days(30);

        let mut state = BookingState::default();
        state
            .pending
            .insert(layout.key_of(day, "Dr. House", 37), hold(day, 37, now() + Duration::minutes(1)));

        assert_eq!(expire_pending_holds(&mut state, &layout, now()), 0);
        assert_eq!(state.pending.len(), 1);
        assert!(state.open.is_empty());
    }

    #[test]
    fn test_expired_hold_inside_24_hours_is_stranded() {
        let layout = BlockLayout::default();
        let tomorrow = now().date().succ_opt().unwrap();
        let block = layout.time_to_block(NaiveTime::from_hms_opt(10, 0, 0).unwrap());

        let mut state = BookingState::default();
        state.pending.insert(
            layout.key_of(tomorrow, "Dr. House", block),
            hold(tomorrow, block, now() - Duration::minutes(1)),
        );

        assert_eq!(expire_pending_holds(&mut state, &layout, now()), 0);
        assert_eq!(state.pending.len(), 1);
        assert!(state.open.is_empty());
    }

    #[test]
    fn test_hold_exactly_24_hours_out_is_not_released() {
        let layout = BlockLayout::default();
        let now = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let tomorrow = now.date().succ_opt().unwrap();
        let block = layout.time_to_block(NaiveTime::from_hms_opt(10, 0, 0).unwrap());

        let mut state = BookingState::default();
        state.pending.insert(
            layout.key_of(tomorrow, "Dr. House", block),
            hold(tomorrow, block, now - Duration::minutes(1)),
        );

        assert_eq!(expire_pending_holds(&mut state, &layout, now), 0);
        assert_eq!(state.pending.len(), 1);
        assert!(!state.open.contains_key(&tomorrow));
    }

    #[test]
    fn test_hold_one_block_past_24_hours_is_released() {
        let layout = BlockLayout::default();
        let now = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let tomorrow = now.date().succ_opt().unwrap();
        let block = layout.time_to_block(NaiveTime::from_hms_opt(10, 15, 0).unwrap());

        let mut state = BookingState::default();
        state.pending.insert(
            layout.key_of(tomorrow, "Dr. House", block),
            hold(tomorrow, block, now - Duration::minutes(1)),
        );

        assert_eq!(expire_pending_holds(&mut state, &layout, now), 1);
        assert!(state.pending.is_empty());
        assert!(state.open[&tomorrow].contains(&Reservation::open(tomorrow, "Dr. House", block)));
    }
}

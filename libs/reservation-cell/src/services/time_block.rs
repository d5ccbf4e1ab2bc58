//! Fixed-width time blocks within a day.
//!
//! A day is cut into `blocks_per_day()` blocks of `length_minutes` each, indexed from
//! midnight. Ordering by block index is ordering by time of day.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{ReservationError, Result};

/// Separator used by [`BlockLayout::key_of`]. Identifiers must not contain it.
pub const KEY_DELIMITER: char = ';';

pub const DEFAULT_BLOCK_LENGTH_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    length_minutes: u32,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            length_minutes: DEFAULT_BLOCK_LENGTH_MINUTES,
        }
    }
}

impl BlockLayout {
    /// Block length must be a factor of 60 (5, 10, 15, 20, 30, ...).
    pub fn new(length_minutes: u32) -> Result<Self> {
        if length_minutes == 0 || 60 % length_minutes != 0 {
            return Err(ReservationError::InvalidBlockLength(length_minutes));
        }
        Ok(Self { length_minutes })
    }

    pub fn length_minutes(&self) -> u32 {
        self.length_minutes
    }

    pub fn blocks_per_hour(&self) -> u32 {
        60 / self.length_minutes
    }

    pub fn blocks_per_day(&self) -> u32 {
        24 * self.blocks_per_hour()
    }

    /// Start time of `block`.
    pub fn block_to_time(&self, block: u32) -> Result<NaiveTime> {
        let hour = block / self.blocks_per_hour();
        let minute = (block % self.blocks_per_hour()) * self.length_minutes;
        NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            ReservationError::InvalidInput(format!("time block {} is outside of the day", block))
        })
    }

    /// Block index for `time`. A time strictly inside a block rounds up to the next one,
    /// so an availability window ending at 12:00 never yields a block starting at 12:00.
    pub fn time_to_block(&self, time: NaiveTime) -> u32 {
        time.hour() * self.blocks_per_hour() + time.minute().div_ceil(self.length_minutes)
    }

    /// Composite key of a pending hold.
    pub fn key_of(&self, day: NaiveDate, provider: &str, block: u32) -> String {
        format!("{day}{KEY_DELIMITER}{provider}{KEY_DELIMITER}{block}")
    }

    pub fn date_time_of(&self, day: NaiveDate, block: u32) -> Result<NaiveDateTime> {
        Ok(day.and_time(self.block_to_time(block)?))
    }
}

/// Provider and patient identifiers take part in pending keys, so they may not be empty
/// or contain the key delimiter.
pub fn is_valid_identifier(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains(KEY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_block_to_time() {
        // 17th hour, third quarter
        assert_eq!(BlockLayout::default().block_to_time(71).unwrap(), time(17, 45));
    }

    #[test]
    fn test_time_to_block() {
        assert_eq!(BlockLayout::default().time_to_block(time(15, 30)), 62);
        assert_eq!(BlockLayout::default().time_to_block(time(9, 15)), 37);
    }

    #[test]
    fn test_time_to_block_rounds_up_inside_a_block() {
        let layout = BlockLayout::default();
        assert_eq!(layout.time_to_block(time(9, 1)), 37);
        assert_eq!(layout.time_to_block(time(9, 14)), 37);
        assert_eq!(layout.time_to_block(time(9, 16)), 38);
        assert_eq!(layout.time_to_block(time(9, 46)), 40);
    }

    #[test]
    fn test_time_to_block_ignores_seconds() {
        let layout = BlockLayout::default();
        let with_seconds = NaiveTime::from_hms_opt(9, 15, 59).unwrap();
        assert_eq!(layout.time_to_block(with_seconds), 37);
    }

    #[test]
    fn test_boundaries_round_trip() {
        let layout = BlockLayout::default();
        assert_eq!(layout.blocks_per_day(), 96);
        for block in 0..layout.blocks_per_day() {
            let start = layout.block_to_time(block).unwrap();
            assert_eq!(layout.time_to_block(start), block);
        }
    }

    #[test]
    fn test_last_minute_of_day_maps_past_the_day() {
        let layout = BlockLayout::default();
        let block = layout.time_to_block(time(23, 59));
        assert_eq!(block, 96);
        assert!(matches!(
            layout.block_to_time(block),
            Err(ReservationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_key_of() {
        let day = NaiveDate::from_ymd_opt(2023, 12, 8).unwrap();
        assert_eq!(
            BlockLayout::default().key_of(day, "someProviderId", 87),
            "2023-12-08;someProviderId;87"
        );
    }

    #[test]
    fn test_date_time_of() {
        let day: NaiveDate = "2023-12-08".parse().unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 12, 8)
            .unwrap()
            .and_hms_opt(12, 15, 0)
            .unwrap();
        assert_eq!(BlockLayout::default().date_time_of(day, 49).unwrap(), expected);
    }

    #[test]
    fn test_custom_block_length() {
        let layout = BlockLayout::new(30).unwrap();
        assert_eq!(layout.blocks_per_hour(), 2);
        assert_eq!(layout.blocks_per_day(), 48);
        assert_eq!(layout.time_to_block(time(10, 10)), 21);
        assert_eq!(layout.block_to_time(21).unwrap(), time(10, 30));
    }

    #[test]
    fn test_block_length_must_divide_an_hour() {
        assert_eq!(BlockLayout::new(7), Err(ReservationError::InvalidBlockLength(7)));
        assert_eq!(BlockLayout::new(0), Err(ReservationError::InvalidBlockLength(0)));
        assert!(BlockLayout::new(5).is_ok());
        assert!(BlockLayout::new(60).is_ok());
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("Dr. House"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("   "));
        assert!(!is_valid_identifier("a;b"));
    }
}

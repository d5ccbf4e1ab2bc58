use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid block length: {0} minutes does not evenly divide an hour")]
    InvalidBlockLength(u32),

    #[error("Invalid pending TTL: {0} seconds must be positive and fit a timestamp")]
    InvalidPendingTtl(u64),
}

pub type Result<T> = std::result::Result<T, ReservationError>;

use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BLOCK_LENGTH_MINUTES: u32 = 15;
pub const DEFAULT_PENDING_TTL_SECONDS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub block_length_minutes: u32,
    pub pending_ttl_seconds: u64,
    /// `None` leaves expiry entirely to the sweep that runs on every read.
    pub sweep_interval_seconds: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            block_length_minutes: DEFAULT_BLOCK_LENGTH_MINUTES,
            pending_ttl_seconds: DEFAULT_PENDING_TTL_SECONDS,
            sweep_interval_seconds: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: var_or("PORT", DEFAULT_PORT),
            block_length_minutes: var_or("BLOCK_LENGTH_MINUTES", DEFAULT_BLOCK_LENGTH_MINUTES),
            pending_ttl_seconds: var_or("PENDING_TTL_SECONDS", DEFAULT_PENDING_TTL_SECONDS),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|value| match value.parse::<u64>() {
                    Ok(0) => None,
                    Ok(seconds) => Some(seconds),
                    Err(_) => {
                        warn!("SWEEP_INTERVAL_SECONDS is not a number, background sweep disabled");
                        None
                    }
                }),
        };

        if !config.is_configured() {
            warn!(
                "BLOCK_LENGTH_MINUTES={} does not evenly divide an hour",
                config.block_length_minutes
            );
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.block_length_minutes != 0 && 60 % self.block_length_minutes == 0
    }
}

fn var_or<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value {:?}, using default {}", key, value, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}

//! # Runtime Configuration
//!
//! Tunables for the request core, read from the environment by the embedding
//! application at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WALLET_CONFIRMATION_TIMEOUT_SECS` | Seconds an active request may wait to be shown | `120` |
//! | `WALLET_RECENT_ADDRESSES_LIMIT` | Length of the recent-addresses list | `10` |

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::address_book::DEFAULT_RECENT_ADDRESSES_LIMIT;

/// Environment variable for the surfacing timeout, in whole seconds.
///
/// The timer starts when a request becomes the active confirmation and is
/// disarmed once the UI reports it shown.
pub const CONFIRMATION_TIMEOUT_ENV: &str = "WALLET_CONFIRMATION_TIMEOUT_SECS";

/// Environment variable for the recent-addresses bound.
pub const RECENT_ADDRESSES_LIMIT_ENV: &str = "WALLET_RECENT_ADDRESSES_LIMIT";

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub confirmation_timeout: Duration,
    pub recent_addresses_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            recent_addresses_limit: DEFAULT_RECENT_ADDRESSES_LIMIT,
        }
    }
}

impl CoreConfig {
    /// Load from the process environment. Unset variables use the defaults;
    /// unparseable ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout_secs = read(&lookup, CONFIRMATION_TIMEOUT_ENV)
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(defaults.confirmation_timeout.as_secs());
        Self {
            confirmation_timeout: Duration::from_secs(timeout_secs),
            recent_addresses_limit: read(&lookup, RECENT_ADDRESSES_LIMIT_ENV)
                .unwrap_or(defaults.recent_addresses_limit),
        }
    }
}

fn read<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

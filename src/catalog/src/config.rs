//! Catalog cache configuration.

use std::time::Duration;

use crate::error::{CatalogError, Result};

/// Default refresh window for client last-used timestamps.
pub const DEFAULT_MAX_LAST_USED_DELAY: &str = "-6h";

/// Default interval between periodic bulk reloads.
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(20 * 60);

/// Catalog cache configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// How far back a client's `last_date_used` may lag before a lookup
    /// refreshes it. Must be a negative humantime duration (`"-6h"`); the
    /// leading `-` is required.
    pub max_last_used_delay: String,

    /// Interval between periodic bulk reloads. The event stream provides
    /// low-latency invalidation; this interval is the eventual-consistency
    /// floor when messages are lost.
    pub cache_expiry: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_last_used_delay: DEFAULT_MAX_LAST_USED_DELAY.to_string(),
            cache_expiry: DEFAULT_CACHE_EXPIRY,
        }
    }
}

/// Parses a negative humantime duration such as `"-6h"`.
pub(crate) fn parse_negative_duration(text: &str) -> Result<chrono::Duration> {
    let magnitude = text.strip_prefix('-').ok_or_else(|| {
        CatalogError::InvalidConfig(format!(
            "max_last_used_delay must be a negative duration starting with '-', got {text:?}"
        ))
    })?;
    let parsed = humantime::parse_duration(magnitude).map_err(|err| {
        CatalogError::InvalidConfig(format!("max_last_used_delay {text:?} is not a duration: {err}"))
    })?;
    let delay = chrono::Duration::from_std(parsed).map_err(|err| {
        CatalogError::InvalidConfig(format!("max_last_used_delay {text:?} is out of range: {err}"))
    })?;
    Ok(-delay)
}

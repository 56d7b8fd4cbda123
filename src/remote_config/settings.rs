//! Fetch behaviour settings for the Remote Config store.

use std::time::Duration;

use crate::remote_config::error::{invalid_argument, RemoteConfigResult};

/// Default timeout for fetch operations (60 seconds).
pub const DEFAULT_FETCH_TIMEOUT_MILLIS: u64 = 60_000;
/// Default minimum interval between successful fetches (12 hours).
pub const DEFAULT_MINIMUM_FETCH_INTERVAL_MILLIS: u64 = 12 * 60 * 60 * 1_000;

/// Configuration options for Remote Config fetch behaviour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfigSettings {
    fetch_timeout_millis: u64,
    minimum_fetch_interval_millis: u64,
}

impl RemoteConfigSettings {
    /// Creates a new settings object after validating values.
    pub fn new(
        fetch_timeout_millis: u64,
        minimum_fetch_interval_millis: u64,
    ) -> RemoteConfigResult<Self> {
        validate_fetch_timeout(fetch_timeout_millis)?;
        Ok(Self {
            fetch_timeout_millis,
            minimum_fetch_interval_millis,
        })
    }

    pub fn fetch_timeout_millis(&self) -> u64 {
        self.fetch_timeout_millis
    }

    pub fn minimum_fetch_interval_millis(&self) -> u64 {
        self.minimum_fetch_interval_millis
    }

    /// Minimum fetch interval as a [`Duration`]; zero disables throttling.
    pub fn minimum_fetch_interval(&self) -> Duration {
        Duration::from_millis(self.minimum_fetch_interval_millis)
    }

    pub(crate) fn apply(&mut self, update: &RemoteConfigSettingsUpdate) -> RemoteConfigResult<()> {
        if let Some(timeout) = update.fetch_timeout_millis {
            validate_fetch_timeout(timeout)?;
        }
        if let Some(timeout) = update.fetch_timeout_millis {
            self.fetch_timeout_millis = timeout;
        }
        if let Some(interval) = update.minimum_fetch_interval_millis {
            self.minimum_fetch_interval_millis = interval;
        }
        Ok(())
    }
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_millis: DEFAULT_FETCH_TIMEOUT_MILLIS,
            minimum_fetch_interval_millis: DEFAULT_MINIMUM_FETCH_INTERVAL_MILLIS,
        }
    }
}

/// Partial update to apply on top of existing settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteConfigSettingsUpdate {
    pub fetch_timeout_millis: Option<u64>,
    pub minimum_fetch_interval_millis: Option<u64>,
}

impl RemoteConfigSettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.fetch_timeout_millis.is_none() && self.minimum_fetch_interval_millis.is_none()
    }

    pub fn minimum_fetch_interval(interval: Duration) -> Self {
        Self {
            minimum_fetch_interval_millis: Some(interval.as_millis() as u64),
            ..Default::default()
        }
    }
}

fn validate_fetch_timeout(value: u64) -> RemoteConfigResult<()> {
    if value == 0 {
        return Err(invalid_argument(
            "fetch_timeout_millis must be greater than zero",
        ));
    }
    Ok(())
}

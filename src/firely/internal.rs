use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::firely::config::FirelyConfig;
use crate::firely::error::FirelyResult;
use crate::firely::lifecycle::{LifecycleAction, LifecycleEvent};
use crate::firely::log::{FirelyLogLevel, LOGGER};
use crate::firely::preferences::{PreferenceStore, INITIAL_CHECK_KEY};
use crate::platform::runtime::spawn_detached;
use crate::remote_config::settings::RemoteConfigSettingsUpdate;
use crate::remote_config::{FetchOutcome, RemoteConfig};

/// Cache expiration used outside debug mode once the first fetch has succeeded.
pub const RELEASE_CACHE_EXPIRATION: Duration = Duration::from_secs(2 * 60 * 60);
/// Minimum fetch interval configured on the store outside debug mode.
pub const RELEASE_MINIMUM_FETCH_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

/// Shared state behind [`Firely`](crate::firely::Firely) and every block or variable it hands out.
pub struct InternalFirely {
    remote_config: RemoteConfig,
    config: Arc<dyn FirelyConfig>,
    preferences: Arc<dyn PreferenceStore>,
    debug_mode: AtomicBool,
    log_level: AtomicU8,
    known_values: Mutex<HashMap<String, String>>,
}

impl InternalFirely {
    /// Registers every declared default with `remote_config`.
    pub fn new(
        remote_config: RemoteConfig,
        config: Arc<dyn FirelyConfig>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Arc<Self> {
        let defaults = config
            .all_values()
            .iter()
            .map(|item| {
                (
                    item.name().to_string(),
                    item.default_value().to_config_string(),
                )
            })
            .collect();
        remote_config.set_defaults(defaults);

        let internal = Arc::new(Self {
            remote_config,
            config,
            preferences,
            debug_mode: AtomicBool::new(false),
            log_level: AtomicU8::new(FirelyLogLevel::None as u8),
            known_values: Mutex::new(HashMap::new()),
        });
        internal.update_known_values();
        internal
    }

    pub fn remote_config(&self) -> &RemoteConfig {
        &self.remote_config
    }

    pub fn get_string(&self, name: &str) -> String {
        self.remote_config.get_string(name)
    }

    pub fn get_boolean(&self, name: &str) -> bool {
        self.remote_config.get_boolean(name)
    }

    pub fn get_double(&self, name: &str) -> f64 {
        self.remote_config.get_double(name)
    }

    pub fn get_long(&self, name: &str) -> i64 {
        self.remote_config.get_long(name)
    }

    /// Current value of every declared key, as of the last activation.
    pub fn current_known_values(&self) -> HashMap<String, String> {
        self.known_values.lock().unwrap().clone()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode.load(Ordering::SeqCst)
    }

    /// Debug mode disables fetch throttling and activates fetched values on every pause.
    pub fn set_debug_mode(&self, debug_mode: bool) {
        self.debug_mode.store(debug_mode, Ordering::SeqCst);
        let interval = if debug_mode {
            Duration::ZERO
        } else {
            RELEASE_MINIMUM_FETCH_INTERVAL
        };
        if let Err(err) = self
            .remote_config
            .set_config_settings(RemoteConfigSettingsUpdate::minimum_fetch_interval(interval))
        {
            self.log_error(format!("Unable to update fetch settings: {err}"));
        }
    }

    pub fn log_level(&self) -> FirelyLogLevel {
        FirelyLogLevel::from_u8(self.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level(&self, level: FirelyLogLevel) {
        self.log_level.store(level as u8, Ordering::SeqCst);
        LOGGER.set_log_level(level.logger_level());
    }

    /// Zero on first launch and in debug mode, [`RELEASE_CACHE_EXPIRATION`] otherwise.
    pub fn cache_expiration(&self) -> Duration {
        if self.debug_mode() || !self.preferences.get_bool(INITIAL_CHECK_KEY, false) {
            Duration::ZERO
        } else {
            RELEASE_CACHE_EXPIRATION
        }
    }

    /// Fetches with [`cache_expiration`](Self::cache_expiration) and activates on success.
    pub async fn fetch(&self) -> FirelyResult<FetchOutcome> {
        match self
            .remote_config
            .fetch_with_expiration(self.cache_expiration())
            .await
        {
            Ok(outcome) => {
                self.log_debug("Fetch Succeeded");
                if let Err(err) = self.preferences.set_bool(INITIAL_CHECK_KEY, true) {
                    self.log_error(format!("Unable to record the first fetch: {err}"));
                }
                self.activate_fetched().await?;
                Ok(outcome)
            }
            Err(err) => {
                self.log_debug(format!("Fetch Failed: {err}"));
                Err(err.into())
            }
        }
    }

    /// Activates staged values, if any, and refreshes the known values.
    pub async fn activate_fetched(&self) -> FirelyResult<bool> {
        self.log_debug("Fetch Activated");
        let activated = self.remote_config.activate().await?;
        self.update_known_values();
        Ok(activated)
    }

    /// Runs [`fetch`](Self::fetch) in the background.
    pub fn spawn_fetch(self: &Arc<Self>) -> bool {
        let internal = Arc::clone(self);
        spawn_detached(async move {
            let _ = internal.fetch().await;
        })
    }

    /// Runs [`activate_fetched`](Self::activate_fetched) in the background.
    pub fn spawn_activate(self: &Arc<Self>) -> bool {
        let internal = Arc::clone(self);
        spawn_detached(async move {
            if let Err(err) = internal.activate_fetched().await {
                internal.log_error(format!("Activation failed: {err}"));
            }
        })
    }

    /// Reacts to a host lifecycle callback without blocking the caller.
    pub fn handle_lifecycle_event(self: &Arc<Self>, event: LifecycleEvent) -> LifecycleAction {
        let action = event.action(self.debug_mode());
        match action {
            LifecycleAction::Fetch => {
                self.spawn_fetch();
            }
            LifecycleAction::Activate => {
                self.spawn_activate();
            }
            LifecycleAction::Ignore => {}
        }
        action
    }

    /// Same decision as [`handle_lifecycle_event`](Self::handle_lifecycle_event), awaited in place.
    pub async fn apply_lifecycle_event(&self, event: LifecycleEvent) -> FirelyResult<LifecycleAction> {
        let action = event.action(self.debug_mode());
        match action {
            LifecycleAction::Fetch => {
                self.fetch().await?;
            }
            LifecycleAction::Activate => {
                self.activate_fetched().await?;
            }
            LifecycleAction::Ignore => {}
        }
        Ok(action)
    }

    pub(crate) fn log_error(&self, message: impl AsRef<str>) {
        if self.log_level().error_log_enabled() {
            LOGGER.error(message);
        }
    }

    pub(crate) fn log_debug(&self, message: impl AsRef<str>) {
        if self.log_level().debug_log_enabled() {
            LOGGER.debug(message);
        }
    }

    fn update_known_values(&self) {
        let values = self
            .config
            .all_values()
            .iter()
            .map(|item| {
                (
                    item.name().to_string(),
                    self.remote_config.get_string(item.name()),
                )
            })
            .collect();
        *self.known_values.lock().unwrap() = values;
    }
}

impl fmt::Debug for InternalFirely {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalFirely")
            .field("remote_config", &self.remote_config)
            .field("debug_mode", &self.debug_mode())
            .field("log_level", &self.log_level())
            .finish()
    }
}

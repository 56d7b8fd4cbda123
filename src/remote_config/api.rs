use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::remote_config::error::{fetch_failed, RemoteConfigError, RemoteConfigResult};
use crate::remote_config::fetch::{FetchRequest, NoopFetchClient, RemoteConfigFetchClient};
use crate::remote_config::settings::{RemoteConfigSettings, RemoteConfigSettingsUpdate};
use crate::remote_config::storage::{
    FetchStatus, FileRemoteConfigStorage, InMemoryRemoteConfigStorage, RemoteConfigStorage,
    RemoteConfigStorageCache,
};
use crate::remote_config::value::{RemoteConfigValue, RemoteConfigValueSource};

/// Result of a successful [`RemoteConfig::fetch_with_expiration`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A new template was downloaded and staged for activation.
    Fetched,
    /// The backend reported that the active template is current.
    NotModified,
    /// The last successful fetch is younger than the cache expiration; no request was made.
    Cached,
}

/// Keys whose fetched value differs from the active one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    updated_keys: BTreeSet<String>,
}

impl ConfigUpdate {
    pub fn updated_keys(&self) -> &BTreeSet<String> {
        &self.updated_keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.updated_keys.contains(key)
    }
}

type ConfigUpdateCallback =
    Arc<dyn Fn(Result<&ConfigUpdate, &RemoteConfigError>) + Send + Sync + 'static>;

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    entries: Vec<(u64, ConfigUpdateCallback)>,
}

/// Handle returned by [`RemoteConfig::add_config_update_listener`].
///
/// The listener stays registered until [`remove`](Self::remove) is called or the handle is
/// dropped.
#[must_use = "dropping the registration removes the listener"]
pub struct ConfigUpdateListenerRegistration {
    id: u64,
    listeners: Weak<Mutex<ListenerSet>>,
}

impl ConfigUpdateListenerRegistration {
    pub fn remove(self) {}
}

impl Drop for ConfigUpdateListenerRegistration {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

struct StagedTemplate {
    config: HashMap<String, String>,
    etag: Option<String>,
    template_version: Option<u64>,
}

#[derive(Clone)]
pub struct RemoteConfig {
    inner: Arc<RemoteConfigInner>,
}

struct RemoteConfigInner {
    defaults: Mutex<HashMap<String, String>>,
    staged: Mutex<Option<StagedTemplate>>,
    settings: Mutex<RemoteConfigSettings>,
    fetch_client: Mutex<Arc<dyn RemoteConfigFetchClient>>,
    storage_cache: RemoteConfigStorageCache,
    listeners: Arc<Mutex<ListenerSet>>,
}

impl RemoteConfig {
    /// Creates a store backed by in-memory storage and the offline fetch client.
    pub fn new() -> Self {
        Self::from_cache(RemoteConfigStorageCache::new(Arc::new(
            InMemoryRemoteConfigStorage::default(),
        )))
    }

    /// Creates a store on top of `storage`, restoring the previously active template.
    pub fn with_storage(storage: Arc<dyn RemoteConfigStorage>) -> RemoteConfigResult<Self> {
        let storage_cache = RemoteConfigStorageCache::new(storage);
        futures::executor::block_on(storage_cache.hydrate_from_storage())?;
        Ok(Self::from_cache(storage_cache))
    }

    /// Convenience wrapper around [`FileRemoteConfigStorage`].
    pub fn with_file_storage(path: impl Into<PathBuf>) -> RemoteConfigResult<Self> {
        let storage = FileRemoteConfigStorage::new(path.into())?;
        Self::with_storage(Arc::new(storage))
    }

    fn from_cache(storage_cache: RemoteConfigStorageCache) -> Self {
        let fetch_client: Arc<dyn RemoteConfigFetchClient> = Arc::new(NoopFetchClient);
        Self {
            inner: Arc::new(RemoteConfigInner {
                defaults: Mutex::new(HashMap::new()),
                staged: Mutex::new(None),
                settings: Mutex::new(RemoteConfigSettings::default()),
                fetch_client: Mutex::new(fetch_client),
                storage_cache,
                listeners: Arc::new(Mutex::new(ListenerSet::default())),
            }),
        }
    }

    pub fn set_defaults(&self, defaults: HashMap<String, String>) {
        *self.inner.defaults.lock().unwrap() = defaults;
    }

    /// Replaces the transport used by [`fetch`](Self::fetch).
    pub fn set_fetch_client(&self, fetch_client: Arc<dyn RemoteConfigFetchClient>) {
        *self.inner.fetch_client.lock().unwrap() = fetch_client;
    }

    pub fn settings(&self) -> RemoteConfigSettings {
        self.inner.settings.lock().unwrap().clone()
    }

    /// Merges `update` into the current settings. Invalid values leave the settings unchanged.
    pub fn set_config_settings(&self, update: RemoteConfigSettingsUpdate) -> RemoteConfigResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        self.inner.settings.lock().unwrap().apply(&update)
    }

    /// Fetches using the configured minimum fetch interval as cache expiration.
    pub async fn fetch(&self) -> RemoteConfigResult<FetchOutcome> {
        let interval = self.settings().minimum_fetch_interval();
        self.fetch_with_expiration(interval).await
    }

    /// Fetches a template unless the last successful fetch is younger than `cache_expiration`.
    ///
    /// Fetched values are staged, not active; call [`activate`](Self::activate) to expose them.
    pub async fn fetch_with_expiration(
        &self,
        cache_expiration: Duration,
    ) -> RemoteConfigResult<FetchOutcome> {
        let now = current_timestamp_millis();
        let expiration_millis = cache_expiration.as_millis() as u64;

        if expiration_millis > 0 {
            if let Some(last_fetch) = self
                .inner
                .storage_cache
                .last_successful_fetch_timestamp_millis()
            {
                if now.saturating_sub(last_fetch) < expiration_millis {
                    return Ok(FetchOutcome::Cached);
                }
            }
        }

        let request = FetchRequest {
            cache_max_age_millis: expiration_millis,
            timeout_millis: self.settings().fetch_timeout_millis(),
            e_tag: self.inner.storage_cache.active_config_etag(),
        };
        let fetch_client = self.inner.fetch_client.lock().unwrap().clone();

        let response = match fetch_client.fetch(request).await {
            Ok(response) => response,
            Err(err) => return self.fail_fetch(err).await,
        };

        match response.status {
            200 => {
                let config = response.config.unwrap_or_default();
                let update = self.diff_against_active(&config);
                *self.inner.staged.lock().unwrap() = Some(StagedTemplate {
                    config,
                    etag: response.etag,
                    template_version: response.template_version,
                });
                self.record_success(now).await?;
                if !update.updated_keys.is_empty() {
                    self.notify(Ok(&update));
                }
                Ok(FetchOutcome::Fetched)
            }
            304 => {
                self.record_success(now).await?;
                Ok(FetchOutcome::NotModified)
            }
            status => {
                self.fail_fetch(fetch_failed(format!(
                    "fetch returned unexpected status {status}"
                )))
                .await
            }
        }
    }

    /// Makes the staged template active. Returns `false` when nothing was staged.
    pub async fn activate(&self) -> RemoteConfigResult<bool> {
        let staged = self.inner.staged.lock().unwrap().take();
        let Some(staged) = staged else {
            return Ok(false);
        };
        let cache = &self.inner.storage_cache;
        cache.set_active_config(staged.config).await?;
        cache.set_active_config_etag(staged.etag).await?;
        cache
            .set_active_config_template_version(staged.template_version)
            .await?;
        Ok(true)
    }

    /// Whether a fetched template is waiting for [`activate`](Self::activate).
    pub fn has_staged_config(&self) -> bool {
        self.inner.staged.lock().unwrap().is_some()
    }

    /// Timestamp of the last successful fetch in milliseconds since epoch, `-1` if none.
    pub fn fetch_time_millis(&self) -> i64 {
        self.inner
            .storage_cache
            .last_successful_fetch_timestamp_millis()
            .map(|millis| millis as i64)
            .unwrap_or(-1)
    }

    pub fn last_fetch_status(&self) -> FetchStatus {
        self.inner.storage_cache.last_fetch_status()
    }

    pub fn active_template_version(&self) -> Option<u64> {
        self.inner.storage_cache.active_config_template_version()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_value(key).as_string()
    }

    pub fn get_boolean(&self, key: &str) -> bool {
        self.get_value(key).as_bool()
    }

    pub fn get_double(&self, key: &str) -> f64 {
        self.get_value(key).as_double()
    }

    pub fn get_long(&self, key: &str) -> i64 {
        self.get_value(key).as_long()
    }

    /// Resolves `key` against the active template, then the defaults.
    pub fn get_value(&self, key: &str) -> RemoteConfigValue {
        if let Some(value) = self.inner.storage_cache.active_value(key) {
            return RemoteConfigValue::new(RemoteConfigValueSource::Remote, value);
        }
        if let Some(value) = self.inner.defaults.lock().unwrap().get(key).cloned() {
            return RemoteConfigValue::new(RemoteConfigValueSource::Default, value);
        }
        RemoteConfigValue::static_value()
    }

    /// Union of defaults and active values, active values taking precedence.
    pub fn get_all(&self) -> HashMap<String, RemoteConfigValue> {
        let mut all: HashMap<String, RemoteConfigValue> = self
            .inner
            .defaults
            .lock()
            .unwrap()
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    RemoteConfigValue::new(RemoteConfigValueSource::Default, value.clone()),
                )
            })
            .collect();
        for (key, value) in self.inner.storage_cache.active_config() {
            all.insert(
                key,
                RemoteConfigValue::new(RemoteConfigValueSource::Remote, value),
            );
        }
        all
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.get_all().into_keys().collect()
    }

    /// Registers a callback invoked after each fetch that changes at least one key, and after
    /// each failed fetch.
    pub fn add_config_update_listener<F>(&self, listener: F) -> ConfigUpdateListenerRegistration
    where
        F: Fn(Result<&ConfigUpdate, &RemoteConfigError>) + Send + Sync + 'static,
    {
        let mut listeners = self.inner.listeners.lock().unwrap();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        ConfigUpdateListenerRegistration {
            id,
            listeners: Arc::downgrade(&self.inner.listeners),
        }
    }

    fn diff_against_active(&self, fetched: &HashMap<String, String>) -> ConfigUpdate {
        let active = self.inner.storage_cache.active_config();
        let mut updated_keys: BTreeSet<String> = fetched
            .iter()
            .filter(|(key, value)| active.get(*key) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect();
        updated_keys.extend(
            active
                .keys()
                .filter(|key| !fetched.contains_key(*key))
                .cloned(),
        );
        ConfigUpdate { updated_keys }
    }

    async fn record_success(&self, now: u64) -> RemoteConfigResult<()> {
        let cache = &self.inner.storage_cache;
        cache.set_last_fetch_status(FetchStatus::Success).await?;
        cache.set_last_successful_fetch_timestamp_millis(now).await
    }

    async fn fail_fetch(&self, err: RemoteConfigError) -> RemoteConfigResult<FetchOutcome> {
        self.inner
            .storage_cache
            .set_last_fetch_status(FetchStatus::Failure)
            .await?;
        self.notify(Err(&err));
        Err(err)
    }

    fn notify(&self, event: Result<&ConfigUpdate, &RemoteConfigError>) {
        let callbacks: Vec<ConfigUpdateCallback> = self
            .inner
            .listeners
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let defaults_len = self.inner.defaults.lock().map(|map| map.len()).unwrap_or(0);
        f.debug_struct("RemoteConfig")
            .field("defaults", &defaults_len)
            .field("staged", &self.has_staged_config())
            .field("last_fetch_status", &self.last_fetch_status().as_str())
            .finish()
    }
}

fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

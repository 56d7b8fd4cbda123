//! Remote Config persistence and its in-memory mirror.
//!
//! [`RemoteConfigStorage`] is the persistence seam; [`RemoteConfigStorageCache`] keeps the same
//! data in memory so reads never await.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::remote_config::error::{storage_error, RemoteConfigResult};

/// Outcome of the last fetch attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    #[default]
    NoFetchYet,
    Success,
    Failure,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::NoFetchYet => "no-fetch-yet",
            FetchStatus::Success => "success",
            FetchStatus::Failure => "failure",
        }
    }
}

/// Persistence layer for the active template and fetch metadata.
#[async_trait::async_trait]
pub trait RemoteConfigStorage: Send + Sync {
    async fn get_last_fetch_status(&self) -> RemoteConfigResult<Option<FetchStatus>>;
    async fn set_last_fetch_status(&self, status: FetchStatus) -> RemoteConfigResult<()>;

    async fn get_last_successful_fetch_timestamp_millis(&self) -> RemoteConfigResult<Option<u64>>;
    async fn set_last_successful_fetch_timestamp_millis(
        &self,
        timestamp: u64,
    ) -> RemoteConfigResult<()>;

    async fn get_active_config(&self) -> RemoteConfigResult<Option<HashMap<String, String>>>;
    async fn set_active_config(&self, config: HashMap<String, String>) -> RemoteConfigResult<()>;

    async fn get_active_config_etag(&self) -> RemoteConfigResult<Option<String>>;
    async fn set_active_config_etag(&self, etag: Option<String>) -> RemoteConfigResult<()>;

    async fn get_active_config_template_version(&self) -> RemoteConfigResult<Option<u64>>;
    async fn set_active_config_template_version(
        &self,
        template_version: Option<u64>,
    ) -> RemoteConfigResult<()>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StorageRecord {
    last_fetch_status: Option<FetchStatus>,
    last_successful_fetch_timestamp_millis: Option<u64>,
    active_config: Option<HashMap<String, String>>,
    active_config_etag: Option<String>,
    active_config_template_version: Option<u64>,
}

/// Process-local storage; nothing survives a restart.
#[derive(Default)]
pub struct InMemoryRemoteConfigStorage {
    inner: Mutex<StorageRecord>,
}

#[async_trait::async_trait]
impl RemoteConfigStorage for InMemoryRemoteConfigStorage {
    async fn get_last_fetch_status(&self) -> RemoteConfigResult<Option<FetchStatus>> {
        Ok(self.inner.lock().unwrap().last_fetch_status)
    }

    async fn set_last_fetch_status(&self, status: FetchStatus) -> RemoteConfigResult<()> {
        self.inner.lock().unwrap().last_fetch_status = Some(status);
        Ok(())
    }

    async fn get_last_successful_fetch_timestamp_millis(&self) -> RemoteConfigResult<Option<u64>> {
        Ok(self.inner.lock().unwrap().last_successful_fetch_timestamp_millis)
    }

    async fn set_last_successful_fetch_timestamp_millis(
        &self,
        timestamp: u64,
    ) -> RemoteConfigResult<()> {
        self.inner.lock().unwrap().last_successful_fetch_timestamp_millis = Some(timestamp);
        Ok(())
    }

    async fn get_active_config(&self) -> RemoteConfigResult<Option<HashMap<String, String>>> {
        Ok(self.inner.lock().unwrap().active_config.clone())
    }

    async fn set_active_config(&self, config: HashMap<String, String>) -> RemoteConfigResult<()> {
        self.inner.lock().unwrap().active_config = Some(config);
        Ok(())
    }

    async fn get_active_config_etag(&self) -> RemoteConfigResult<Option<String>> {
        Ok(self.inner.lock().unwrap().active_config_etag.clone())
    }

    async fn set_active_config_etag(&self, etag: Option<String>) -> RemoteConfigResult<()> {
        self.inner.lock().unwrap().active_config_etag = etag;
        Ok(())
    }

    async fn get_active_config_template_version(&self) -> RemoteConfigResult<Option<u64>> {
        Ok(self.inner.lock().unwrap().active_config_template_version)
    }

    async fn set_active_config_template_version(
        &self,
        template_version: Option<u64>,
    ) -> RemoteConfigResult<()> {
        self.inner.lock().unwrap().active_config_template_version = template_version;
        Ok(())
    }
}

/// JSON file storage; the whole record is rewritten on every update.
pub struct FileRemoteConfigStorage {
    path: PathBuf,
    inner: Mutex<StorageRecord>,
}

impl FileRemoteConfigStorage {
    pub fn new(path: PathBuf) -> RemoteConfigResult<Self> {
        let record = if path.exists() {
            Self::load_record(&path)?
        } else {
            StorageRecord::default()
        };
        Ok(Self {
            path,
            inner: Mutex::new(record),
        })
    }

    fn load_record(path: &PathBuf) -> RemoteConfigResult<StorageRecord> {
        let data = fs::read(path)
            .map_err(|err| storage_error(format!("failed to read storage file: {err}")))?;
        serde_json::from_slice(&data)
            .map_err(|err| storage_error(format!("failed to parse storage file as JSON: {err}")))
    }

    fn update<F>(&self, mutate: F) -> RemoteConfigResult<()>
    where
        F: FnOnce(&mut StorageRecord),
    {
        let mut record = self.inner.lock().unwrap();
        mutate(&mut record);
        self.persist(&record)
    }

    fn persist(&self, record: &StorageRecord) -> RemoteConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                storage_error(format!("failed to create storage directory: {err}"))
            })?;
        }
        let serialized = serde_json::to_vec_pretty(record)
            .map_err(|err| storage_error(format!("failed to serialize storage record: {err}")))?;
        fs::write(&self.path, serialized)
            .map_err(|err| storage_error(format!("failed to write storage file: {err}")))
    }
}

#[async_trait::async_trait]
impl RemoteConfigStorage for FileRemoteConfigStorage {
    async fn get_last_fetch_status(&self) -> RemoteConfigResult<Option<FetchStatus>> {
        Ok(self.inner.lock().unwrap().last_fetch_status)
    }

    async fn set_last_fetch_status(&self, status: FetchStatus) -> RemoteConfigResult<()> {
        self.update(|record| record.last_fetch_status = Some(status))
    }

    async fn get_last_successful_fetch_timestamp_millis(&self) -> RemoteConfigResult<Option<u64>> {
        Ok(self.inner.lock().unwrap().last_successful_fetch_timestamp_millis)
    }

    async fn set_last_successful_fetch_timestamp_millis(
        &self,
        timestamp: u64,
    ) -> RemoteConfigResult<()> {
        self.update(|record| record.last_successful_fetch_timestamp_millis = Some(timestamp))
    }

    async fn get_active_config(&self) -> RemoteConfigResult<Option<HashMap<String, String>>> {
        Ok(self.inner.lock().unwrap().active_config.clone())
    }

    async fn set_active_config(&self, config: HashMap<String, String>) -> RemoteConfigResult<()> {
        self.update(|record| record.active_config = Some(config))
    }

    async fn get_active_config_etag(&self) -> RemoteConfigResult<Option<String>> {
        Ok(self.inner.lock().unwrap().active_config_etag.clone())
    }

    async fn set_active_config_etag(&self, etag: Option<String>) -> RemoteConfigResult<()> {
        self.update(|record| record.active_config_etag = etag)
    }

    async fn get_active_config_template_version(&self) -> RemoteConfigResult<Option<u64>> {
        Ok(self.inner.lock().unwrap().active_config_template_version)
    }

    async fn set_active_config_template_version(
        &self,
        template_version: Option<u64>,
    ) -> RemoteConfigResult<()> {
        self.update(|record| record.active_config_template_version = template_version)
    }
}

/// In-memory mirror of a [`RemoteConfigStorage`].
pub struct RemoteConfigStorageCache {
    storage: Arc<dyn RemoteConfigStorage>,
    last_fetch_status: Mutex<FetchStatus>,
    last_successful_fetch_timestamp_millis: Mutex<Option<u64>>,
    active_config: Mutex<HashMap<String, String>>,
    active_config_etag: Mutex<Option<String>>,
    active_config_template_version: Mutex<Option<u64>>,
}

impl fmt::Debug for RemoteConfigStorageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfigStorageCache")
            .field("last_fetch_status", &self.last_fetch_status())
            .field(
                "last_successful_fetch_timestamp_millis",
                &self.last_successful_fetch_timestamp_millis(),
            )
            .field("active_config_size", &self.active_config_len())
            .field("active_config_etag", &self.active_config_etag())
            .finish()
    }
}

impl RemoteConfigStorageCache {
    pub fn new(storage: Arc<dyn RemoteConfigStorage>) -> Self {
        Self {
            storage,
            last_fetch_status: Mutex::new(FetchStatus::NoFetchYet),
            last_successful_fetch_timestamp_millis: Mutex::new(None),
            active_config: Mutex::new(HashMap::new()),
            active_config_etag: Mutex::new(None),
            active_config_template_version: Mutex::new(None),
        }
    }

    pub async fn hydrate_from_storage(&self) -> RemoteConfigResult<()> {
        if let Some(status) = self.storage.get_last_fetch_status().await? {
            *self.last_fetch_status.lock().unwrap() = status;
        }
        if let Some(timestamp) = self
            .storage
            .get_last_successful_fetch_timestamp_millis()
            .await?
        {
            *self.last_successful_fetch_timestamp_millis.lock().unwrap() = Some(timestamp);
        }
        if let Some(config) = self.storage.get_active_config().await? {
            *self.active_config.lock().unwrap() = config;
        }
        if let Some(etag) = self.storage.get_active_config_etag().await? {
            *self.active_config_etag.lock().unwrap() = Some(etag);
        }
        if let Some(version) = self.storage.get_active_config_template_version().await? {
            *self.active_config_template_version.lock().unwrap() = Some(version);
        }
        Ok(())
    }

    pub fn last_fetch_status(&self) -> FetchStatus {
        *self.last_fetch_status.lock().unwrap()
    }

    pub async fn set_last_fetch_status(&self, status: FetchStatus) -> RemoteConfigResult<()> {
        self.storage.set_last_fetch_status(status).await?;
        *self.last_fetch_status.lock().unwrap() = status;
        Ok(())
    }

    pub fn last_successful_fetch_timestamp_millis(&self) -> Option<u64> {
        *self.last_successful_fetch_timestamp_millis.lock().unwrap()
    }

    pub async fn set_last_successful_fetch_timestamp_millis(
        &self,
        timestamp: u64,
    ) -> RemoteConfigResult<()> {
        self.storage
            .set_last_successful_fetch_timestamp_millis(timestamp)
            .await?;
        *self.last_successful_fetch_timestamp_millis.lock().unwrap() = Some(timestamp);
        Ok(())
    }

    pub fn active_config(&self) -> HashMap<String, String> {
        self.active_config.lock().unwrap().clone()
    }

    /// Looks up one active entry without cloning the whole template.
    pub fn active_value(&self, key: &str) -> Option<String> {
        self.active_config.lock().unwrap().get(key).cloned()
    }

    fn active_config_len(&self) -> usize {
        self.active_config.lock().unwrap().len()
    }

    pub async fn set_active_config(
        &self,
        config: HashMap<String, String>,
    ) -> RemoteConfigResult<()> {
        self.storage.set_active_config(config.clone()).await?;
        *self.active_config.lock().unwrap() = config;
        Ok(())
    }

    pub fn active_config_etag(&self) -> Option<String> {
        self.active_config_etag.lock().unwrap().clone()
    }

    pub async fn set_active_config_etag(&self, etag: Option<String>) -> RemoteConfigResult<()> {
        self.storage.set_active_config_etag(etag.clone()).await?;
        *self.active_config_etag.lock().unwrap() = etag;
        Ok(())
    }

    pub fn active_config_template_version(&self) -> Option<u64> {
        *self.active_config_template_version.lock().unwrap()
    }

    pub async fn set_active_config_template_version(
        &self,
        template_version: Option<u64>,
    ) -> RemoteConfigResult<()> {
        self.storage
            .set_active_config_template_version(template_version)
            .await?;
        *self.active_config_template_version.lock().unwrap() = template_version;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "current_thread")]
    async fn cache_roundtrips_metadata() {
        let storage: Arc<dyn RemoteConfigStorage> =
            Arc::new(InMemoryRemoteConfigStorage::default());
        let cache = RemoteConfigStorageCache::new(storage.clone());

        cache.hydrate_from_storage().await.unwrap();
        assert_eq!(cache.last_fetch_status(), FetchStatus::NoFetchYet);
        assert_eq!(cache.last_successful_fetch_timestamp_millis(), None);

        cache.set_last_fetch_status(FetchStatus::Success).await.unwrap();
        cache
            .set_last_successful_fetch_timestamp_millis(1234)
            .await
            .unwrap();
        cache
            .set_active_config(HashMap::from([(
                String::from("feature_flag_1"),
                String::from("true"),
            )]))
            .await
            .unwrap();
        cache
            .set_active_config_etag(Some(String::from("etag")))
            .await
            .unwrap();
        cache
            .set_active_config_template_version(Some(42))
            .await
            .unwrap();

        assert_eq!(cache.active_value("feature_flag_1").as_deref(), Some("true"));
        assert_eq!(cache.active_value("missing"), None);

        let rehydrated = RemoteConfigStorageCache::new(storage);
        rehydrated.hydrate_from_storage().await.unwrap();
        assert_eq!(rehydrated.last_fetch_status(), FetchStatus::Success);
        assert_eq!(
            rehydrated.last_successful_fetch_timestamp_millis(),
            Some(1234)
        );
        assert_eq!(
            rehydrated.active_config().get("feature_flag_1"),
            Some(&String::from("true"))
        );
        assert_eq!(rehydrated.active_config_etag(), Some(String::from("etag")));
        assert_eq!(rehydrated.active_config_template_version(), Some(42));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn file_storage_persists_state() {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "firely-remote-config-storage-{}-{}.json",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));

        let storage = Arc::new(FileRemoteConfigStorage::new(path.clone()).unwrap());
        let cache = RemoteConfigStorageCache::new(storage);
        cache.hydrate_from_storage().await.unwrap();

        cache.set_last_fetch_status(FetchStatus::Success).await.unwrap();
        cache
            .set_active_config(HashMap::from([(
                String::from("color"),
                String::from("blue"),
            )]))
            .await
            .unwrap();
        cache
            .set_active_config_etag(Some(String::from("persist-etag")))
            .await
            .unwrap();
        drop(cache);

        let storage = Arc::new(FileRemoteConfigStorage::new(path.clone()).unwrap());
        let cache = RemoteConfigStorageCache::new(storage);
        cache.hydrate_from_storage().await.unwrap();
        assert_eq!(cache.last_fetch_status(), FetchStatus::Success);
        assert_eq!(cache.active_value("color").as_deref(), Some("blue"));
        assert_eq!(
            cache.active_config_etag(),
            Some(String::from("persist-etag"))
        );

        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let path = std::env::temp_dir().join(format!(
            "firely-remote-config-corrupt-{}.json",
            std::process::id()
        ));
        fs::write(&path, b"not json").unwrap();
        let err = FileRemoteConfigStorage::new(path.clone()).err().unwrap();
        assert_eq!(err.code_str(), "remote-config/storage");
        let _ = fs::remove_file(path);
    }
}

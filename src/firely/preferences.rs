//! Small key/value persistence for flags that must survive restarts.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::firely::error::{preferences_error, FirelyResult};

/// Set once the first fetch has succeeded.
pub const INITIAL_CHECK_KEY: &str = "firely.initial_check";

pub trait PreferenceStore: Send + Sync {
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn set_bool(&self, key: &str, value: bool) -> FirelyResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    values: Mutex<HashMap<String, bool>>,
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) -> FirelyResult<()> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Preferences kept in a JSON object on disk.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: Mutex<HashMap<String, bool>>,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> FirelyResult<Self> {
        let path = path.into();
        let values = if path.exists() {
            let data = fs::read(&path).map_err(|err| {
                preferences_error(format!("failed to read preferences file: {err}"))
            })?;
            serde_json::from_slice(&data).map_err(|err| {
                preferences_error(format!("failed to parse preferences file: {err}"))
            })?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, bool>) -> FirelyResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                preferences_error(format!("failed to create preferences directory: {err}"))
            })?;
        }
        let serialized = serde_json::to_vec_pretty(values).map_err(|err| {
            preferences_error(format!("failed to serialize preferences: {err}"))
        })?;
        fs::write(&self.path, serialized)
            .map_err(|err| preferences_error(format!("failed to write preferences file: {err}")))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) -> FirelyResult<()> {
        let mut values = self.values.lock().unwrap();
        if values.get(key) == Some(&value) {
            return Ok(());
        }
        values.insert(key.to_string(), value);
        self.persist(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_defaults_until_set() {
        let store = InMemoryPreferenceStore::default();
        assert!(!store.get_bool(INITIAL_CHECK_KEY, false));
        store.set_bool(INITIAL_CHECK_KEY, true).unwrap();
        assert!(store.get_bool(INITIAL_CHECK_KEY, false));
    }

    #[test]
    fn file_store_survives_reload() {
        let path = std::env::temp_dir().join(format!(
            "firely-preferences-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        let store = FilePreferenceStore::new(&path).unwrap();
        assert!(!store.get_bool(INITIAL_CHECK_KEY, false));
        store.set_bool(INITIAL_CHECK_KEY, true).unwrap();
        drop(store);

        let reloaded = FilePreferenceStore::new(&path).unwrap();
        assert!(reloaded.get_bool(INITIAL_CHECK_KEY, false));
        let _ = fs::remove_file(path);
    }
}

//! Runtime options for [`Firely::setup`](crate::firely::Firely::setup).
//!
//! Options are usually read from a JSON document:
//!
//! ```json
//! {
//!   "debug_mode": false,
//!   "log_level": "error",
//!   "preferences_path": "/var/lib/app/firely-preferences.json",
//!   "backend": {
//!     "project_id": "my-project",
//!     "api_key": "AIza...",
//!     "app_id": "1:123:web:abc",
//!     "app_instance_id": "instance-1"
//!   }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Deserialize;

use crate::firely::error::{invalid_config, FirelyResult};
use crate::firely::log::FirelyLogLevel;
use crate::remote_config::fetch::HttpRemoteConfigFetchClient;
use crate::remote_config::{DEFAULT_NAMESPACE, REMOTE_CONFIG_API_URL};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FirelyOptions {
    pub debug_mode: bool,
    pub log_level: FirelyLogLevel,
    /// Where the first-launch flag is kept. In memory when unset.
    pub preferences_path: Option<PathBuf>,
    /// Where the active template and fetch metadata are kept. In memory when unset.
    pub storage_path: Option<PathBuf>,
    /// Remote Config REST backend. Without one, fetches return an empty template.
    pub backend: Option<BackendOptions>,
}

impl FirelyOptions {
    pub fn from_json_str(document: &str) -> FirelyResult<Self> {
        serde_json::from_str(document)
            .map_err(|err| invalid_config(format!("failed to parse Firely options: {err}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> FirelyResult<Self> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|err| {
            invalid_config(format!("unable to read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&document)
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_log_level(mut self, log_level: FirelyLogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn with_backend(mut self, backend: BackendOptions) -> Self {
        self.backend = Some(backend);
        self
    }
}

/// Credentials and endpoint of the Remote Config REST API.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BackendOptions {
    pub project_id: String,
    pub api_key: String,
    pub app_id: String,
    pub app_instance_id: String,
    #[serde(default)]
    pub app_instance_id_token: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_base_url() -> String {
    REMOTE_CONFIG_API_URL.to_string()
}

impl BackendOptions {
    pub fn new(
        project_id: impl Into<String>,
        api_key: impl Into<String>,
        app_id: impl Into<String>,
        app_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            app_id: app_id.into(),
            app_instance_id: app_instance_id.into(),
            app_instance_id_token: None,
            language_code: None,
            namespace: default_namespace(),
            base_url: default_base_url(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the HTTP fetch client for these credentials.
    pub fn fetch_client(&self) -> FirelyResult<HttpRemoteConfigFetchClient> {
        for (field, value) in [
            ("project_id", &self.project_id),
            ("api_key", &self.api_key),
            ("app_id", &self.app_id),
            ("app_instance_id", &self.app_instance_id),
        ] {
            if value.trim().is_empty() {
                return Err(invalid_config(format!("backend {field} must not be empty")));
            }
        }

        let client = Client::builder()
            .build()
            .map_err(|err| invalid_config(format!("failed to build HTTP client: {err}")))?;
        let mut fetch_client = HttpRemoteConfigFetchClient::new(
            client,
            self.base_url.clone(),
            self.project_id.clone(),
            self.namespace.clone(),
            self.api_key.clone(),
            self.app_id.clone(),
            self.app_instance_id.clone(),
        );
        if let Some(token) = &self.app_instance_id_token {
            fetch_client = fetch_client.with_instance_token(token.clone());
        }
        if let Some(language_code) = &self.language_code {
            fetch_client = fetch_client.with_language_code(language_code.clone());
        }
        Ok(fetch_client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let options = FirelyOptions::from_json_str("{}").unwrap();
        assert_eq!(options, FirelyOptions::default());
        assert!(!options.debug_mode);
        assert_eq!(options.log_level, FirelyLogLevel::None);
        assert!(options.backend.is_none());
    }

    #[test]
    fn parses_backend_with_defaults() {
        let options = FirelyOptions::from_json_str(
            r#"{
                "debug_mode": true,
                "log_level": "debug",
                "storage_path": "/tmp/firely-storage.json",
                "backend": {
                    "project_id": "demo",
                    "api_key": "key",
                    "app_id": "1:1:web:1",
                    "app_instance_id": "instance"
                }
            }"#,
        )
        .unwrap();

        assert!(options.debug_mode);
        assert_eq!(options.log_level, FirelyLogLevel::Debug);
        assert_eq!(
            options.storage_path.as_deref(),
            Some(Path::new("/tmp/firely-storage.json"))
        );
        let backend = options.backend.unwrap();
        assert_eq!(backend, BackendOptions::new("demo", "key", "1:1:web:1", "instance"));
        assert_eq!(backend.namespace, DEFAULT_NAMESPACE);
        assert_eq!(backend.base_url, REMOTE_CONFIG_API_URL);
        assert!(backend.fetch_client().is_ok());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = FirelyOptions::from_json_str(r#"{"log_level": "verbose"}"#).unwrap_err();
        assert_eq!(err.code_str(), "firely/invalid-config");
    }

    #[test]
    fn rejects_blank_credentials() {
        let backend = BackendOptions::new("demo", " ", "app", "instance");
        let err = backend.fetch_client().err().unwrap();
        assert_eq!(err.code_str(), "firely/invalid-config");
        assert!(err.message().contains("api_key"));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "firely-options-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"log_level": "error"}"#).unwrap();

        let options = FirelyOptions::from_path(&path).unwrap();
        assert_eq!(options.log_level, FirelyLogLevel::Error);

        let _ = std::fs::remove_file(&path);
        assert!(FirelyOptions::from_path(&path).is_err());
    }
}

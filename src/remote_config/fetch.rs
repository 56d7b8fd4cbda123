//! Remote Config fetch client abstractions.
//!
//! The backend is reached through [`RemoteConfigFetchClient`], so tests and hosts with their own
//! transport can swap in an implementation.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::remote_config::constants::{DEFAULT_LANGUAGE_CODE, SDK_VERSION};
use crate::remote_config::error::{fetch_failed, internal_error, RemoteConfigResult};

/// Parameters describing a fetch attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    /// Maximum allowed age of the cached template before the network is used.
    pub cache_max_age_millis: u64,
    /// Timeout budget for the request.
    pub timeout_millis: u64,
    /// Entity tag of the active template, sent as `If-None-Match`.
    pub e_tag: Option<String>,
}

/// Minimal representation of the Remote Config REST response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub config: Option<HashMap<String, String>>,
    pub template_version: Option<u64>,
}

/// Abstraction over the network layer used to retrieve Remote Config templates.
#[async_trait::async_trait]
pub trait RemoteConfigFetchClient: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> RemoteConfigResult<FetchResponse>;
}

/// Offline client: answers every fetch with an empty template.
#[derive(Default)]
pub struct NoopFetchClient;

#[async_trait::async_trait]
impl RemoteConfigFetchClient for NoopFetchClient {
    async fn fetch(&self, _request: FetchRequest) -> RemoteConfigResult<FetchResponse> {
        Ok(FetchResponse {
            status: 200,
            etag: None,
            config: Some(HashMap::new()),
            template_version: None,
        })
    }
}

#[derive(Deserialize)]
struct RestFetchResponse {
    #[serde(default)]
    entries: Option<HashMap<String, String>>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default, rename = "templateVersion")]
    template_version: Option<u64>,
}

/// HTTP implementation for the Remote Config REST API.
pub struct HttpRemoteConfigFetchClient {
    client: Client,
    base_url: String,
    project_id: String,
    namespace: String,
    api_key: String,
    app_id: String,
    app_instance_id: String,
    app_instance_id_token: Option<String>,
    language_code: String,
}

impl HttpRemoteConfigFetchClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        namespace: impl Into<String>,
        api_key: impl Into<String>,
        app_id: impl Into<String>,
        app_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            project_id: project_id.into(),
            namespace: namespace.into(),
            api_key: api_key.into(),
            app_id: app_id.into(),
            app_instance_id: app_instance_id.into(),
            app_instance_id_token: None,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
        }
    }

    pub fn with_instance_token(mut self, token: impl Into<String>) -> Self {
        self.app_instance_id_token = Some(token.into());
        self
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    fn build_headers(&self, e_tag: Option<&str>) -> RemoteConfigResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            IF_NONE_MATCH,
            HeaderValue::from_str(e_tag.unwrap_or("*"))
                .map_err(|err| internal_error(format!("invalid ETag: {err}")))?,
        );
        Ok(headers)
    }

    fn request_body(&self) -> JsonValue {
        let mut payload = json!({
            "sdk_version": SDK_VERSION,
            "app_instance_id": self.app_instance_id,
            "app_id": self.app_id,
            "language_code": self.language_code,
        });
        if let (Some(token), Some(obj)) = (&self.app_instance_id_token, payload.as_object_mut()) {
            obj.insert(
                "app_instance_id_token".to_string(),
                JsonValue::String(token.clone()),
            );
        }
        payload
    }

    fn build_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/namespaces/{}:fetch?key={}",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.namespace,
            self.api_key
        )
    }
}

#[async_trait::async_trait]
impl RemoteConfigFetchClient for HttpRemoteConfigFetchClient {
    async fn fetch(&self, request: FetchRequest) -> RemoteConfigResult<FetchResponse> {
        let headers = self.build_headers(request.e_tag.as_deref())?;
        let response = self
            .client
            .post(self.build_url())
            .headers(headers)
            .json(&self.request_body())
            .timeout(Duration::from_millis(request.timeout_millis))
            .send()
            .await
            .map_err(|err| fetch_failed(format!("remote config fetch failed: {err}")))?;

        let mut status = response.status();
        let e_tag = response
            .headers()
            .get("ETag")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let response_body = if status == StatusCode::OK {
            Some(response.json::<RestFetchResponse>().await.map_err(|err| {
                fetch_failed(format!("failed to parse Remote Config response: {err}"))
            })?)
        } else if status == StatusCode::NOT_MODIFIED {
            None
        } else {
            return Err(fetch_failed(format!(
                "fetch returned unexpected status {}",
                status.as_u16()
            )));
        };

        let mut config = response_body.as_ref().and_then(|body| body.entries.clone());
        let state = response_body.as_ref().and_then(|body| body.state.clone());
        let template_version = response_body
            .as_ref()
            .and_then(|body| body.template_version);

        match state.as_deref() {
            Some("INSTANCE_STATE_UNSPECIFIED") => status = StatusCode::INTERNAL_SERVER_ERROR,
            Some("NO_CHANGE") => status = StatusCode::NOT_MODIFIED,
            Some("NO_TEMPLATE") | Some("EMPTY_CONFIG") => {
                config = Some(HashMap::new());
            }
            _ => {}
        }

        match status {
            StatusCode::OK | StatusCode::NOT_MODIFIED => Ok(FetchResponse {
                status: status.as_u16(),
                etag: e_tag,
                config,
                template_version,
            }),
            other => Err(fetch_failed(format!(
                "fetch returned unexpected status {}",
                other.as_u16()
            ))),
        }
    }
}

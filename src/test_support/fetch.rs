use std::collections::VecDeque;
use std::sync::Mutex;

use crate::remote_config::error::{internal_error, RemoteConfigError, RemoteConfigResult};
use crate::remote_config::fetch::{FetchRequest, FetchResponse, RemoteConfigFetchClient};

/// Fetch client that replays queued responses in order and records every request.
#[derive(Default)]
pub struct StubFetchClient {
    responses: Mutex<VecDeque<RemoteConfigResult<FetchResponse>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StubFetchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: FetchResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, error: RemoteConfigError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<FetchRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl RemoteConfigFetchClient for StubFetchClient {
    async fn fetch(&self, request: FetchRequest) -> RemoteConfigResult<FetchResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(internal_error("no response queued")))
    }
}

/// A `200` response carrying `entries` as the fetched template.
pub fn response_with(entries: &[(&str, &str)]) -> FetchResponse {
    FetchResponse {
        status: 200,
        etag: Some(String::from("etag-test")),
        config: Some(
            entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        ),
        template_version: Some(1),
    }
}

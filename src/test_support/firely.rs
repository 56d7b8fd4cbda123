use std::sync::Arc;

use crate::firely::config::FirelyItem;
use crate::firely::internal::InternalFirely;
use crate::firely::preferences::InMemoryPreferenceStore;
use crate::remote_config::RemoteConfig;
use crate::test_support::{response_with, StubFetchClient};

/// Engine over `items` whose fetches are answered by `client`.
pub fn internal_with(items: Vec<FirelyItem>, client: &Arc<StubFetchClient>) -> Arc<InternalFirely> {
    let remote_config = RemoteConfig::new();
    remote_config.set_fetch_client(client.clone());
    InternalFirely::new(
        remote_config,
        Arc::new(items),
        Arc::new(InMemoryPreferenceStore::default()),
    )
}

/// Engine over `items` whose active values already include `remote`.
pub async fn internal_activated(
    items: Vec<FirelyItem>,
    remote: &[(&str, &str)],
) -> Arc<InternalFirely> {
    let client = Arc::new(StubFetchClient::new());
    client.push_response(response_with(remote));
    let internal = internal_with(items, &client);
    internal.fetch().await.unwrap();
    internal
}

//! Remote Config value store used by the Firely facade.
//!
//! The store keeps client defaults, the active template and a staged (fetched but not yet
//! activated) template. Network access goes through a pluggable
//! [`RemoteConfigFetchClient`](fetch::RemoteConfigFetchClient) and persistence through a pluggable
//! [`RemoteConfigStorage`](storage::RemoteConfigStorage).
mod api;
mod constants;
pub mod error;
pub mod fetch;
pub mod settings;
pub mod storage;
pub mod value;

pub use api::{
    ConfigUpdate, ConfigUpdateListenerRegistration, FetchOutcome, RemoteConfig,
};
pub use constants::{DEFAULT_NAMESPACE, REMOTE_CONFIG_API_URL};

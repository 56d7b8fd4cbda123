//! Test utilities shared across unit tests.

use std::time::Duration;

pub mod fetch;
pub mod firely;
pub mod log;

pub use fetch::{response_with, StubFetchClient};
pub use firely::{internal_activated, internal_with};
pub use log::LogCapture;

/// Polls `condition` for up to two seconds, yielding to the runtime between checks.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

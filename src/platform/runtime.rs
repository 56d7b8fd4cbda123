use std::future::Future;
use std::sync::LazyLock;

use tokio::runtime::{Builder, Handle, Runtime};

static BACKGROUND_RUNTIME: LazyLock<Option<Runtime>> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("firely-background")
        .enable_all()
        .build()
        .ok()
});

/// Runs `future` in the background.
///
/// Uses the caller's tokio runtime when there is one, otherwise a lazily started single-worker
/// runtime. Returns `false` if neither is available and the future was dropped.
pub fn spawn_detached<F>(future: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(future);
        return true;
    }
    match BACKGROUND_RUNTIME.as_ref() {
        Some(runtime) => {
            runtime.spawn(future);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn spawns_without_ambient_runtime() {
        let (tx, rx) = mpsc::channel();
        assert!(spawn_detached(async move {
            let _ = tx.send(7);
        }));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn spawns_on_ambient_runtime() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        assert!(spawn_detached(async move {
            let _ = tx.send("done");
        }));
        assert_eq!(rx.await.unwrap(), "done");
    }
}

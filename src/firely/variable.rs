use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::firely::error::{invalid_value, FirelyResult};
use crate::firely::internal::InternalFirely;
use crate::remote_config::ConfigUpdateListenerRegistration;

/// A type a [`LiveVariable`] can be read as.
pub trait RemoteType: Default + Sized {
    fn read(internal: &InternalFirely, name: &str) -> FirelyResult<Self>;
}

impl RemoteType for bool {
    fn read(internal: &InternalFirely, name: &str) -> FirelyResult<Self> {
        Ok(internal.get_boolean(name))
    }
}

impl RemoteType for String {
    fn read(internal: &InternalFirely, name: &str) -> FirelyResult<Self> {
        Ok(internal.get_string(name))
    }
}

impl RemoteType for f64 {
    fn read(internal: &InternalFirely, name: &str) -> FirelyResult<Self> {
        Ok(internal.get_double(name))
    }
}

impl RemoteType for i64 {
    fn read(internal: &InternalFirely, name: &str) -> FirelyResult<Self> {
        Ok(internal.get_long(name))
    }
}

// The store has no 32-bit accessor; the raw string is parsed instead.
impl RemoteType for i32 {
    fn read(internal: &InternalFirely, name: &str) -> FirelyResult<Self> {
        let raw = internal.get_string(name);
        raw.trim().parse::<i32>().map_err(|err| {
            invalid_value(format!("{name}: \"{raw}\" is not a 32-bit integer ({err})"))
        })
    }
}

/// A single declared key read as `T`.
///
/// ```
/// use firely::firely::{Firely, FirelyItem, FirelyOptions};
///
/// let firely = Firely::builder(vec![FirelyItem::new("max_results", 20)])
///     .options(FirelyOptions::default())
///     .build()
///     .unwrap();
/// let max_results = firely.integer_variable("max_results").unwrap();
/// assert_eq!(max_results.get(), 20);
/// ```
pub struct LiveVariable<T> {
    name: String,
    internal: Arc<InternalFirely>,
    _type: PhantomData<fn() -> T>,
}

impl<T: RemoteType> LiveVariable<T> {
    pub(crate) fn new(name: String, internal: Arc<InternalFirely>) -> Self {
        Self {
            name,
            internal,
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value, or the error that prevented the conversion.
    pub fn try_get(&self) -> FirelyResult<T> {
        T::read(&self.internal, &self.name)
    }

    /// Current value; a value that cannot be converted is logged and read as `T::default()`.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => {
                self.internal.log_error(err.to_string());
                T::default()
            }
        }
    }

    /// Activates fetched values as soon as an update touching this key arrives.
    pub fn observe_real_time(&self) -> LiveVariableDisposable {
        self.observe(None)
    }

    /// Like [`observe_real_time`](Self::observe_real_time), calling `on_error` when an update
    /// fails.
    pub fn observe_real_time_with_error<F>(&self, on_error: F) -> LiveVariableDisposable
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observe(Some(Box::new(on_error)))
    }

    fn observe(&self, on_error: Option<Box<dyn Fn() + Send + Sync>>) -> LiveVariableDisposable {
        let name = self.name.clone();
        let internal = Arc::downgrade(&self.internal);
        let registration = self
            .internal
            .remote_config()
            .add_config_update_listener(move |event| {
                let Some(internal) = internal.upgrade() else {
                    return;
                };
                match event {
                    Ok(update) => {
                        if update.contains(&name) {
                            internal.spawn_activate();
                        }
                    }
                    Err(err) => {
                        internal.log_debug(format!("Error observing remote configs: {err}"));
                        if let Some(on_error) = &on_error {
                            on_error();
                        }
                    }
                }
            });
        LiveVariableDisposable { registration }
    }
}

impl<T> fmt::Debug for LiveVariable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveVariable")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Keeps a [`LiveVariable`] observation alive.
#[must_use = "dropping the disposable stops the observation"]
pub struct LiveVariableDisposable {
    registration: ConfigUpdateListenerRegistration,
}

impl LiveVariableDisposable {
    pub fn dispose(self) {
        self.registration.remove();
    }
}

impl fmt::Debug for LiveVariableDisposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveVariableDisposable").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::firely::config::FirelyItem;
    use crate::firely::log::FirelyLogLevel;
    use crate::remote_config::error::fetch_failed;
    use crate::test_support::{
        internal_activated, internal_with, response_with, wait_until, LogCapture,
        StubFetchClient,
    };

    fn items() -> Vec<FirelyItem> {
        vec![
            FirelyItem::new("variable_flag", false),
            FirelyItem::new("variable_text", "hello"),
            FirelyItem::new("variable_ratio", 0.5),
            FirelyItem::new("variable_count", 7),
        ]
    }

    #[tokio::test(flavor = "current_thread")]
    async fn coerces_remote_strings() {
        let internal = internal_activated(
            items(),
            &[
                ("variable_flag", "YES"),
                ("variable_text", "bonjour"),
                ("variable_ratio", "1.25"),
                ("variable_count", " 42 "),
            ],
        )
        .await;

        assert!(LiveVariable::<bool>::new("variable_flag".into(), internal.clone()).get());
        assert_eq!(
            LiveVariable::<String>::new("variable_text".into(), internal.clone()).get(),
            "bonjour"
        );
        assert_eq!(
            LiveVariable::<f64>::new("variable_ratio".into(), internal.clone()).get(),
            1.25
        );
        assert_eq!(
            LiveVariable::<i64>::new("variable_count".into(), internal.clone()).get(),
            42
        );
        assert_eq!(
            LiveVariable::<i32>::new("variable_count".into(), internal).get(),
            42
        );
    }

    #[test]
    fn reads_declared_defaults_before_any_fetch() {
        let internal = internal_with(items(), &Arc::new(StubFetchClient::new()));

        assert!(!LiveVariable::<bool>::new("variable_flag".into(), internal.clone()).get());
        assert_eq!(
            LiveVariable::<f64>::new("variable_ratio".into(), internal.clone()).get(),
            0.5
        );
        assert_eq!(
            LiveVariable::<i32>::new("variable_count".into(), internal.clone()).get(),
            7
        );
        assert_eq!(
            LiveVariable::<String>::new("undeclared_key".into(), internal).get(),
            ""
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unparsable_integer_is_an_error() {
        let internal = internal_activated(items(), &[("variable_count", "12.5")]).await;
        let variable = LiveVariable::<i32>::new("variable_count".into(), internal.clone());

        let err = variable.try_get().unwrap_err();
        assert_eq!(err.code_str(), "firely/invalid-value");

        let capture = LogCapture::start();
        internal.set_log_level(FirelyLogLevel::Error);
        assert_eq!(variable.get(), 0);
        assert!(capture
            .records()
            .iter()
            .any(|(_, message)| message.contains("variable_count")));
        // The long accessor still truncates the double.
        assert_eq!(
            LiveVariable::<i64>::new("variable_count".into(), internal).get(),
            12
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn observation_activates_updates_for_its_key() {
        let client = Arc::new(StubFetchClient::new());
        client.push_response(response_with(&[("variable_text", "updated")]));
        let internal = internal_with(items(), &client);
        let variable = LiveVariable::<String>::new("variable_text".into(), internal.clone());
        let disposable = variable.observe_real_time();

        internal
            .remote_config()
            .fetch_with_expiration(Duration::ZERO)
            .await
            .unwrap();

        assert!(wait_until(|| variable.get() == "updated").await);
        assert_eq!(internal.current_known_values()["variable_text"], "updated");
        disposable.dispose();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn updates_for_other_keys_are_not_activated() {
        let client = Arc::new(StubFetchClient::new());
        client.push_response(response_with(&[("variable_flag", "true")]));
        let internal = internal_with(items(), &client);
        let variable = LiveVariable::<String>::new("variable_text".into(), internal.clone());
        let _disposable = variable.observe_real_time();

        internal
            .remote_config()
            .fetch_with_expiration(Duration::ZERO)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(internal.remote_config().has_staged_config());
        assert!(!internal.get_boolean("variable_flag"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn errors_reach_the_callback_until_disposed() {
        let client = Arc::new(StubFetchClient::new());
        client.push_error(fetch_failed("offline"));
        client.push_error(fetch_failed("still offline"));
        let internal = internal_with(items(), &client);
        let variable = LiveVariable::<bool>::new("variable_flag".into(), internal.clone());

        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        let disposable = variable.observe_real_time_with_error(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let remote_config = internal.remote_config();
        assert!(remote_config.fetch_with_expiration(Duration::ZERO).await.is_err());
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        disposable.dispose();
        assert!(remote_config.fetch_with_expiration(Duration::ZERO).await.is_err());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}

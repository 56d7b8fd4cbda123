use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

use crate::firely::code_block::CodeBlock;
use crate::firely::config::FirelyConfig;
use crate::firely::error::{empty_variable, not_setup, FirelyResult};
use crate::firely::internal::InternalFirely;
use crate::firely::lifecycle::{LifecycleAction, LifecycleEvent};
use crate::firely::log::FirelyLogLevel;
use crate::firely::options::FirelyOptions;
use crate::firely::ordered_array_block::OrderedArrayBlock;
use crate::firely::preferences::{FilePreferenceStore, InMemoryPreferenceStore, PreferenceStore};
use crate::firely::variable::{LiveVariable, RemoteType};
use crate::remote_config::fetch::RemoteConfigFetchClient;
use crate::remote_config::RemoteConfig;

static INSTANCE: LazyLock<RwLock<Option<Firely>>> = LazyLock::new(|| RwLock::new(None));

/// Entry point for declared feature flags and experiments.
///
/// Cloning is cheap; every clone shares the same store and settings.
#[derive(Clone)]
pub struct Firely {
    internal: Arc<InternalFirely>,
}

impl Firely {
    pub fn builder(config: impl FirelyConfig + 'static) -> FirelyBuilder {
        FirelyBuilder::new(Arc::new(config))
    }

    /// Builds an instance from `options` and registers it as the global one.
    pub fn setup(config: impl FirelyConfig + 'static, options: FirelyOptions) -> FirelyResult<Self> {
        Self::builder(config).options(options).install()
    }

    /// The instance registered by [`setup`](Self::setup).
    pub fn instance() -> FirelyResult<Self> {
        INSTANCE.read().unwrap().clone().ok_or_else(not_setup)
    }

    /// Unregisters the global instance, returning it.
    pub fn shutdown() -> Option<Self> {
        INSTANCE.write().unwrap().take()
    }

    pub fn set_debug_mode(&self, debug_mode: bool) -> &Self {
        self.internal.set_debug_mode(debug_mode);
        self
    }

    pub fn set_log_level(&self, log_level: FirelyLogLevel) -> &Self {
        self.internal.set_log_level(log_level);
        self
    }

    pub fn log_level(&self) -> FirelyLogLevel {
        self.internal.log_level()
    }

    pub fn code_block(&self, item: impl AsRef<str>) -> FirelyResult<CodeBlock> {
        Ok(CodeBlock::new(checked_name(item)?, self.internal.clone()))
    }

    pub fn ordered_array_block<'a>(
        &self,
        item: impl AsRef<str>,
    ) -> FirelyResult<OrderedArrayBlock<'a>> {
        Ok(OrderedArrayBlock::new(
            checked_name(item)?,
            self.internal.clone(),
        ))
    }

    pub fn double_variable(&self, item: impl AsRef<str>) -> FirelyResult<LiveVariable<f64>> {
        self.variable(item)
    }

    pub fn boolean_variable(&self, item: impl AsRef<str>) -> FirelyResult<LiveVariable<bool>> {
        self.variable(item)
    }

    pub fn integer_variable(&self, item: impl AsRef<str>) -> FirelyResult<LiveVariable<i32>> {
        self.variable(item)
    }

    pub fn string_variable(&self, item: impl AsRef<str>) -> FirelyResult<LiveVariable<String>> {
        self.variable(item)
    }

    pub fn long_variable(&self, item: impl AsRef<str>) -> FirelyResult<LiveVariable<i64>> {
        self.variable(item)
    }

    pub fn variable<T: RemoteType>(&self, item: impl AsRef<str>) -> FirelyResult<LiveVariable<T>> {
        Ok(LiveVariable::new(checked_name(item)?, self.internal.clone()))
    }

    /// Current value of every declared key, suitable for analytics properties.
    pub fn values_as_map(&self) -> HashMap<String, String> {
        self.internal.current_known_values()
    }

    pub fn internal(&self) -> &Arc<InternalFirely> {
        &self.internal
    }

    pub fn handle_lifecycle_event(&self, event: LifecycleEvent) -> LifecycleAction {
        self.internal.handle_lifecycle_event(event)
    }
}

impl fmt::Debug for Firely {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firely")
            .field("internal", &self.internal)
            .finish()
    }
}

fn checked_name(item: impl AsRef<str>) -> FirelyResult<String> {
    let name = item.as_ref();
    if name.is_empty() {
        return Err(empty_variable());
    }
    Ok(name.to_string())
}

/// Assembles a [`Firely`] from options and optional collaborators.
///
/// Collaborators set explicitly take precedence over the ones derived from options.
pub struct FirelyBuilder {
    config: Arc<dyn FirelyConfig>,
    options: FirelyOptions,
    fetch_client: Option<Arc<dyn RemoteConfigFetchClient>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    remote_config: Option<RemoteConfig>,
}

impl FirelyBuilder {
    fn new(config: Arc<dyn FirelyConfig>) -> Self {
        Self {
            config,
            options: FirelyOptions::default(),
            fetch_client: None,
            preferences: None,
            remote_config: None,
        }
    }

    pub fn options(mut self, options: FirelyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn fetch_client(mut self, fetch_client: Arc<dyn RemoteConfigFetchClient>) -> Self {
        self.fetch_client = Some(fetch_client);
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn remote_config(mut self, remote_config: RemoteConfig) -> Self {
        self.remote_config = Some(remote_config);
        self
    }

    pub fn build(self) -> FirelyResult<Firely> {
        let remote_config = match self.remote_config {
            Some(remote_config) => remote_config,
            None => match &self.options.storage_path {
                Some(path) => RemoteConfig::with_file_storage(path.clone())?,
                None => RemoteConfig::new(),
            },
        };

        let fetch_client = match self.fetch_client {
            Some(fetch_client) => Some(fetch_client),
            None => match &self.options.backend {
                Some(backend) => {
                    Some(Arc::new(backend.fetch_client()?) as Arc<dyn RemoteConfigFetchClient>)
                }
                None => None,
            },
        };
        if let Some(fetch_client) = fetch_client {
            remote_config.set_fetch_client(fetch_client);
        }

        let preferences: Arc<dyn PreferenceStore> = match self.preferences {
            Some(preferences) => preferences,
            None => match &self.options.preferences_path {
                Some(path) => Arc::new(FilePreferenceStore::new(path.clone())?),
                None => Arc::new(InMemoryPreferenceStore::default()),
            },
        };

        let internal = InternalFirely::new(remote_config, self.config, preferences);
        internal.set_log_level(self.options.log_level);
        internal.set_debug_mode(self.options.debug_mode);
        Ok(Firely { internal })
    }

    /// Builds and registers the result as the global instance.
    pub fn install(self) -> FirelyResult<Firely> {
        let firely = self.build()?;
        *INSTANCE.write().unwrap() = Some(firely.clone());
        Ok(firely)
    }
}

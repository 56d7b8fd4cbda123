#![doc = include_str!("README.md")]
mod api;
pub mod code_block;
pub mod config;
pub mod error;
pub mod internal;
pub mod lifecycle;
pub(crate) mod log;
pub mod options;
pub mod ordered_array_block;
pub mod preferences;
pub mod variable;

pub use api::{Firely, FirelyBuilder};
pub use code_block::{BranchOutcome, CodeBlock, CodeBranch};
pub use config::{DefaultValue, FirelyConfig, FirelyGroup, FirelyItem, GroupedConfig};
pub use error::{FirelyError, FirelyErrorCode, FirelyResult};
pub use internal::InternalFirely;
pub use lifecycle::{LifecycleAction, LifecycleEvent};
pub use log::FirelyLogLevel;
pub use options::{BackendOptions, FirelyOptions};
pub use ordered_array_block::OrderedArrayBlock;
pub use preferences::{FilePreferenceStore, InMemoryPreferenceStore, PreferenceStore};
pub use variable::{LiveVariable, LiveVariableDisposable, RemoteType};

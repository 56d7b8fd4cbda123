//! Declared configuration keys and their typed defaults.
//!
//! Keys are grouped the way the `firely-config.json` document groups them:
//!
//! ```json
//! {
//!   "experiment": [ { "key": "xp_text_variant", "default": "A" } ],
//!   "feature_flag": [ { "key": "feature_flag_1", "default": false } ]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::firely::error::{invalid_config, FirelyResult};

/// A typed default value. The remote store only knows strings, see [`DefaultValue::to_config_string`].
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
}

impl DefaultValue {
    /// Textual form pushed to the remote store as the key's default.
    pub fn to_config_string(&self) -> String {
        match self {
            DefaultValue::Bool(value) => value.to_string(),
            DefaultValue::Long(value) => value.to_string(),
            DefaultValue::Double(value) => format!("{value:?}"),
            DefaultValue::String(value) => value.clone(),
        }
    }

    fn from_json(key: &str, value: &JsonValue) -> FirelyResult<Self> {
        match value {
            JsonValue::Bool(flag) => Ok(DefaultValue::Bool(*flag)),
            JsonValue::String(text) => Ok(DefaultValue::String(text.clone())),
            JsonValue::Number(number) => match number.as_i64() {
                Some(long) => Ok(DefaultValue::Long(long)),
                None => number
                    .as_f64()
                    .map(DefaultValue::Double)
                    .ok_or_else(|| invalid_config(format!("default of '{key}' is out of range"))),
            },
            other => Err(invalid_config(format!(
                "default of '{key}' must be a string, number or boolean, got {other}"
            ))),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_config_string())
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Bool(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        DefaultValue::Long(value.into())
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        DefaultValue::Long(value)
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        DefaultValue::Double(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::String(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::String(value)
    }
}

/// One declared key.
#[derive(Clone, Debug, PartialEq)]
pub struct FirelyItem {
    key: String,
    default: DefaultValue,
}

impl FirelyItem {
    pub fn new(key: impl Into<String>, default: impl Into<DefaultValue>) -> Self {
        Self {
            key: key.into(),
            default: default.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }
}

impl AsRef<str> for FirelyItem {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

/// A named group of declared keys, e.g. `experiment` or `feature_flag`.
#[derive(Clone, Debug, PartialEq)]
pub struct FirelyGroup {
    name: String,
    items: Vec<FirelyItem>,
}

impl FirelyGroup {
    pub fn new(name: impl Into<String>, items: Vec<FirelyItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper camel case form of the group name: `feature_flag` becomes `FeatureFlag`.
    ///
    /// The first character is upper-cased, then every `_` followed by a word character is
    /// replaced by that character upper-cased. A trailing `_` is kept.
    pub fn type_name(&self) -> String {
        let mut capitalized = String::with_capacity(self.name.len());
        let mut chars = self.name.chars();
        if !self.name.trim().is_empty() {
            if let Some(first) = chars.next() {
                capitalized.extend(first.to_uppercase());
            }
        }
        capitalized.extend(chars);

        let mut converted = String::with_capacity(capitalized.len());
        let mut chars = capitalized.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '_' {
                let next = chars.next_if(|next| next.is_ascii_alphanumeric() || *next == '_');
                if let Some(next) = next {
                    converted.extend(next.to_uppercase());
                    continue;
                }
            }
            converted.push(ch);
        }
        converted
    }

    pub fn items(&self) -> &[FirelyItem] {
        &self.items
    }
}

/// Source of the keys an application declares.
pub trait FirelyConfig: Send + Sync {
    fn all_values(&self) -> Vec<FirelyItem>;
}

/// Keys organised in groups, built in code or loaded from a `firely-config.json` document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupedConfig {
    groups: Vec<FirelyGroup>,
}

impl GroupedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a group. Empty groups are ignored.
    pub fn with_group(mut self, name: impl Into<String>, items: Vec<FirelyItem>) -> Self {
        if !items.is_empty() {
            self.groups.push(FirelyGroup::new(name, items));
        }
        self
    }

    pub fn from_json_str(document: &str) -> FirelyResult<Self> {
        let value: JsonValue = serde_json::from_str(document)
            .map_err(|err| invalid_config(format!("failed to parse Firely config: {err}")))?;
        let JsonValue::Object(groups) = value else {
            return Err(invalid_config("Firely config must be a JSON object"));
        };
        Self::from_json_groups(groups)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FirelyResult<Self> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|err| {
            invalid_config(format!("unable to read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&document)
    }

    fn from_json_groups(groups: JsonMap<String, JsonValue>) -> FirelyResult<Self> {
        let mut config = GroupedConfig::new();
        let mut seen = HashSet::new();
        for (group_name, entries) in groups {
            let JsonValue::Array(entries) = entries else {
                return Err(invalid_config(format!(
                    "group '{group_name}' must be an array"
                )));
            };
            let mut items = Vec::with_capacity(entries.len());
            for entry in &entries {
                let key = entry
                    .get("key")
                    .and_then(JsonValue::as_str)
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| {
                        invalid_config(format!("entry in '{group_name}' is missing a key"))
                    })?;
                let default = entry.get("default").ok_or_else(|| {
                    invalid_config(format!("key '{key}' is missing a default"))
                })?;
                if !seen.insert(key.to_string()) {
                    return Err(invalid_config(format!("key '{key}' is declared twice")));
                }
                items.push(FirelyItem::new(key, DefaultValue::from_json(key, default)?));
            }
            config = config.with_group(group_name, items);
        }
        Ok(config)
    }

    pub fn groups(&self) -> &[FirelyGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&FirelyGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn item(&self, key: &str) -> Option<&FirelyItem> {
        self.groups
            .iter()
            .flat_map(|group| group.items.iter())
            .find(|item| item.key == key)
    }
}

impl FirelyConfig for GroupedConfig {
    fn all_values(&self) -> Vec<FirelyItem> {
        self.groups
            .iter()
            .flat_map(|group| group.items.iter().cloned())
            .collect()
    }
}

impl FirelyConfig for Vec<FirelyItem> {
    fn all_values(&self) -> Vec<FirelyItem> {
        self.clone()
    }
}

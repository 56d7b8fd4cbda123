//! Remote Config values and their typed coercions.
//!
//! Every parameter is stored as text; callers choose how to read it. Missing keys resolve to a
//! static value whose coercions all return the zero value of the requested type.

/// Indicates where a Remote Config value originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteConfigValueSource {
    /// Value fetched from the backend and activated.
    Remote,
    /// Default value declared by the application.
    Default,
    /// Fallback used when the key has neither a remote nor a default entry.
    Static,
}

impl RemoteConfigValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteConfigValueSource::Remote => "remote",
            RemoteConfigValueSource::Default => "default",
            RemoteConfigValueSource::Static => "static",
        }
    }
}

/// A Remote Config parameter value with typed accessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfigValue {
    source: RemoteConfigValueSource,
    value: String,
}

impl RemoteConfigValue {
    const DEFAULT_BOOLEAN: bool = false;
    const DEFAULT_DOUBLE: f64 = 0.0;
    const DEFAULT_LONG: i64 = 0;
    const BOOLEAN_TRUTHY_VALUES: [&'static str; 6] = ["1", "true", "t", "yes", "y", "on"];

    pub(crate) fn new(source: RemoteConfigValueSource, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }

    pub(crate) fn static_value() -> Self {
        Self::new(RemoteConfigValueSource::Static, String::new())
    }

    /// Returns the raw value.
    ///
    /// # Examples
    ///
    /// ```
    /// use firely::remote_config::value::RemoteConfigValue;
    ///
    /// let value = RemoteConfigValue::default();
    /// assert_eq!(value.as_string(), "");
    /// ```
    pub fn as_string(&self) -> String {
        self.value.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns `true` for case-insensitive values in `{"1", "true", "t", "yes", "y", "on"}`.
    pub fn as_bool(&self) -> bool {
        if self.source == RemoteConfigValueSource::Static {
            return Self::DEFAULT_BOOLEAN;
        }
        let trimmed = self.value.trim();
        Self::BOOLEAN_TRUTHY_VALUES
            .iter()
            .any(|truthy| trimmed.eq_ignore_ascii_case(truthy))
    }

    /// Returns the value as a double. Unparseable values and `NaN` read as `0.0`.
    pub fn as_double(&self) -> f64 {
        if self.source == RemoteConfigValueSource::Static {
            return Self::DEFAULT_DOUBLE;
        }
        match self.value.trim().parse::<f64>() {
            Ok(parsed) if parsed.is_nan() => Self::DEFAULT_DOUBLE,
            Ok(parsed) => parsed,
            Err(_) => Self::DEFAULT_DOUBLE,
        }
    }

    /// Returns the value as a 64-bit integer.
    ///
    /// Integral text is parsed directly; finite decimal text is truncated toward zero. Anything
    /// else reads as `0`.
    pub fn as_long(&self) -> i64 {
        if self.source == RemoteConfigValueSource::Static {
            return Self::DEFAULT_LONG;
        }
        let trimmed = self.value.trim();
        if let Ok(parsed) = trimmed.parse::<i64>() {
            return parsed;
        }
        match trimmed.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => parsed.trunc() as i64,
            _ => Self::DEFAULT_LONG,
        }
    }

    pub fn source(&self) -> RemoteConfigValueSource {
        self.source
    }
}

impl Default for RemoteConfigValue {
    fn default() -> Self {
        Self::static_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_truthy_values() {
        for truthy in RemoteConfigValue::BOOLEAN_TRUTHY_VALUES {
            let value = RemoteConfigValue::new(RemoteConfigValueSource::Remote, truthy);
            assert!(value.as_bool(), "expected {truthy} to be true");
        }
        let upper = RemoteConfigValue::new(RemoteConfigValueSource::Default, "TRUE");
        assert!(upper.as_bool());
        for falsy in ["0", "false", "off", "", "maybe"] {
            let value = RemoteConfigValue::new(RemoteConfigValueSource::Remote, falsy);
            assert!(!value.as_bool(), "expected {falsy} to be false");
        }
    }

    #[test]
    fn static_values_read_as_zero() {
        let value = RemoteConfigValue::static_value();
        assert!(!value.as_bool());
        assert_eq!(value.as_double(), 0.0);
        assert_eq!(value.as_long(), 0);
        assert_eq!(value.as_str(), "");
        assert_eq!(value.source().as_str(), "static");
    }

    #[test]
    fn double_parsing() {
        let value = RemoteConfigValue::new(RemoteConfigValueSource::Default, " 42.5 ");
        assert_eq!(value.as_double(), 42.5);

        let nan = RemoteConfigValue::new(RemoteConfigValueSource::Remote, "NaN");
        assert_eq!(nan.as_double(), 0.0);

        let text = RemoteConfigValue::new(RemoteConfigValueSource::Remote, "blue");
        assert_eq!(text.as_double(), 0.0);
    }

    #[test]
    fn long_parsing() {
        let value = RemoteConfigValue::new(RemoteConfigValueSource::Remote, "9000000000");
        assert_eq!(value.as_long(), 9_000_000_000);

        let decimal = RemoteConfigValue::new(RemoteConfigValueSource::Remote, "-3.9");
        assert_eq!(decimal.as_long(), -3);

        let text = RemoteConfigValue::new(RemoteConfigValueSource::Remote, "twelve");
        assert_eq!(text.as_long(), 0);
    }
}

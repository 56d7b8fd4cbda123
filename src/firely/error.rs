use std::fmt::{Display, Formatter};

use crate::remote_config::error::RemoteConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirelyErrorCode {
    NotSetup,
    EmptyVariable,
    InvalidConfig,
    InvalidValue,
    RemoteConfig,
    Preferences,
}

impl FirelyErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirelyErrorCode::NotSetup => "firely/not-setup",
            FirelyErrorCode::EmptyVariable => "firely/empty-variable",
            FirelyErrorCode::InvalidConfig => "firely/invalid-config",
            FirelyErrorCode::InvalidValue => "firely/invalid-value",
            FirelyErrorCode::RemoteConfig => "firely/remote-config",
            FirelyErrorCode::Preferences => "firely/preferences",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FirelyError {
    pub code: FirelyErrorCode,
    message: String,
}

impl FirelyError {
    pub fn new(code: FirelyErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FirelyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for FirelyError {}

impl From<RemoteConfigError> for FirelyError {
    fn from(err: RemoteConfigError) -> Self {
        FirelyError::new(FirelyErrorCode::RemoteConfig, err.to_string())
    }
}

pub type FirelyResult<T> = Result<T, FirelyError>;

pub fn not_setup() -> FirelyError {
    FirelyError::new(FirelyErrorCode::NotSetup, "Need to call setup() first.")
}

pub fn empty_variable() -> FirelyError {
    FirelyError::new(FirelyErrorCode::EmptyVariable, "Empty variable")
}

pub fn invalid_config(message: impl Into<String>) -> FirelyError {
    FirelyError::new(FirelyErrorCode::InvalidConfig, message)
}

pub fn invalid_value(message: impl Into<String>) -> FirelyError {
    FirelyError::new(FirelyErrorCode::InvalidValue, message)
}

pub fn preferences_error(message: impl Into<String>) -> FirelyError {
    FirelyError::new(FirelyErrorCode::Preferences, message)
}

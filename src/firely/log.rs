use std::str::FromStr;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::logger::{LogError, LogLevel, Logger};

pub(crate) static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("firely"));

/// Verbosity of Firely's own diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FirelyLogLevel {
    #[default]
    None = 0,
    Error = 1,
    Debug = 2,
}

impl FirelyLogLevel {
    pub fn error_log_enabled(self) -> bool {
        self >= FirelyLogLevel::Error
    }

    pub fn debug_log_enabled(self) -> bool {
        self >= FirelyLogLevel::Debug
    }

    /// Level applied to the crate logger when this level is selected.
    pub fn logger_level(self) -> LogLevel {
        match self {
            FirelyLogLevel::None => LogLevel::Silent,
            FirelyLogLevel::Error => LogLevel::Error,
            FirelyLogLevel::Debug => LogLevel::Debug,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => FirelyLogLevel::Error,
            2 => FirelyLogLevel::Debug,
            _ => FirelyLogLevel::None,
        }
    }
}

impl FromStr for FirelyLogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(FirelyLogLevel::None),
            "error" => Ok(FirelyLogLevel::Error),
            "debug" => Ok(FirelyLogLevel::Debug),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

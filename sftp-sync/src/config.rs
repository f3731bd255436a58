//! Options for the directory sync façade

use serde::{Deserialize, Serialize};

/// Default SSH port used by `login`
pub const DEFAULT_PORT: u16 = 22;

/// How failures cross the public API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Return every failure as a [`SyncError`](crate::SyncError)
    #[default]
    Strict,
    /// Log failures and return the operation's sentinel (`false`, empty
    /// list, `None`). Not connected, unusable local directories and
    /// cancellation are still returned as errors.
    Lenient,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown error policy '{}'", other)),
        }
    }
}

/// Options for a [`DirectorySync`](crate::DirectorySync)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Error propagation policy
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

impl SyncOptions {
    pub fn strict() -> Self {
        Self {
            error_policy: ErrorPolicy::Strict,
        }
    }

    pub fn lenient() -> Self {
        Self {
            error_policy: ErrorPolicy::Lenient,
        }
    }
}

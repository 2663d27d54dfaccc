//! Config fingerprinting — a stable identity for a backtest request.
//!
//! The hash covers the canonical JSON of the validated `ConfigModel`
//! (registry keys are a `BTreeMap`, so key order is fixed). Two runs with the
//! same hash submitted the same scripts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigModel;

/// BLAKE3 hex digest of a config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn of(config: &ConfigModel) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(config)?;
        Ok(Self::from_bytes(json.as_bytes()))
    }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

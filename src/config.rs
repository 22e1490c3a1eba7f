//! Engine options
//!
//! Loaded from YAML or the environment; every key is optional.
//!
//! ```yaml
//! max_depth: 128
//! pretty: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Default limit on tree depth for walk and restore.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Environment override for [`EngineOptions::max_depth`].
pub const ENV_MAX_DEPTH: &str = "COMPONENT_STATE_MAX_DEPTH";
/// Environment override for [`EngineOptions::pretty`].
pub const ENV_PRETTY: &str = "COMPONENT_STATE_PRETTY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Deepest owner chain accepted before the call fails.
    pub max_depth: usize,
    /// Pretty-print documents in the text helpers.
    pub pretty: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            pretty: false,
        }
    }
}

impl EngineOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let options = Self::from_yaml_str(&content)?;
        debug!("Loaded engine options from {}", path.display());
        Ok(options)
    }

    /// Defaults, overridden by `COMPONENT_STATE_MAX_DEPTH` / `COMPONENT_STATE_PRETTY`.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(max_depth) = std::env::var(ENV_MAX_DEPTH)
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            options.max_depth = max_depth;
        }
        if let Some(pretty) = std::env::var(ENV_PRETTY)
            .ok()
            .and_then(|v| parse_flag(&v))
        {
            options.pretty = pretty;
        }
        options
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

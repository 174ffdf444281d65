//! Engine options and their YAML/JSON loader.

use std::path::Path;

use prov_core::errors::ErrorInfo;
use prov_core::serde::{from_yaml_slice, read_document};
use prov_core::ProvError;
use serde::{Deserialize, Serialize};

/// Scheduling options for [`crate::Engine`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker threads used to run the modules of one wave. `1` runs sequentially.
    #[serde(default = "EngineConfig::default_parallelism")]
    pub parallelism: usize,
    /// Converts a panicking module into a module failure instead of unwinding.
    #[serde(default = "EngineConfig::default_capture_panics")]
    pub capture_panics: bool,
    /// Logs established values that no module reads.
    #[serde(default = "EngineConfig::default_warn_unreferenced")]
    pub warn_unreferenced: bool,
}

impl EngineConfig {
    const fn default_parallelism() -> usize {
        1
    }

    const fn default_capture_panics() -> bool {
        true
    }

    const fn default_warn_unreferenced() -> bool {
        true
    }

    /// Sequential dispatch with panic capture enabled.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Same as the default but dispatching each wave on `threads` workers.
    pub fn parallel(threads: usize) -> Self {
        Self {
            parallelism: threads.max(1),
            ..Self::default()
        }
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_slice(data: &[u8]) -> Result<Self, ProvError> {
        let config: Self = from_yaml_slice(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects options the scheduler cannot honour.
    pub fn validate(&self) -> Result<(), ProvError> {
        if self.parallelism == 0 {
            return Err(ProvError::Config(
                ErrorInfo::new("prov.config_parallelism", "parallelism must be at least 1")
                    .with_hint("use 1 for sequential dispatch"),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: Self::default_parallelism(),
            capture_panics: Self::default_capture_panics(),
            warn_unreferenced: Self::default_warn_unreferenced(),
        }
    }
}

/// Loads an engine configuration from a YAML or JSON file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ProvError> {
    let config: EngineConfig = read_document(path)?;
    config.validate()?;
    Ok(config)
}

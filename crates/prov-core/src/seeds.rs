//! Seed manifests listing established values to declare before scheduling.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ProvError;
use crate::ids::Identifier;
use crate::registry::ParameterRegistry;
use crate::serde::read_document;
use crate::types::ParamValue;

/// One established value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedEntry {
    /// Identifier of the quantity.
    pub id: Identifier,
    /// Measured value.
    pub value: ParamValue,
    /// Optional measurement uncertainty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
}

/// Collection of established values, typically loaded from YAML.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeedManifest {
    /// Seeds in declaration order.
    #[serde(default)]
    pub seeds: Vec<SeedEntry>,
}

impl SeedManifest {
    /// Declares every seed into the registry, stopping at the first error.
    pub fn declare_into(&self, registry: &mut ParameterRegistry) -> Result<usize, ProvError> {
        for seed in &self.seeds {
            registry.declare_established(seed.id.clone(), seed.value.clone(), seed.uncertainty)?;
        }
        Ok(self.seeds.len())
    }
}

/// Loads a seed manifest from a `.yaml`/`.yml` or `.json` file.
pub fn load_seed_manifest(path: &Path) -> Result<SeedManifest, ProvError> {
    read_document(path)
}

//! Read-only registry views handed to report generators and exporters.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ProvError;
use crate::hash::stable_hash_string;
use crate::ids::{Identifier, ModuleId};
use crate::provenance::{Provenance, ValueRecord};
use crate::serde::{from_json_slice, to_canonical_json_bytes};
use crate::types::ParamValue;

/// Consumer-facing projection of a [`ValueRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Central value.
    pub value: ParamValue,
    /// Optional uncertainty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
    /// Provenance class.
    pub provenance: Provenance,
    /// Producing module for computed values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_by: Option<ModuleId>,
}

/// Immutable map of identifier to record. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Arc<BTreeMap<Identifier, ValueRecord>>,
}

impl Snapshot {
    pub(crate) fn from_records(records: BTreeMap<Identifier, ValueRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// Returns the record for `id`.
    pub fn get(&self, id: &Identifier) -> Option<&ValueRecord> {
        self.records.get(id)
    }

    /// Whether the snapshot holds a record for `id`.
    pub fn contains(&self, id: &Identifier) -> bool {
        self.records.contains_key(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over records in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &ValueRecord)> {
        self.records.iter()
    }

    /// Iterates over identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = &Identifier> {
        self.records.keys()
    }

    /// Records with the requested provenance class.
    pub fn by_provenance(&self, provenance: Provenance) -> Vec<&ValueRecord> {
        self.records
            .values()
            .filter(|record| record.provenance == provenance)
            .collect()
    }

    /// Records produced by `module`.
    pub fn produced_by(&self, module: &ModuleId) -> Vec<&ValueRecord> {
        self.records
            .values()
            .filter(|record| record.produced_by.as_ref() == Some(module))
            .collect()
    }

    /// Records whose identifier lives in the given cosmetic namespace.
    pub fn namespace(&self, namespace: &str) -> Vec<&ValueRecord> {
        self.records
            .values()
            .filter(|record| record.id.namespace() == namespace)
            .collect()
    }

    /// Records ordered by write sequence.
    pub fn in_write_order(&self) -> Vec<&ValueRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by_key(|record| record.sequence);
        records
    }

    /// Consumer-facing projection of every record.
    pub fn entries(&self) -> BTreeMap<Identifier, SnapshotEntry> {
        self.records
            .iter()
            .map(|(id, record)| {
                (
                    id.clone(),
                    SnapshotEntry {
                        value: record.value.clone(),
                        uncertainty: record.uncertainty,
                        provenance: record.provenance,
                        produced_by: record.produced_by.clone(),
                    },
                )
            })
            .collect()
    }

    /// Stable SHA256 digest of the full snapshot.
    pub fn digest(&self) -> Result<String, ProvError> {
        stable_hash_string(self)
    }

    /// Deterministic JSON export.
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, ProvError> {
        to_canonical_json_bytes(self)
    }

    /// Loads a snapshot previously exported with [`Snapshot::to_canonical_json_bytes`].
    pub fn from_json_slice(data: &[u8]) -> Result<Self, ProvError> {
        from_json_slice(data)
    }
}

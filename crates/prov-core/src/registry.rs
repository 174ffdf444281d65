//! Shared store of value records enforcing single-writer provenance tiers.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ErrorInfo, ProvError};
use crate::ids::{Identifier, ModuleId};
use crate::provenance::{Provenance, ValueRecord};
use crate::snapshot::Snapshot;
use crate::types::{Estimate, ParamValue};

/// A single output write submitted by a computation module.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    /// Module performing the write.
    pub module_id: ModuleId,
    /// Identifier being written.
    pub id: Identifier,
    /// Value and uncertainty produced.
    pub estimate: Estimate,
    /// Class the module declares for this output.
    pub provenance: Provenance,
    /// Identifiers the module read to produce the value.
    pub depends_on: BTreeSet<Identifier>,
}

/// Records a DERIVED/PREDICTED class change made by a producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reclassification {
    /// Identifier whose class changed.
    pub id: Identifier,
    /// Producer that re-declared the class.
    pub module: ModuleId,
    /// Class before the write.
    pub before: Provenance,
    /// Class after the write.
    pub after: Provenance,
    /// Run in which the change happened.
    pub run: u64,
}

/// Key/value store of [`ValueRecord`]s.
///
/// Established records are write-once. Computed records belong to the module
/// that first committed them and may be refreshed by that module once per run.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    records: BTreeMap<Identifier, ValueRecord>,
    sequence: u64,
    run: u64,
    reclassified: Vec<Reclassification>,
}

impl ParameterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an ESTABLISHED record.
    pub fn declare_established(
        &mut self,
        id: impl Into<Identifier>,
        value: impl Into<ParamValue>,
        uncertainty: Option<f64>,
    ) -> Result<&ValueRecord, ProvError> {
        let id = id.into();
        let value = value.into();
        if let Some(existing) = self.records.get(&id) {
            return Err(ProvError::DuplicateEstablished(
                ErrorInfo::new("prov.duplicate_established", "identifier already declared")
                    .with_context("id", id.as_str())
                    .with_context("existing", existing.provenance.label()),
            ));
        }
        if !value.is_finite() || !uncertainty.map_or(true, f64::is_finite) {
            return Err(ProvError::InvalidValue(
                ErrorInfo::new("prov.non_finite_seed", "established value must be finite")
                    .with_context("id", id.as_str()),
            ));
        }
        let sequence = self.next_sequence();
        debug!(id = %id, sequence, "established value declared");
        let record = ValueRecord::established(id.clone(), value, uncertainty, sequence);
        Ok(self.records.entry(id).or_insert(record))
    }

    /// Inserts or refreshes a DERIVED/PREDICTED record.
    pub fn commit(&mut self, request: CommitRequest) -> Result<&ValueRecord, ProvError> {
        let CommitRequest {
            module_id,
            id,
            estimate,
            provenance,
            depends_on,
        } = request;

        if !provenance.is_computed() {
            return Err(ProvError::override_violation(
                "prov.commit_established_class",
                &id,
                &module_id,
                "modules cannot commit established values",
            ));
        }
        let mut previous_class = None;
        if let Some(existing) = self.records.get(&id) {
            match &existing.produced_by {
                None => {
                    return Err(ProvError::override_violation(
                        "prov.override_established",
                        &id,
                        &module_id,
                        "established values are write-once",
                    ));
                }
                Some(owner) if *owner != module_id => {
                    return Err(ProvError::OverrideViolation(
                        ErrorInfo::new("prov.foreign_owner", "identifier owned by another module")
                            .with_context("id", id.as_str())
                            .with_context("module", module_id.as_str())
                            .with_context("owner", owner.as_str())
                            .with_hint("release the identifier before reassigning it"),
                    ));
                }
                Some(_) if existing.run == self.run => {
                    return Err(ProvError::override_violation(
                        "prov.double_commit",
                        &id,
                        &module_id,
                        "identifier already committed in this run",
                    ));
                }
                Some(_) => {
                    if existing.provenance != provenance {
                        previous_class = Some(existing.provenance);
                    }
                }
            }
        }
        if let Some(missing) = depends_on.iter().find(|dep| !self.records.contains_key(*dep)) {
            return Err(ProvError::unresolved(missing));
        }
        if !estimate.is_finite() {
            return Err(ProvError::InvalidValue(
                ErrorInfo::new("prov.non_finite_commit", "committed value must be finite")
                    .with_context("id", id.as_str())
                    .with_context("module", module_id.as_str()),
            ));
        }

        if let Some(before) = previous_class {
            warn!(
                id = %id,
                module = %module_id,
                %before,
                after = %provenance,
                "provenance reclassified by producer"
            );
            self.reclassified.push(Reclassification {
                id: id.clone(),
                module: module_id.clone(),
                before,
                after: provenance,
                run: self.run,
            });
        }

        let sequence = self.next_sequence();
        debug!(id = %id, module = %module_id, sequence, "value committed");
        let record = ValueRecord {
            id: id.clone(),
            value: estimate.value,
            uncertainty: estimate.uncertainty,
            provenance,
            produced_by: Some(module_id),
            depends_on,
            sequence,
            run: self.run,
        };
        let slot = match self.records.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(record);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(record),
        };
        Ok(slot)
    }

    /// Returns the record for `id`.
    pub fn get(&self, id: &Identifier) -> Result<&ValueRecord, ProvError> {
        self.records.get(id).ok_or_else(|| ProvError::unresolved(id))
    }

    /// Returns the record for `id` if one exists.
    pub fn try_get(&self, id: &Identifier) -> Option<&ValueRecord> {
        self.records.get(id)
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: &Identifier) -> bool {
        self.records.contains_key(id)
    }

    /// Returns the module owning `id`, if it is a computed record.
    pub fn owner(&self, id: &Identifier) -> Option<&ModuleId> {
        self.records
            .get(id)
            .and_then(|record| record.produced_by.as_ref())
    }

    /// Whether `id` is an established record.
    pub fn is_established(&self, id: &Identifier) -> bool {
        self.records
            .get(id)
            .is_some_and(ValueRecord::is_established)
    }

    /// Iterates over identifiers of established records.
    pub fn established_ids(&self) -> impl Iterator<Item = &Identifier> {
        self.records
            .values()
            .filter(|record| record.is_established())
            .map(|record| &record.id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a read-only snapshot of every record.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_records(self.records.clone())
    }

    /// Opens a new scheduling run and returns its number.
    pub fn begin_run(&mut self) -> u64 {
        self.run += 1;
        self.reclassified.clear();
        debug!(run = self.run, sequence = self.sequence, "registry run opened");
        self.run
    }

    /// Number of the current run (0 before the first run).
    pub fn current_run(&self) -> u64 {
        self.run
    }

    /// Last sequence number handed out.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Reclassifications made during the current run.
    pub fn reclassifications(&self) -> &[Reclassification] {
        &self.reclassified
    }

    /// Removes a computed record so a different module may claim the identifier.
    pub fn release(&mut self, id: &Identifier) -> Result<ValueRecord, ProvError> {
        let record = self.get(id)?;
        if record.is_established() {
            return Err(ProvError::OverrideViolation(
                ErrorInfo::new("prov.release_established", "established values cannot be released")
                    .with_context("id", id.as_str()),
            ));
        }
        let released = self.records.remove(id).ok_or_else(|| ProvError::unresolved(id))?;
        debug!(id = %id, owner = ?released.produced_by, "record released");
        Ok(released)
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(module: &str, id: &str, value: f64, provenance: Provenance) -> CommitRequest {
        CommitRequest {
            module_id: ModuleId::from(module),
            id: Identifier::from(id),
            estimate: Estimate::exact(value),
            provenance,
            depends_on: BTreeSet::new(),
        }
    }

    #[test]
    fn sequence_increments_on_every_write() {
        let mut registry = ParameterRegistry::new();
        registry.declare_established("a", 1.0, None).unwrap();
        registry.begin_run();
        let seq = registry
            .commit(request("m", "b", 2.0, Provenance::Derived))
            .unwrap()
            .sequence;
        assert_eq!(seq, 2);
        assert_eq!(registry.sequence(), 2);
    }

    #[test]
    fn reclassification_is_recorded_for_the_run() {
        let mut registry = ParameterRegistry::new();
        registry.begin_run();
        registry
            .commit(request("m", "x", 1.0, Provenance::Derived))
            .unwrap();
        registry.begin_run();
        registry
            .commit(request("m", "x", 1.0, Provenance::Predicted))
            .unwrap();
        let changes = registry.reclassifications();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before, Provenance::Derived);
        assert_eq!(changes[0].after, Provenance::Predicted);
        assert_eq!(changes[0].run, 2);

        registry.begin_run();
        assert!(registry.reclassifications().is_empty());
    }

    #[test]
    fn commit_rejects_established_class() {
        let mut registry = ParameterRegistry::new();
        let err = registry
            .commit(request("m", "x", 1.0, Provenance::Established))
            .unwrap_err();
        assert_eq!(err.code(), "prov.commit_established_class");
    }
}

//! Run results and provenance summaries handed back to callers.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use prov_core::serde::to_canonical_json_bytes;
use prov_core::{
    stable_hash_string, Identifier, ModuleId, ProvError, Provenance, Reclassification, Snapshot,
};
use serde::{Deserialize, Serialize};

use crate::audit::AuditReport;

/// Outcome of one module within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ModuleStatus {
    /// Module ran and every output was committed.
    Ran,
    /// Module was not invoked because a module it depends on failed.
    SkippedUpstreamFailure {
        /// Failed module at the root of the skipped subtree.
        upstream: ModuleId,
    },
    /// Module returned an error, panicked or produced unusable outputs.
    Failed {
        /// Failure cause.
        cause: String,
    },
}

impl ModuleStatus {
    /// Whether the module ran successfully.
    pub fn is_ran(&self) -> bool {
        matches!(self, ModuleStatus::Ran)
    }
}

impl Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStatus::Ran => f.write_str("RAN"),
            ModuleStatus::SkippedUpstreamFailure { .. } => f.write_str("SKIPPED_UPSTREAM_FAILURE"),
            ModuleStatus::Failed { cause } => write!(f, "FAILED: {cause}"),
        }
    }
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStatus {
    /// Every module ran.
    Success,
    /// At least one module failed or was skipped.
    Partial,
}

/// Everything a caller learns from [`crate::Engine::execute_pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Registry run number.
    pub run: u64,
    /// Aggregate outcome.
    pub status: PipelineStatus,
    /// Outcome per module.
    pub per_module_status: BTreeMap<ModuleId, ModuleStatus>,
    /// Modules that were invoked, in scheduling order.
    pub execution_order: Vec<ModuleId>,
    /// Scheduling waves, each in ascending module id order.
    pub waves: Vec<Vec<ModuleId>>,
    /// Post-run audit.
    pub audit: AuditReport,
    /// Class changes made during the run.
    pub reclassified: Vec<Reclassification>,
    /// Registry contents once the run finished.
    pub final_snapshot: Snapshot,
    /// Registry sequence counter before the first commit of the run.
    pub sequence_start: u64,
}

impl PipelineResult {
    /// Renders one `module: STATUS` line per module.
    pub fn status_report(&self) -> String {
        let mut lines = Vec::with_capacity(self.per_module_status.len() + 1);
        lines.push(format!(
            "run {} {} ({} modules)",
            self.run,
            match self.status {
                PipelineStatus::Success => "SUCCESS",
                PipelineStatus::Partial => "PARTIAL",
            },
            self.per_module_status.len()
        ));
        for (module, status) in &self.per_module_status {
            lines.push(format!("{module}: {status}"));
        }
        lines.join("\n")
    }

    /// Sequence numbers of the records written during this run, relative to
    /// [`PipelineResult::sequence_start`].
    pub fn relative_sequences(&self) -> BTreeMap<Identifier, u64> {
        self.final_snapshot
            .iter()
            .filter(|(_, record)| record.run == self.run && record.sequence > self.sequence_start)
            .map(|(id, record)| (id.clone(), record.sequence - self.sequence_start))
            .collect()
    }

    /// Status of `module`, if it is part of the run.
    pub fn module_status(&self, module: &ModuleId) -> Option<&ModuleStatus> {
        self.per_module_status.get(module)
    }
}

/// Number of records per provenance class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceCounts {
    /// ESTABLISHED records.
    pub established: usize,
    /// DERIVED records.
    pub derived: usize,
    /// PREDICTED records.
    pub predicted: usize,
}

/// A class change visible in a provenance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassChange {
    /// Identifier whose class changed.
    pub id: Identifier,
    /// Previous class.
    pub before: Provenance,
    /// Current class.
    pub after: Provenance,
}

/// Summary of the registry contents, optionally diffed against an earlier snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceReport {
    /// Content-addressed hash of the report body.
    pub report_hash: String,
    /// Records per class.
    pub counts: ProvenanceCounts,
    /// Class changes.
    pub reclassified: Vec<ClassChange>,
    /// Identifiers absent from the previous snapshot.
    pub added: Vec<Identifier>,
    /// Identifiers present only in the previous snapshot.
    pub removed: Vec<Identifier>,
    /// Digest of the snapshot the report describes.
    pub snapshot_digest: String,
}

impl ProvenanceReport {
    /// Builds a report for `current`.
    ///
    /// With a `previous` snapshot, class changes, additions and removals are
    /// computed by diffing. Without one, class changes come from `recent`.
    pub fn new(
        current: &Snapshot,
        previous: Option<&Snapshot>,
        recent: &[Reclassification],
    ) -> Result<Self, ProvError> {
        let mut counts = ProvenanceCounts::default();
        for (_, record) in current.iter() {
            match record.provenance {
                Provenance::Established => counts.established += 1,
                Provenance::Derived => counts.derived += 1,
                Provenance::Predicted => counts.predicted += 1,
            }
        }

        let (reclassified, added, removed) = match previous {
            Some(previous) => {
                let reclassified = current
                    .iter()
                    .filter_map(|(id, record)| {
                        let before = previous.get(id)?.provenance;
                        (before != record.provenance).then(|| ClassChange {
                            id: id.clone(),
                            before,
                            after: record.provenance,
                        })
                    })
                    .collect();
                let added = current
                    .ids()
                    .filter(|id| !previous.contains(id))
                    .cloned()
                    .collect();
                let removed = previous
                    .ids()
                    .filter(|id| !current.contains(id))
                    .cloned()
                    .collect();
                (reclassified, added, removed)
            }
            None => {
                let reclassified = recent
                    .iter()
                    .map(|change| ClassChange {
                        id: change.id.clone(),
                        before: change.before,
                        after: change.after,
                    })
                    .collect();
                (reclassified, Vec::new(), Vec::new())
            }
        };

        let snapshot_digest = current.digest()?;
        let report_hash =
            stable_hash_string(&(&counts, &reclassified, &added, &removed, &snapshot_digest))?;
        Ok(Self {
            report_hash,
            counts,
            reclassified,
            added,
            removed,
            snapshot_digest,
        })
    }

    /// Serialises the report as canonical JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProvError> {
        to_canonical_json_bytes(self)
    }
}

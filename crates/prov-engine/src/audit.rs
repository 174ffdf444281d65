//! Post-run consistency audit of the registry.

use std::collections::BTreeSet;

use prov_core::{Identifier, Snapshot};
use prov_graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Whether every declared identifier holds a current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditStatus {
    /// Every seed is present and every declared output was committed this run.
    Pass,
    /// Some declared outputs were not committed this run.
    Incomplete,
}

/// A computed record whose dependency was written after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleRead {
    /// The computed record.
    pub id: Identifier,
    /// The dependency with the newer sequence.
    pub dependency: Identifier,
}

/// Post-run consistency check over the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Aggregate status.
    pub status: AuditStatus,
    /// Declared outputs without a record from this run.
    pub unresolved: Vec<Identifier>,
    /// Established values no module reads.
    pub unreferenced_established: Vec<Identifier>,
    /// Records that read a value newer than themselves.
    pub stale: Vec<StaleRead>,
}

impl AuditReport {
    /// Whether the audit passed.
    pub fn passed(&self) -> bool {
        self.status == AuditStatus::Pass
    }
}

/// Audits `snapshot` against the outputs declared by `graph` for run `run`.
pub fn audit(
    graph: &DependencyGraph,
    snapshot: &Snapshot,
    run: u64,
    warn_unreferenced: bool,
) -> AuditReport {
    let unresolved: Vec<Identifier> = graph
        .producers()
        .keys()
        .chain(graph.established().iter())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|id| match snapshot.get(id) {
            Some(record) => !record.is_established() && record.run != run,
            None => true,
        })
        .cloned()
        .collect();

    let referenced = graph.referenced_identifiers();
    let unreferenced_established: Vec<Identifier> = snapshot
        .iter()
        .filter(|(id, record)| record.is_established() && !referenced.contains(id))
        .map(|(id, _)| id.clone())
        .collect();
    if warn_unreferenced {
        for id in &unreferenced_established {
            warn!(id = %id, "established value is not read by any module");
        }
    }

    let mut stale = Vec::new();
    for (id, record) in snapshot.iter() {
        for dependency in &record.depends_on {
            if snapshot
                .get(dependency)
                .is_some_and(|upstream| upstream.sequence > record.sequence)
            {
                warn!(id = %id, dependency = %dependency, "record is older than its input");
                stale.push(StaleRead {
                    id: id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let status = if unresolved.is_empty() {
        AuditStatus::Pass
    } else {
        AuditStatus::Incomplete
    };
    AuditReport {
        status,
        unresolved,
        unreferenced_established,
        stale,
    }
}

//! The engine facade: registration, runs, queries and reports.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError, RwLock};

use prov_core::errors::ErrorInfo;
use prov_core::{
    Identifier, ModuleId, ParamValue, ParameterRegistry, ProvError, SeedManifest, Snapshot,
    ValueRecord,
};
use prov_graph::validate::check_ownership;
use prov_graph::{DependencyGraph, ModuleDescriptor};
use tracing::{info, instrument};

use crate::audit::audit;
use crate::config::EngineConfig;
use crate::report::{PipelineResult, PipelineStatus, ProvenanceReport};
use crate::scheduler::run_waves;

/// Owns the parameter registry and the registered computation modules.
///
/// Registration needs `&mut self`; runs and queries only need `&self`, with the
/// registry write lock taken once per committed wave. Runs are serialised: a
/// second `execute_pipeline` call waits until the first one has been audited.
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    registry: RwLock<ParameterRegistry>,
    modules: Vec<ModuleDescriptor>,
    run_lock: Mutex<()>,
}

impl Engine {
    /// Creates an engine with an empty registry.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(ParameterRegistry::new()),
            modules: Vec::new(),
            run_lock: Mutex::new(()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers a computation module. Module ids must be unique.
    pub fn register_module(&mut self, descriptor: ModuleDescriptor) -> Result<(), ProvError> {
        if self
            .modules
            .iter()
            .any(|existing| existing.module_id() == descriptor.module_id())
        {
            return Err(ProvError::DuplicateModule(
                ErrorInfo::new("prov.duplicate_module", "module id registered twice")
                    .with_context("module", descriptor.module_id().as_str()),
            ));
        }
        self.modules.push(descriptor);
        Ok(())
    }

    /// Unregisters a module. Its records stay in the registry until released.
    pub fn remove_module(&mut self, module: &ModuleId) -> Option<ModuleDescriptor> {
        let index = self
            .modules
            .iter()
            .position(|descriptor| descriptor.module_id() == module)?;
        Some(self.modules.remove(index))
    }

    /// Registered modules in registration order.
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    /// Declares one ESTABLISHED value.
    pub fn declare_established(
        &self,
        id: impl Into<Identifier>,
        value: impl Into<ParamValue>,
        uncertainty: Option<f64>,
    ) -> Result<(), ProvError> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .declare_established(id, value, uncertainty)
            .map(|_| ())
    }

    /// Declares every seed of a manifest, returning how many were declared.
    pub fn declare_seeds(&self, manifest: &SeedManifest) -> Result<usize, ProvError> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        manifest.declare_into(&mut registry)
    }

    /// Drops a computed record so another module may claim its identifier.
    pub fn release(&self, id: &Identifier) -> Result<ValueRecord, ProvError> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .release(id)
    }

    /// Runs every static check without executing anything.
    pub fn validate(&self) -> Result<DependencyGraph, ProvError> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let established: BTreeSet<Identifier> = registry.established_ids().cloned().collect();
        let graph = DependencyGraph::build(self.modules.iter().cloned(), &established)?;
        check_ownership(&graph, &registry)?;
        Ok(graph)
    }

    /// Validates, schedules and runs every registered module, then audits the registry.
    ///
    /// Structural errors and commit-time violations are returned as `Err`. Module
    /// failures are isolated to their dependents and reported as
    /// [`PipelineStatus::Partial`].
    #[instrument(skip(self), fields(modules = self.modules.len()))]
    pub fn execute_pipeline(&self) -> Result<PipelineResult, ProvError> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.config.validate()?;
        let graph = self.validate()?;
        let (run, sequence_start) = {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            let run = registry.begin_run();
            (run, registry.sequence())
        };
        info!(run, waves = graph.waves().len(), "pipeline started");

        let schedule = run_waves(&graph, &self.registry, &self.config)?;

        let (final_snapshot, reclassified) = {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            (registry.snapshot(), registry.reclassifications().to_vec())
        };
        let audit = audit(&graph, &final_snapshot, run, self.config.warn_unreferenced);
        let status = if schedule.statuses.values().all(|status| status.is_ran()) {
            PipelineStatus::Success
        } else {
            PipelineStatus::Partial
        };
        info!(
            run,
            ?status,
            executed = schedule.execution_order.len(),
            audit = ?audit.status,
            "pipeline finished"
        );

        Ok(PipelineResult {
            run,
            status,
            per_module_status: schedule.statuses,
            execution_order: schedule.execution_order,
            waves: schedule.waves,
            audit,
            reclassified,
            final_snapshot,
            sequence_start,
        })
    }

    /// Read-only view of the registry.
    pub fn snapshot(&self) -> Snapshot {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Summarises the registry, diffed against `previous` when given.
    pub fn provenance_report(
        &self,
        previous: Option<&Snapshot>,
    ) -> Result<ProvenanceReport, ProvError> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        ProvenanceReport::new(&registry.snapshot(), previous, registry.reclassifications())
    }
}

//! Wave-by-wave execution of a validated dependency graph.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use prov_core::errors::ErrorInfo;
use prov_core::{CommitRequest, ModuleId, ParameterRegistry, ProvError};
use prov_graph::{DependencyGraph, ModuleDescriptor, ModuleInputs, ModuleOutputs};
use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::report::ModuleStatus;

/// What the scheduler observed while running every wave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Outcome per module.
    pub statuses: BTreeMap<ModuleId, ModuleStatus>,
    /// Modules actually invoked, in order.
    pub execution_order: Vec<ModuleId>,
    /// Waves as computed from the graph.
    pub waves: Vec<Vec<ModuleId>>,
}

struct Invocation<'g> {
    descriptor: &'g ModuleDescriptor,
    inputs: ModuleInputs,
}

/// Runs every module of `graph`, committing outputs into `registry`.
///
/// Outputs of one wave are committed together, in ascending module id order,
/// once every module of the wave has returned. A module's outputs are checked
/// in full before any of them is committed.
pub fn run_waves(
    graph: &DependencyGraph,
    registry: &RwLock<ParameterRegistry>,
    config: &EngineConfig,
) -> Result<Schedule, ProvError> {
    config.validate()?;
    let pool = if config.parallelism > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallelism)
                .build()
                .map_err(|err| {
                    ProvError::Runtime(
                        ErrorInfo::new("prov.thread_pool", err.to_string())
                            .with_context("threads", config.parallelism.to_string()),
                    )
                })?,
        )
    } else {
        None
    };

    let waves = graph.waves();
    let mut statuses: BTreeMap<ModuleId, ModuleStatus> = BTreeMap::new();
    let mut execution_order = Vec::new();

    for (index, wave) in waves.iter().enumerate() {
        let mut invocations = Vec::with_capacity(wave.len());
        {
            let registry = registry.read().unwrap_or_else(PoisonError::into_inner);
            for module in wave {
                let descriptor = graph
                    .descriptor(module)
                    .ok_or_else(|| ProvError::module_execution(module, "module not in graph"))?;
                if let Some(upstream) = failed_upstream(graph, module, &statuses) {
                    warn!(module = %module, upstream = %upstream, "skipping module after upstream failure");
                    statuses.insert(
                        module.clone(),
                        ModuleStatus::SkippedUpstreamFailure { upstream },
                    );
                    continue;
                }
                let mut inputs = ModuleInputs::new();
                for id in descriptor.reads() {
                    inputs.insert(id.clone(), registry.get(id)?.clone());
                }
                invocations.push(Invocation { descriptor, inputs });
            }
        }
        debug!(wave = index, modules = invocations.len(), "dispatching wave");

        let outcomes: Vec<Result<ModuleOutputs, String>> = match &pool {
            Some(pool) if invocations.len() > 1 => pool.install(|| {
                invocations
                    .par_iter()
                    .map(|invocation| invoke(invocation, config))
                    .collect()
            }),
            _ => invocations
                .iter()
                .map(|invocation| invoke(invocation, config))
                .collect(),
        };

        let mut registry = registry.write().unwrap_or_else(PoisonError::into_inner);
        for (invocation, outcome) in invocations.iter().zip(outcomes) {
            let descriptor = invocation.descriptor;
            let module = descriptor.module_id();
            execution_order.push(module.clone());
            match outcome {
                Ok(outputs) => {
                    for (id, estimate) in outputs {
                        let provenance = descriptor.output_class(&id).ok_or_else(|| {
                            ProvError::module_execution(module, format!("undeclared output `{id}`"))
                        })?;
                        registry.commit(CommitRequest {
                            module_id: module.clone(),
                            id,
                            estimate,
                            provenance,
                            depends_on: descriptor.reads().clone(),
                        })?;
                    }
                    statuses.insert(module.clone(), ModuleStatus::Ran);
                }
                Err(cause) => {
                    let err = ProvError::module_execution(module, cause.clone());
                    error!(module = %module, error = %err, "module failed");
                    statuses.insert(module.clone(), ModuleStatus::Failed { cause });
                }
            }
        }
    }

    Ok(Schedule {
        statuses,
        execution_order,
        waves,
    })
}

/// Root failure among the direct dependencies of `module`, if any.
fn failed_upstream(
    graph: &DependencyGraph,
    module: &ModuleId,
    statuses: &BTreeMap<ModuleId, ModuleStatus>,
) -> Option<ModuleId> {
    graph
        .dependencies(module)
        .find_map(|dependency| match statuses.get(dependency) {
            Some(ModuleStatus::Failed { .. }) => Some(dependency.clone()),
            Some(ModuleStatus::SkippedUpstreamFailure { upstream }) => Some(upstream.clone()),
            _ => None,
        })
}

fn invoke(invocation: &Invocation<'_>, config: &EngineConfig) -> Result<ModuleOutputs, String> {
    let descriptor = invocation.descriptor;
    let result = if config.capture_panics {
        panic::catch_unwind(AssertUnwindSafe(|| descriptor.run(&invocation.inputs)))
            .map_err(|payload| format!("panicked: {}", panic_message(payload.as_ref())))?
    } else {
        descriptor.run(&invocation.inputs)
    };
    let outputs = result.map_err(|failure| failure.message)?;
    check_outputs(descriptor, &outputs)?;
    Ok(outputs)
}

fn check_outputs(descriptor: &ModuleDescriptor, outputs: &ModuleOutputs) -> Result<(), String> {
    if let Some(missing) = descriptor.writes().keys().find(|id| !outputs.contains_key(*id)) {
        return Err(format!("declared output `{missing}` was not produced"));
    }
    if let Some(extra) = outputs.keys().find(|id| !descriptor.produces(id)) {
        return Err(format!("produced undeclared output `{extra}`"));
    }
    if let Some((id, _)) = outputs.iter().find(|(_, estimate)| !estimate.is_finite()) {
        return Err(format!("output `{id}` is not finite"));
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

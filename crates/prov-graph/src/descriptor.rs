//! Module descriptors and the computation contract.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use prov_core::{Estimate, Identifier, ModuleId, Provenance, ValueRecord};
use thiserror::Error;

/// Read-only bundle of input records handed to a module.
pub type ModuleInputs = BTreeMap<Identifier, ValueRecord>;

/// Values produced by a module, keyed by output identifier.
pub type ModuleOutputs = BTreeMap<Identifier, Estimate>;

/// Failure reported by a computation module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ModuleFailure {
    /// Human readable cause.
    pub message: String,
}

impl ModuleFailure {
    /// Creates a failure with the given cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ModuleFailure {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ModuleFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Pure computation contract: inputs in, outputs out, no other shared state.
pub trait ComputeModule: Send + Sync {
    /// Computes the module outputs from its declared inputs.
    fn compute(&self, inputs: &ModuleInputs) -> Result<ModuleOutputs, ModuleFailure>;
}

impl<F> ComputeModule for F
where
    F: Fn(&ModuleInputs) -> Result<ModuleOutputs, ModuleFailure> + Send + Sync,
{
    fn compute(&self, inputs: &ModuleInputs) -> Result<ModuleOutputs, ModuleFailure> {
        self(inputs)
    }
}

/// Declared input/output contract of one computation module.
#[derive(Clone)]
pub struct ModuleDescriptor {
    module_id: ModuleId,
    reads: BTreeSet<Identifier>,
    writes: BTreeMap<Identifier, Provenance>,
    run: Arc<dyn ComputeModule>,
}

impl ModuleDescriptor {
    /// Creates a descriptor backed by a closure, with no inputs and no outputs yet.
    pub fn new<F>(module_id: impl Into<ModuleId>, run: F) -> Self
    where
        F: Fn(&ModuleInputs) -> Result<ModuleOutputs, ModuleFailure> + Send + Sync + 'static,
    {
        Self::from_module(module_id, run)
    }

    /// Creates a descriptor backed by any [`ComputeModule`] implementation.
    pub fn from_module(module_id: impl Into<ModuleId>, module: impl ComputeModule + 'static) -> Self {
        Self {
            module_id: module_id.into(),
            reads: BTreeSet::new(),
            writes: BTreeMap::new(),
            run: Arc::new(module),
        }
    }

    /// Adds identifiers the module reads.
    pub fn reading<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        self.reads.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Adds outputs declared DERIVED.
    pub fn deriving<I, T>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        self.writing(ids, Provenance::Derived)
    }

    /// Adds outputs declared PREDICTED.
    pub fn predicting<I, T>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        self.writing(ids, Provenance::Predicted)
    }

    /// Adds outputs with an explicit class. A later declaration of the same
    /// identifier replaces the earlier class.
    pub fn writing<I, T>(mut self, ids: I, provenance: Provenance) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        for id in ids {
            self.writes.insert(id.into(), provenance);
        }
        self
    }

    /// Stable identifier of the module.
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Identifiers the module reads.
    pub fn reads(&self) -> &BTreeSet<Identifier> {
        &self.reads
    }

    /// Identifiers the module writes, with their declared class.
    pub fn writes(&self) -> &BTreeMap<Identifier, Provenance> {
        &self.writes
    }

    /// Declared class of one output.
    pub fn output_class(&self, id: &Identifier) -> Option<Provenance> {
        self.writes.get(id).copied()
    }

    /// Whether the module writes `id`.
    pub fn produces(&self, id: &Identifier) -> bool {
        self.writes.contains_key(id)
    }

    /// Invokes the module.
    pub fn run(&self, inputs: &ModuleInputs) -> Result<ModuleOutputs, ModuleFailure> {
        self.run.compute(inputs)
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("module_id", &self.module_id)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

/// Fetches a scalar input, failing the module if it is absent or structured.
pub fn scalar_input(inputs: &ModuleInputs, id: &str) -> Result<f64, ModuleFailure> {
    let record = inputs
        .get(&Identifier::from(id))
        .ok_or_else(|| ModuleFailure::new(format!("input `{id}` not provided")))?;
    record
        .scalar()
        .ok_or_else(|| ModuleFailure::new(format!("input `{id}` is not a scalar")))
}

/// Fetches the components of a structured input.
pub fn tuple_input<'a>(inputs: &'a ModuleInputs, id: &str) -> Result<&'a [f64], ModuleFailure> {
    inputs
        .get(&Identifier::from(id))
        .map(|record| record.value.components())
        .ok_or_else(|| ModuleFailure::new(format!("input `{id}` not provided")))
}

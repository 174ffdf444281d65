#![deny(missing_docs)]

//! Module descriptors, the producer/consumer dependency graph and the static
//! checks that must pass before anything is scheduled.

mod descriptor;
mod graph;
pub mod validate;

pub use descriptor::{
    scalar_input, tuple_input, ComputeModule, ModuleDescriptor, ModuleFailure, ModuleInputs,
    ModuleOutputs,
};
pub use graph::DependencyGraph;

#![deny(missing_docs)]

//! Dependency-ordered execution of provenance-tracked computation modules.
//!
//! An [`Engine`] owns the parameter registry and the registered module
//! descriptors. [`Engine::execute_pipeline`] validates the dependency graph,
//! runs modules wave by wave and audits the registry afterwards.

pub mod audit;
mod config;
mod engine;
pub mod report;
pub mod scheduler;

pub use audit::{AuditReport, AuditStatus, StaleRead};
pub use config::{load_config, EngineConfig};
pub use engine::Engine;
pub use report::{
    ClassChange, ModuleStatus, PipelineResult, PipelineStatus, ProvenanceCounts, ProvenanceReport,
};

pub use prov_core;
pub use prov_graph;

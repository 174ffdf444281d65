#![deny(missing_docs)]
#![doc = "Value records, provenance classes and the write-guarded parameter registry."]

pub mod errors;
pub mod hash;
mod ids;
pub mod provenance;
pub mod registry;
pub mod seeds;
pub mod serde;
pub mod snapshot;
mod types;

pub use errors::{ErrorInfo, ProvError};
pub use hash::stable_hash_string;
pub use ids::{Identifier, ModuleId};
pub use provenance::{Provenance, ValueRecord};
pub use registry::{CommitRequest, ParameterRegistry, Reclassification};
pub use seeds::{load_seed_manifest, SeedEntry, SeedManifest};
pub use snapshot::{Snapshot, SnapshotEntry};
pub use types::{Estimate, ParamValue};

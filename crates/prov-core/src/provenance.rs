//! Provenance classes and the immutable value record.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::ids::{Identifier, ModuleId};
use crate::types::{Estimate, ParamValue};

/// Classification of how a value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Measured experimentally; write-once.
    Established,
    /// Computed from other values through a first-principles chain.
    Derived,
    /// Computed and awaiting experimental confirmation.
    Predicted,
}

impl Provenance {
    /// Whether the class is produced by a computation module.
    pub fn is_computed(self) -> bool {
        !matches!(self, Provenance::Established)
    }

    /// Upper-case label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Provenance::Established => "ESTABLISHED",
            Provenance::Derived => "DERIVED",
            Provenance::Predicted => "PREDICTED",
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A committed value together with its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    /// Identifier of the quantity.
    pub id: Identifier,
    /// Central value.
    pub value: ParamValue,
    /// Optional uncertainty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
    /// Provenance class.
    pub provenance: Provenance,
    /// Producing module; `None` iff the record is established.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_by: Option<ModuleId>,
    /// Identifiers read by the producing module; empty iff established.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<Identifier>,
    /// Registry-global write counter at the time of the write.
    pub sequence: u64,
    /// Scheduling run that wrote the record (0 for established seeds).
    pub run: u64,
}

impl ValueRecord {
    pub(crate) fn established(
        id: Identifier,
        value: ParamValue,
        uncertainty: Option<f64>,
        sequence: u64,
    ) -> Self {
        Self {
            id,
            value,
            uncertainty,
            provenance: Provenance::Established,
            produced_by: None,
            depends_on: BTreeSet::new(),
            sequence,
            run: 0,
        }
    }

    /// Returns the value and uncertainty as an [`Estimate`].
    pub fn estimate(&self) -> Estimate {
        Estimate {
            value: self.value.clone(),
            uncertainty: self.uncertainty,
        }
    }

    /// Returns the scalar value, if the record holds a scalar.
    pub fn scalar(&self) -> Option<f64> {
        self.value.as_scalar()
    }

    /// Whether the record is write-once established data.
    pub fn is_established(&self) -> bool {
        self.provenance == Provenance::Established
    }
}

//! Numeric payloads and per-output estimates.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Numeric payload of a tracked quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Single scalar such as a mass or a mixing angle.
    Scalar(f64),
    /// Small structured quantity such as a coupling triple.
    Tuple(Vec<f64>),
}

impl ParamValue {
    /// Returns the scalar payload, if this is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ParamValue::Scalar(value) => Some(*value),
            ParamValue::Tuple(_) => None,
        }
    }

    /// Returns the components of the value as a slice.
    pub fn components(&self) -> &[f64] {
        match self {
            ParamValue::Scalar(value) => std::slice::from_ref(value),
            ParamValue::Tuple(values) => values,
        }
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.components().iter().all(|value| value.is_finite())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        ParamValue::Tuple(values)
    }
}

impl<const N: usize> From<[f64; N]> for ParamValue {
    fn from(values: [f64; N]) -> Self {
        ParamValue::Tuple(values.to_vec())
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Scalar(value) => write!(f, "{value}"),
            ParamValue::Tuple(values) => {
                write!(f, "(")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Value and optional one-sigma uncertainty produced for one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Central value.
    pub value: ParamValue,
    /// Optional uncertainty on the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
}

impl Estimate {
    /// Creates an estimate without an uncertainty.
    pub fn exact(value: impl Into<ParamValue>) -> Self {
        Self {
            value: value.into(),
            uncertainty: None,
        }
    }

    /// Creates an estimate carrying an uncertainty.
    pub fn with_uncertainty(value: impl Into<ParamValue>, uncertainty: f64) -> Self {
        Self {
            value: value.into(),
            uncertainty: Some(uncertainty),
        }
    }

    /// Whether the value and the uncertainty are finite.
    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.uncertainty.map_or(true, f64::is_finite)
    }
}

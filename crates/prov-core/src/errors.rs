//! Structured error types shared across the provenance engine crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{Identifier, ModuleId};

/// Structured payload attached to every [`ProvError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, module ids, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the provenance engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum ProvError {
    /// A seed value was declared twice.
    #[error("duplicate established value: {0}")]
    DuplicateEstablished(ErrorInfo),
    /// Two or more modules claim the same output identifier.
    #[error("ambiguous producer: {0}")]
    AmbiguousProducer(ErrorInfo),
    /// The module graph contains a cycle (self-loops included).
    #[error("cycle detected: {info}")]
    CycleDetected {
        /// Ordered module ids along the cycle; the first id is repeated at the end.
        path: Vec<ModuleId>,
        /// Structured payload.
        info: ErrorInfo,
    },
    /// A write targeted an established identifier or one owned by another module.
    #[error("override violation: {0}")]
    OverrideViolation(ErrorInfo),
    /// A read targeted an identifier without a committed record.
    #[error("unresolved dependency: {0}")]
    UnresolvedDependency(ErrorInfo),
    /// A module failed while running.
    #[error("module execution failed: {0}")]
    ModuleExecution(ErrorInfo),
    /// A module reads an identifier that nothing seeds or produces.
    #[error("missing producer: {0}")]
    MissingProducer(ErrorInfo),
    /// Two descriptors share one module id.
    #[error("duplicate module: {0}")]
    DuplicateModule(ErrorInfo),
    /// A descriptor is malformed.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(ErrorInfo),
    /// A value cannot be stored (non-finite components).
    #[error("invalid value: {0}")]
    InvalidValue(ErrorInfo),
    /// Serialization and IO errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Engine options that cannot be honoured.
    #[error("invalid configuration: {0}")]
    Config(ErrorInfo),
    /// Scheduler resources could not be set up.
    #[error("runtime error: {0}")]
    Runtime(ErrorInfo),
}

impl ProvError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ProvError::CycleDetected { info, .. } => info,
            ProvError::DuplicateEstablished(info)
            | ProvError::AmbiguousProducer(info)
            | ProvError::OverrideViolation(info)
            | ProvError::UnresolvedDependency(info)
            | ProvError::ModuleExecution(info)
            | ProvError::MissingProducer(info)
            | ProvError::DuplicateModule(info)
            | ProvError::InvalidDescriptor(info)
            | ProvError::InvalidValue(info)
            | ProvError::Serde(info)
            | ProvError::Config(info)
            | ProvError::Runtime(info) => info,
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Structural errors are configuration defects surfaced before any module runs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ProvError::DuplicateEstablished(_)
                | ProvError::AmbiguousProducer(_)
                | ProvError::CycleDetected { .. }
                | ProvError::MissingProducer(_)
                | ProvError::DuplicateModule(_)
                | ProvError::InvalidDescriptor(_)
        )
    }

    /// Builds a cycle error from the ordered cycle path.
    pub fn cycle(path: Vec<ModuleId>) -> Self {
        let rendered = path
            .iter()
            .map(ModuleId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        let info = ErrorInfo::new("prov.cycle_detected", "module dependency graph is cyclic")
            .with_context("path", rendered)
            .with_hint("break the cycle by seeding one of the quantities as established");
        ProvError::CycleDetected { path, info }
    }

    /// Builds an error for a read of an identifier that has no record.
    pub fn unresolved(id: &Identifier) -> Self {
        ProvError::UnresolvedDependency(
            ErrorInfo::new("prov.unresolved", "no committed record for identifier")
                .with_context("id", id.as_str()),
        )
    }

    /// Builds a commit-time override violation.
    pub fn override_violation(
        code: &str,
        id: &Identifier,
        module: &ModuleId,
        message: impl Into<String>,
    ) -> Self {
        ProvError::OverrideViolation(
            ErrorInfo::new(code, message)
                .with_context("id", id.as_str())
                .with_context("module", module.as_str()),
        )
    }

    /// Builds a module execution error carrying the failure cause.
    pub fn module_execution(module: &ModuleId, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        ProvError::ModuleExecution(
            ErrorInfo::new("prov.module_failed", cause.clone())
                .with_context("module", module.as_str())
                .with_context("cause", cause),
        )
    }

    /// Builds a serde/IO error with the provided code.
    pub fn serde(code: &str, err: impl ToString) -> Self {
        ProvError::Serde(ErrorInfo::new(code, err.to_string()))
    }
}

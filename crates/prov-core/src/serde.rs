//! Canonical JSON and YAML helpers used for exports, manifests and configuration.

use std::collections::BTreeMap;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ErrorInfo, ProvError};

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes with deterministic key ordering.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, ProvError> {
    let value =
        serde_json::to_value(value).map_err(|err| ProvError::serde("prov.json_serialize", err))?;
    let canonical = canonicalize(value);
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonical)
        .map_err(|err| ProvError::serde("prov.json_write", err))?;
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProvError> {
    serde_json::from_slice(data).map_err(|err| ProvError::serde("prov.json_deserialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProvError> {
    serde_yaml::from_slice(data).map_err(|err| ProvError::serde("prov.yaml_deserialize", err))
}

/// Serializes a value into YAML.
pub fn to_yaml_string<T: Serialize>(value: &T) -> Result<String, ProvError> {
    serde_yaml::to_string(value).map_err(|err| ProvError::serde("prov.yaml_serialize", err))
}

/// Reads a YAML or JSON document from disk, dispatching on the file extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, ProvError> {
    let bytes = fs::read(path).map_err(|err| {
        ProvError::Serde(
            ErrorInfo::new("prov.read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => from_json_slice(&bytes),
        _ => from_yaml_slice(&bytes),
    }
}

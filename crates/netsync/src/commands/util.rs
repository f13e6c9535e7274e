//! Shared helpers for command handlers.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;

use netsync_core::{FieldMap, InterfaceConfig};

use crate::error::CliError;

/// Read a list of parsed CLI records. JSON and YAML are both accepted
/// (YAML is a superset of JSON); scalar values are stringified so numeric
/// fields like `vlan_id: 10` need no quoting.
pub fn read_records(path: &Path) -> Result<Vec<FieldMap>, CliError> {
    let raw: Vec<BTreeMap<String, serde_yaml::Value>> = read_document(path)?;
    raw.into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .into_iter()
                .filter_map(|(field, value)| match scalar(&value) {
                    Ok(Some(text)) => Some(Ok((field, text))),
                    Ok(None) => None,
                    Err(kind) => Some(Err(input_error(
                        path,
                        format!("record {index}: field `{field}` is {kind}, expected a scalar"),
                    ))),
                })
                .collect::<Result<FieldMap, CliError>>()
        })
        .collect()
}

/// Read switchport settings keyed by interface name.
pub fn read_interface_configs(path: &Path) -> Result<BTreeMap<String, InterfaceConfig>, CliError> {
    read_document(path)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|e| input_error(path, e.to_string()))?;
    serde_yaml::from_str(&contents).map_err(|e| input_error(path, e.to_string()))
}

fn scalar(value: &serde_yaml::Value) -> Result<Option<String>, &'static str> {
    match value {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::Bool(b) => Ok(Some(b.to_string())),
        serde_yaml::Value::Number(n) => Ok(Some(n.to_string())),
        serde_yaml::Value::String(s) => Ok(Some(s.clone())),
        serde_yaml::Value::Sequence(_) => Err("a list"),
        serde_yaml::Value::Mapping(_) => Err("a map"),
        serde_yaml::Value::Tagged(_) => Err("tagged"),
    }
}

fn input_error(path: &Path, reason: String) -> CliError {
    CliError::InputFile {
        path: path.display().to_string(),
        reason,
    }
}

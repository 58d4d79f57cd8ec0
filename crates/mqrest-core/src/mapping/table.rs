//! Mapping table data model and override composition.
//!
//! The bundled table ships in `data/mapping.json`. A table is immutable once
//! built; applying overrides produces a new table and leaves the input alone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

const BUILTIN_MAPPING_JSON: &str = include_str!("../../data/mapping.json");

/// Wire qualifier to mapping qualifier, used when a (verb, qualifier) pair
/// is missing from the command index.
pub(crate) const FALLBACK_QUALIFIERS: &[(&str, &str)] = &[
    ("QUEUE", "queue"),
    ("QLOCAL", "queue"),
    ("QREMOTE", "queue"),
    ("QALIAS", "queue"),
    ("QMODEL", "queue"),
    ("QCLUSTER", "queue"),
    ("QSTATUS", "qstatus"),
    ("CHANNEL", "channel"),
    ("CHSTATUS", "chstatus"),
    ("QMGR", "qmgr"),
    ("QMSTATUS", "qmstatus"),
    ("CMDSERV", "cmdserv"),
    ("LISTENER", "listener"),
    ("LSSTATUS", "lsstatus"),
    ("SERVICE", "service"),
    ("SVSTATUS", "svstatus"),
    ("TOPIC", "topic"),
    ("SUB", "sub"),
    ("NAMELIST", "namelist"),
    ("PROCESS", "process"),
    ("AUTHINFO", "authinfo"),
    ("CONN", "conn"),
    ("STGCLASS", "stgclass"),
    ("COMMINFO", "comminfo"),
    ("CFSTRUCT", "cfstruct"),
    ("BUFFPOOL", "buffpool"),
    ("PSID", "psid"),
    ("LOG", "log"),
    ("MAXSMSGS", "maxsmsgs"),
    ("SMDS", "smds"),
    ("SMDSCONN", "smdsconn"),
    ("SECURITY", "security"),
    ("TRACE", "trace"),
    ("CHINIT", "chinit"),
];

/// How override data is combined with the bundled table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMode {
    /// Deep-merge override entries into the existing qualifier tables.
    #[default]
    Merge,
    /// Swap whole qualifier entries for the override's.
    Replace,
}

/// Command index entry, keyed by `"VERB QUALIFIER"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CommandMapping {
    /// Mapping qualifier shared by related wire qualifiers.
    pub qualifier: String,
    /// Parameters appended when the caller asks for `all`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_parameter_macros: Vec<String>,
}

/// Wire pair emitted directly by the request key-value layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValueEntry {
    pub key: String,
    pub value: String,
}

/// Translation tables for one mapping qualifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct QualifierMapping {
    /// Caller name to wire name.
    pub request_key_map: HashMap<String, String>,
    /// Wire key to (caller value to wire value).
    pub request_value_map: HashMap<String, HashMap<String, String>>,
    /// Caller key to (caller value to wire pair).
    pub request_key_value_map: HashMap<String, HashMap<String, KeyValueEntry>>,
    /// Wire name to caller name.
    pub response_key_map: HashMap<String, String>,
    /// Wire key to (wire value to caller value).
    pub response_value_map: HashMap<String, HashMap<String, String>>,
}

impl QualifierMapping {
    fn merge(&mut self, other: QualifierMapping) {
        self.request_key_map.extend(other.request_key_map);
        merge_nested(&mut self.request_value_map, other.request_value_map);
        merge_nested(&mut self.request_key_value_map, other.request_key_value_map);
        self.response_key_map.extend(other.response_key_map);
        merge_nested(&mut self.response_value_map, other.response_value_map);
    }
}

/// The full mapping table: command index plus per-qualifier tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MappingTable {
    pub commands: HashMap<String, CommandMapping>,
    pub qualifiers: HashMap<String, QualifierMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl MappingTable {
    /// Parse the table bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_MAPPING_JSON)
    }

    /// Parse a table or override document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidConfig(format!("invalid mapping data: {}", e)))
    }

    /// Convert a JSON value shaped as `{commands, qualifiers}`.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::InvalidConfig(format!("invalid mapping data: {}", e)))
    }

    /// Compose override data onto this table, returning a new table.
    ///
    /// Command index entries are always inserted or replaced per key. In
    /// merge mode a new qualifier is added wholesale and an existing one has
    /// each sub-map merged key by key; nested value maps merge per outer key.
    /// In replace mode an override qualifier entry replaces the existing one.
    pub fn with_overrides(&self, overrides: &MappingTable, mode: OverrideMode) -> Self {
        let mut table = self.clone();
        for (key, command) in &overrides.commands {
            table.commands.insert(key.clone(), command.clone());
        }
        for (name, qualifier) in &overrides.qualifiers {
            match (mode, table.qualifiers.get_mut(name)) {
                (OverrideMode::Merge, Some(existing)) => existing.merge(qualifier.clone()),
                _ => {
                    table.qualifiers.insert(name.clone(), qualifier.clone());
                }
            }
        }
        table
    }

    /// Command index lookup for an uppercase verb and wire qualifier.
    pub fn command(&self, verb: &str, wire_qualifier: &str) -> Option<&CommandMapping> {
        self.commands.get(&command_key(verb, wire_qualifier))
    }

    /// Tables for a mapping qualifier.
    pub fn qualifier(&self, qualifier: &str) -> Option<&QualifierMapping> {
        self.qualifiers.get(qualifier)
    }
}

pub(crate) fn command_key(verb: &str, wire_qualifier: &str) -> String {
    format!("{} {}", verb, wire_qualifier)
}

pub(crate) fn fallback_qualifier(wire_qualifier: &str) -> Option<&'static str> {
    FALLBACK_QUALIFIERS
        .iter()
        .find(|(wire, _)| *wire == wire_qualifier)
        .map(|(_, qualifier)| *qualifier)
}

fn merge_nested<V>(
    target: &mut HashMap<String, HashMap<String, V>>,
    source: HashMap<String, HashMap<String, V>>,
) {
    for (key, inner) in source {
        target.entry(key).or_default().extend(inner);
    }
}

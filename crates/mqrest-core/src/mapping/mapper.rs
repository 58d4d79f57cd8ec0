//! The three-layer attribute mapper.

use std::collections::HashMap;

use serde_json::Value;

use super::issue::{MappingDirection, MappingIssue, MappingReason};
use super::table::{fallback_qualifier, KeyValueEntry, MappingTable, OverrideMode, QualifierMapping};
use super::Attributes;
use crate::error::Result;

/// Translates attribute records using an owned, immutable mapping table.
///
/// The mapper is read-only after construction and can be shared between
/// threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AttributeMapper {
    table: MappingTable,
}

/// Borrowed view of the maps one direction uses.
struct DirectionMaps<'a> {
    key_map: &'a HashMap<String, String>,
    value_map: &'a HashMap<String, HashMap<String, String>>,
    key_value_map: Option<&'a HashMap<String, HashMap<String, KeyValueEntry>>>,
}

impl<'a> DirectionMaps<'a> {
    fn for_direction(mapping: &'a QualifierMapping, direction: MappingDirection) -> Self {
        match direction {
            MappingDirection::Request => Self {
                key_map: &mapping.request_key_map,
                value_map: &mapping.request_value_map,
                key_value_map: Some(&mapping.request_key_value_map),
            },
            MappingDirection::Response => Self {
                key_map: &mapping.response_key_map,
                value_map: &mapping.response_value_map,
                key_value_map: None,
            },
        }
    }
}

impl AttributeMapper {
    /// Mapper over the bundled table.
    pub fn new() -> Result<Self> {
        Ok(Self::from_table(MappingTable::builtin()?))
    }

    /// Mapper over the bundled table composed with override data.
    pub fn with_overrides(overrides: &MappingTable, mode: OverrideMode) -> Result<Self> {
        let table = MappingTable::builtin()?.with_overrides(overrides, mode);
        Ok(Self::from_table(table))
    }

    /// Mapper over an explicit table.
    pub fn from_table(table: MappingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Whether the mapping qualifier has a translation table.
    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.table.qualifier(qualifier).is_some()
    }

    /// Resolve the mapping qualifier for an uppercase verb and wire qualifier.
    ///
    /// Tries the command index, then the static per-object fallback, then
    /// the lowercased wire qualifier. Never fails.
    pub fn resolve_mapping_qualifier(&self, verb: &str, wire_qualifier: &str) -> String {
        if let Some(command) = self.table.command(verb, wire_qualifier) {
            return command.qualifier.clone();
        }
        if let Some(qualifier) = fallback_qualifier(wire_qualifier) {
            return qualifier.to_string();
        }
        wire_qualifier.to_lowercase()
    }

    /// Translate caller attributes into MQSC parameters.
    pub fn map_request(
        &self,
        qualifier: &str,
        attributes: &Attributes,
        strict: bool,
    ) -> (Attributes, Vec<MappingIssue>) {
        self.map_attributes(qualifier, attributes, strict, MappingDirection::Request, None)
    }

    /// Translate an MQSC response record into caller attributes.
    pub fn map_response(
        &self,
        qualifier: &str,
        attributes: &Attributes,
        strict: bool,
    ) -> (Attributes, Vec<MappingIssue>) {
        self.map_attributes(qualifier, attributes, strict, MappingDirection::Response, None)
    }

    /// Translate a list of response records, tagging each issue with the
    /// record's position.
    pub fn map_response_list(
        &self,
        qualifier: &str,
        records: &[Attributes],
    ) -> (Vec<Attributes>, Vec<MappingIssue>) {
        let mut mapped = Vec::with_capacity(records.len());
        let mut issues = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let (record, record_issues) = self.map_attributes(
                qualifier,
                record,
                false,
                MappingDirection::Response,
                Some(index),
            );
            mapped.push(record);
            issues.extend(record_issues);
        }
        (mapped, issues)
    }

    /// Translate requested response-parameter names through the request key
    /// map. Unknown names pass through with an issue; `all` is kept as is.
    pub fn map_response_parameter_names(
        &self,
        qualifier: &str,
        names: &[String],
    ) -> (Vec<String>, Vec<MappingIssue>) {
        let Some(mapping) = self.table.qualifier(qualifier) else {
            return (names.to_vec(), Vec::new());
        };
        let mut issues = Vec::new();
        let mapped = names
            .iter()
            .map(|name| {
                if name.eq_ignore_ascii_case("all") {
                    return name.clone();
                }
                match mapping.request_key_map.get(name) {
                    Some(wire) => wire.clone(),
                    None => {
                        issues.push(MappingIssue::new(
                            MappingDirection::Request,
                            MappingReason::UnknownKey,
                            name.clone(),
                            qualifier,
                        ));
                        name.clone()
                    }
                }
            })
            .collect();
        (mapped, issues)
    }

    /// Append the command's macro parameters when `all` was requested.
    pub fn resolve_response_parameter_macros(
        &self,
        verb: &str,
        wire_qualifier: &str,
        requested: Vec<String>,
    ) -> Vec<String> {
        let Some(command) = self.table.command(verb, wire_qualifier) else {
            return requested;
        };
        if command.response_parameter_macros.is_empty()
            || !requested.iter().any(|name| name.eq_ignore_ascii_case("all"))
        {
            return requested;
        }
        let mut expanded = requested;
        expanded.extend(command.response_parameter_macros.iter().cloned());
        expanded
    }

    fn map_attributes(
        &self,
        qualifier: &str,
        attributes: &Attributes,
        strict: bool,
        direction: MappingDirection,
        object_index: Option<usize>,
    ) -> (Attributes, Vec<MappingIssue>) {
        if attributes.is_empty() {
            return (Attributes::new(), Vec::new());
        }

        let Some(mapping) = self.table.qualifier(qualifier) else {
            let issue = MappingIssue::new(
                direction,
                MappingReason::UnknownQualifier,
                qualifier,
                qualifier,
            )
            .with_object_index(object_index);
            tracing::debug!(qualifier, strict, "No mapping table for qualifier");
            return (attributes.clone(), vec![issue]);
        };

        let maps = DirectionMaps::for_direction(mapping, direction);
        let mut result = Attributes::new();
        let mut issues = Vec::new();

        for (name, value) in attributes {
            if let Some(entry) = maps
                .key_value_map
                .and_then(|kv| kv.get(name))
                .and_then(|values| value.as_str().and_then(|v| values.get(v)))
            {
                result.insert(entry.key.clone(), Value::String(entry.value.clone()));
                continue;
            }

            let lookup_key = match direction {
                MappingDirection::Request => name.clone(),
                MappingDirection::Response => name.to_uppercase(),
            };
            let mapped_key = match maps.key_map.get(&lookup_key) {
                Some(mapped) => mapped.clone(),
                None => {
                    issues.push(
                        MappingIssue::new(
                            direction,
                            MappingReason::UnknownKey,
                            name.clone(),
                            qualifier,
                        )
                        .with_object_index(object_index),
                    );
                    name.clone()
                }
            };

            let wire_key = match direction {
                MappingDirection::Request => &mapped_key,
                MappingDirection::Response => &lookup_key,
            };
            let mapped_value = match maps.value_map.get(wire_key) {
                Some(values) => translate_value(value, values, |unknown| {
                    issues.push(
                        MappingIssue::new(
                            direction,
                            MappingReason::UnknownValue,
                            name.clone(),
                            qualifier,
                        )
                        .with_value(unknown)
                        .with_object_index(object_index),
                    );
                }),
                None => value.clone(),
            };

            result.insert(mapped_key, mapped_value);
        }

        (result, issues)
    }
}

/// Strings map directly, lists map per element, other values pass through.
fn translate_value(
    value: &Value,
    values: &HashMap<String, String>,
    mut on_unknown: impl FnMut(Value),
) -> Value {
    let mut lookup = |item: &Value| match item.as_str() {
        Some(text) => match values.get(text) {
            Some(mapped) => Value::String(mapped.clone()),
            None => {
                on_unknown(item.clone());
                item.clone()
            }
        },
        None => item.clone(),
    };
    match value {
        Value::String(_) => lookup(value),
        Value::Array(items) => Value::Array(items.iter().map(&mut lookup).collect()),
        other => other.clone(),
    }
}

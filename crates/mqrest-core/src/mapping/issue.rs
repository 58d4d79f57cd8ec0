//! Translation failures reported by the attribute mapper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of the wire a translation ran on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MappingDirection {
    /// Caller names to wire names.
    Request,
    /// Wire names to caller names.
    Response,
}

impl MappingDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingDirection::Request => "request",
            MappingDirection::Response => "response",
        }
    }
}

impl std::fmt::Display for MappingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a translation failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MappingReason {
    /// No key-map entry for the attribute name.
    UnknownKey,
    /// The attribute has a value map, but not for this value.
    UnknownValue,
    /// The mapping qualifier has no table at all.
    UnknownQualifier,
}

impl MappingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingReason::UnknownKey => "unknown_key",
            MappingReason::UnknownValue => "unknown_value",
            MappingReason::UnknownQualifier => "unknown_qualifier",
        }
    }
}

impl std::fmt::Display for MappingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute translation failure.
///
/// Issues accumulate while a record is translated; they never stop the
/// iteration. The caller decides whether any issue is fatal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingIssue {
    pub direction: MappingDirection,
    pub reason: MappingReason,
    /// Attribute name as it was supplied to the mapper.
    pub attribute_name: String,
    /// Offending value, for unknown-value issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_value: Option<Value>,
    /// Position of the record within a response list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_index: Option<usize>,
    pub qualifier: String,
}

impl MappingIssue {
    /// Create an issue without value or index.
    pub fn new(
        direction: MappingDirection,
        reason: MappingReason,
        attribute_name: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            reason,
            attribute_name: attribute_name.into(),
            attribute_value: None,
            object_index: None,
            qualifier: qualifier.into(),
        }
    }

    /// Attach the value that failed translation.
    pub fn with_value(mut self, value: Value) -> Self {
        self.attribute_value = Some(value);
        self
    }

    /// Attach the record index.
    pub fn with_object_index(mut self, index: Option<usize>) -> Self {
        self.object_index = index;
        self
    }
}

impl std::fmt::Display for MappingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.direction, self.reason, self.attribute_name)?;
        if let Some(value) = &self.attribute_value {
            write!(f, "={}", value)?;
        }
        if let Some(index) = self.object_index {
            write!(f, " (object {})", index)?;
        }
        Ok(())
    }
}

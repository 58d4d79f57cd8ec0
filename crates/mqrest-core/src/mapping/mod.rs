//! Attribute translation between caller-facing names and MQSC parameters.
//!
//! Callers speak `snake_case` (`max_queue_depth`, `default_persistence`);
//! the REST API speaks MQSC tokens (`MAXDEPTH`, `DEFPSIST`). The
//! [`AttributeMapper`] runs attributes through three layers, driven by a
//! [`MappingTable`]:
//!
//! 1. key-value pairs for flag-style request attributes,
//! 2. key renaming,
//! 3. value translation.
//!
//! Translation never stops at the first problem; every miss is reported
//! as a [`MappingIssue`] and the caller decides whether that is fatal.

pub mod issue;
pub mod mapper;
pub mod table;

pub use issue::{MappingDirection, MappingIssue, MappingReason};
pub use mapper::AttributeMapper;
pub use table::{CommandMapping, KeyValueEntry, MappingTable, OverrideMode, QualifierMapping};

/// A flat attribute record: name to JSON value.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

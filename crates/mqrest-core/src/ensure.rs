//! Idempotent define-or-alter.
//!
//! `ensure_*` displays the object, defines it when absent, and otherwise
//! alters only the attributes whose current value differs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::mapping::Attributes;
use crate::session::{CommandRequest, Session};

/// What an ensure call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureAction {
    Created,
    Updated,
    Unchanged,
}

impl std::fmt::Display for EnsureAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            EnsureAction::Created => "created",
            EnsureAction::Updated => "updated",
            EnsureAction::Unchanged => "unchanged",
        };
        f.write_str(text)
    }
}

/// Result of an ensure call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureOutcome {
    pub action: EnsureAction,
    /// Attributes sent in the ALTER, in the caller's naming.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,
}

impl EnsureOutcome {
    pub fn created() -> Self {
        Self {
            action: EnsureAction::Created,
            changed: Vec::new(),
        }
    }

    pub fn unchanged() -> Self {
        Self {
            action: EnsureAction::Unchanged,
            changed: Vec::new(),
        }
    }

    pub fn updated(changed: Vec<String>) -> Self {
        Self {
            action: EnsureAction::Updated,
            changed,
        }
    }
}

/// Qualifiers used for each step of an ensure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsureTarget {
    pub display_qualifier: &'static str,
    pub define_qualifier: &'static str,
    pub alter_qualifier: &'static str,
}

impl EnsureTarget {
    /// Same qualifier for every step.
    pub const fn uniform(qualifier: &'static str) -> Self {
        Self {
            display_qualifier: qualifier,
            define_qualifier: qualifier,
            alter_qualifier: qualifier,
        }
    }

    /// Queue types display through `QUEUE`.
    pub const fn queue(qualifier: &'static str) -> Self {
        Self {
            display_qualifier: "QUEUE",
            define_qualifier: qualifier,
            alter_qualifier: qualifier,
        }
    }
}

/// Desired attributes that differ from `current`, as (names, attributes).
///
/// Values compare as trimmed, case-insensitive text, so `5000` matches
/// `"5000"`. A desired attribute missing from `current` always differs.
pub fn diff_attributes(desired: &Attributes, current: &Attributes) -> (Vec<String>, Attributes) {
    let mut names = Vec::new();
    let mut changed = Attributes::new();
    for (key, desired_value) in desired {
        let matches = current
            .get(key)
            .is_some_and(|current_value| values_match(desired_value, current_value));
        if !matches {
            names.push(key.clone());
            changed.insert(key.clone(), desired_value.clone());
        }
    }
    (names, changed)
}

fn values_match(desired: &Value, current: &Value) -> bool {
    text_of(desired)
        .trim()
        .eq_ignore_ascii_case(text_of(current).trim())
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

macro_rules! ensure_helpers {
    ($($method:ident => $target:expr),* $(,)?) => {
        /// Targets behind the `ensure_*` helpers.
        pub const ENSURE_TARGETS: &[EnsureTarget] = &[$($target),*];

        impl Session {
            $(
                pub fn $method(
                    &mut self,
                    name: &str,
                    desired: &Attributes,
                ) -> Result<EnsureOutcome> {
                    self.ensure_object(name, desired, $target)
                }
            )*
        }
    };
}

impl Session {
    /// Converge the named object to `desired`.
    pub fn ensure_object(
        &mut self,
        name: &str,
        desired: &Attributes,
        target: EnsureTarget,
    ) -> Result<EnsureOutcome> {
        let display = CommandRequest::new("DISPLAY", target.display_qualifier)
            .with_name(name)
            .with_response_parameters(vec!["all".to_string()]);
        let current = match self.execute(display) {
            Ok(records) => records.into_iter().next(),
            Err(err) if err.is_command_error() => {
                tracing::debug!(name, error = %err, "Display failed, treating object as absent");
                None
            }
            Err(err) => return Err(err),
        };

        let Some(current) = current else {
            self.execute(
                CommandRequest::new("DEFINE", target.define_qualifier)
                    .with_name(name)
                    .with_parameters(desired.clone()),
            )?;
            tracing::info!(name, qualifier = target.define_qualifier, "Created");
            return Ok(EnsureOutcome::created());
        };

        if desired.is_empty() {
            return Ok(EnsureOutcome::unchanged());
        }
        self.alter_changed(
            CommandRequest::new("ALTER", target.alter_qualifier).with_name(name),
            desired,
            &current,
        )
    }

    /// Converge queue manager attributes. The queue manager always exists,
    /// so this never defines.
    pub fn ensure_qmgr(&mut self, desired: &Attributes) -> Result<EnsureOutcome> {
        if desired.is_empty() {
            return Ok(EnsureOutcome::unchanged());
        }
        let display = CommandRequest::new("DISPLAY", "QMGR")
            .with_response_parameters(vec!["all".to_string()]);
        let current = self.execute(display)?.into_iter().next().unwrap_or_default();
        self.alter_changed(CommandRequest::new("ALTER", "QMGR"), desired, &current)
    }

    fn alter_changed(
        &mut self,
        alter: CommandRequest,
        desired: &Attributes,
        current: &Attributes,
    ) -> Result<EnsureOutcome> {
        let (names, changed) = diff_attributes(desired, current);
        if names.is_empty() {
            return Ok(EnsureOutcome::unchanged());
        }
        let qualifier = alter.qualifier.clone();
        self.execute(alter.with_parameters(changed))?;
        tracing::info!(%qualifier, changed = ?names, "Updated");
        Ok(EnsureOutcome::updated(names))
    }
}

ensure_helpers! {
    ensure_qlocal => EnsureTarget::queue("QLOCAL"),
    ensure_qremote => EnsureTarget::queue("QREMOTE"),
    ensure_qalias => EnsureTarget::queue("QALIAS"),
    ensure_qmodel => EnsureTarget::queue("QMODEL"),
    ensure_channel => EnsureTarget::uniform("CHANNEL"),
    ensure_authinfo => EnsureTarget::uniform("AUTHINFO"),
    ensure_listener => EnsureTarget::uniform("LISTENER"),
    ensure_namelist => EnsureTarget::uniform("NAMELIST"),
    ensure_process => EnsureTarget::uniform("PROCESS"),
    ensure_service => EnsureTarget::uniform("SERVICE"),
    ensure_topic => EnsureTarget::uniform("TOPIC"),
    ensure_sub => EnsureTarget::uniform("SUB"),
    ensure_stgclass => EnsureTarget::uniform("STGCLASS"),
    ensure_comminfo => EnsureTarget::uniform("COMMINFO"),
    ensure_cfstruct => EnsureTarget::uniform("CFSTRUCT"),
}

//! Error types for the MQ REST client.
//!
//! Every failure surfaces to the caller; nothing in this crate retries.

use serde_json::Value;

use crate::mapping::MappingIssue;
use crate::sync::SyncOperation;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Client error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or connection failure while talking to the REST API.
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// HTTP 401/403 on a command, or a failed LTPA login.
    #[error("Authentication failed (HTTP {status}) for {url}")]
    Auth { url: String, status: u16 },

    /// Response body was not a JSON object.
    #[error("Unparseable response (HTTP {status}): {body}")]
    Response { status: u16, body: String },

    /// Non-zero completion or reason code, overall or on any item.
    #[error(
        "Command failed (HTTP {status}): completion code {}, reason code {}",
        code_text(.payload, "overallCompletionCode"),
        code_text(.payload, "overallReasonCode")
    )]
    Command { status: u16, payload: Value },

    /// One or more attribute translation issues in strict mode.
    #[error("Mapping failed: {}", describe_issues(.issues))]
    Mapping { issues: Vec<MappingIssue> },

    /// A sync operation ran out of time.
    #[error("Timed out waiting for {name} to be {operation} after {elapsed_secs:.1}s")]
    Timeout {
        name: String,
        operation: SyncOperation,
        elapsed_secs: f64,
    },

    /// Invalid configuration or input document.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn transport(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether this is a command-level failure reported by the queue manager.
    pub fn is_command_error(&self) -> bool {
        matches!(self, Error::Command { .. })
    }

    /// Whether this is a network failure.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Whether this is an authentication failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth { .. })
    }

    /// Whether this is a strict-mode mapping failure.
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, Error::Mapping { .. })
    }

    /// Whether a sync operation timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Overall completion code of a command error.
    ///
    /// Falls back to the first non-zero per-item code when the overall code
    /// is zero or missing.
    pub fn completion_code(&self) -> Option<i64> {
        self.command_code("overallCompletionCode", "completionCode")
    }

    /// Overall reason code of a command error, with the same fallback as
    /// [`Error::completion_code`].
    pub fn reason_code(&self) -> Option<i64> {
        self.command_code("overallReasonCode", "reasonCode")
    }

    /// Mapping issues carried by a mapping error.
    pub fn mapping_issues(&self) -> &[MappingIssue] {
        match self {
            Error::Mapping { issues } => issues,
            _ => &[],
        }
    }

    fn command_code(&self, overall: &str, item: &str) -> Option<i64> {
        let Error::Command { payload, .. } = self else {
            return None;
        };
        if let Some(code) = payload.get(overall).and_then(Value::as_i64) {
            if code != 0 {
                return Some(code);
            }
        }
        let from_items = payload
            .get("commandResponse")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.get(item).and_then(Value::as_i64))
            .find(|code| *code != 0);
        from_items.or_else(|| payload.get(overall).and_then(Value::as_i64))
    }
}

fn code_text(payload: &Value, key: &str) -> String {
    match payload.get(key) {
        Some(value) => value.to_string(),
        None => "-".to_string(),
    }
}

fn describe_issues(issues: &[MappingIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

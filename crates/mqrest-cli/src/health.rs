//! Queue manager health report.

use mqrest_core::{Attributes, CommandOptions, Session};
use serde::Serialize;
use serde_json::Value;

const UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerHealth {
    pub name: String,
    pub start_mode: String,
}

/// Reachability and status of one queue manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub qmgr_name: String,
    pub reachable: bool,
    pub status: String,
    pub command_server: String,
    pub listeners: Vec<ListenerHealth>,
    /// Reachable and reporting a known status.
    pub passed: bool,
}

/// Query the queue manager, its status, the command server and listeners.
///
/// Only the first query decides reachability; later failures leave their
/// field at `UNKNOWN`.
pub fn check(session: &mut Session) -> HealthReport {
    let mut report = HealthReport {
        qmgr_name: session.qmgr_name().to_string(),
        reachable: false,
        status: UNKNOWN.to_string(),
        command_server: UNKNOWN.to_string(),
        listeners: Vec::new(),
        passed: false,
    };

    let qmgr = match session.display_qmgr(CommandOptions::new()) {
        Ok(qmgr) => qmgr,
        Err(e) => {
            tracing::warn!(qmgr = %report.qmgr_name, error = %e, "Queue manager unreachable");
            return report;
        }
    };
    report.reachable = true;
    if let Some(name) = qmgr.as_ref().and_then(|q| text(q, &["queue_manager_name", "QMNAME"])) {
        report.qmgr_name = name;
    }

    match session.display_qmstatus(CommandOptions::new()) {
        Ok(Some(status)) => {
            if let Some(value) = text(&status, &["status", "ha_status", "STATUS", "HASTATUS"]) {
                report.status = value;
            }
        }
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "DISPLAY QMSTATUS failed"),
    }

    match session.display_cmdserv(CommandOptions::new()) {
        Ok(Some(cmdserv)) => {
            if let Some(value) = text(&cmdserv, &["status", "STATUS"]) {
                report.command_server = value;
            }
        }
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "DISPLAY CMDSERV failed"),
    }

    match session.display_listener(Some("*"), CommandOptions::new()) {
        Ok(listeners) => {
            report.listeners = listeners
                .iter()
                .map(|listener| ListenerHealth {
                    name: text(listener, &["listener_name", "LISTENER"]).unwrap_or_default(),
                    start_mode: text(listener, &["start_mode", "CONTROL"]).unwrap_or_default(),
                })
                .collect();
        }
        Err(e) => tracing::debug!(error = %e, "DISPLAY LISTENER failed"),
    }

    report.passed = report.reachable && report.status != UNKNOWN;
    report
}

/// First non-empty value among `keys`, trimmed.
fn text(record: &Attributes, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .map(|value| match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
        .find(|value| !value.is_empty())
}

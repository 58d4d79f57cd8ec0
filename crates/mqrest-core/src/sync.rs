//! Blocking start/stop/restart with status polling.
//!
//! Each operation issues the command, then polls the object's status until
//! it reaches the target state or the timeout elapses. Time comes from a
//! [`Clock`] so tests can drive the loop without real delays.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mapping::Attributes;
use crate::session::{CommandRequest, Session};

/// Default polling budget.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const RUNNING_VALUES: &[&str] = &["RUNNING", "running"];
const STOPPED_VALUES: &[&str] = &["STOPPED", "stopped", "INACTIVE", "inactive"];

/// Time source for polling.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time and real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on or advanced by hand.
///
/// Every sleep is recorded so tests can assert on the polling cadence.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualClockState>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualClockState::default()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
    }

    /// Sleeps requested so far.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Total time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.lock().offset
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualClockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().offset
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

/// Polling budget and cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SYNC_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SyncConfig {
    /// Zero values fall back to the defaults.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
        .normalized()
    }

    /// Build from seconds, rejecting negative or non-finite values.
    pub fn from_secs(timeout_secs: f64, poll_interval_secs: f64) -> Result<Self> {
        let timeout = non_negative_secs("timeout", timeout_secs)?;
        let poll_interval = non_negative_secs("poll interval", poll_interval_secs)?;
        Ok(Self::new(timeout, poll_interval))
    }

    fn normalized(self) -> Self {
        Self {
            timeout: if self.timeout.is_zero() {
                DEFAULT_SYNC_TIMEOUT
            } else {
                self.timeout
            },
            poll_interval: if self.poll_interval.is_zero() {
                DEFAULT_POLL_INTERVAL
            } else {
                self.poll_interval
            },
        }
    }
}

fn non_negative_secs(what: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "sync {} must not be negative, got {}",
            what, secs
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// The state transition a sync call performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Started,
    Stopped,
    Restarted,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SyncOperation::Started => "started",
            SyncOperation::Stopped => "stopped",
            SyncOperation::Restarted => "restarted",
        };
        f.write_str(text)
    }
}

/// Result of a completed sync call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub operation: SyncOperation,
    pub polls: u32,
    pub elapsed_secs: f64,
}

/// How to start, stop and observe one object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusConfig {
    /// Qualifier for START and STOP.
    pub qualifier: &'static str,
    /// Qualifier for the status DISPLAY.
    pub status_qualifier: &'static str,
    /// Record keys that may carry the status, checked in order.
    pub status_keys: &'static [&'static str],
    /// Whether an empty status result means the object has stopped.
    pub empty_means_stopped: bool,
}

impl StatusConfig {
    /// Channels drop out of CHSTATUS entirely once inactive.
    pub const CHANNEL: StatusConfig = StatusConfig {
        qualifier: "CHANNEL",
        status_qualifier: "CHSTATUS",
        status_keys: &["channel_status", "STATUS"],
        empty_means_stopped: true,
    };

    pub const LISTENER: StatusConfig = StatusConfig {
        qualifier: "LISTENER",
        status_qualifier: "LSSTATUS",
        status_keys: &["status", "STATUS"],
        empty_means_stopped: false,
    };

    pub const SERVICE: StatusConfig = StatusConfig {
        qualifier: "SERVICE",
        status_qualifier: "SVSTATUS",
        status_keys: &["status", "STATUS"],
        empty_means_stopped: false,
    };
}

/// Whether any record reports one of `targets` under any of `keys`.
fn has_status(records: &[Attributes], keys: &[&str], targets: &[&str]) -> bool {
    records.iter().any(|record| {
        keys.iter()
            .filter_map(|key| record.get(*key).and_then(|value| value.as_str()))
            .any(|value| targets.contains(&value.trim()))
    })
}

impl Session {
    /// Start an object and wait until it reports running.
    pub fn start_sync(
        &mut self,
        name: &str,
        status: &StatusConfig,
        config: SyncConfig,
    ) -> Result<SyncOutcome> {
        let config = config.normalized();
        self.execute(CommandRequest::new("START", status.qualifier).with_name(name))?;
        self.poll_until(name, status, config, SyncOperation::Started)
    }

    /// Stop an object and wait until it reports stopped.
    pub fn stop_sync(
        &mut self,
        name: &str,
        status: &StatusConfig,
        config: SyncConfig,
    ) -> Result<SyncOutcome> {
        let config = config.normalized();
        self.execute(CommandRequest::new("STOP", status.qualifier).with_name(name))?;
        self.poll_until(name, status, config, SyncOperation::Stopped)
    }

    /// Stop then start. Polls and elapsed time are summed over both phases.
    pub fn restart_sync(
        &mut self,
        name: &str,
        status: &StatusConfig,
        config: SyncConfig,
    ) -> Result<SyncOutcome> {
        let stopped = self.stop_sync(name, status, config)?;
        let started = self.start_sync(name, status, config)?;
        let outcome = SyncOutcome {
            operation: SyncOperation::Restarted,
            polls: stopped.polls + started.polls,
            elapsed_secs: stopped.elapsed_secs + started.elapsed_secs,
        };
        tracing::info!(
            name,
            polls = outcome.polls,
            elapsed_secs = outcome.elapsed_secs,
            "Restarted"
        );
        Ok(outcome)
    }

    pub fn start_channel_sync(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.start_sync(name, &StatusConfig::CHANNEL, config)
    }

    pub fn stop_channel_sync(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.stop_sync(name, &StatusConfig::CHANNEL, config)
    }

    pub fn restart_channel(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.restart_sync(name, &StatusConfig::CHANNEL, config)
    }

    pub fn start_listener_sync(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.start_sync(name, &StatusConfig::LISTENER, config)
    }

    pub fn stop_listener_sync(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.stop_sync(name, &StatusConfig::LISTENER, config)
    }

    pub fn restart_listener(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.restart_sync(name, &StatusConfig::LISTENER, config)
    }

    pub fn start_service_sync(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.start_sync(name, &StatusConfig::SERVICE, config)
    }

    pub fn stop_service_sync(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.stop_sync(name, &StatusConfig::SERVICE, config)
    }

    pub fn restart_service(&mut self, name: &str, config: SyncConfig) -> Result<SyncOutcome> {
        self.restart_sync(name, &StatusConfig::SERVICE, config)
    }

    fn poll_until(
        &mut self,
        name: &str,
        status: &StatusConfig,
        config: SyncConfig,
        operation: SyncOperation,
    ) -> Result<SyncOutcome> {
        let targets = match operation {
            SyncOperation::Started => RUNNING_VALUES,
            _ => STOPPED_VALUES,
        };
        let clock = self.clock.clone();
        let started_at = clock.now();
        let mut polls = 0u32;

        loop {
            clock.sleep(config.poll_interval);
            let records = self.query_status(name, status)?;
            polls += 1;

            let reached = (operation == SyncOperation::Stopped
                && status.empty_means_stopped
                && records.is_empty())
                || has_status(&records, status.status_keys, targets);

            let elapsed_secs = clock.now().saturating_duration_since(started_at).as_secs_f64();
            tracing::debug!(
                name,
                polls,
                elapsed_secs,
                reached,
                "Polled {}",
                status.status_qualifier
            );

            if reached {
                tracing::info!(name, %operation, polls, elapsed_secs, "Sync complete");
                return Ok(SyncOutcome {
                    operation,
                    polls,
                    elapsed_secs,
                });
            }
            if elapsed_secs >= config.timeout.as_secs_f64() {
                return Err(Error::Timeout {
                    name: name.to_string(),
                    operation,
                    elapsed_secs,
                });
            }
        }
    }

    fn query_status(&mut self, name: &str, status: &StatusConfig) -> Result<Vec<Attributes>> {
        let request = CommandRequest::new("DISPLAY", status.status_qualifier)
            .with_name(name)
            .with_response_parameters(vec!["all".to_string()]);
        match self.execute(request) {
            Ok(records) => Ok(records),
            Err(err) if err.is_command_error() => {
                tracing::warn!(name, error = %err, "Status query failed, treating as no status");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

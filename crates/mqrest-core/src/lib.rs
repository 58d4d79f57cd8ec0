//! Client core for the IBM MQ administrative REST API.
//!
//! A [`Session`] sends MQSC commands through the `runCommandJSON` endpoint
//! and returns flat attribute records. On top of that sit:
//!
//! - attribute mapping between `snake_case` names and MQSC tokens ([`mapping`]),
//! - per-command convenience methods ([`commands`]),
//! - idempotent define-or-alter ([`ensure`]),
//! - blocking start/stop/restart with status polling ([`sync`]).
//!
//! ```no_run
//! use mqrest_core::prelude::*;
//!
//! # fn main() -> mqrest_core::Result<()> {
//! let config = SessionConfig::new("https://localhost:9443/ibmmq/rest/v2", "QM1");
//! let mut session = Session::builder(config, Credentials::basic("mqadmin", "mqadmin")).build()?;
//!
//! for queue in session.display_queue(Some("APP.*"), CommandOptions::new())? {
//!     println!("{:?}", queue.get("queue_name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod commands;
pub mod config;
pub mod ensure;
pub mod error;
pub mod mapping;
pub mod session;
pub mod sync;
pub mod transport;

pub use auth::Credentials;
pub use commands::CommandOptions;
pub use config::{ConfigFile, CredentialsConfig, SessionConfig};
pub use ensure::{EnsureAction, EnsureOutcome, EnsureTarget, ENSURE_TARGETS};
pub use error::{Error, Result};
pub use mapping::{AttributeMapper, Attributes, MappingIssue, MappingTable, OverrideMode};
pub use session::{CommandRequest, Session, SessionBuilder};
pub use sync::{
    Clock, ManualClock, StatusConfig, SyncConfig, SyncOperation, SyncOutcome, SystemClock,
};
pub use transport::{HttpTransport, Transport, TransportResponse};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::auth::Credentials;
    pub use crate::commands::CommandOptions;
    pub use crate::config::{defaults, env_vars, SessionConfig};
    pub use crate::ensure::{EnsureAction, EnsureOutcome};
    pub use crate::error::{Error, Result};
    pub use crate::mapping::{Attributes, MappingIssue, OverrideMode};
    pub use crate::session::{CommandRequest, Session};
    pub use crate::sync::{SyncConfig, SyncOperation, SyncOutcome};
}

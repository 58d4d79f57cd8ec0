//! Session configuration: defaults, environment variables and TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::mapping::OverrideMode;
use crate::sync::SyncConfig;

/// Default values.
pub mod defaults {
    /// Per-request HTTP timeout.
    pub const TIMEOUT_SECS: u64 = 30;
    /// Sent as `ibm-mq-rest-csrf-token` unless disabled.
    pub const CSRF_TOKEN: &str = "local";
    pub const SYNC_TIMEOUT_SECS: f64 = 30.0;
    pub const POLL_INTERVAL_SECS: f64 = 1.0;
}

/// Environment variable names.
pub mod env_vars {
    pub const BASE_URL: &str = "MQ_REST_BASE_URL";
    pub const QMGR_NAME: &str = "MQ_QMGR_NAME";
    pub const GATEWAY_QMGR: &str = "MQ_GATEWAY_QMGR";
    pub const VERIFY_TLS: &str = "MQ_VERIFY_TLS";
    pub const TIMEOUT_SECS: &str = "MQ_REST_TIMEOUT_SECS";
    pub const ADMIN_USER: &str = "MQ_ADMIN_USER";
    pub const ADMIN_PASSWORD: &str = "MQ_ADMIN_PASSWORD";

    /// Basic credentials from `MQ_ADMIN_USER` and `MQ_ADMIN_PASSWORD`.
    pub fn basic_credentials() -> Option<crate::auth::Credentials> {
        let user = std::env::var(ADMIN_USER).ok()?;
        let password = std::env::var(ADMIN_PASSWORD).unwrap_or_default();
        Some(crate::auth::Credentials::basic(user, password))
    }
}

/// Connection and behavior settings for a [`crate::Session`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// REST base URL, e.g. `https://localhost:9443/ibmmq/rest/v2`.
    pub base_url: String,
    /// Target queue manager.
    pub qmgr_name: String,
    /// Queue manager that routes commands to a remote target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_qmgr: Option<String>,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Per-request timeout; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub map_attributes: bool,
    /// Fail on any mapping issue instead of passing attributes through.
    #[serde(default = "default_true")]
    pub mapping_strict: bool,
    /// CSRF token header value; `None` omits the header. An empty string in
    /// a file also omits it.
    #[serde(default = "default_csrf_token", deserialize_with = "empty_as_none")]
    pub csrf_token: Option<String>,
    /// JSON file with mapping overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_overrides: Option<PathBuf>,
    #[serde(default)]
    pub mapping_overrides_mode: OverrideMode,
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: f64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: f64,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    defaults::TIMEOUT_SECS
}

fn default_csrf_token() -> Option<String> {
    Some(defaults::CSRF_TOKEN.to_string())
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let token = Option::<String>::deserialize(deserializer)?;
    Ok(token.filter(|token| !token.is_empty()))
}

fn default_sync_timeout_secs() -> f64 {
    defaults::SYNC_TIMEOUT_SECS
}

fn default_poll_interval_secs() -> f64 {
    defaults::POLL_INTERVAL_SECS
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>, qmgr_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            qmgr_name: qmgr_name.into(),
            gateway_qmgr: None,
            verify_tls: true,
            timeout_secs: defaults::TIMEOUT_SECS,
            map_attributes: true,
            mapping_strict: true,
            csrf_token: default_csrf_token(),
            mapping_overrides: None,
            mapping_overrides_mode: OverrideMode::Merge,
            sync_timeout_secs: defaults::SYNC_TIMEOUT_SECS,
            poll_interval_secs: defaults::POLL_INTERVAL_SECS,
        }
    }

    pub fn with_gateway_qmgr(mut self, gateway: impl Into<String>) -> Self {
        self.gateway_qmgr = Some(gateway.into());
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_map_attributes(mut self, enabled: bool) -> Self {
        self.map_attributes = enabled;
        self
    }

    pub fn with_mapping_strict(mut self, strict: bool) -> Self {
        self.mapping_strict = strict;
        self
    }

    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name-to-value source; `from_env` uses the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(env_vars::BASE_URL)
            .ok_or_else(|| Error::InvalidConfig(format!("{} is not set", env_vars::BASE_URL)))?;
        let qmgr_name = lookup(env_vars::QMGR_NAME)
            .ok_or_else(|| Error::InvalidConfig(format!("{} is not set", env_vars::QMGR_NAME)))?;

        let mut config = Self::new(base_url, qmgr_name);
        config.gateway_qmgr = lookup(env_vars::GATEWAY_QMGR).filter(|s| !s.is_empty());
        if let Some(verify) = lookup(env_vars::VERIFY_TLS) {
            config.verify_tls = parse_bool(&verify).ok_or_else(|| {
                Error::InvalidConfig(format!("{} must be true or false", env_vars::VERIFY_TLS))
            })?;
        }
        if let Some(timeout) = lookup(env_vars::TIMEOUT_SECS) {
            config.timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("{} must be whole seconds", env_vars::TIMEOUT_SECS))
            })?;
        }
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig(format!("invalid config: {}", e)))
    }

    /// Base URL without trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Validated sync settings.
    pub fn sync_config(&self) -> Result<SyncConfig> {
        SyncConfig::from_secs(self.sync_timeout_secs, self.poll_interval_secs)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("base_url is empty".to_string()));
        }
        if self.qmgr_name.trim().is_empty() {
            return Err(Error::InvalidConfig("qmgr_name is empty".to_string()));
        }
        Ok(())
    }
}

/// Credentials section of a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsConfig {
    Basic { username: String, password: String },
    Ltpa { username: String, password: String },
    Certificate {
        cert_path: PathBuf,
        #[serde(default)]
        key_path: Option<PathBuf>,
    },
}

impl From<CredentialsConfig> for Credentials {
    fn from(config: CredentialsConfig) -> Self {
        match config {
            CredentialsConfig::Basic { username, password } => {
                Credentials::basic(username, password)
            }
            CredentialsConfig::Ltpa { username, password } => Credentials::ltpa(username, password),
            CredentialsConfig::Certificate {
                cert_path,
                key_path,
            } => Credentials::certificate(cert_path, key_path),
        }
    }
}

/// A TOML file with session settings at the top level and an optional
/// `[credentials]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub session: SessionConfig,
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&text).map_err(|e| Error::InvalidConfig(format!("invalid config: {}", e)))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new("https://localhost:9443/ibmmq/rest/v2/", "QM1");
        assert!(config.verify_tls);
        assert!(config.map_attributes);
        assert!(config.mapping_strict);
        assert_eq!(config.csrf_token.as_deref(), Some("local"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.normalized_base_url(), "https://localhost:9443/ibmmq/rest/v2");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("MQ_REST_BASE_URL", "https://mq:9443/ibmmq/rest/v2"),
            ("MQ_QMGR_NAME", "QM1"),
            ("MQ_GATEWAY_QMGR", "QM2"),
            ("MQ_VERIFY_TLS", "false"),
            ("MQ_REST_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();

        let config =
            SessionConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.qmgr_name, "QM1");
        assert_eq!(config.gateway_qmgr.as_deref(), Some("QM2"));
        assert!(!config.verify_tls);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_from_lookup_requires_base_url() {
        let err = SessionConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains("MQ_REST_BASE_URL"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_bool() {
        let err = SessionConfig::from_lookup(|name| match name {
            "MQ_REST_BASE_URL" => Some("https://mq".to_string()),
            "MQ_QMGR_NAME" => Some("QM1".to_string()),
            "MQ_VERIFY_TLS" => Some("sometimes".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://localhost:9443/ibmmq/rest/v2"
qmgr_name = "QM1"
verify_tls = false
mapping_strict = false
mapping_overrides_mode = "replace"
sync_timeout_secs = 10.0
"#
        )
        .unwrap();

        let config = SessionConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.qmgr_name, "QM1");
        assert!(!config.verify_tls);
        assert!(config.map_attributes);
        assert!(!config.mapping_strict);
        assert_eq!(config.mapping_overrides_mode, OverrideMode::Replace);
        assert_eq!(config.csrf_token.as_deref(), Some("local"));

        let sync = config.sync_config().unwrap();
        assert_eq!(sync.timeout, Duration::from_secs(10));
        assert_eq!(sync.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_negative_sync_settings_rejected() {
        let mut config = SessionConfig::new("https://mq", "QM1");
        config.poll_interval_secs = -1.0;
        assert!(config.sync_config().is_err());
    }

    #[test]
    fn test_credentials_config() {
        #[derive(Deserialize)]
        struct Doc {
            credentials: CredentialsConfig,
        }
        let doc: Doc = toml::from_str(
            r#"
[credentials]
type = "ltpa"
username = "admin"
password = "secret"
"#,
        )
        .unwrap();
        let credentials: Credentials = doc.credentials.into();
        assert_eq!(credentials, Credentials::ltpa("admin", "secret"));
    }

    #[test]
    fn test_config_file_with_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://mq:9443/ibmmq/rest/v2"
qmgr_name = "QM2"
gateway_qmgr = "QM1"

[credentials]
type = "basic"
username = "mqadmin"
password = "mqadmin"
"#
        )
        .unwrap();

        let loaded = ConfigFile::load(file.path()).unwrap();
        assert_eq!(loaded.session.qmgr_name, "QM2");
        assert_eq!(loaded.session.gateway_qmgr.as_deref(), Some("QM1"));
        let credentials: Credentials = loaded.credentials.unwrap().into();
        assert_eq!(credentials, Credentials::basic("mqadmin", "mqadmin"));
    }

    #[test]
    fn test_empty_csrf_token_omits_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url = \"https://mq\"\nqmgr_name = \"QM1\"\ncsrf_token = \"\""
        )
        .unwrap();
        let loaded = ConfigFile::load(file.path()).unwrap();
        assert_eq!(loaded.session.csrf_token, None);

        let config: SessionConfig =
            toml::from_str("base_url = \"https://mq\"\nqmgr_name = \"QM1\"\ncsrf_token = \"abc\"")
                .unwrap();
        assert_eq!(config.csrf_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_config_file_without_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"https://mq\"\nqmgr_name = \"QM1\"").unwrap();
        let loaded = ConfigFile::load(file.path()).unwrap();
        assert!(loaded.credentials.is_none());
        assert!(ConfigFile::load("/nonexistent/mqrest.toml").is_err());
    }
}

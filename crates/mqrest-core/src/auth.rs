//! Credential schemes and their request headers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Path appended to the base URL for LTPA login.
pub const LTPA_LOGIN_PATH: &str = "/login";

/// Cookie carrying the LTPA session token.
pub const LTPA_COOKIE_NAME: &str = "LtpaToken2";

/// How a session authenticates against the REST API.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP Basic authentication on every request.
    Basic { username: String, password: String },
    /// One login at session construction, then an `LtpaToken2` cookie.
    Ltpa { username: String, password: String },
    /// Mutual TLS with a client certificate. `key_path` may be omitted when
    /// the certificate file also holds the private key.
    Certificate {
        cert_path: PathBuf,
        key_path: Option<PathBuf>,
    },
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn ltpa(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Ltpa {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn certificate(cert_path: impl Into<PathBuf>, key_path: Option<PathBuf>) -> Self {
        Credentials::Certificate {
            cert_path: cert_path.into(),
            key_path,
        }
    }

    /// Add this scheme's per-request headers.
    ///
    /// `ltpa_token` is the token obtained by [`ltpa_login`]; it is ignored by
    /// the other schemes. Certificates act at the TLS layer and add nothing.
    pub fn apply(&self, headers: &mut HashMap<String, String>, ltpa_token: Option<&str>) {
        match self {
            Credentials::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                headers.insert("Authorization".to_string(), format!("Basic {}", encoded));
            }
            Credentials::Ltpa { .. } => {
                if let Some(token) = ltpa_token.filter(|t| !t.is_empty()) {
                    headers.insert(
                        "Cookie".to_string(),
                        format!("{}={}", LTPA_COOKIE_NAME, token),
                    );
                }
            }
            Credentials::Certificate { .. } => {}
        }
    }

    /// Load the client identity for certificate credentials.
    pub fn identity(&self) -> Result<Option<reqwest::Identity>> {
        let Credentials::Certificate {
            cert_path,
            key_path,
        } = self
        else {
            return Ok(None);
        };

        let mut pem = std::fs::read(cert_path).map_err(|e| {
            Error::InvalidConfig(format!(
                "cannot read client certificate {}: {}",
                cert_path.display(),
                e
            ))
        })?;
        if let Some(key_path) = key_path {
            let key = std::fs::read(key_path).map_err(|e| {
                Error::InvalidConfig(format!(
                    "cannot read client key {}: {}",
                    key_path.display(),
                    e
                ))
            })?;
            pem.push(b'\n');
            pem.extend_from_slice(&key);
        }

        reqwest::Identity::from_pem(&pem)
            .map(Some)
            .map_err(|e| Error::InvalidConfig(format!("invalid client certificate: {}", e)))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Ltpa { username, .. } => f
                .debug_struct("Ltpa")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Certificate {
                cert_path,
                key_path,
            } => f
                .debug_struct("Certificate")
                .field("cert_path", cert_path)
                .field("key_path", key_path)
                .finish(),
        }
    }
}

/// Log in with LTPA credentials and return the `LtpaToken2` value.
///
/// Any status of 400 or above, or a response without the cookie, is an
/// authentication error.
pub fn ltpa_login(
    transport: &dyn Transport,
    base_url: &str,
    username: &str,
    password: &str,
    csrf_token: Option<&str>,
    timeout: Option<Duration>,
    verify_tls: bool,
) -> Result<String> {
    let url = format!("{}{}", base_url, LTPA_LOGIN_PATH);
    let payload = json!({"username": username, "password": password});

    let mut headers = HashMap::new();
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    if let Some(token) = csrf_token {
        headers.insert("ibm-mq-rest-csrf-token".to_string(), token.to_string());
    }

    tracing::debug!(url = %url, username, "LTPA login");
    let response = transport.post_json(&url, &payload, &headers, timeout, verify_tls)?;
    if response.status >= 400 {
        return Err(Error::Auth {
            url,
            status: response.status,
        });
    }

    response
        .header("set-cookie")
        .and_then(extract_ltpa_token)
        .ok_or(Error::Auth {
            url,
            status: response.status,
        })
}

/// Find the `LtpaToken2` value in a `Set-Cookie` header.
pub fn extract_ltpa_token(set_cookie: &str) -> Option<String> {
    let prefix = format!("{}=", LTPA_COOKIE_NAME);
    set_cookie
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix(prefix.as_str()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

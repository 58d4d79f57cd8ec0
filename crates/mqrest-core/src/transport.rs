//! HTTP transport used by the session.
//!
//! The session only depends on the [`Transport`] trait. [`HttpTransport`] is
//! the blocking reqwest implementation; tests substitute an in-memory one.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::{Error, Result};

/// Raw HTTP response handed back to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    /// Lowercase header name to value. Repeated headers are joined with `"; "`.
    pub headers: HashMap<String, String>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Sends a JSON POST and returns the raw response.
///
/// Implementations must report network failures as [`Error::Transport`] and
/// return every HTTP status, including 4xx and 5xx, as a response.
pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        url: &str,
        payload: &Value,
        headers: &HashMap<String, String>,
        timeout: Option<Duration>,
        verify_tls: bool,
    ) -> Result<TransportResponse>;
}

/// Blocking reqwest transport.
///
/// One client is built lazily per TLS verification mode and reused.
#[derive(Default)]
pub struct HttpTransport {
    identity: Option<reqwest::Identity>,
    verified: OnceCell<Client>,
    unverified: OnceCell<Client>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport presenting a client certificate for mutual TLS.
    pub fn with_identity(identity: reqwest::Identity) -> Self {
        Self {
            identity: Some(identity),
            ..Self::default()
        }
    }

    fn client(&self, verify_tls: bool) -> Result<&Client> {
        let cell = if verify_tls {
            &self.verified
        } else {
            &self.unverified
        };
        cell.get_or_try_init(|| {
            let mut builder = Client::builder().danger_accept_invalid_certs(!verify_tls);
            if let Some(identity) = &self.identity {
                builder = builder.identity(identity.clone());
            }
            builder
                .build()
                .map_err(|e| Error::transport("", format!("failed to build HTTP client: {}", e)))
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("client_certificate", &self.identity.is_some())
            .finish()
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        payload: &Value,
        headers: &HashMap<String, String>,
        timeout: Option<Duration>,
        verify_tls: bool,
    ) -> Result<TransportResponse> {
        let client = self.client(verify_tls)?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| {
                    Error::transport(url, format!("invalid header name {}: {}", name, e))
                })?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::transport(url, format!("invalid header value: {}", e)))?;
            header_map.insert(name, value);
        }

        let mut request = client.post(url).headers(header_map).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!(url, "POST");
        let response = request.send().map_err(|e| Error::transport(url, e))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response
            .text()
            .map_err(|e| Error::transport(url, format!("failed to read response: {}", e)))?;

        Ok(TransportResponse {
            status,
            body,
            headers,
        })
    }
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str("; ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

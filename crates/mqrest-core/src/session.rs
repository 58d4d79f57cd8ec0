//! Command dispatcher.
//!
//! A [`Session`] turns a [`CommandRequest`] into a `runCommandJSON` POST,
//! classifies the response and returns flat attribute records. Attribute
//! mapping runs on both sides when enabled.
//!
//! A session keeps diagnostics about its most recent call, so it takes
//! `&mut self` and is meant to be owned by one caller at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::auth::{ltpa_login, Credentials};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::mapping::{AttributeMapper, Attributes, MappingIssue, MappingTable, OverrideMode};
use crate::sync::{Clock, SyncConfig, SystemClock};
use crate::transport::{HttpTransport, Transport};

/// Path template for the MQSC endpoint, relative to the base URL.
pub const MQSC_PATH: &str = "/admin/action/qmgr/{qmgr}/mqsc";

pub const CSRF_TOKEN_HEADER: &str = "ibm-mq-rest-csrf-token";
pub const GATEWAY_QMGR_HEADER: &str = "ibm-mq-rest-gateway-qmgr";

/// One MQSC command to run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandRequest {
    pub verb: String,
    pub qualifier: String,
    pub name: Option<String>,
    pub parameters: Attributes,
    /// Explicit response parameters. DISPLAY defaults to `["all"]`.
    pub response_parameters: Option<Vec<String>>,
    /// Filter such as `"current_queue_depth GT 100"`.
    pub where_clause: Option<String>,
    pub display: bool,
    /// The call fails without sending once this instant has passed.
    pub deadline: Option<Instant>,
}

impl CommandRequest {
    /// A request for `verb` on `qualifier`. DISPLAY verbs are flagged as
    /// display commands.
    pub fn new(verb: impl Into<String>, qualifier: impl Into<String>) -> Self {
        let verb = verb.into();
        let display = verb.eq_ignore_ascii_case("DISPLAY");
        Self {
            verb,
            qualifier: qualifier.into(),
            display,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Attributes) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_response_parameters(mut self, names: Vec<String>) -> Self {
        self.response_parameters = Some(names);
        self
    }

    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    config: SessionConfig,
    credentials: Credentials,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    overrides: Option<(MappingTable, OverrideMode)>,
}

impl SessionBuilder {
    /// Use a custom transport instead of [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom clock for sync polling.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Compose mapping overrides onto the bundled table. Takes precedence
    /// over `mapping_overrides` in the config.
    pub fn mapping_overrides(mut self, overrides: MappingTable, mode: OverrideMode) -> Self {
        self.overrides = Some((overrides, mode));
        self
    }

    /// Validate, build the mapper and transport, and log in for LTPA.
    pub fn build(self) -> Result<Session> {
        self.config.validate()?;
        let sync_config = self.config.sync_config()?;

        let mapper = if self.config.map_attributes {
            let overrides = match self.overrides {
                Some(overrides) => Some(overrides),
                None => match &self.config.mapping_overrides {
                    Some(path) => {
                        let text = std::fs::read_to_string(path).map_err(|e| {
                            Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
                        })?;
                        Some((
                            MappingTable::from_json_str(&text)?,
                            self.config.mapping_overrides_mode,
                        ))
                    }
                    None => None,
                },
            };
            let mapper = match overrides {
                Some((table, mode)) => AttributeMapper::with_overrides(&table, mode)?,
                None => AttributeMapper::new()?,
            };
            Some(Arc::new(mapper))
        } else {
            None
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => match self.credentials.identity()? {
                Some(identity) => Arc::new(HttpTransport::with_identity(identity)),
                None => Arc::new(HttpTransport::new()),
            },
        };

        let base_url = self.config.normalized_base_url().to_string();
        let ltpa_token = match &self.credentials {
            Credentials::Ltpa { username, password } => Some(ltpa_login(
                transport.as_ref(),
                &base_url,
                username,
                password,
                self.config.csrf_token.as_deref(),
                self.config.timeout(),
                self.config.verify_tls,
            )?),
            _ => None,
        };

        tracing::debug!(
            base_url = %base_url,
            qmgr = %self.config.qmgr_name,
            map_attributes = self.config.map_attributes,
            strict = self.config.mapping_strict,
            "Session created"
        );

        Ok(Session {
            base_url,
            config: self.config,
            credentials: self.credentials,
            transport,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            mapper,
            ltpa_token,
            sync_config,
            last_http_status: None,
            last_response_text: None,
            last_response_payload: None,
            last_command_payload: None,
        })
    }
}

/// A connection to one queue manager through the REST API.
pub struct Session {
    config: SessionConfig,
    base_url: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    pub(crate) clock: Arc<dyn Clock>,
    mapper: Option<Arc<AttributeMapper>>,
    ltpa_token: Option<String>,
    sync_config: SyncConfig,
    last_http_status: Option<u16>,
    last_response_text: Option<String>,
    last_response_payload: Option<Value>,
    last_command_payload: Option<Value>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("qmgr_name", &self.config.qmgr_name)
            .field("credentials", &self.credentials)
            .field("map_attributes", &self.mapper.is_some())
            .field("last_http_status", &self.last_http_status)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder(config: SessionConfig, credentials: Credentials) -> SessionBuilder {
        SessionBuilder {
            config,
            credentials,
            transport: None,
            clock: None,
            overrides: None,
        }
    }

    pub fn qmgr_name(&self) -> &str {
        &self.config.qmgr_name
    }

    pub fn gateway_qmgr(&self) -> Option<&str> {
        self.config.gateway_qmgr.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sync settings taken from the session config.
    pub fn sync_config(&self) -> SyncConfig {
        self.sync_config
    }

    /// The attribute mapper, when mapping is enabled.
    pub fn mapper(&self) -> Option<&AttributeMapper> {
        self.mapper.as_deref()
    }

    pub fn last_http_status(&self) -> Option<u16> {
        self.last_http_status
    }

    pub fn last_response_text(&self) -> Option<&str> {
        self.last_response_text.as_deref()
    }

    pub fn last_response_payload(&self) -> Option<&Value> {
        self.last_response_payload.as_ref()
    }

    pub fn last_command_payload(&self) -> Option<&Value> {
        self.last_command_payload.as_ref()
    }

    /// Full MQSC endpoint URL.
    pub fn mqsc_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url,
            MQSC_PATH.replace("{qmgr}", &self.config.qmgr_name)
        )
    }

    /// Run one command and return its flattened, mapped records.
    pub fn execute(&mut self, request: CommandRequest) -> Result<Vec<Attributes>> {
        self.last_http_status = None;
        self.last_response_text = None;
        self.last_response_payload = None;
        self.last_command_payload = None;

        let verb = request.verb.to_uppercase();
        let qualifier = request.qualifier.to_uppercase();
        let strict = self.config.mapping_strict;

        let mut parameters = request.parameters;
        let mut response_parameters = request.response_parameters;
        if request.display && response_parameters.is_none() {
            response_parameters = Some(vec!["all".to_string()]);
        }

        let mut mapping_qualifier = None;
        if let Some(mapper) = &self.mapper {
            let resolved = mapper.resolve_mapping_qualifier(&verb, &qualifier);

            if !parameters.is_empty() {
                let (mapped, issues) = mapper.map_request(&resolved, &parameters, strict);
                check_issues(issues, strict)?;
                parameters = mapped;
            }

            if let Some(names) = response_parameters.take() {
                let (names, issues) = mapper.map_response_parameter_names(&resolved, &names);
                if !issues.is_empty() {
                    tracing::debug!(
                        count = issues.len(),
                        "Response parameters passed through unmapped"
                    );
                }
                response_parameters =
                    Some(mapper.resolve_response_parameter_macros(&verb, &qualifier, names));
            }

            mapping_qualifier = Some(resolved);
        }

        if let Some(clause) = request.where_clause.as_deref() {
            let clause = self.map_where_clause(mapping_qualifier.as_deref(), clause);
            parameters.insert("WHERE".to_string(), Value::String(clause));
        }

        let payload = build_payload(
            &verb,
            &qualifier,
            request.name.as_deref(),
            parameters,
            response_parameters,
        );
        self.last_command_payload = Some(payload.clone());

        let url = self.mqsc_url();
        let timeout = self.request_timeout(request.deadline, &url)?;
        let headers = self.headers();

        tracing::debug!(
            command = %verb,
            qualifier = %qualifier,
            name = ?request.name,
            "Sending command"
        );
        let response = self.transport.post_json(
            &url,
            &payload,
            &headers,
            timeout,
            self.config.verify_tls,
        )?;

        self.last_http_status = Some(response.status);
        self.last_response_text = Some(response.body.clone());

        if response.status == 401 || response.status == 403 {
            return Err(Error::Auth {
                url,
                status: response.status,
            });
        }

        let parsed = match serde_json::from_str::<Value>(&response.body) {
            Ok(value) if value.is_object() => value,
            _ => {
                return Err(Error::Response {
                    status: response.status,
                    body: response.body,
                })
            }
        };
        self.last_response_payload = Some(parsed.clone());

        if has_command_error(&parsed) {
            return Err(Error::Command {
                status: response.status,
                payload: parsed,
            });
        }

        let records = flatten_command_response(&parsed);

        match (&self.mapper, mapping_qualifier) {
            (Some(mapper), Some(resolved))
                if mapper.has_qualifier(&resolved) && !records.is_empty() =>
            {
                let (mapped, issues) = mapper.map_response_list(&resolved, &records);
                check_issues(issues, strict)?;
                Ok(mapped)
            }
            _ => Ok(records),
        }
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        self.credentials.apply(&mut headers, self.ltpa_token.as_deref());
        if let Some(token) = &self.config.csrf_token {
            headers.insert(CSRF_TOKEN_HEADER.to_string(), token.clone());
        }
        if let Some(gateway) = &self.config.gateway_qmgr {
            headers.insert(GATEWAY_QMGR_HEADER.to_string(), gateway.clone());
        }
        headers
    }

    /// Configured timeout, narrowed to what is left before the deadline.
    fn request_timeout(&self, deadline: Option<Instant>, url: &str) -> Result<Option<Duration>> {
        let configured = self.config.timeout();
        let Some(deadline) = deadline else {
            return Ok(configured);
        };
        let now = self.clock.now();
        if deadline <= now {
            return Err(Error::transport(url, "deadline exceeded before the request was sent"));
        }
        let remaining = deadline - now;
        Ok(Some(configured.map_or(remaining, |timeout| timeout.min(remaining))))
    }

    /// Translate the leading attribute keyword of a filter clause.
    fn map_where_clause(&self, qualifier: Option<&str>, clause: &str) -> String {
        let clause = clause.trim();
        let (keyword, rest) = match clause.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, Some(rest)),
            None => (clause, None),
        };
        let mapped = self
            .mapper
            .as_deref()
            .zip(qualifier)
            .and_then(|(mapper, qualifier)| mapper.table().qualifier(qualifier))
            .and_then(|mapping| mapping.request_key_map.get(keyword))
            .map(String::as_str)
            .unwrap_or(keyword);
        match rest {
            Some(rest) => format!("{} {}", mapped, rest.trim_start()),
            None => mapped.to_string(),
        }
    }
}

fn check_issues(issues: Vec<MappingIssue>, strict: bool) -> Result<()> {
    if issues.is_empty() {
        return Ok(());
    }
    if strict {
        return Err(Error::Mapping { issues });
    }
    for issue in &issues {
        tracing::warn!(%issue, "Attribute mapping issue");
    }
    Ok(())
}

fn build_payload(
    verb: &str,
    qualifier: &str,
    name: Option<&str>,
    parameters: Attributes,
    response_parameters: Option<Vec<String>>,
) -> Value {
    let mut payload = Map::new();
    payload.insert("type".to_string(), Value::from("runCommandJSON"));
    payload.insert("command".to_string(), Value::from(verb));
    payload.insert("qualifier".to_string(), Value::from(qualifier));
    if let Some(name) = name {
        payload.insert("name".to_string(), Value::from(name));
    }
    if !parameters.is_empty() {
        payload.insert("parameters".to_string(), Value::Object(parameters));
    }
    if let Some(names) = response_parameters.filter(|names| !names.is_empty()) {
        payload.insert("responseParameters".to_string(), Value::from(names));
    }
    Value::Object(payload)
}

fn is_non_zero(value: Option<&Value>) -> bool {
    value.and_then(Value::as_f64).is_some_and(|code| code != 0.0)
}

/// Non-zero overall or per-item completion/reason codes.
pub(crate) fn has_command_error(payload: &Value) -> bool {
    if is_non_zero(payload.get("overallCompletionCode"))
        || is_non_zero(payload.get("overallReasonCode"))
    {
        return true;
    }
    payload
        .get("commandResponse")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|item| is_non_zero(item.get("completionCode")) || is_non_zero(item.get("reasonCode")))
}

/// One record per `commandResponse[].parameters`, or per nested `objects`
/// entry when present. Malformed entries are skipped.
pub(crate) fn flatten_command_response(payload: &Value) -> Vec<Attributes> {
    let Some(items) = payload.get("commandResponse").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for item in items {
        let Some(parameters) = item.get("parameters").and_then(Value::as_object) else {
            continue;
        };
        match parameters.get("objects").and_then(Value::as_array) {
            Some(objects) => {
                for object in objects.iter().filter_map(Value::as_object) {
                    let mut record: Attributes = parameters
                        .iter()
                        .filter(|(key, _)| key.as_str() != "objects")
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    for (key, value) in object {
                        record.insert(key.clone(), value.clone());
                    }
                    records.push(record);
                }
            }
            None => records.push(parameters.clone()),
        }
    }
    records
}

//! Shared test helpers: a recording in-memory transport and session setup.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mqrest_core::{
    Attributes, Credentials, Error, ManualClock, Result, Session, SessionConfig, Transport,
    TransportResponse,
};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://localhost:9443/ibmmq/rest/v2";
pub const QMGR: &str = "QM1";

/// One request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub payload: Value,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
}

impl RecordedCall {
    pub fn command(&self) -> &str {
        self.payload["command"].as_str().unwrap_or_default()
    }

    pub fn qualifier(&self) -> &str {
        self.payload["qualifier"].as_str().unwrap_or_default()
    }

    pub fn parameters(&self) -> Attributes {
        self.payload
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

enum Scripted {
    Response(TransportResponse),
    Failure(String),
}

/// Replays queued responses in order and records every call.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_response(&self, response: TransportResponse) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Response(response));
    }

    /// 200 with a successful `commandResponse` built from `parameters`.
    pub fn add_success_response(&self, parameters: Vec<Value>) {
        self.add_response(TransportResponse::new(200, success_body(parameters).to_string()));
    }

    /// 200 with non-zero overall codes.
    pub fn add_command_error_response(&self, completion: i64, reason: i64) {
        let body = json!({
            "overallCompletionCode": completion,
            "overallReasonCode": reason,
            "commandResponse": [{"completionCode": completion, "reasonCode": reason}]
        });
        self.add_response(TransportResponse::new(200, body.to_string()));
    }

    pub fn add_raw_response(&self, status: u16, body: &str) {
        self.add_response(TransportResponse::new(status, body));
    }

    /// The next call fails at the network level.
    pub fn add_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Failure(message.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls.lock().unwrap().last().cloned().expect("no calls recorded")
    }
}

impl Transport for MockTransport {
    fn post_json(
        &self,
        url: &str,
        payload: &Value,
        headers: &HashMap<String, String>,
        timeout: Option<Duration>,
        verify_tls: bool,
    ) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            payload: payload.clone(),
            headers: headers.clone(),
            timeout,
            verify_tls,
        });
        match self.responses.lock().unwrap().pop_front() {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(Error::Transport {
                url: url.to_string(),
                message,
            }),
            None => panic!("no scripted response left for {}", payload),
        }
    }
}

pub fn success_body(parameters: Vec<Value>) -> Value {
    let items: Vec<Value> = parameters
        .into_iter()
        .map(|p| json!({"completionCode": 0, "reasonCode": 0, "parameters": p}))
        .collect();
    json!({
        "overallCompletionCode": 0,
        "overallReasonCode": 0,
        "commandResponse": items
    })
}

pub fn attrs(value: Value) -> Attributes {
    value.as_object().cloned().expect("expected a JSON object")
}

pub fn config() -> SessionConfig {
    SessionConfig::new(BASE_URL, QMGR)
}

/// Session over `transport` with default config and basic credentials.
pub fn session(transport: &Arc<MockTransport>) -> Session {
    session_with(transport, config())
}

pub fn session_with(transport: &Arc<MockTransport>, config: SessionConfig) -> Session {
    Session::builder(config, Credentials::basic("admin", "passw0rd"))
        .transport(transport.clone())
        .build()
        .expect("session builds")
}

/// Session with a manual clock for deterministic polling.
pub fn session_with_clock(transport: &Arc<MockTransport>, clock: &Arc<ManualClock>) -> Session {
    Session::builder(config(), Credentials::basic("admin", "passw0rd"))
        .transport(transport.clone())
        .clock(clock.clone())
        .build()
        .expect("session builds")
}

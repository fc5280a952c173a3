//! Request builder, executor and response classifier for the Asana REST API.
//!
//! # Design
//! Each call is split the same way: `build_request` turns (method, path,
//! query, body) into a complete `HttpRequest` without I/O, the `Transport`
//! performs the round-trip, and `parse_response` classifies the answer.
//! `execute` chains the three and notifies listeners.
//!
//! The client keeps no state between calls. The sync cursor travels in the
//! returned `Response` or `ApiError` instead of a shared field.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::{Config, Credential};
use crate::error::{ApiError, Error, Result};
use crate::events::{ResponseEvent, ResponseListener};
use crate::http::{Body, HttpMethod, HttpRequest, HttpResponse};
use crate::multipart;
use crate::transport::{Transport, UreqTransport};
use crate::types::Response;

/// Feature flags sent with every request.
const ENABLED_FEATURES: &str = "new_rich_text";

/// Synchronous client for the Asana REST API.
#[derive(Clone)]
pub struct Client {
    base_url: String,
    credential: Credential,
    transport: Arc<dyn Transport>,
    listeners: Vec<Arc<dyn ResponseListener>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client using the blocking `ureq` transport.
    ///
    /// Fails with `Error::Configuration` when no credential is configured.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = UreqTransport::from_config(config)?;
        Self::with_transport(config, transport)
    }

    /// Client sending through a caller-supplied transport.
    pub fn with_transport(config: &Config, transport: impl Transport + 'static) -> Result<Self> {
        Ok(Self {
            base_url: config.normalized_base_url()?,
            credential: config.credential()?,
            transport: Arc::new(transport),
            listeners: Vec::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register a listener notified after every completed call.
    pub fn add_listener(&mut self, listener: impl ResponseListener + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    pub fn with_listener(mut self, listener: impl ResponseListener + 'static) -> Self {
        self.add_listener(listener);
        self
    }

    /// Build the full request without touching the network.
    ///
    /// GET and DELETE never carry a body. A multipart body reads its file
    /// here, so an unreadable path fails before anything is sent.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<&Body>,
    ) -> Result<HttpRequest> {
        let mut headers = vec![
            ("Authorization".to_string(), self.authorization()),
            ("Accept".to_string(), "application/json".to_string()),
            ("Asana-Enable".to_string(), ENABLED_FEATURES.to_string()),
        ];

        let encoded = match body.filter(|_| method.sends_body()) {
            Some(Body::Multipart { fields, file }) => {
                let part = file.load()?;
                let form = multipart::encode(&multipart::flatten_fields(fields), &part);
                headers.push(("Content-Type".to_string(), form.content_type()));
                Some(form.bytes)
            }
            Some(Body::Json(value)) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_vec(value)?)
            }
            None => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                None
            }
        };

        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            query: query.to_vec(),
            headers,
            body: encoded,
        })
    }

    /// Classify a raw response: an `errors` member becomes `Error::Api`,
    /// anything else is a `Response`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Response> {
        classify(response.status, decode_body(&response.body))
    }

    /// Build, send and classify one request.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<Body>,
    ) -> Result<Response> {
        let body = body.filter(|_| method.sends_body());
        let request = self.build_request(method, path, query, body.as_ref())?;
        debug!(
            %method,
            path,
            query_params = query.len(),
            multipart = body.as_ref().is_some_and(Body::is_multipart),
            "sending asana request"
        );

        let started = Instant::now();
        let raw = self.transport.send(&request).map_err(|err| {
            warn!(%method, path, error = %err, "asana request failed");
            Error::Transport(err)
        })?;
        debug!(
            %method,
            path,
            status = raw.status,
            elapsed = ?started.elapsed(),
            "asana response"
        );

        let status = raw.status;
        let json = decode_body(&raw.body);
        self.notify(&ResponseEvent {
            method,
            path,
            query,
            payload: body.as_ref().map(Body::payload),
            response: &json,
            status,
        });

        classify(status, json).inspect_err(|err| {
            warn!(%method, path, status, error = %err, "asana api error");
        })
    }

    pub fn get(&self, path: &str, query: &[(String, String)]) -> Result<Response> {
        self.execute(HttpMethod::Get, path, query, None)
    }

    pub fn post(&self, path: &str, body: Body) -> Result<Response> {
        self.execute(HttpMethod::Post, path, &[], Some(body))
    }

    pub fn put(&self, path: &str, body: Body) -> Result<Response> {
        self.execute(HttpMethod::Put, path, &[], Some(body))
    }

    pub fn delete(&self, path: &str) -> Result<Response> {
        self.execute(HttpMethod::Delete, path, &[], None)
    }

    fn authorization(&self) -> String {
        match &self.credential {
            Credential::Bearer(token) => format!("Bearer {token}"),
            Credential::ApiKey(key) => format!("Basic {}", STANDARD.encode(format!("{key}:"))),
        }
    }

    fn notify(&self, event: &ResponseEvent<'_>) {
        for listener in &self.listeners {
            listener.on_response(event);
        }
    }
}

/// Decode a response body, keeping integers too large for 64 bits as strings.
/// Anything that is not JSON decodes to `Value::Null`.
fn decode_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(body) {
        Ok(value) => stringify_big_integers(value),
        Err(err) => {
            trace!(error = %err, "response body is not JSON");
            Value::Null
        }
    }
}

fn stringify_big_integers(value: Value) -> Value {
    match value {
        Value::Number(n) if !(n.is_i64() || n.is_u64() || n.is_f64()) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(stringify_big_integers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| (key, stringify_big_integers(child)))
                .collect(),
        ),
        other => other,
    }
}

fn classify(status: u16, json: Value) -> Result<Response> {
    let sync = json.get("sync").and_then(Value::as_str).map(str::to_owned);
    if let Some(errors) = json.get("errors").filter(|errors| !errors.is_null()) {
        return Err(Error::Api(ApiError::from_errors(errors, status, sync)));
    }
    Ok(Response { status, json, sync })
}

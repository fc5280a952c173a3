//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. `Client`
//! builds a complete `HttpRequest` (URL, query pairs, headers, encoded body)
//! before anything touches the network, and classifies an `HttpResponse`
//! after the `Transport` hands it back. Everything in between is the
//! transport's business.

use std::fmt;

use serde_json::Value;

use crate::multipart::FileRef;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a body on the wire.
    pub fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured query parameters. Values are raw; the transport encodes them.
pub type Query = Vec<(String, String)>;

/// Payload handed to `Client::execute`.
///
/// A JSON body and a file upload are mutually exclusive: an upload is always
/// sent as multipart form data, with `fields` flattened into bracketed names
/// next to the file part.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Multipart { fields: Value, file: FileRef },
}

impl Body {
    /// The structured part of the payload, without file contents.
    pub fn payload(&self) -> &Value {
        match self {
            Body::Json(value) => value,
            Body::Multipart { fields, .. } => fields,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart { .. })
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Client::build_request`. `url` is the base URL joined with the
/// caller's path verbatim; `query` is appended (percent-encoded) by the
/// transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Query,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

//! Network execution of a fully built `HttpRequest`.
//!
//! `Transport` is the only place the client touches the network. The default
//! implementation is a blocking `ureq` agent; tests substitute their own.

use std::io;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ConfigError, TransportError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and returns whatever the server answered.
///
/// Any HTTP status is a response, not an error: status interpretation belongs
/// to `Client`. An `Err` means no usable response arrived at all.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a `ureq::Agent`.
///
/// Connect and overall timeouts come from `Config`. Certificate verification
/// stays on unless `accept_invalid_certs` is set.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(connect_timeout: Duration, timeout: Duration, accept_invalid_certs: bool) -> Self {
        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(connect_timeout))
            .timeout_global(Some(timeout));
        if accept_invalid_certs {
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        Self {
            agent: builder.build().new_agent(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.connect_timeout()?,
            config.timeout()?,
            config.accept_invalid_certs,
        ))
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match request.method {
            HttpMethod::Get => prepare(self.agent.get(&request.url), request).call(),
            HttpMethod::Delete => prepare(self.agent.delete(&request.url), request).call(),
            HttpMethod::Post => {
                let builder = prepare(self.agent.post(&request.url), request);
                match &request.body {
                    Some(body) => builder.send(&body[..]),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = prepare(self.agent.put(&request.url), request);
                match &request.body {
                    Some(body) => builder.send(&body[..]),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(TransportError::from)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        // The server answered; its body is usable whatever the size.
        let bytes = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(TransportError::from)?;

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.query_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        let kind = match &err {
            ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
            ureq::Error::HostNotFound => TransportErrorKind::Dns,
            ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
            ureq::Error::Io(io_err) => io_kind(io_err),
            _ => TransportErrorKind::Other,
        };
        TransportError::new(kind, err.to_string())
    }
}

fn io_kind(err: &io::Error) -> TransportErrorKind {
    match err.kind() {
        io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => TransportErrorKind::Connect,
        _ => TransportErrorKind::Io,
    }
}

//! Error types for the Asana client.
//!
//! # Design
//! The taxonomy follows where a call can fail: before the client exists
//! (`Configuration`), before the request leaves (`Argument`,
//! `Serialization`), on the wire (`Transport`), or in the server's answer
//! (`Api`). Nothing is retried; every variant reaches the caller as is.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure surfaced by `Client` and `Asana`.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An attachment path is missing or unreadable.
    #[error("{0}")]
    Argument(String),

    /// A request body could not be encoded as JSON.
    #[error("failed to encode request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The sync cursor attached to an API error, if any.
    pub fn sync(&self) -> Option<&str> {
        match self {
            Error::Api(err) => err.sync.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither an access token nor an API key was supplied.
    #[error("you need to specify an access token or API key")]
    MissingCredential,

    #[error("failed to read configuration file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration at {path}:{line}:{column}: {message}")]
    Parse {
        path: PathBuf,
        /// One-based line of the error (0 if unknown).
        line: usize,
        /// One-based column of the error (0 if unknown).
        column: usize,
        message: String,
    },

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// One entry of the server's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorDetail {
    pub message: String,
    pub help: Option<String>,
    pub phrase: Option<String>,
}

impl ApiErrorDetail {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
        let message = match value {
            Value::String(message) => message.clone(),
            _ => text("message").unwrap_or_else(|| value.to_string()),
        };
        Self {
            message,
            help: text("help"),
            phrase: text("phrase"),
        }
    }
}

/// The server answered with a body containing an `errors` array.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    /// All error messages joined with `", "`.
    pub message: String,
    pub status: u16,
    /// Sync cursor sent alongside the errors (change-feed endpoints).
    pub sync: Option<String>,
    pub details: Vec<ApiErrorDetail>,
}

impl ApiError {
    /// Build from the raw `errors` member of a decoded response.
    pub fn from_errors(errors: &Value, status: u16, sync: Option<String>) -> Self {
        let details: Vec<ApiErrorDetail> = match errors {
            Value::Array(items) => items.iter().map(ApiErrorDetail::from_value).collect(),
            other => vec![ApiErrorDetail::from_value(other)],
        };
        let message = details
            .iter()
            .map(|detail| detail.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            message,
            status,
            sync,
            details,
        }
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Dns,
    Connect,
    Io,
    Other,
}

/// No usable HTTP response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error ({kind:?}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

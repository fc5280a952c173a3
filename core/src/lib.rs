//! Synchronous client for the Asana REST API.
//!
//! # Overview
//! `Client` is the transport core: it builds a plain-data `HttpRequest`,
//! hands it to a `Transport`, and classifies the answer into a `Response` or
//! a typed `Error`. `Asana` layers the operation catalog (tasks, projects,
//! tags, workspaces, sections, webhooks, attachments, custom fields) on top,
//! filling in the default workspace and project from `Config`.
//!
//! # Design
//! - Blocking and single-request: a call returns once the server answered,
//!   the timeout fired, or the connection failed. No retries anywhere.
//! - No state between calls. The sync cursor comes back in `Response::sync`
//!   or `ApiError::sync`.
//! - Responses are pass-through `serde_json::Value`; integers wider than 64
//!   bits are kept as strings.
//! - `ResponseListener`s observe every call the server answered.
//!
//! ```no_run
//! use asana_client::{Asana, Config};
//! use serde_json::json;
//!
//! # fn main() -> asana_client::Result<()> {
//! let config = Config {
//!     workspace_id: Some("1768".into()),
//!     project_id: Some("99".into()),
//!     ..Config::with_token("0/abc123")
//! };
//! let asana = Asana::new(&config)?;
//! let task = asana.create_task(json!({ "name": "Hello World!" }))?;
//! println!("created {}", task.data()["gid"]);
//! # Ok(())
//! # }
//! ```

pub mod asana;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod multipart;
pub mod transport;
pub mod types;

pub use asana::{Asana, DefaultContext};
pub use client::Client;
pub use config::{Config, Credential};
pub use error::{ApiError, ApiErrorDetail, ConfigError, Error, Result, TransportError, TransportErrorKind};
pub use events::{ResponseEvent, ResponseListener};
pub use http::{Body, HttpMethod, HttpRequest, HttpResponse, Query};
pub use multipart::FileRef;
pub use transport::{Transport, UreqTransport};
pub use types::{Response, TaskFilter};

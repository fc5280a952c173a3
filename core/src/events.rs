//! Observer hook fired after every completed API call.
//!
//! A call is "completed" when the server answered, whether with data or with
//! an `errors` payload. Transport failures and rejected arguments never reach
//! listeners.

use serde_json::Value;

use crate::http::HttpMethod;

/// What a listener sees for one completed call.
#[derive(Debug, Clone, Copy)]
pub struct ResponseEvent<'a> {
    pub method: HttpMethod,
    /// Path relative to the base URL, as the caller passed it.
    pub path: &'a str,
    pub query: &'a [(String, String)],
    /// Request payload, without file contents for uploads.
    pub payload: Option<&'a Value>,
    /// Decoded response body (`Value::Null` when it was not JSON).
    pub response: &'a Value,
    pub status: u16,
}

/// Receives a `ResponseEvent` for each completed call.
pub trait ResponseListener: Send + Sync {
    fn on_response(&self, event: &ResponseEvent<'_>);
}

impl<F> ResponseListener for F
where
    F: Fn(&ResponseEvent<'_>) + Send + Sync,
{
    fn on_response(&self, event: &ResponseEvent<'_>) {
        self(event)
    }
}

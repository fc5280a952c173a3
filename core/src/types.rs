//! Value types returned by and passed to the client.
//!
//! Responses stay pass-through JSON; only the envelope (`data`, `sync`) is
//! lifted into fields.

use serde_json::Value;

use crate::http::Query;

/// A successfully classified API response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// The whole decoded body. `Value::Null` when the body was empty or not JSON.
    pub json: Value,
    /// Sync cursor for change-feed endpoints.
    pub sync: Option<String>,
}

impl Response {
    /// The `data` member of the envelope, or `Value::Null`.
    pub fn data(&self) -> &Value {
        self.json.get("data").unwrap_or(&Value::Null)
    }

    pub fn into_json(self) -> Value {
        self.json
    }
}

/// Filter for listing tasks. Empty fields are left out of the query; which
/// combinations are valid is the server's call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub assignee: Option<String>,
    pub project: Option<String>,
    pub workspace: Option<String>,
}

impl TaskFilter {
    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn to_query(&self) -> Query {
        [
            ("assignee", &self.assignee),
            ("project", &self.project),
            ("workspace", &self.workspace),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), v.to_string()))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_unwraps_envelope() {
        let response = Response {
            status: 200,
            json: json!({"data": {"gid": "1"}}),
            sync: None,
        };
        assert_eq!(response.data(), &json!({"gid": "1"}));
    }

    #[test]
    fn data_is_null_without_envelope() {
        let response = Response {
            status: 204,
            json: Value::Null,
            sync: None,
        };
        assert!(response.data().is_null());
    }

    #[test]
    fn filter_drops_empty_fields_and_keeps_order() {
        let filter = TaskFilter::default()
            .workspace("1768")
            .assignee("me")
            .project("");
        assert_eq!(
            filter.to_query(),
            vec![
                ("assignee".to_string(), "me".to_string()),
                ("workspace".to_string(), "1768".to_string()),
            ]
        );
    }
}

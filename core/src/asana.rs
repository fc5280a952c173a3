//! The Asana operation catalog.
//!
//! Every operation maps its arguments onto a method, a path and, for writes,
//! a `{"data": ...}` payload, then hands off to `Client::execute`. Errors pass
//! through untouched. Identifiers the caller leaves out are taken from the
//! `DefaultContext`; when that is empty too the path segment stays empty and
//! the server decides.

use serde_json::{json, Map, Value};

use crate::client::Client;
use crate::config::Config;
use crate::error::Result;
use crate::http::{Body, HttpMethod, Query};
use crate::multipart::FileRef;
use crate::types::{Response, TaskFilter};

/// Workspace and project substituted when an operation omits them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultContext {
    pub workspace_id: Option<String>,
    pub project_id: Option<String>,
}

impl DefaultContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workspace_id: config.workspace_id.clone(),
            project_id: config.project_id.clone(),
        }
    }

    pub fn workspace<'a>(&'a self, id: Option<&'a str>) -> &'a str {
        pick(id, self.workspace_id.as_deref())
    }

    pub fn project<'a>(&'a self, id: Option<&'a str>) -> &'a str {
        pick(id, self.project_id.as_deref())
    }
}

fn pick<'a>(explicit: Option<&'a str>, fallback: Option<&'a str>) -> &'a str {
    explicit
        .filter(|id| !id.is_empty())
        .or(fallback)
        .unwrap_or("")
}

/// Resource-level API over a `Client`.
#[derive(Debug, Clone)]
pub struct Asana {
    client: Client,
    defaults: DefaultContext,
}

impl Asana {
    /// Client plus default context, both taken from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::from_parts(Client::new(config)?, DefaultContext::from_config(config)))
    }

    pub fn from_parts(client: Client, defaults: DefaultContext) -> Self {
        Self { client, defaults }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    pub fn defaults(&self) -> &DefaultContext {
        &self.defaults
    }

    fn get(&self, path: &str, query: Query) -> Result<Response> {
        self.client.execute(HttpMethod::Get, path, &query, None)
    }

    fn post(&self, path: &str, data: Value) -> Result<Response> {
        self.client.post(path, wrap(data))
    }

    fn put(&self, path: &str, data: Value) -> Result<Response> {
        self.client.put(path, wrap(data))
    }

    fn delete(&self, path: &str) -> Result<Response> {
        self.client.delete(path)
    }

    // --- users ---

    /// A user by id; `None` means the authenticated user.
    pub fn get_user(&self, user_id: Option<&str>) -> Result<Response> {
        let id = user_id.filter(|id| !id.is_empty()).unwrap_or("me");
        self.get(&format!("users/{id}"), Vec::new())
    }

    pub fn get_current_user(&self) -> Result<Response> {
        self.get("users/me", Vec::new())
    }

    pub fn get_users(&self, opt_fields: Option<&str>) -> Result<Response> {
        self.get("users", opt_fields_query(opt_fields))
    }

    // --- tasks ---

    /// Create a task. Caller fields override the default workspace/project.
    pub fn create_task(&self, data: Value) -> Result<Response> {
        let mut defaults = Map::new();
        if let Some(workspace) = self.defaults.workspace_id.as_deref() {
            defaults.insert("workspace".into(), json!(workspace));
        }
        if let Some(project) = self.defaults.project_id.as_deref() {
            defaults.insert("projects".into(), json!(project));
        }
        self.post("tasks", merge_over(defaults, data))
    }

    pub fn get_task(&self, task_id: &str) -> Result<Response> {
        self.get(&format!("tasks/{task_id}"), Vec::new())
    }

    pub fn get_subtasks(&self, task_id: &str) -> Result<Response> {
        self.get(&format!("tasks/{task_id}/subtasks"), Vec::new())
    }

    pub fn update_task(&self, task_id: &str, data: Value) -> Result<Response> {
        self.put(&format!("tasks/{task_id}"), data)
    }

    pub fn delete_task(&self, task_id: &str) -> Result<Response> {
        self.delete(&format!("tasks/{task_id}"))
    }

    /// Upload a file as an attachment of the task.
    pub fn add_task_attachment(&self, task_id: &str, file: FileRef) -> Result<Response> {
        let body = Body::Multipart {
            fields: Value::Object(Map::new()),
            file,
        };
        self.client.post(&format!("tasks/{task_id}/attachments"), body)
    }

    pub fn get_task_attachments(&self, task_id: &str) -> Result<Response> {
        self.get(&format!("tasks/{task_id}/attachments"), Vec::new())
    }

    pub fn get_attachment(&self, attachment_id: &str) -> Result<Response> {
        self.get(&format!("attachments/{attachment_id}"), Vec::new())
    }

    pub fn get_projects_for_task(&self, task_id: &str) -> Result<Response> {
        self.get(&format!("tasks/{task_id}/projects"), Vec::new())
    }

    pub fn add_project_to_task(&self, task_id: &str, project_id: Option<&str>) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.post(&format!("tasks/{task_id}/addProject"), json!({ "project": project }))
    }

    pub fn remove_project_from_task(&self, task_id: &str, project_id: Option<&str>) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.post(&format!("tasks/{task_id}/removeProject"), json!({ "project": project }))
    }

    pub fn get_tasks_by_filter(&self, filter: &TaskFilter) -> Result<Response> {
        self.get("tasks", filter.to_query())
    }

    pub fn get_task_stories(&self, task_id: &str) -> Result<Response> {
        self.get(&format!("tasks/{task_id}/stories"), Vec::new())
    }

    pub fn comment_on_task(&self, task_id: &str, text: &str) -> Result<Response> {
        self.post(&format!("tasks/{task_id}/stories"), json!({ "text": text }))
    }

    pub fn add_tag_to_task(&self, task_id: &str, tag_id: &str) -> Result<Response> {
        self.post(&format!("tasks/{task_id}/addTag"), json!({ "tag": tag_id }))
    }

    pub fn remove_tag_from_task(&self, task_id: &str, tag_id: &str) -> Result<Response> {
        self.post(&format!("tasks/{task_id}/removeTag"), json!({ "tag": tag_id }))
    }

    // --- projects ---

    pub fn create_project(&self, data: Value) -> Result<Response> {
        self.post("projects", data)
    }

    pub fn get_project(&self, project_id: Option<&str>) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.get(&format!("projects/{project}"), Vec::new())
    }

    pub fn get_projects(&self, archived: bool, opt_fields: Option<&str>) -> Result<Response> {
        let mut query = vec![("archived".to_string(), archived.to_string())];
        query.extend(opt_fields_query(opt_fields));
        self.get("projects", query)
    }

    pub fn get_projects_in_workspace(&self, workspace_id: Option<&str>, archived: bool) -> Result<Response> {
        let workspace = self.defaults.workspace(workspace_id);
        let query = vec![
            ("archived".to_string(), archived.to_string()),
            ("workspace".to_string(), workspace.to_string()),
        ];
        self.get("projects", query)
    }

    pub fn update_project(&self, project_id: Option<&str>, data: Value) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.put(&format!("projects/{project}"), data)
    }

    pub fn get_project_tasks(&self, project_id: Option<&str>) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.get("tasks", vec![("project".to_string(), project.to_string())])
    }

    pub fn get_project_stories(&self, project_id: Option<&str>) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.get(&format!("projects/{project}/stories"), Vec::new())
    }

    pub fn comment_on_project(&self, project_id: Option<&str>, text: &str) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.post(&format!("projects/{project}/stories"), json!({ "text": text }))
    }

    /// Change feed for a project.
    ///
    /// Without a cursor, or with an expired one, the server answers with an
    /// API error whose `sync` holds a fresh cursor to poll with next.
    pub fn get_project_events(&self, project_id: Option<&str>, sync: Option<&str>) -> Result<Response> {
        let project = self.defaults.project(project_id);
        let query = sync
            .filter(|token| !token.is_empty())
            .map(|token| vec![("sync".to_string(), token.to_string())])
            .unwrap_or_default();
        self.get(&format!("projects/{project}/events"), query)
    }

    // --- tags ---

    pub fn get_tag(&self, tag_id: &str) -> Result<Response> {
        self.get(&format!("tags/{tag_id}"), Vec::new())
    }

    pub fn get_tags(&self) -> Result<Response> {
        self.get("tags", Vec::new())
    }

    pub fn update_tag(&self, tag_id: &str, data: Value) -> Result<Response> {
        self.put(&format!("tags/{tag_id}"), data)
    }

    pub fn get_tasks_with_tag(&self, tag_id: &str) -> Result<Response> {
        self.get(&format!("tags/{tag_id}/tasks"), Vec::new())
    }

    // --- stories ---

    pub fn get_story(&self, story_id: &str) -> Result<Response> {
        self.get(&format!("stories/{story_id}"), Vec::new())
    }

    // --- workspaces ---

    pub fn get_workspaces(&self) -> Result<Response> {
        self.get("workspaces", Vec::new())
    }

    pub fn update_workspace(&self, workspace_id: Option<&str>, data: Value) -> Result<Response> {
        let workspace = self.defaults.workspace(workspace_id);
        self.put(&format!("workspaces/{workspace}"), data)
    }

    /// Tasks in a workspace for an assignee (`me` when omitted).
    pub fn get_workspace_tasks(&self, workspace_id: Option<&str>, assignee: Option<&str>) -> Result<Response> {
        let workspace = self.defaults.workspace(workspace_id);
        let assignee = assignee.filter(|a| !a.is_empty()).unwrap_or("me");
        let query = vec![
            ("workspace".to_string(), workspace.to_string()),
            ("assignee".to_string(), assignee.to_string()),
        ];
        self.get("tasks", query)
    }

    pub fn get_workspace_tags(&self, workspace_id: Option<&str>) -> Result<Response> {
        let workspace = self.defaults.workspace(workspace_id);
        self.get(&format!("workspaces/{workspace}/tags"), Vec::new())
    }

    pub fn get_workspace_users(&self, workspace_id: Option<&str>) -> Result<Response> {
        let workspace = self.defaults.workspace(workspace_id);
        self.get(&format!("workspaces/{workspace}/users"), Vec::new())
    }

    pub fn get_custom_fields(&self, workspace_id: Option<&str>) -> Result<Response> {
        let workspace = self.defaults.workspace(workspace_id);
        self.get(&format!("workspaces/{workspace}/custom_fields"), Vec::new())
    }

    pub fn get_custom_field(&self, field_id: &str) -> Result<Response> {
        self.get(&format!("custom_fields/{field_id}"), Vec::new())
    }

    // --- webhooks ---

    pub fn create_webhook(&self, resource_id: &str, target_url: &str) -> Result<Response> {
        self.post("webhooks", json!({ "resource": resource_id, "target": target_url }))
    }

    pub fn get_webhook(&self, webhook_id: &str) -> Result<Response> {
        self.get(&format!("webhooks/{webhook_id}"), Vec::new())
    }

    pub fn get_webhooks(&self, workspace_id: Option<&str>) -> Result<Response> {
        let workspace = self.defaults.workspace(workspace_id);
        self.get("webhooks", vec![("workspace".to_string(), workspace.to_string())])
    }

    pub fn delete_webhook(&self, webhook_id: &str) -> Result<Response> {
        self.delete(&format!("webhooks/{webhook_id}"))
    }

    // --- sections ---

    pub fn create_section(&self, project_id: Option<&str>, data: Value) -> Result<Response> {
        let project = self.defaults.project(project_id);
        let mut defaults = Map::new();
        if !project.is_empty() {
            defaults.insert("projects".into(), json!(project));
        }
        self.post(&format!("projects/{project}/sections"), merge_over(defaults, data))
    }

    pub fn get_project_sections(&self, project_id: Option<&str>) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.get(&format!("projects/{project}/sections"), Vec::new())
    }

    pub fn get_section(&self, section_id: &str) -> Result<Response> {
        self.get(&format!("sections/{section_id}"), Vec::new())
    }

    pub fn update_section(&self, section_id: &str, data: Value) -> Result<Response> {
        self.put(&format!("sections/{section_id}"), data)
    }

    pub fn delete_section(&self, section_id: &str) -> Result<Response> {
        self.delete(&format!("sections/{section_id}"))
    }

    /// Reorder a section within a project (`before_section` / `after_section`).
    pub fn move_section(&self, project_id: Option<&str>, data: Value) -> Result<Response> {
        let project = self.defaults.project(project_id);
        self.post(&format!("projects/{project}/sections/insert"), data)
    }
}

fn wrap(data: Value) -> Body {
    Body::Json(json!({ "data": data }))
}

/// Caller fields win over `defaults`. Non-object data is sent unchanged.
fn merge_over(mut defaults: Map<String, Value>, data: Value) -> Value {
    match data {
        Value::Object(fields) => {
            defaults.extend(fields);
            Value::Object(defaults)
        }
        other => other,
    }
}

fn opt_fields_query(opt_fields: Option<&str>) -> Query {
    opt_fields
        .filter(|fields| !fields.is_empty())
        .map(|fields| vec![("opt_fields".to_string(), fields.to_string())])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_id_wins_over_default() {
        let defaults = DefaultContext {
            workspace_id: Some("1768".into()),
            project_id: Some("99".into()),
        };
        assert_eq!(defaults.workspace(Some("5")), "5");
        assert_eq!(defaults.workspace(None), "1768");
        assert_eq!(defaults.project(Some("")), "99");
    }

    #[test]
    fn missing_default_leaves_segment_empty() {
        let defaults = DefaultContext::default();
        assert_eq!(defaults.project(None), "");
    }

    #[test]
    fn caller_fields_override_defaults() {
        let mut defaults = Map::new();
        defaults.insert("workspace".into(), json!("1768"));
        defaults.insert("projects".into(), json!("99"));
        let merged = merge_over(defaults, json!({"projects": ["7"], "name": "x"}));
        assert_eq!(merged, json!({"workspace": "1768", "projects": ["7"], "name": "x"}));
    }

    #[test]
    fn empty_opt_fields_are_omitted() {
        assert!(opt_fields_query(Some("")).is_empty());
        assert!(opt_fields_query(None).is_empty());
        assert_eq!(
            opt_fields_query(Some("name,email")),
            vec![("opt_fields".to_string(), "name,email".to_string())]
        );
    }
}

//! In-memory stand-in for a slice of the Asana REST API.
//!
//! Serves tasks, attachments, a project change feed, the current user and a
//! custom field under `/api/1.0`, answering with Asana's `{"data": ...}` and
//! `{"errors": [...]}` envelopes. Every route requires an `Authorization`
//! header.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Path prefix all routes are nested under.
pub const API_PREFIX: &str = "/api/1.0";

/// Raw body of the seeded custom field; `precision_value` does not fit in 64 bits.
pub const CUSTOM_FIELD_BODY: &str = r#"{"data":{"gid":"4242","name":"Estimate","type":"number","precision_value":98765432109876543210987654321}}"#;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub gid: String,
    pub name: String,
    pub notes: String,
    pub completed: bool,
    pub workspace: Option<String>,
    pub projects: Vec<String>,
    pub assignee: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub gid: String,
    pub name: String,
    pub size: usize,
    pub parent: String,
    /// Non-file form fields that arrived with the upload.
    pub fields: HashMap<String, String>,
}

#[derive(Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(one) if one.is_empty() => Vec::new(),
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
    pub workspace: Option<String>,
    pub projects: Option<OneOrMany>,
    pub assignee: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
    pub assignee: Option<String>,
}

#[derive(Deserialize)]
pub struct TaskQuery {
    pub project: Option<String>,
    pub workspace: Option<String>,
    pub assignee: Option<String>,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub sync: Option<String>,
}

#[derive(Default)]
pub struct Store {
    next_gid: u64,
    pub tasks: HashMap<String, Task>,
    pub attachments: HashMap<String, Attachment>,
    pub sync_tokens: HashSet<String>,
}

impl Store {
    fn allocate_gid(&mut self) -> String {
        self.next_gid += 1;
        (1_000_000 + self.next_gid).to_string()
    }

    fn issue_sync_token(&mut self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sync_tokens.insert(token.clone());
        token
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/users/me", get(current_user))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{gid}", get(get_task).put(update_task).delete(delete_task))
        .route(
            "/tasks/{gid}/attachments",
            get(list_attachments).post(upload_attachment),
        )
        .route("/projects/{gid}/events", get(project_events))
        .route("/custom_fields/{gid}", get(custom_field))
        .fallback(not_found)
        .layer(middleware::from_fn(require_auth))
        .with_state(db);
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Asana-style error body.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "errors": [{ "message": message }] }))).into_response()
}

async fn require_auth(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer ") || value.starts_with("Basic "));
    if authorized {
        next.run(request).await
    } else {
        error_response(StatusCode::UNAUTHORIZED, "Not Authorized")
    }
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

async fn current_user() -> Json<Value> {
    Json(json!({
        "data": { "gid": "1", "name": "Mock User", "email": "mock@example.com" }
    }))
}

async fn list_tasks(State(db): State<Db>, Query(query): Query<TaskQuery>) -> Json<Value> {
    let store = db.read().await;
    let mut tasks: Vec<&Task> = store
        .tasks
        .values()
        .filter(|task| {
            query
                .project
                .as_ref()
                .map_or(true, |project| task.projects.contains(project))
        })
        .filter(|task| {
            query
                .workspace
                .as_ref()
                .map_or(true, |workspace| task.workspace.as_ref() == Some(workspace))
        })
        .filter(|task| {
            query
                .assignee
                .as_ref()
                .map_or(true, |assignee| task.assignee.as_ref() == Some(assignee))
        })
        .collect();
    tasks.sort_by(|a, b| a.gid.cmp(&b.gid));
    Json(json!({ "data": tasks }))
}

async fn create_task(
    State(db): State<Db>,
    input: Result<Json<Envelope<CreateTask>>, JsonRejection>,
) -> Response {
    let Json(Envelope { data: input }) = match input {
        Ok(input) => input,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    let mut store = db.write().await;
    let task = Task {
        gid: store.allocate_gid(),
        name: input.name,
        notes: input.notes,
        completed: input.completed,
        workspace: input.workspace.filter(|w| !w.is_empty()),
        projects: input.projects.map(OneOrMany::into_vec).unwrap_or_default(),
        assignee: input.assignee,
    };
    tracing::debug!(gid = %task.gid, "created task");
    store.tasks.insert(task.gid.clone(), task.clone());
    (StatusCode::CREATED, Json(json!({ "data": task }))).into_response()
}

async fn get_task(State(db): State<Db>, Path(gid): Path<String>) -> Response {
    let store = db.read().await;
    match store.tasks.get(&gid) {
        Some(task) => Json(json!({ "data": task })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn update_task(
    State(db): State<Db>,
    Path(gid): Path<String>,
    input: Result<Json<Envelope<UpdateTask>>, JsonRejection>,
) -> Response {
    let Json(Envelope { data: input }) = match input {
        Ok(input) => input,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    let mut store = db.write().await;
    let Some(task) = store.tasks.get_mut(&gid) else {
        return error_response(StatusCode::NOT_FOUND, "Not Found");
    };
    if let Some(name) = input.name {
        task.name = name;
    }
    if let Some(notes) = input.notes {
        task.notes = notes;
    }
    if let Some(completed) = input.completed {
        task.completed = completed;
    }
    if let Some(assignee) = input.assignee {
        task.assignee = Some(assignee);
    }
    Json(json!({ "data": task })).into_response()
}

async fn delete_task(State(db): State<Db>, Path(gid): Path<String>) -> Response {
    let mut store = db.write().await;
    match store.tasks.remove(&gid) {
        Some(_) => Json(json!({ "data": {} })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn upload_attachment(
    State(db): State<Db>,
    Path(gid): Path<String>,
    mut multipart: Multipart,
) -> Response {
    if !db.read().await.tasks.contains_key(&gid) {
        return error_response(StatusCode::NOT_FOUND, "Not Found");
    }

    let mut file: Option<(String, usize)> = None;
    let mut fields = HashMap::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.body_text()),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.body_text()),
        };
        if name == "file" {
            file = Some((file_name.unwrap_or_else(|| "upload".to_string()), bytes.len()));
        } else {
            fields.insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }

    let Some((name, size)) = file else {
        return error_response(StatusCode::BAD_REQUEST, "file: Missing input");
    };
    let mut store = db.write().await;
    let attachment = Attachment {
        gid: store.allocate_gid(),
        name,
        size,
        parent: gid,
        fields,
    };
    store.attachments.insert(attachment.gid.clone(), attachment.clone());
    Json(json!({ "data": attachment })).into_response()
}

async fn list_attachments(State(db): State<Db>, Path(gid): Path<String>) -> Json<Value> {
    let store = db.read().await;
    let mut attachments: Vec<&Attachment> = store
        .attachments
        .values()
        .filter(|attachment| attachment.parent == gid)
        .collect();
    attachments.sort_by(|a, b| a.gid.cmp(&b.gid));
    Json(json!({ "data": attachments }))
}

/// Change feed. A missing or unknown sync token gets 412 plus a fresh token,
/// which is how Asana hands out the first cursor.
async fn project_events(
    State(db): State<Db>,
    Path(_gid): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let mut store = db.write().await;
    let known = query
        .sync
        .as_ref()
        .is_some_and(|token| store.sync_tokens.remove(token));
    let next = store.issue_sync_token();
    if !known {
        let body = json!({
            "errors": [{ "message": "Sync token invalid or too old. If you are attempting to keep resources in sync, you must fetch the full dataset for this query now and use the new sync token for the next sync." }],
            "sync": next,
        });
        return (StatusCode::PRECONDITION_FAILED, Json(body)).into_response();
    }
    Json(json!({ "data": [], "sync": next, "has_more": false })).into_response()
}

async fn custom_field(Path(gid): Path<String>) -> Response {
    if gid != "4242" {
        return error_response(StatusCode::NOT_FOUND, "Not Found");
    }
    (
        [(header::CONTENT_TYPE, "application/json")],
        CUSTOM_FIELD_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_to_json() {
        let task = Task {
            gid: "1000001".to_string(),
            name: "Test".to_string(),
            notes: String::new(),
            completed: false,
            workspace: Some("1768".to_string()),
            projects: vec!["99".to_string()],
            assignee: None,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["gid"], "1000001");
        assert_eq!(json["projects"][0], "99");
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn create_task_accepts_single_project_string() {
        let input: Envelope<CreateTask> =
            serde_json::from_str(r#"{"data":{"name":"Hello","projects":"99"}}"#).unwrap();
        assert_eq!(input.data.projects.map(OneOrMany::into_vec), Some(vec!["99".to_string()]));
    }

    #[test]
    fn create_task_accepts_project_list() {
        let input: Envelope<CreateTask> =
            serde_json::from_str(r#"{"data":{"name":"Hello","projects":["1","2"]}}"#).unwrap();
        assert_eq!(
            input.data.projects.map(OneOrMany::into_vec),
            Some(vec!["1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn create_task_rejects_missing_name() {
        let result: Result<Envelope<CreateTask>, _> = serde_json::from_str(r#"{"data":{"notes":"x"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_task_all_fields_optional() {
        let input: Envelope<UpdateTask> = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert!(input.data.name.is_none());
        assert!(input.data.completed.is_none());
    }

    #[test]
    fn gids_are_unique_and_increasing() {
        let mut store = Store::default();
        let first = store.allocate_gid();
        let second = store.allocate_gid();
        assert_ne!(first, second);
        assert!(first < second);
    }
}

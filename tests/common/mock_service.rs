//! In-process stand-in for the upload service.

use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// How the mock answers. Everything succeeds by default.
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub existing_files: Vec<String>,
    pub empty_files: Vec<String>,
    /// `addfile` for this name answers with an application error
    pub failing_addfile: Option<String>,
    /// Delay before answering `begin`
    pub begin_delay: Option<Duration>,
    /// Error message returned by `begin`
    pub begin_error: Option<String>,
    /// Answer every request with a bare 401
    pub reject_auth: bool,
    /// Raw body returned by `finalize` instead of an envelope
    pub finalize_raw: Option<&'static str>,
    /// Error message returned by `submit`
    pub submit_error: Option<String>,
    pub session_id: i64,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub authorization: Option<String>,
    pub json: Option<Value>,
    pub fields: HashMap<String, String>,
    /// Name of the file part and its byte length
    pub file_part: Option<(String, usize)>,
}

struct ServiceState {
    behavior: Behavior,
    calls: Mutex<Vec<RecordedCall>>,
    received: Mutex<Vec<(String, usize)>>,
    next_file_id: AtomicI64,
}

pub struct MockService {
    pub base_url: String,
    state: Arc<ServiceState>,
    handle: JoinHandle<()>,
}

impl MockService {
    pub async fn start(behavior: Behavior) -> Self {
        let state = Arc::new(ServiceState {
            behavior,
            calls: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            next_file_id: AtomicI64::new(1),
        });

        let app = Router::new()
            .route("/upload/begin", post(begin))
            .route("/upload/validatefile", post(validate_file))
            .route("/upload/addfile", post(add_file))
            .route("/upload/finalize", post(finalize))
            .route("/upload/submit", post(submit))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock service");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock service");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.endpoint).collect()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls().iter().filter(|c| c.endpoint == endpoint).count()
    }

    /// Files stored by `addfile`, with their sizes, in arrival order.
    pub fn received(&self) -> Vec<(String, usize)> {
        self.state.received.lock().unwrap().clone()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn envelope(data: Value) -> Response {
    Json(json!({ "error": null, "data": data })).into_response()
}

fn failure(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message, "data": null })),
    )
        .into_response()
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn record(state: &ServiceState, call: RecordedCall) {
    state.calls.lock().unwrap().push(call);
}

fn record_json(state: &ServiceState, endpoint: &'static str, headers: &HeaderMap, body: &Value) {
    record(
        state,
        RecordedCall {
            endpoint,
            authorization: authorization(headers),
            json: Some(body.clone()),
            fields: HashMap::new(),
            file_part: None,
        },
    );
}

async fn read_form(
    endpoint: &'static str,
    headers: &HeaderMap,
    mut multipart: Multipart,
) -> RecordedCall {
    let mut fields = HashMap::new();
    let mut file_part = None;

    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        if name == "validatefile" || name == "addfile" {
            let bytes = field.bytes().await.expect("file bytes");
            file_part = Some((name, bytes.len()));
        } else {
            let value = field.text().await.expect("text field");
            fields.insert(name, value);
        }
    }

    RecordedCall {
        endpoint,
        authorization: authorization(headers),
        json: None,
        fields,
        file_part,
    }
}

async fn begin(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_json(&state, "begin", &headers, &body);
    if state.behavior.reject_auth {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if let Some(delay) = state.behavior.begin_delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(message) = &state.behavior.begin_error {
        return failure(message);
    }

    envelope(json!({
        "uploadSessionId": state.behavior.session_id,
        "username": "jdoe",
        "ipAddress": "127.0.0.1",
        "projectNumber": body["projectNumber"],
        "subjectLabel": body["subjectLabel"],
        "sessionLabel": body["sessionLabel"],
        "dataType": body["dataType"],
        "startTime": "2026-10-18T09:00:00Z",
    }))
}

async fn validate_file(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let call = read_form("validatefile", &headers, multipart).await;
    let filename = call.fields.get("filename").cloned().unwrap_or_default();
    record(&state, call);

    envelope(json!({
        "filename": filename,
        "fileExists": state.behavior.existing_files.contains(&filename),
        "fileIsEmpty": state.behavior.empty_files.contains(&filename),
    }))
}

async fn add_file(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let call = read_form("addfile", &headers, multipart).await;
    let filename = call.fields.get("filename").cloned().unwrap_or_default();
    let size = call.file_part.as_ref().map(|(_, len)| *len).unwrap_or(0);
    record(&state, call);

    if state.behavior.failing_addfile.as_deref() == Some(filename.as_str()) {
        return failure("could not write file");
    }

    state.received.lock().unwrap().push((filename, size));
    let id = state.next_file_id.fetch_add(1, Ordering::SeqCst);
    envelope(json!({ "uploadFileId": id }))
}

async fn finalize(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_json(&state, "finalize", &headers, &body);
    if let Some(raw) = state.behavior.finalize_raw {
        return (StatusCode::BAD_GATEWAY, raw).into_response();
    }
    envelope(json!({
        "uploadSessionId": body["uploadSessionId"],
        "endTime": "2026-10-18T09:05:00Z",
    }))
}

async fn submit(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_json(&state, "submit", &headers, &body);
    if let Some(message) = &state.behavior.submit_error {
        return failure(message);
    }
    let names: Vec<String> = state
        .received
        .lock()
        .unwrap()
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    envelope(json!({
        "uploadSessionId": body["uploadSessionId"],
        "fileNames": names,
    }))
}

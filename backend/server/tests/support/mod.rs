#![allow(dead_code)]

use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{patch, post},
};
use bank::models::{Medium, PeerNote, Resource, ResourceType, Term};
use chrono::{DateTime, TimeZone, Utc};
use futures::stream;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn resource(id: &str, title: &str, grade_id: &str, subject_id: &str, year: u16, day: u32) -> Resource {
    Resource {
        id: id.to_string(),
        title: title.to_string(),
        kind: ResourceType::PastPaper,
        grade_id: grade_id.to_string(),
        subject_id: subject_id.to_string(),
        term: Some(Term::Third),
        year: Some(year),
        medium: Medium::English,
        file_url: Some(format!("https://files.test/{id}.pdf")),
        created_at: at(day),
    }
}

pub fn note(id: &str, title: &str, approved: bool) -> PeerNote {
    PeerNote {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        author_name: "Nimal".to_string(),
        grade_id: Some("ol".to_string()),
        subject_id: Some("science".to_string()),
        medium: Some(Medium::English),
        price: None,
        file_url: None,
        approved,
        created_at: at(1),
    }
}

pub async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, Response)> {
    let response = app.oneshot(request).await?;
    Ok((response.status(), response))
}

pub async fn get(app: Router, uri: &str) -> Result<(StatusCode, Value)> {
    let (status, response) = send(app, Request::get(uri).body(Body::empty())?).await?;
    Ok((status, json_body(response).await?))
}

pub async fn text_body(response: Response) -> Result<String> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn json_body(response: Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

pub fn ids(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_str()).collect())
        .unwrap_or_default()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    Ok(builder.body(Body::from(body.to_string()))?)
}

pub const BOUNDARY: &str = "papers-test-boundary";

/// `fields` as text parts followed by one `file` part.
pub fn multipart_body(fields: &[(&str, &str)], file_name: &str, content_type: &str, file: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    body
}

/// In-process stand-in for the hosted store and the chat API. Every request it
/// serves is recorded in order.
pub struct StubStore {
    pub calls: Mutex<Vec<String>>,
    pub admin_hash: String,
    pub fail_resource_insert: bool,
    pub chat_chunks: Vec<Bytes>,
}

impl StubStore {
    pub fn new(admin_hash: String) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            admin_hash,
            fail_resource_insert: false,
            chat_chunks: Vec::new(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// Serves on an ephemeral port and returns the base URL.
    pub async fn spawn(self: Arc<Self>) -> Result<String> {
        let router = Router::new()
            .route("/rest/v1/admin_users", axum::routing::get(select_admin))
            .route("/rest/v1/resources", post(insert_resource))
            .route("/rest/v1/peer_notes", patch(update_note))
            .route("/rest/v1/audit_logs", post(append_audit))
            .route(
                "/storage/v1/object/{bucket}/{*path}",
                post(upload_object).delete(remove_object),
            )
            .route("/models/{call}", post(stream_chat))
            .with_state(self);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(format!("http://{address}"))
    }
}

type Stub = State<Arc<StubStore>>;

async fn select_admin(
    State(stub): Stub,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let username = params.get("username").cloned().unwrap_or_default();
    stub.record(format!("select admin {username}"));

    if username == "eq.kamala" {
        Json(json!([{
            "id": 1,
            "username": "kamala",
            "password_hash": stub.admin_hash,
            "role": "admin"
        }]))
    } else {
        Json(json!([]))
    }
}

async fn insert_resource(State(stub): Stub, Json(mut row): Json<Value>) -> Response {
    stub.record("insert resource".to_string());

    if stub.fail_resource_insert {
        return (StatusCode::INTERNAL_SERVER_ERROR, "insert failed").into_response();
    }

    row["id"] = json!("r-new");
    row["created_at"] = json!("2030-01-01T00:00:00Z");

    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn update_note(State(stub): Stub, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let id = params.get("id").cloned().unwrap_or_default();
    stub.record(format!("update note {id}"));

    Json(json!([]))
}

async fn append_audit(State(stub): Stub) -> StatusCode {
    stub.record("audit".to_string());
    StatusCode::CREATED
}

async fn upload_object(
    State(stub): Stub,
    Path((bucket, path)): Path<(String, String)>,
) -> Json<Value> {
    stub.record(format!("upload {bucket}/{path}"));
    Json(json!({ "Key": format!("{bucket}/{path}") }))
}

async fn remove_object(State(stub): Stub, Path((bucket, path)): Path<(String, String)>) -> StatusCode {
    stub.record(format!("remove {bucket}/{path}"));
    StatusCode::OK
}

async fn stream_chat(State(stub): Stub, Path(call): Path<String>) -> Response {
    stub.record(format!("chat {call}"));

    let chunks: Vec<Result<Bytes, Infallible>> = stub.chat_chunks.iter().cloned().map(Ok).collect();

    (
        [(CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream::iter(chunks)),
    )
        .into_response()
}

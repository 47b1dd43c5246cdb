// Drives the router against an in-process store and chat API that record every
// call, so write paths can be checked end to end.
mod support;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use bank::{Catalog, credentials::hash_password, models::AdminRole};
use serde_json::{Value, json};
use server::{
    app,
    config::{ChatConfig, Config},
    state::State,
};
use support::{
    BOUNDARY, StubStore, get, ids, json_body, json_request, multipart_body, note, resource, send,
    text_body,
};

const PASSWORD: &str = "correct horse";

async fn stub(configure: impl FnOnce(&mut StubStore)) -> Result<(Arc<StubStore>, String)> {
    let mut store = StubStore::new(hash_password(PASSWORD)?);
    configure(&mut store);

    let store = Arc::new(store);
    let url = store.clone().spawn().await?;

    Ok((store, url))
}

fn state(store_url: &str) -> Result<Arc<State>> {
    let catalog = Catalog {
        resources: vec![resource("p1", "O/L Science 2024", "ol", "science", 2024, 20)],
        notes: vec![note("n1", "Cell biology summary", false)],
        ..Catalog::default()
    };
    let config = Config {
        store_url: store_url.to_string(),
        store_key: "service-key".to_string(),
        chat: Some(ChatConfig {
            api_url: store_url.to_string(),
            api_key: "chat-key".to_string(),
            model: "tutor".to_string(),
            system_prompt: "Be brief.".to_string(),
        }),
        ..Config::default()
    };

    State::with_catalog(config, catalog)
}

fn upload_request(token: &str) -> Result<Request<Body>> {
    let fields = [
        ("title", "O/L Science 2025"),
        ("type", "Past Paper"),
        ("gradeId", "ol"),
        ("subjectId", "science"),
        ("medium", "English"),
        ("year", "2025"),
    ];
    let body = multipart_body(&fields, "paper.pdf", "application/pdf", b"%PDF-1.7 science");

    Ok(Request::post("/api/admin/resources")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))?)
}

fn sse_event(text: &str) -> String {
    let payload = json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] });
    format!("data: {payload}\n\n")
}

// A stored argon2 hash signs the admin in and the token opens the session route.
#[tokio::test]
async fn login_issues_a_working_session() -> Result<()> {
    let (store, url) = stub(|_| {}).await?;
    let app = app(state(&url)?);

    let login = json!({ "username": "kamala", "password": PASSWORD });
    let (status, response) = send(
        app.clone(),
        json_request("POST", "/api/admin/login", None, login)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let body = json_body(response).await?;
    assert_eq!(body["username"], "kamala");
    assert_eq!(body["role"], "admin");
    let token = body["token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());

    let request = Request::get("/api/admin/session")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let (status, response) = send(app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(response).await?["username"], "kamala");

    assert_eq!(store.calls(), ["select admin eq.kamala", "audit"]);

    Ok(())
}

// A wrong password and an unknown user are indistinguishable to the caller.
#[tokio::test]
async fn failed_logins_look_alike() -> Result<()> {
    let (_, url) = stub(|_| {}).await?;
    let app = app(state(&url)?);

    let mut bodies = Vec::new();
    for (username, password) in [("kamala", "wrong"), ("nobody", PASSWORD)] {
        let login = json!({ "username": username, "password": password });
        let (status, response) = send(
            app.clone(),
            json_request("POST", "/api/admin/login", None, login)?,
        )
        .await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{username}");
        bodies.push(text_body(response).await?);
    }

    assert_eq!(bodies[0], bodies[1]);

    Ok(())
}

// The PDF lands in storage before the row is inserted; the new paper leads the fleet.
#[tokio::test]
async fn upload_stores_file_then_row() -> Result<()> {
    let (store, url) = stub(|_| {}).await?;
    let state = state(&url)?;
    let (token, _) = state.sessions.issue("kamala", AdminRole::Admin).await;
    let app = app(state);

    let (status, response) = send(app.clone(), upload_request(&token)?).await?;
    assert_eq!(status, StatusCode::CREATED);

    let created = json_body(response).await?;
    assert_eq!(created["id"], "r-new");
    assert!(
        created["fileUrl"]
            .as_str()
            .is_some_and(|url| url.contains("/storage/v1/object/public/papers/ol/science/"))
    );

    let calls = store.calls();
    assert_eq!(calls.len(), 3, "{calls:?}");
    assert!(calls[0].starts_with("upload papers/ol/science/"));
    assert!(calls[0].ends_with(".pdf"));
    assert_eq!(calls[1..], ["insert resource", "audit"]);

    let request = Request::get("/api/admin/resources")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let (_, response) = send(app, request).await?;
    assert_eq!(ids(&json_body(response).await?), ["r-new", "p1"]);

    Ok(())
}

// When the row insert fails the stored object is removed again.
#[tokio::test]
async fn failed_insert_removes_the_upload() -> Result<()> {
    let (store, url) = stub(|s| s.fail_resource_insert = true).await?;
    let state = state(&url)?;
    let (token, _) = state.sessions.issue("kamala", AdminRole::Admin).await;
    let app = app(state.clone());

    let (status, _) = send(app, upload_request(&token)?).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let calls = store.calls();
    assert_eq!(calls.len(), 3, "{calls:?}");
    assert_eq!(calls[1], "insert resource");
    assert_eq!(calls[2], calls[0].replacen("upload", "remove", 1));

    assert!(state.catalog.read().await.resource("r-new").is_none());

    Ok(())
}

// Moderating a note or video that does not exist answers 404.
#[tokio::test]
async fn unknown_notes_and_videos_are_not_found() -> Result<()> {
    let (store, url) = stub(|_| {}).await?;
    let state = state(&url)?;
    let (token, _) = state.sessions.issue("kamala", AdminRole::Admin).await;
    let app = app(state);

    let (status, _) = send(
        app.clone(),
        json_request("POST", "/api/admin/notes/missing/approve", Some(&token), Value::Null)?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(store.calls(), ["update note eq.missing"]);

    for uri in ["/api/admin/notes/missing", "/api/admin/videos/missing"] {
        let (status, _) = send(
            app.clone(),
            json_request("DELETE", uri, Some(&token), Value::Null)?,
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
    assert_eq!(store.calls().len(), 1);

    Ok(())
}

// Chat text is forwarded in order, even when a chunk ends inside a character.
#[tokio::test]
async fn chat_stream_keeps_order_and_characters() -> Result<()> {
    let events = [sse_event("Osmosis is "), sse_event("ගණිතය"), sse_event(" in water.")].concat();
    let cut = events.find('ග').unwrap_or_default() + 1;
    let first = events.find('\n').unwrap_or_default() - 4;
    let bytes = events.into_bytes();

    let chunks = vec![
        Bytes::copy_from_slice(&bytes[..first]),
        Bytes::copy_from_slice(&bytes[first..cut]),
        Bytes::copy_from_slice(&bytes[cut..]),
    ];
    let (store, url) = stub(|s| s.chat_chunks = chunks).await?;
    let app = app(state(&url)?);

    let question = json!({ "history": [], "message": "What is osmosis?" });
    let (status, response) = send(app, json_request("POST", "/api/chat", None, question)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text_body(response).await?, "Osmosis is ගණිතය in water.");

    assert_eq!(store.calls(), ["chat tutor:streamGenerateContent"]);

    Ok(())
}

// Reads keep working from memory while the store is reachable but idle.
#[tokio::test]
async fn catalog_reads_do_not_touch_the_store() -> Result<()> {
    let (store, url) = stub(|_| {}).await?;

    let (status, body) = get(app(state(&url)?), "/api/search?query=science").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), ["p1"]);
    assert!(store.calls().is_empty());

    Ok(())
}

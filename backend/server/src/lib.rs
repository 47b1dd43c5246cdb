//! HTTP API of a past papers library for school students.
//!
//! Students browse exam papers by grade and subject, read approved peer notes,
//! watch lesson videos and ask a tutoring assistant. Admins upload and moderate
//! content behind a session login.
//!
//!
//!
//! # General Infrastructure
//! - The single-page client routes on URL fragments and asks `/api/view` for
//!   the payload of each fragment
//! - Records live in a PostgREST style store; PDFs in its object storage
//! - The catalog (papers, notes, videos, playlists) is held in memory and
//!   re-fetched on an interval
//! - If the store is down at boot the last snapshot written by `process` is
//!   served instead
//!
//!
//!
//! # Endpoints
//!
//! ## Public
//! ```text
//! GET  /api/grades                  grades with their subjects
//! GET  /api/search?query=&limit=    home search (min 2 chars)
//! GET  /api/view?fragment=#/...     payload for a client route
//! GET  /api/settings                maintenance flag and announcement
//! GET  /api/notes    POST /api/notes
//! GET  /api/videos   GET /api/playlists
//! GET  /api/papers/{id}/comments    POST /api/papers/{id}/comments
//! GET  /api/theme    PUT /api/theme
//! POST /api/chat                    streamed plain text
//! ```
//!
//! ## Admin (`Authorization: Bearer <token>`)
//! ```text
//! POST   /api/admin/login           POST /api/admin/logout
//! GET    /api/admin/session
//! GET    /api/admin/resources       POST /api/admin/resources (multipart)
//! DELETE /api/admin/resources/{id}
//! GET    /api/admin/notes
//! POST   /api/admin/notes/{id}/approve   DELETE /api/admin/notes/{id}
//! POST   /api/admin/videos          DELETE /api/admin/videos/{id}
//! POST   /api/admin/playlists
//! PUT    /api/admin/settings        developer only
//! POST   /api/admin/users           developer only
//! POST   /api/admin/refresh
//! ```
//!
//!
//!
//! # Setup
//!
//! Run locally.
//! ```sh
//! STORE_KEY=... RUST_LOG=info cargo run -p papers
//! ```
//!
//! Seed an account.
//! ```sh
//! cargo run -p process -- hash-password 'correct horse'
//! ```
//!
//! Write the fallback snapshot.
//! ```sh
//! cargo run -p process -- snapshot --out catalog.json
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Error};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post, put},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod admin;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod navigation;
pub mod preferences;
pub mod routes;
pub mod search;
pub mod state;
pub mod utils;

use admin::{
    approve_note_handler, create_admin_handler, create_playlist_handler, create_video_handler,
    delete_note_handler, delete_resource_handler, delete_video_handler, fleet_handler,
    login_handler, logout_handler, pending_notes_handler, refresh_handler, session_handler,
    update_settings_handler, upload_handler,
};
use config::Config;
use routes::{
    chat_handler, comments_handler, create_comment_handler, create_note_handler, grades_handler,
    notes_handler, playlists_handler, search_handler, set_theme_handler, settings_handler,
    theme_handler, videos_handler, view_handler,
};
use state::{State, spawn_refresh};

pub fn app(state: Arc<State>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if let Some(origin) = &state.config.allowed_origin {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => cors = cors.allow_origin(origin),
            Err(e) => warn!("Ignoring ALLOWED_ORIGIN {origin}: {e}"),
        }
    }

    let body_limit = state.config.body_limit();

    let public = Router::new()
        .route("/grades", get(grades_handler))
        .route("/search", get(search_handler))
        .route("/view", get(view_handler))
        .route("/settings", get(settings_handler))
        .route("/notes", get(notes_handler).post(create_note_handler))
        .route("/videos", get(videos_handler))
        .route("/playlists", get(playlists_handler))
        .route(
            "/papers/{id}/comments",
            get(comments_handler).post(create_comment_handler),
        )
        .route("/theme", get(theme_handler).put(set_theme_handler))
        .route("/chat", post(chat_handler));

    let admin = Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/session", get(session_handler))
        .route("/resources", get(fleet_handler).post(upload_handler))
        .route("/resources/{id}", delete(delete_resource_handler))
        .route("/notes", get(pending_notes_handler))
        .route("/notes/{id}/approve", post(approve_note_handler))
        .route("/notes/{id}", delete(delete_note_handler))
        .route("/videos", post(create_video_handler))
        .route("/videos/{id}", delete(delete_video_handler))
        .route("/playlists", post(create_playlist_handler))
        .route("/settings", put(update_settings_handler))
        .route("/users", post(create_admin_handler))
        .route("/refresh", post(refresh_handler));

    Router::new()
        .nest("/api", public.nest("/admin", admin))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), Error> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;
    let refresh = spawn_refresh(state.clone());

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh.abort();
    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

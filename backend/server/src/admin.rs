use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State as AxumState},
    http::StatusCode,
};
use bank::{
    credentials::hash_password,
    models::{
        AdminRole, AdminUser, AuditEntry, NewPlaylist, NewVideo, PeerNote, Playlist, Resource,
        SystemSettings, Video,
    },
    remote::{
        ADMIN_USERS, PEER_NOTES, PLAYLISTS, RESOURCES, SETTINGS_ROW_ID, SYSTEM_SETTINGS, VIDEOS,
    },
    rows::{
        AdminUserRow, NewAdminUserRow, NewPlaylistRow, NewResourceRow, NewVideoRow, PeerNoteRow,
        PlaylistRow, ResourceRow, SystemSettingsPatch, SystemSettingsRow, VideoRow,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    auth::{AdminSession, DeveloperSession, Session, authenticate},
    error::AppError,
    search::{CatalogFilter, QueryMode, filter},
    state::State,
    utils::{PDF, UploadForm, object_path, read_upload},
};

type AppState = AxumState<Arc<State>>;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(flatten)]
    pub session: Session,
}

#[derive(Deserialize)]
pub struct NewAdminRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: AdminRole,
}

#[derive(Debug, Serialize)]
pub struct AdminAccount {
    pub id: String,
    pub username: String,
    pub role: AdminRole,
}

#[derive(Debug, Serialize)]
pub struct Refreshed {
    pub resources: usize,
}

pub async fn login_handler(
    AxumState(state): AppState,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = authenticate(&state.store, &request.username, &request.password).await?;
    let (token, session) = state.sessions.issue(&user.username, user.role).await;

    info!("Admin {} signed in as {}", user.username, user.role);
    state
        .audit(AuditEntry::new("login", &user.username, Some(&user.id)))
        .await;

    Ok(Json(LoginResponse { token, session }))
}

pub async fn logout_handler(
    AxumState(state): AppState,
    AdminSession { token, session }: AdminSession,
) -> StatusCode {
    state.sessions.revoke(&token).await;
    info!("Admin {} signed out", session.username);

    StatusCode::NO_CONTENT
}

pub async fn session_handler(AdminSession { session, .. }: AdminSession) -> Json<Session> {
    Json(session)
}

pub async fn fleet_handler(
    AxumState(state): AppState,
    _admin: AdminSession,
    Query(params): Query<CatalogFilter>,
) -> Json<Vec<Resource>> {
    let catalog = state.catalog.read().await;

    Json(
        filter(&catalog.resources, &params, QueryMode::Browse)
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub async fn upload_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    let UploadForm { mut resource, file } = read_upload(multipart).await?;
    let bucket = &state.config.upload_bucket;

    let mut stored = None;
    if let Some(file) = file {
        let path = object_path(&resource);
        let url = state.store.upload(bucket, &path, PDF, file.bytes).await?;

        info!("Stored {} as {path}", file.file_name);
        resource.file_url = Some(url);
        stored = Some(path);
    }

    let inserted = state
        .store
        .insert::<_, ResourceRow>(RESOURCES, &NewResourceRow::from(&resource))
        .await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            // the row never landed, so the object would be unreachable
            if let Some(path) = stored {
                match state.store.remove_object(bucket, &path).await {
                    Ok(()) => info!("Removed {path} after failed insert"),
                    Err(cleanup) => warn!("Orphaned upload {path}: {cleanup:#}"),
                }
            }
            return Err(e.into());
        }
    };
    let resource = Resource::try_from(row)?;

    info!("Admin {} uploaded {}", session.username, resource.id);
    state
        .catalog
        .write()
        .await
        .add_resource(resource.clone());
    state
        .audit(
            AuditEntry::new("upload_resource", &session.username, Some(&resource.id))
                .with_details(&resource.title),
        )
        .await;

    Ok((StatusCode::CREATED, Json(resource)))
}

pub async fn delete_resource_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.catalog.read().await.resource(&id).is_none() {
        return Err(AppError::NotFound("Paper"));
    }

    state.store.delete(RESOURCES, &id).await?;
    state.catalog.write().await.remove_resource(&id);

    info!("Admin {} deleted resource {id}", session.username);
    state
        .audit(AuditEntry::new("delete_resource", &session.username, Some(&id)))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Every note, approved or pending, for moderation.
pub async fn pending_notes_handler(
    AxumState(state): AppState,
    _admin: AdminSession,
) -> Json<Vec<PeerNote>> {
    Json(state.catalog.read().await.notes.clone())
}

pub async fn approve_note_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<PeerNote>, AppError> {
    let row: PeerNoteRow = state
        .store
        .update(PEER_NOTES, &id, &json!({ "approved": true }))
        .await?
        .ok_or(AppError::NotFound("Note"))?;
    let note = PeerNote::try_from(row)?;

    state.catalog.write().await.upsert_note(note.clone());
    state
        .audit(AuditEntry::new("approve_note", &session.username, Some(&id)))
        .await;

    Ok(Json(note))
}

pub async fn delete_note_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.catalog.read().await.note(&id).is_none() {
        return Err(AppError::NotFound("Note"));
    }

    state.store.delete(PEER_NOTES, &id).await?;
    state.catalog.write().await.remove_note(&id);

    state
        .audit(AuditEntry::new("delete_note", &session.username, Some(&id)))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_video_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
    Json(video): Json<NewVideo>,
) -> Result<(StatusCode, Json<Video>), AppError> {
    if video.title.trim().is_empty() {
        return Err(AppError::MissingField("title"));
    }
    if video.video_url.trim().is_empty() {
        return Err(AppError::MissingField("videoUrl"));
    }

    let row: VideoRow = state
        .store
        .insert(VIDEOS, &NewVideoRow::from(&video))
        .await?;
    let video = Video::try_from(row)?;

    state.catalog.write().await.add_video(video.clone());
    state
        .audit(
            AuditEntry::new("add_video", &session.username, Some(&video.id))
                .with_details(&video.video_url),
        )
        .await;

    Ok((StatusCode::CREATED, Json(video)))
}

pub async fn delete_video_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.catalog.read().await.video(&id).is_none() {
        return Err(AppError::NotFound("Video"));
    }

    state.store.delete(VIDEOS, &id).await?;
    state.catalog.write().await.remove_video(&id);

    state
        .audit(AuditEntry::new("delete_video", &session.username, Some(&id)))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_playlist_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
    Json(playlist): Json<NewPlaylist>,
) -> Result<(StatusCode, Json<Playlist>), AppError> {
    if playlist.title.trim().is_empty() {
        return Err(AppError::MissingField("title"));
    }

    let row: PlaylistRow = state
        .store
        .insert(PLAYLISTS, &NewPlaylistRow::from(&playlist))
        .await?;
    let playlist = Playlist::try_from(row)?;

    state.catalog.write().await.add_playlist(playlist.clone());
    state
        .audit(AuditEntry::new("add_playlist", &session.username, Some(&playlist.id)))
        .await;

    Ok((StatusCode::CREATED, Json(playlist)))
}

pub async fn update_settings_handler(
    AxumState(state): AppState,
    DeveloperSession(session): DeveloperSession,
    Json(settings): Json<SystemSettings>,
) -> Result<Json<SystemSettings>, AppError> {
    let row: SystemSettingsRow = state
        .store
        .update(
            SYSTEM_SETTINGS,
            SETTINGS_ROW_ID,
            &SystemSettingsPatch::from(&settings),
        )
        .await?
        .ok_or(AppError::NotFound("Settings row"))?;
    let settings = SystemSettings::from(row);

    info!(
        "Developer {} set maintenance mode {}",
        session.username, settings.maintenance_mode
    );
    *state.settings.write().await = settings.clone();
    state
        .audit(AuditEntry::new("update_settings", &session.username, None))
        .await;

    Ok(Json(settings))
}

pub async fn create_admin_handler(
    AxumState(state): AppState,
    DeveloperSession(session): DeveloperSession,
    Json(request): Json<NewAdminRequest>,
) -> Result<(StatusCode, Json<AdminAccount>), AppError> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::MissingField("username"));
    }

    let new_user = NewAdminUserRow {
        username: username.to_string(),
        password_hash: hash_password(&request.password)?,
        role: request.role.label(),
    };

    let row: AdminUserRow = state.store.insert(ADMIN_USERS, &new_user).await?;
    let AdminUser {
        id, username, role, ..
    } = AdminUser::try_from(row)?;

    info!("Developer {} created {role} account {username}", session.username);
    state
        .audit(AuditEntry::new("create_admin", &session.username, Some(&id)).with_details(&username))
        .await;

    Ok((StatusCode::CREATED, Json(AdminAccount { id, username, role })))
}

pub async fn refresh_handler(
    AxumState(state): AppState,
    AdminSession { session, .. }: AdminSession,
) -> Result<Json<Refreshed>, AppError> {
    let resources = state.refresh_catalog().await?;

    info!("Admin {} refreshed the catalog", session.username);
    state
        .audit(AuditEntry::new("refresh_catalog", &session.username, None))
        .await;

    Ok(Json(Refreshed { resources }))
}

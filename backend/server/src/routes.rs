use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State as AxumState},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use bank::{
    models::{Comment, NewComment, NewPeerNote, PeerNote, Playlist, Resource, SystemSettings, Video},
    reference::{self, GAMES, GRADES, Game, Grade, Subject},
    remote::{COMMENTS, PEER_NOTES},
    rows::{CommentRow, NewCommentRow, NewPeerNoteRow, PeerNoteRow},
    snapshot::convert_rows,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    auth::{Session, session_from_headers},
    chat::ChatRequest,
    error::AppError,
    navigation::Route,
    preferences::{Theme, ThemePreference},
    search::{CatalogFilter, QueryMode, blank_as_none, filter},
    state::State,
};

type AppState = AxumState<Arc<State>>;

const LATEST_ON_HOME: usize = 8;
const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Serialize)]
pub struct GradeView {
    #[serde(flatten)]
    pub grade: &'static Grade,
    pub subjects: Vec<&'static Subject>,
}

impl GradeView {
    fn of(grade: &'static Grade) -> Self {
        Self {
            grade,
            subjects: reference::subjects_for(grade.id).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCount {
    #[serde(flatten)]
    pub subject: &'static Subject,
    pub resource_count: usize,
}

/// Payload behind each fragment route of the client.
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum View {
    Home {
        grades: Vec<GradeView>,
        latest: Vec<Resource>,
        announcement: Option<String>,
    },
    Grade {
        grade: &'static Grade,
        subjects: Vec<SubjectCount>,
    },
    Subject {
        grade: Option<&'static Grade>,
        subject: Option<&'static Subject>,
        resources: Vec<Resource>,
    },
    Paper {
        paper: Resource,
        grade: Option<&'static Grade>,
        subject: Option<&'static Subject>,
        comments: Vec<Comment>,
    },
    Notes {
        notes: Vec<PeerNote>,
    },
    Videos {
        videos: Vec<Video>,
        playlists: Vec<Playlist>,
    },
    Games {
        games: &'static [Game],
    },
    Admin {
        authenticated: bool,
        session: Option<Session>,
    },
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(flatten)]
    pub filter: CatalogFilter,
    // flattened query values arrive as strings
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ViewParams {
    #[serde(default)]
    pub fragment: String,
    #[serde(flatten)]
    pub filter: CatalogFilter,
}

pub async fn grades_handler() -> Json<Vec<GradeView>> {
    Json(GRADES.iter().map(GradeView::of).collect())
}

pub async fn search_handler(
    AxumState(state): AppState,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Resource>> {
    let mode = QueryMode::search(params.limit.unwrap_or(state.config.search_limit));
    let catalog = state.catalog.read().await;

    Json(
        filter(&catalog.resources, &params.filter, mode)
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub async fn view_handler(
    AxumState(state): AppState,
    headers: HeaderMap,
    Query(params): Query<ViewParams>,
) -> Result<Json<View>, AppError> {
    let view = match Route::parse(&params.fragment) {
        Route::Home => {
            let latest = state
                .catalog
                .read()
                .await
                .resources
                .iter()
                .take(LATEST_ON_HOME)
                .cloned()
                .collect();

            View::Home {
                grades: GRADES.iter().map(GradeView::of).collect(),
                latest,
                announcement: state.settings.read().await.announcement.clone(),
            }
        }
        Route::Grade { grade_id } => {
            let grade = reference::grade(&grade_id).ok_or(AppError::NotFound("Grade"))?;
            let catalog = state.catalog.read().await;

            let subjects = reference::subjects_for(grade.id)
                .map(|subject| SubjectCount {
                    subject,
                    resource_count: catalog
                        .resources
                        .iter()
                        .filter(|r| r.grade_id == grade.id && r.subject_id == subject.id)
                        .count(),
                })
                .collect();

            View::Grade { grade, subjects }
        }
        Route::Subject {
            grade_id,
            subject_id,
        } => {
            let scoped = params.filter.with_grade(&grade_id).with_subject(&subject_id);
            let catalog = state.catalog.read().await;

            View::Subject {
                grade: reference::grade(&grade_id),
                subject: reference::subject(&subject_id),
                resources: filter(&catalog.resources, &scoped, QueryMode::Browse)
                    .into_iter()
                    .cloned()
                    .collect(),
            }
        }
        Route::Paper { paper_id } => {
            let paper = state
                .catalog
                .read()
                .await
                .resource(&paper_id)
                .cloned()
                .ok_or(AppError::NotFound("Paper"))?;

            View::Paper {
                grade: reference::grade(&paper.grade_id),
                subject: reference::subject(&paper.subject_id),
                comments: load_comments(&state, &paper.id).await,
                paper,
            }
        }
        Route::Notes => View::Notes {
            notes: state.catalog.read().await.approved_notes(),
        },
        Route::Videos => {
            let catalog = state.catalog.read().await;

            View::Videos {
                videos: catalog.videos.clone(),
                playlists: catalog.playlists.clone(),
            }
        }
        Route::Games => View::Games { games: GAMES },
        Route::Admin => {
            let session = session_from_headers(&state, &headers)
                .await
                .map(|(_, session)| session);

            View::Admin {
                authenticated: session.is_some(),
                session,
            }
        }
        Route::NotFound => return Err(AppError::NotFound("Page")),
    };

    Ok(Json(view))
}

pub async fn settings_handler(AxumState(state): AppState) -> Json<SystemSettings> {
    Json(state.settings.read().await.clone())
}

pub async fn notes_handler(
    AxumState(state): AppState,
    Query(params): Query<CatalogFilter>,
) -> Json<Vec<PeerNote>> {
    let notes = state.catalog.read().await.approved_notes();

    Json(
        filter(&notes, &params, QueryMode::Browse)
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub async fn create_note_handler(
    AxumState(state): AppState,
    Json(note): Json<NewPeerNote>,
) -> Result<(StatusCode, Json<PeerNote>), AppError> {
    ensure_open(&state).await?;

    if note.title.trim().is_empty() {
        return Err(AppError::MissingField("title"));
    }
    if note.author_name.trim().is_empty() {
        return Err(AppError::MissingField("authorName"));
    }

    let row: PeerNoteRow = state
        .store
        .insert(PEER_NOTES, &NewPeerNoteRow::from(&note))
        .await?;
    let note = PeerNote::try_from(row)?;

    info!("Peer note {} submitted for review", note.id);
    state.catalog.write().await.upsert_note(note.clone());

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn videos_handler(
    AxumState(state): AppState,
    Query(params): Query<CatalogFilter>,
) -> Json<Vec<Video>> {
    let catalog = state.catalog.read().await;

    Json(
        filter(&catalog.videos, &params, QueryMode::Browse)
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub async fn playlists_handler(AxumState(state): AppState) -> Json<Vec<Playlist>> {
    Json(state.catalog.read().await.playlists.clone())
}

pub async fn comments_handler(
    AxumState(state): AppState,
    Path(paper_id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    if state.catalog.read().await.resource(&paper_id).is_none() {
        return Err(AppError::NotFound("Paper"));
    }

    Ok(Json(load_comments(&state, &paper_id).await))
}

pub async fn create_comment_handler(
    AxumState(state): AppState,
    Path(paper_id): Path<String>,
    Json(comment): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    ensure_open(&state).await?;

    if state.catalog.read().await.resource(&paper_id).is_none() {
        return Err(AppError::NotFound("Paper"));
    }

    let body = comment.body.trim();
    if body.is_empty() {
        return Err(AppError::MissingField("body"));
    }
    if body.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::MalformedPayload(format!(
            "comments are limited to {MAX_COMMENT_LEN} characters"
        )));
    }

    let row: CommentRow = state
        .store
        .insert(COMMENTS, &NewCommentRow::new(&paper_id, &comment))
        .await?;

    Ok((StatusCode::CREATED, Json(Comment::try_from(row)?)))
}

pub async fn theme_handler(headers: HeaderMap) -> Json<ThemePreference> {
    Json(ThemePreference {
        theme: Theme::from_headers(&headers),
    })
}

pub async fn set_theme_handler(Json(preference): Json<ThemePreference>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, preference.theme.set_cookie())],
        Json(preference),
    )
}

pub async fn chat_handler(
    AxumState(state): AppState,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    request.validate()?;

    let client = state.chat.as_ref().ok_or(AppError::ChatUnavailable)?;
    let chunks = client.stream(&request).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response())
}

/// Oldest first. An unreachable store yields no comments rather than an error.
async fn load_comments(state: &State, paper_id: &str) -> Vec<Comment> {
    let rows: Vec<CommentRow> = match state
        .store
        .select_eq(COMMENTS, "resource_id", paper_id)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Comments for {paper_id} unavailable: {e:#}");
            return Vec::new();
        }
    };

    let mut comments = convert_rows::<CommentRow, Comment>(COMMENTS, rows).items;
    comments.sort_by_key(|c| c.created_at);
    comments
}

async fn ensure_open(state: &State) -> Result<(), AppError> {
    if state.settings.read().await.maintenance_mode {
        return Err(AppError::Maintenance);
    }

    Ok(())
}

//! Row shapes returned by the remote store.
//!
//! The store speaks snake_case and is loose about types: ids come back as
//! integers or uuids, years as integers or strings. Everything is converted
//! here so the rest of the crate only sees the models.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    AdminRole, AdminUser, Comment, Medium, NewComment, NewPeerNote, NewPlaylist, NewResource,
    NewVideo, PeerNote, Playlist, Resource, ResourceType, SystemSettings, Term, Video,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawYear {
    Number(i64),
    Text(String),
}

fn required_id(id: Option<RawId>) -> Result<String, RowError> {
    id.map(RawId::into_string)
        .filter(|id| !id.trim().is_empty())
        .ok_or(RowError::Missing("id"))
}

fn required_text(value: Option<String>, what: &'static str) -> Result<String, RowError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(RowError::Missing(what))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn year(value: Option<RawYear>) -> Result<Option<u16>, RowError> {
    match value {
        None => Ok(None),
        Some(RawYear::Number(n)) => u16::try_from(n)
            .map(Some)
            .map_err(|_| RowError::Invalid("year", n.to_string())),
        Some(RawYear::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawYear::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RowError::Invalid("year", s)),
    }
}

fn optional_medium(value: Option<String>) -> Result<Option<Medium>, RowError> {
    optional_text(value).map(|m| m.parse()).transpose()
}

fn created(value: Option<DateTime<Utc>>) -> DateTime<Utc> {
    value.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ResourceRow {
    pub id: Option<RawId>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub term: Option<String>,
    pub year: Option<RawYear>,
    pub medium: Option<String>,
    pub file_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ResourceRow> for Resource {
    type Error = RowError;

    fn try_from(row: ResourceRow) -> Result<Self, Self::Error> {
        let kind = optional_text(row.kind)
            .and_then(|k| k.parse().ok())
            .unwrap_or(ResourceType::Other);

        // unknown terms are dropped rather than failing the row
        let term = optional_text(row.term).and_then(|t| t.parse::<Term>().ok());

        Ok(Resource {
            id: required_id(row.id)?,
            title: required_text(row.title, "title")?,
            kind,
            grade_id: required_text(row.grade_id, "grade_id")?,
            subject_id: required_text(row.subject_id, "subject_id")?,
            term,
            year: year(row.year)?,
            medium: required_text(row.medium, "medium")?.parse::<Medium>()?,
            file_url: optional_text(row.file_url),
            created_at: created(row.created_at),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewResourceRow {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub grade_id: String,
    pub subject_id: String,
    pub term: Option<&'static str>,
    pub year: Option<u16>,
    pub medium: &'static str,
    pub file_url: Option<String>,
}

impl From<&NewResource> for NewResourceRow {
    fn from(new: &NewResource) -> Self {
        Self {
            title: new.title.clone(),
            kind: new.kind.label(),
            grade_id: new.grade_id.clone(),
            subject_id: new.subject_id.clone(),
            term: new.term.map(Term::label),
            year: new.year,
            medium: new.medium.label(),
            file_url: new.file_url.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PeerNoteRow {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<String>,
    pub price: Option<u32>,
    pub file_url: Option<String>,
    #[serde(default)]
    pub approved: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<PeerNoteRow> for PeerNote {
    type Error = RowError;

    fn try_from(row: PeerNoteRow) -> Result<Self, Self::Error> {
        Ok(PeerNote {
            id: required_id(row.id)?,
            title: required_text(row.title, "title")?,
            description: optional_text(row.description),
            author_name: optional_text(row.author_name).unwrap_or_else(|| "Anonymous".to_string()),
            grade_id: optional_text(row.grade_id),
            subject_id: optional_text(row.subject_id),
            medium: optional_medium(row.medium)?,
            price: row.price,
            file_url: optional_text(row.file_url),
            approved: row.approved.unwrap_or(false),
            created_at: created(row.created_at),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewPeerNoteRow {
    pub title: String,
    pub description: Option<String>,
    pub author_name: String,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<&'static str>,
    pub price: Option<u32>,
    pub file_url: Option<String>,
    pub approved: bool,
}

impl From<&NewPeerNote> for NewPeerNoteRow {
    fn from(new: &NewPeerNote) -> Self {
        Self {
            title: new.title.trim().to_string(),
            description: optional_text(new.description.clone()),
            author_name: new.author_name.trim().to_string(),
            grade_id: optional_text(new.grade_id.clone()),
            subject_id: optional_text(new.subject_id.clone()),
            medium: new.medium.map(Medium::label),
            price: new.price,
            file_url: optional_text(new.file_url.clone()),
            approved: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct VideoRow {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<String>,
    pub playlist_id: Option<RawId>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<VideoRow> for Video {
    type Error = RowError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        Ok(Video {
            id: required_id(row.id)?,
            title: required_text(row.title, "title")?,
            video_url: required_text(row.video_url, "video_url")?,
            grade_id: optional_text(row.grade_id),
            subject_id: optional_text(row.subject_id),
            medium: optional_medium(row.medium)?,
            playlist_id: row.playlist_id.map(RawId::into_string),
            created_at: created(row.created_at),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewVideoRow {
    pub title: String,
    pub video_url: String,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<&'static str>,
    pub playlist_id: Option<String>,
}

impl From<&NewVideo> for NewVideoRow {
    fn from(new: &NewVideo) -> Self {
        Self {
            title: new.title.trim().to_string(),
            video_url: new.video_url.trim().to_string(),
            grade_id: optional_text(new.grade_id.clone()),
            subject_id: optional_text(new.subject_id.clone()),
            medium: new.medium.map(Medium::label),
            playlist_id: optional_text(new.playlist_id.clone()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlaylistRow {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<PlaylistRow> for Playlist {
    type Error = RowError;

    fn try_from(row: PlaylistRow) -> Result<Self, Self::Error> {
        Ok(Playlist {
            id: required_id(row.id)?,
            title: required_text(row.title, "title")?,
            description: optional_text(row.description),
            created_at: created(row.created_at),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewPlaylistRow {
    pub title: String,
    pub description: Option<String>,
}

impl From<&NewPlaylist> for NewPlaylistRow {
    fn from(new: &NewPlaylist) -> Self {
        Self {
            title: new.title.trim().to_string(),
            description: optional_text(new.description.clone()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CommentRow {
    pub id: Option<RawId>,
    pub resource_id: Option<RawId>,
    pub author_name: Option<String>,
    pub body: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = RowError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: required_id(row.id)?,
            resource_id: row
                .resource_id
                .map(RawId::into_string)
                .ok_or(RowError::Missing("resource_id"))?,
            author_name: optional_text(row.author_name).unwrap_or_else(|| "Anonymous".to_string()),
            body: required_text(row.body, "body")?,
            created_at: created(row.created_at),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewCommentRow {
    pub resource_id: String,
    pub author_name: String,
    pub body: String,
}

impl NewCommentRow {
    pub fn new(resource_id: &str, comment: &NewComment) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            author_name: optional_text(Some(comment.author_name.clone()))
                .unwrap_or_else(|| "Anonymous".to_string()),
            body: comment.body.trim().to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AdminUserRow {
    pub id: Option<RawId>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RowError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let role = match optional_text(row.role) {
            Some(role) => role.parse::<AdminRole>()?,
            None => AdminRole::default(),
        };

        Ok(AdminUser {
            id: required_id(row.id)?,
            username: required_text(row.username, "username")?,
            password_hash: required_text(row.password_hash, "password_hash")?,
            role,
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewAdminUserRow {
    pub username: String,
    pub password_hash: String,
    pub role: &'static str,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SystemSettingsRow {
    pub maintenance_mode: Option<bool>,
    pub announcement: Option<String>,
}

impl From<SystemSettingsRow> for SystemSettings {
    fn from(row: SystemSettingsRow) -> Self {
        Self {
            maintenance_mode: row.maintenance_mode.unwrap_or(false),
            announcement: optional_text(row.announcement),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SystemSettingsPatch<'a> {
    pub maintenance_mode: bool,
    pub announcement: Option<&'a str>,
}

impl<'a> From<&'a SystemSettings> for SystemSettingsPatch<'a> {
    fn from(settings: &'a SystemSettings) -> Self {
        Self {
            maintenance_mode: settings.maintenance_mode,
            announcement: settings.announcement.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn resource_row(value: serde_json::Value) -> ResourceRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn maps_snake_case_row() {
        let row = resource_row(json!({
            "id": 42,
            "title": " 2023 Combined Maths Paper ",
            "type": "Past Paper",
            "grade_id": "al",
            "subject_id": "combined-maths",
            "term": "2nd",
            "year": "2023",
            "medium": "Sinhala",
            "file_url": "",
            "created_at": "2024-03-01T08:30:00+00:00"
        }));

        let resource = Resource::try_from(row).unwrap();
        assert_eq!(resource.id, "42");
        assert_eq!(resource.title, "2023 Combined Maths Paper");
        assert_eq!(resource.kind, ResourceType::PastPaper);
        assert_eq!(resource.term, Some(Term::Second));
        assert_eq!(resource.year, Some(2023));
        assert_eq!(resource.medium, Medium::Sinhala);
        assert_eq!(resource.file_url, None);
    }

    #[test]
    fn missing_title_rejects_row() {
        let row = resource_row(json!({
            "id": "a1",
            "title": null,
            "grade_id": "ol",
            "subject_id": "science",
            "medium": "English"
        }));

        assert_eq!(Resource::try_from(row), Err(RowError::Missing("title")));
    }

    #[test]
    fn lenient_on_type_and_term_strict_on_medium() {
        let row = resource_row(json!({
            "id": "a2",
            "title": "Revision pack",
            "type": "Flashcards",
            "term": "Summer",
            "grade_id": "grade-9",
            "subject_id": "history",
            "medium": "Tamil"
        }));
        let resource = Resource::try_from(row).unwrap();
        assert_eq!(resource.kind, ResourceType::Other);
        assert_eq!(resource.term, None);
        assert_eq!(resource.year, None);

        let row = resource_row(json!({
            "id": "a3",
            "title": "Revision pack",
            "grade_id": "grade-9",
            "subject_id": "history",
            "medium": "Klingon"
        }));
        assert!(matches!(Resource::try_from(row), Err(RowError::Invalid("medium", _))));
    }

    #[test]
    fn bad_year_rejects_row() {
        let row = resource_row(json!({
            "id": "a4",
            "title": "Paper",
            "grade_id": "ol",
            "subject_id": "science",
            "medium": "English",
            "year": "twenty"
        }));

        assert!(matches!(Resource::try_from(row), Err(RowError::Invalid("year", _))));
    }

    #[test]
    fn admin_role_defaults_to_admin() {
        let row: AdminUserRow = serde_json::from_value(json!({
            "id": 1,
            "username": "nimal",
            "password_hash": "$argon2id$v=19$..."
        }))
        .unwrap();

        assert_eq!(AdminUser::try_from(row).unwrap().role, AdminRole::Admin);
    }

    #[test]
    fn new_rows_use_store_labels() {
        let new = NewResource {
            title: "Syllabus 2025".into(),
            kind: ResourceType::Syllabus,
            grade_id: "ol".into(),
            subject_id: "ict".into(),
            term: Some(Term::Third),
            year: None,
            medium: Medium::Tamil,
            file_url: Some("https://cdn/x.pdf".into()),
        };

        let value = serde_json::to_value(NewResourceRow::from(&new)).unwrap();
        assert_eq!(value["type"], "Syllabus");
        assert_eq!(value["term"], "3rd Term");
        assert_eq!(value["medium"], "Tamil");
        assert_eq!(value["grade_id"], "ol");
    }
}

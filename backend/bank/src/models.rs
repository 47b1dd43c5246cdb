use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rows::RowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "Past Paper")]
    PastPaper,
    #[serde(rename = "Term Test")]
    TermTest,
    #[serde(rename = "Short Note")]
    ShortNote,
    #[serde(rename = "Model Paper")]
    ModelPaper,
    Syllabus,
    #[serde(rename = "Teachers Guide")]
    TeachersGuide,
    #[serde(rename = "Marking Scheme")]
    MarkingScheme,
    Other,
}

impl ResourceType {
    pub const ALL: [ResourceType; 8] = [
        ResourceType::PastPaper,
        ResourceType::TermTest,
        ResourceType::ShortNote,
        ResourceType::ModelPaper,
        ResourceType::Syllabus,
        ResourceType::TeachersGuide,
        ResourceType::MarkingScheme,
        ResourceType::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ResourceType::PastPaper => "Past Paper",
            ResourceType::TermTest => "Term Test",
            ResourceType::ShortNote => "Short Note",
            ResourceType::ModelPaper => "Model Paper",
            ResourceType::Syllabus => "Syllabus",
            ResourceType::TeachersGuide => "Teachers Guide",
            ResourceType::MarkingScheme => "Marking Scheme",
            ResourceType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    #[serde(rename = "1st Term", alias = "1st")]
    First,
    #[serde(rename = "2nd Term", alias = "2nd")]
    Second,
    #[serde(rename = "3rd Term", alias = "3rd")]
    Third,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::First, Term::Second, Term::Third];

    pub fn label(self) -> &'static str {
        match self {
            Term::First => "1st Term",
            Term::Second => "2nd Term",
            Term::Third => "3rd Term",
        }
    }

    fn short(self) -> &'static str {
        match self {
            Term::First => "1st",
            Term::Second => "2nd",
            Term::Third => "3rd",
        }
    }
}

/// Language a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Medium {
    Sinhala,
    English,
    Tamil,
}

impl Medium {
    pub const ALL: [Medium; 3] = [Medium::Sinhala, Medium::English, Medium::Tamil];

    pub fn label(self) -> &'static str {
        match self {
            Medium::Sinhala => "Sinhala",
            Medium::English => "English",
            Medium::Tamil => "Tamil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    #[default]
    Admin,
    Developer,
}

impl AdminRole {
    pub const ALL: [AdminRole; 2] = [AdminRole::Admin, AdminRole::Developer];

    pub fn label(self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::Developer => "developer",
        }
    }
}

macro_rules! labelled {
    ($($ty:ident => $what:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }

            impl FromStr for $ty {
                type Err = RowError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let s = s.trim();
                    $ty::ALL
                        .into_iter()
                        .find(|v| v.label().eq_ignore_ascii_case(s))
                        .ok_or_else(|| RowError::Invalid($what, s.to_string()))
                }
            }
        )*
    };
}

labelled!(ResourceType => "type", Medium => "medium");

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Term {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Term::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s) || t.short().eq_ignore_ascii_case(s))
            .ok_or_else(|| RowError::Invalid("term", s.to_string()))
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AdminRole {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AdminRole::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| RowError::Invalid("role", s.to_string()))
    }
}

/// A downloadable exam document. Never mutated after it is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub grade_id: String,
    pub subject_id: String,
    pub term: Option<Term>,
    pub year: Option<u16>,
    pub medium: Medium,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResource {
    pub title: String,
    pub kind: ResourceType,
    pub grade_id: String,
    pub subject_id: String,
    pub term: Option<Term>,
    pub year: Option<u16>,
    pub medium: Medium,
    pub file_url: Option<String>,
}

/// Student-submitted note listed in the marketplace once approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerNote {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub author_name: String,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<Medium>,
    pub price: Option<u32>,
    pub file_url: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPeerNote {
    pub title: String,
    pub description: Option<String>,
    pub author_name: String,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<Medium>,
    pub price: Option<u32>,
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub video_url: String,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<Medium>,
    pub playlist_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo {
    pub title: String,
    pub video_url: String,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub medium: Option<Medium>,
    pub playlist_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlaylist {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub resource_id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub author_name: String,
    pub body: String,
}

/// Admin account. The hash is an argon2 PHC string and never leaves the server.
#[derive(Clone, PartialEq)]
pub struct AdminUser {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: AdminRole,
}

impl fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default)]
    pub announcement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub action: String,
    pub actor: String,
    pub target_id: Option<String>,
    pub details: Option<String>,
}

impl AuditEntry {
    pub fn new(action: &str, actor: &str, target_id: Option<&str>) -> Self {
        Self {
            action: action.to_string(),
            actor: actor.to_string(),
            target_id: target_id.map(str::to_string),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

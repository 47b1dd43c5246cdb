//! Fragment routes of the single-page client.
//!
//! ```text
//! #/                          home
//! #/grade/:gradeId            subjects of a grade
//! #/subject/:gradeId/:subjectId
//! #/paper/:paperId
//! #/notes  #/videos  #/games  #/admin
//! ```
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum Route {
    Home,
    #[serde(rename_all = "camelCase")]
    Grade { grade_id: String },
    #[serde(rename_all = "camelCase")]
    Subject { grade_id: String, subject_id: String },
    #[serde(rename_all = "camelCase")]
    Paper { paper_id: String },
    Notes,
    Videos,
    Games,
    Admin,
    NotFound,
}

impl Route {
    /// Leading `#` and `/` are optional; a trailing slash is ignored.
    pub fn parse(fragment: &str) -> Self {
        let path = fragment.trim().trim_start_matches('#').trim_matches('/');
        if path.is_empty() {
            return Route::Home;
        }

        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Route::NotFound;
        }

        match segments.as_slice() {
            ["grade", grade_id] => Route::Grade {
                grade_id: grade_id.to_string(),
            },
            ["subject", grade_id, subject_id] => Route::Subject {
                grade_id: grade_id.to_string(),
                subject_id: subject_id.to_string(),
            },
            ["paper", paper_id] => Route::Paper {
                paper_id: paper_id.to_string(),
            },
            ["notes"] => Route::Notes,
            ["videos"] => Route::Videos,
            ["games"] => Route::Games,
            ["admin"] => Route::Admin,
            _ => Route::NotFound,
        }
    }

    pub fn fragment(&self) -> String {
        match self {
            Route::Home => "#/".to_string(),
            Route::Grade { grade_id } => format!("#/grade/{grade_id}"),
            Route::Subject {
                grade_id,
                subject_id,
            } => format!("#/subject/{grade_id}/{subject_id}"),
            Route::Paper { paper_id } => format!("#/paper/{paper_id}"),
            Route::Notes => "#/notes".to_string(),
            Route::Videos => "#/videos".to_string(),
            Route::Games => "#/games".to_string(),
            Route::Admin => "#/admin".to_string(),
            Route::NotFound => "#/404".to_string(),
        }
    }
}

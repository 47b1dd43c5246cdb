//! # Catalog Query Engine
//!
//! One filter for every list the library shows: home search, the admin fleet,
//! the notes marketplace, the video library and the subject page.
//!
//!
//!
//! ## Predicates
//! - Text: case-insensitive substring of the title, or substring of the year
//!   (`"202"` matches 2024)
//! - Grade, subject, medium, term, type: exact equality
//! - Unset (or blank) predicates match everything
//! - A record without a facet fails an active predicate on that facet
//! - All active predicates are ANDed
//!
//!
//!
//! ## Modes
//! The search box and the listing pages disagree about short queries, so the
//! caller picks explicitly.
//!
//! - [`QueryMode::Search`]: fewer than [`MIN_QUERY_LEN`] characters returns
//!   nothing, results are cut to the limit
//! - [`QueryMode::Browse`]: a blank query matches all, no truncation
//!
//!
//!
//! ## Cost
//! Linear scan per request. The catalog is a few hundred records so no index
//! is kept; output order is the catalog order (newest first).
use std::{fmt::Display, str::FromStr};

use bank::models::{Medium, PeerNote, Resource, ResourceType, Term, Video};
use serde::{Deserialize, Deserializer};

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_SEARCH_LIMIT: usize = 8;

pub trait Searchable {
    fn title(&self) -> &str;

    fn year(&self) -> Option<u16> {
        None
    }

    fn grade_id(&self) -> Option<&str> {
        None
    }

    fn subject_id(&self) -> Option<&str> {
        None
    }

    fn medium(&self) -> Option<Medium> {
        None
    }

    fn term(&self) -> Option<Term> {
        None
    }

    fn kind(&self) -> Option<ResourceType> {
        None
    }
}

impl Searchable for Resource {
    fn title(&self) -> &str {
        &self.title
    }

    fn year(&self) -> Option<u16> {
        self.year
    }

    fn grade_id(&self) -> Option<&str> {
        Some(&self.grade_id)
    }

    fn subject_id(&self) -> Option<&str> {
        Some(&self.subject_id)
    }

    fn medium(&self) -> Option<Medium> {
        Some(self.medium)
    }

    fn term(&self) -> Option<Term> {
        self.term
    }

    fn kind(&self) -> Option<ResourceType> {
        Some(self.kind)
    }
}

impl Searchable for PeerNote {
    fn title(&self) -> &str {
        &self.title
    }

    fn grade_id(&self) -> Option<&str> {
        self.grade_id.as_deref()
    }

    fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    fn medium(&self) -> Option<Medium> {
        self.medium
    }
}

impl Searchable for Video {
    fn title(&self) -> &str {
        &self.title
    }

    fn grade_id(&self) -> Option<&str> {
        self.grade_id.as_deref()
    }

    fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    fn medium(&self) -> Option<Medium> {
        self.medium
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub grade_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub subject_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub medium: Option<Medium>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub term: Option<Term>,
    #[serde(default, rename = "type", deserialize_with = "blank_as_none")]
    pub kind: Option<ResourceType>,
}

/// Query strings send `medium=` for "any"; treat it like an absent key.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Search { limit: usize },
    Browse,
}

impl QueryMode {
    pub fn search(limit: usize) -> Self {
        QueryMode::Search {
            limit: limit.clamp(1, MAX_SEARCH_LIMIT),
        }
    }
}

enum TextMatch {
    Everything,
    Nothing,
    Needle(String),
}

impl CatalogFilter {
    pub fn with_grade(mut self, grade_id: &str) -> Self {
        self.grade_id = Some(grade_id.to_string());
        self
    }

    pub fn with_subject(mut self, subject_id: &str) -> Self {
        self.subject_id = Some(subject_id.to_string());
        self
    }

    fn text(&self, mode: QueryMode) -> TextMatch {
        let query = self.query.as_deref().map(str::trim).unwrap_or_default();

        match mode {
            QueryMode::Search { .. } if query.chars().count() < MIN_QUERY_LEN => TextMatch::Nothing,
            QueryMode::Browse if query.is_empty() => TextMatch::Everything,
            _ => TextMatch::Needle(query.to_lowercase()),
        }
    }

    fn categories_match<T: Searchable>(&self, item: &T) -> bool {
        fn facet<V: PartialEq>(wanted: Option<V>, actual: Option<V>) -> bool {
            match wanted {
                None => true,
                Some(wanted) => actual == Some(wanted),
            }
        }

        facet(self.grade_id.as_deref(), item.grade_id())
            && facet(self.subject_id.as_deref(), item.subject_id())
            && facet(self.medium, item.medium())
            && facet(self.term, item.term())
            && facet(self.kind, item.kind())
    }
}

fn text_matches<T: Searchable>(item: &T, needle: &str) -> bool {
    item.title().to_lowercase().contains(needle)
        || item
            .year()
            .is_some_and(|year| year.to_string().contains(needle))
}

pub fn filter<'a, T: Searchable>(items: &'a [T], filter: &CatalogFilter, mode: QueryMode) -> Vec<&'a T> {
    let text = filter.text(mode);
    if let TextMatch::Nothing = text {
        return Vec::new();
    }

    let matches = items.iter().filter(|item| {
        filter.categories_match(*item)
            && match &text {
                TextMatch::Needle(needle) => text_matches(*item, needle),
                _ => true,
            }
    });

    match mode {
        QueryMode::Search { limit } => matches.take(limit).collect(),
        QueryMode::Browse => matches.collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn resource(
        id: &str,
        title: &str,
        grade_id: &str,
        subject_id: &str,
        medium: Medium,
        year: Option<u16>,
    ) -> Resource {
        Resource {
            id: id.to_string(),
            title: title.to_string(),
            kind: ResourceType::PastPaper,
            grade_id: grade_id.to_string(),
            subject_id: subject_id.to_string(),
            term: None,
            year,
            medium,
            file_url: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn fleet() -> Vec<Resource> {
        let mut term_test = resource("5", "Science Term Test", "grade-9", "science", Medium::Tamil, Some(2022));
        term_test.kind = ResourceType::TermTest;
        term_test.term = Some(Term::Second);

        vec![
            resource("1", "2024 Science Past Paper", "ol", "science", Medium::English, Some(2024)),
            resource("2", "Physics Model Paper", "al", "physics", Medium::Sinhala, Some(2019)),
            resource("3", "Chemistry Paper", "al", "chemistry", Medium::Sinhala, Some(2023)),
            resource("4", "Chemistry Paper", "al", "chemistry", Medium::English, None),
            term_test,
            resource("6", "History Short Note", "ol", "history", Medium::Sinhala, None),
            resource("7", "Maths Paper I", "ol", "mathematics", Medium::Sinhala, Some(2020)),
            resource("8", "Maths Paper II", "ol", "mathematics", Medium::Sinhala, Some(2021)),
            resource("9", "Maths Paper III", "ol", "mathematics", Medium::Sinhala, Some(2022)),
        ]
    }

    fn ids(items: Vec<&Resource>) -> Vec<&str> {
        items.into_iter().map(|r| r.id.as_str()).collect()
    }

    fn query(q: &str) -> CatalogFilter {
        CatalogFilter {
            query: Some(q.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_filter_browses_everything_in_order() {
        let all = fleet();
        let result = filter(&all, &CatalogFilter::default(), QueryMode::Browse);

        assert_eq!(ids(result), ["1", "2", "3", "4", "5", "6", "7", "8", "9"]);
    }

    #[test]
    fn categorical_predicates_are_anded() {
        let all = fleet();
        let wanted = CatalogFilter {
            grade_id: Some("al".into()),
            medium: Some(Medium::Sinhala),
            ..Default::default()
        };

        let result = filter(&all, &wanted, QueryMode::Browse);
        assert_eq!(ids(result.clone()), ["2", "3"]);
        assert!(result.iter().all(|r| r.grade_id == "al" && r.medium == Medium::Sinhala));
    }

    #[test]
    fn every_match_satisfies_every_predicate_and_nothing_is_missed() {
        let all = fleet();
        let wanted = CatalogFilter {
            query: Some("paper".into()),
            grade_id: Some("ol".into()),
            medium: Some(Medium::Sinhala),
            ..Default::default()
        };

        let result = filter(&all, &wanted, QueryMode::Browse);
        let expected: Vec<&Resource> = all
            .iter()
            .filter(|r| {
                r.title.to_lowercase().contains("paper")
                    && r.grade_id == "ol"
                    && r.medium == Medium::Sinhala
            })
            .collect();

        assert_eq!(result, expected);
    }

    #[test]
    fn term_and_type_predicates() {
        let all = fleet();
        let wanted = CatalogFilter {
            term: Some(Term::Second),
            kind: Some(ResourceType::TermTest),
            ..Default::default()
        };
        assert_eq!(ids(filter(&all, &wanted, QueryMode::Browse)), ["5"]);

        let first_term = CatalogFilter {
            term: Some(Term::First),
            ..Default::default()
        };
        assert!(filter(&all, &first_term, QueryMode::Browse).is_empty());
    }

    #[test]
    fn single_character_search_returns_nothing() {
        let all = fleet();

        assert!(filter(&all, &query("a"), QueryMode::search(6)).is_empty());
        assert!(filter(&all, &query("  "), QueryMode::search(6)).is_empty());
        assert!(filter(&all, &CatalogFilter::default(), QueryMode::search(6)).is_empty());
    }

    #[test]
    fn single_character_browse_still_matches() {
        let all = fleet();
        let result = filter(&all, &query("I"), QueryMode::Browse);

        assert!(!result.is_empty());
        assert!(filter(&all, &query(""), QueryMode::Browse).len() == all.len());
    }

    #[test]
    fn search_is_case_insensitive() {
        let all = fleet();
        let result = filter(&all, &query("SCIENCE"), QueryMode::search(6));

        assert_eq!(ids(result), ["1", "5"]);
    }

    #[test]
    fn year_substring_matches() {
        let all = fleet();
        let result = filter(&all, &query("202"), QueryMode::Browse);

        assert_eq!(ids(result), ["1", "3", "5", "7", "8", "9"]);
    }

    #[test]
    fn search_truncates_to_limit() {
        let all = fleet();

        assert_eq!(filter(&all, &query("paper"), QueryMode::search(6)).len(), 6);
        assert_eq!(filter(&all, &query("paper"), QueryMode::Browse).len(), 7);
        assert_eq!(QueryMode::search(50), QueryMode::Search { limit: MAX_SEARCH_LIMIT });
        assert_eq!(QueryMode::search(0), QueryMode::Search { limit: 1 });
    }

    #[test]
    fn result_is_a_subset_and_idempotent() {
        let all = fleet();
        let wanted = CatalogFilter {
            query: Some("chem".into()),
            ..Default::default()
        };

        let once: Vec<Resource> = filter(&all, &wanted, QueryMode::Browse)
            .into_iter()
            .cloned()
            .collect();
        let twice: Vec<Resource> = filter(&once, &wanted, QueryMode::Browse)
            .into_iter()
            .cloned()
            .collect();

        assert!(once.iter().all(|r| all.contains(r)));
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_facet_fails_active_predicate() {
        let note = PeerNote {
            id: "n1".into(),
            title: "Organic chemistry summary".into(),
            description: None,
            author_name: "Dilini".into(),
            grade_id: None,
            subject_id: Some("chemistry".into()),
            medium: None,
            price: None,
            file_url: None,
            approved: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let notes = vec![note];

        let by_grade = CatalogFilter::default().with_grade("al");
        let by_subject = CatalogFilter::default().with_subject("chemistry");

        assert!(filter(&notes, &by_grade, QueryMode::Browse).is_empty());
        assert_eq!(filter(&notes, &by_subject, QueryMode::Browse).len(), 1);
    }

    #[test]
    fn blank_query_params_are_unset() {
        let parsed: CatalogFilter = serde_json::from_value(serde_json::json!({
            "query": "",
            "gradeId": " ",
            "medium": "",
            "term": "3rd",
            "type": "Past Paper"
        }))
        .unwrap();

        assert_eq!(parsed.query, None);
        assert_eq!(parsed.grade_id, None);
        assert_eq!(parsed.medium, None);
        assert_eq!(parsed.term, Some(Term::Third));
        assert_eq!(parsed.kind, Some(ResourceType::PastPaper));
    }

    #[test]
    fn unknown_medium_is_rejected() {
        let parsed: Result<CatalogFilter, _> =
            serde_json::from_value(serde_json::json!({ "medium": "Latin" }));

        assert!(parsed.is_err());
    }
}

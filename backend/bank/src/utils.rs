use std::sync::LazyLock;

use regex::Regex;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_/\\.]").expect("valid regex"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9- ]").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

/// Lowercase ascii words joined by dashes, safe for object storage keys.
pub fn slug(input: &str) -> String {
    let s = SEPARATORS.replace_all(input, " ");
    let s = DISALLOWED.replace_all(&s, "");
    let s = SPACES.replace_all(s.trim(), "-");

    s.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

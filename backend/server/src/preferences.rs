use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use serde::{Deserialize, Serialize};

pub const THEME_COOKIE: &str = "theme";
const ONE_YEAR_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == THEME_COOKIE)
            .map(|(_, value)| match value.trim() {
                "dark" => Theme::Dark,
                _ => Theme::Light,
            })
            .unwrap_or_default()
    }

    pub fn set_cookie(self) -> HeaderValue {
        HeaderValue::from_str(&format!(
            "{THEME_COOKIE}={}; Path=/; Max-Age={ONE_YEAR_SECS}; SameSite=Lax",
            self.as_str()
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("theme=light; Path=/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePreference {
    pub theme: Theme,
}

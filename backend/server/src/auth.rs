//! # Admin Gate
//!
//! Username + password checked against the `admin_users` table, where the
//! password is an argon2 hash. There is no built-in account: every admin,
//! developers included, is a row.
//!
//!
//!
//! ## Sessions
//! - Login hands out an opaque bearer token (UUID v4)
//! - The token maps to username, role and expiry in memory only, so a restart
//!   logs everyone out
//! - Expired tokens are dropped when touched and purged by the refresh task
//!
//!
//!
//! ## Roles
//! - `admin`: fleet, uploads, moderation
//! - `developer`: everything above plus settings and account creation
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use bank::{
    StoreClient,
    credentials::verify_password,
    models::{AdminRole, AdminUser},
    remote::ADMIN_USERS,
    rows::AdminUserRow,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{config::MAX_SESSION_TTL_MINS, error::AppError, state::State};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub role: AdminRole,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_developer(&self) -> bool {
        self.role == AdminRole::Developer
    }
}

pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl_mins: i64) -> Self {
        Self {
            ttl: Duration::try_minutes(ttl_mins.clamp(1, MAX_SESSION_TTL_MINS))
                .unwrap_or(Duration::hours(2)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn issue(&self, username: &str, role: AdminRole) -> (String, Session) {
        self.issue_at(username, role, Utc::now()).await
    }

    async fn issue_at(&self, username: &str, role: AdminRole, now: DateTime<Utc>) -> (String, Session) {
        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            username: username.to_string(),
            role,
            expires_at: now + self.ttl,
        };

        self.sessions
            .write()
            .await
            .insert(token.clone(), session.clone());

        (token, session)
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.get_at(token, Utc::now()).await
    }

    async fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let session = self.sessions.read().await.get(token).cloned()?;

        if session.expires_at <= now {
            self.sessions.write().await.remove(token);
            return None;
        }

        Some(session)
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now()).await
    }

    async fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);

        before - sessions.len()
    }
}

/// Looks the user up and checks the password. Every failure is the same error.
pub async fn authenticate(
    store: &StoreClient,
    username: &str,
    password: &str,
) -> Result<AdminUser, AppError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let rows: Vec<AdminUserRow> = store.select_eq(ADMIN_USERS, "username", username).await?;
    let Some(row) = rows.into_iter().next() else {
        info!("Login attempt for unknown admin {username}");
        return Err(AppError::InvalidCredentials);
    };

    let user = AdminUser::try_from(row).map_err(|e| {
        warn!("Unusable admin row for {username}: {e}");
        AppError::InvalidCredentials
    })?;

    check_password(&user, password)?;

    Ok(user)
}

pub fn check_password(user: &AdminUser, password: &str) -> Result<(), AppError> {
    match verify_password(password, &user.password_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::InvalidCredentials),
        Err(e) => {
            warn!("Admin {} has an unusable password hash: {e}", user.username);
            Err(AppError::InvalidCredentials)
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn session_from_headers(state: &State, headers: &HeaderMap) -> Option<(String, Session)> {
    let token = bearer_token(headers)?;
    let session = state.sessions.get(token).await?;

    Some((token.to_string(), session))
}

/// Any signed-in admin.
pub struct AdminSession {
    pub token: String,
    pub session: Session,
}

impl FromRequestParts<Arc<State>> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<State>) -> Result<Self, Self::Rejection> {
        let (token, session) = session_from_headers(state, &parts.headers)
            .await
            .ok_or(AppError::Unauthorized)?;

        Ok(Self { token, session })
    }
}

/// A signed-in admin holding the developer role.
pub struct DeveloperSession(pub Session);

impl FromRequestParts<Arc<State>> for DeveloperSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<State>) -> Result<Self, Self::Rejection> {
        let AdminSession { session, .. } = AdminSession::from_request_parts(parts, state).await?;

        if !session.is_developer() {
            return Err(AppError::Forbidden);
        }

        Ok(Self(session))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use bank::credentials::hash_password;

    use super::*;

    #[tokio::test]
    async fn issued_sessions_resolve_until_expiry() {
        let store = SessionStore::new(30);
        let now = Utc::now();
        let (token, session) = store.issue_at("kasun", AdminRole::Admin, now).await;

        assert_eq!(store.get_at(&token, now).await, Some(session.clone()));
        assert_eq!(
            store.get_at(&token, now + Duration::minutes(29)).await,
            Some(session)
        );
        assert_eq!(store.get_at(&token, now + Duration::minutes(30)).await, None);
        assert_eq!(store.get_at(&token, now).await, None);
    }

    #[tokio::test]
    async fn revoke_and_purge() {
        let store = SessionStore::new(10);
        let now = Utc::now();
        let (old, _) = store.issue_at("a", AdminRole::Admin, now - Duration::minutes(20)).await;
        let (fresh, _) = store.issue_at("b", AdminRole::Developer, now).await;

        assert_eq!(store.purge_expired_at(now).await, 1);
        assert!(!store.revoke(&old).await);
        assert!(store.revoke(&fresh).await);
        assert_eq!(store.get_at(&fresh, now).await, None);
    }

    #[tokio::test]
    async fn oversized_ttl_is_clamped() {
        let store = SessionStore::new(i64::MAX);
        let now = Utc::now();
        let (token, session) = store.issue_at("a", AdminRole::Admin, now).await;

        assert_eq!(session.expires_at, now + Duration::minutes(MAX_SESSION_TTL_MINS));
        assert!(store.get_at(&token, now).await.is_some());
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let store = SessionStore::new(10);
        let (a, _) = store.issue("x", AdminRole::Admin).await;
        let (b, _) = store.issue("x", AdminRole::Admin).await;

        assert_ne!(a, b);
    }

    #[test]
    fn password_check_uses_hash() {
        let user = AdminUser {
            id: "1".into(),
            username: "nimal".into(),
            password_hash: hash_password("correct horse").unwrap(),
            role: AdminRole::Admin,
        };

        assert!(check_password(&user, "correct horse").is_ok());
        assert!(matches!(
            check_password(&user, "wrong"),
            Err(AppError::InvalidCredentials)
        ));

        let legacy = AdminUser {
            password_hash: "correct horse".into(),
            ..user
        };
        assert!(matches!(
            check_password(&legacy, "correct horse"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer 5f2c"));
        assert_eq!(bearer_token(&headers), Some("5f2c"));
    }
}

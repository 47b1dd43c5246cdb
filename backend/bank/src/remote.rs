//! # Remote Store
//!
//! Hosted backend-as-a-service: PostgREST-style tables plus object storage.
//!
//! ## Tables
//! - `resources`, `peer_notes`, `videos`, `video_playlists`: the catalog
//! - `comments`: per-resource discussion
//! - `admin_users`: username, argon2 hash, role
//! - `system_settings`: single row, maintenance flag + announcement
//! - `audit_logs`: append-only admin trail
//!
//! ## Requests
//! - Every request carries the service key twice, as `apikey` and as a bearer token
//! - Writes ask for `return=representation` so the stored row comes back
//! - Uploads go to `storage/v1/object/{bucket}/{path}`, served from the public URL
use std::time::Duration;

use anyhow::{Context, Error, bail};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};

pub const RESOURCES: &str = "resources";
pub const PEER_NOTES: &str = "peer_notes";
pub const VIDEOS: &str = "videos";
pub const PLAYLISTS: &str = "video_playlists";
pub const COMMENTS: &str = "comments";
pub const ADMIN_USERS: &str = "admin_users";
pub const SYSTEM_SETTINGS: &str = "system_settings";
/// `system_settings` holds a single row.
pub const SETTINGS_ROW_ID: &str = "1";
pub const AUDIT_LOGS: &str = "audit_logs";

pub const NEWEST_FIRST: (&str, &str) = ("order", "created_at.desc");

#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building store http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, Error> {
        let request = self
            .http
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .query(query);

        let response = ensure_success(table, self.authorized(request).send().await?).await?;
        decode_rows(table, response).await
    }

    pub async fn select_eq<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<T>, Error> {
        let filter = format!("eq.{value}");
        self.select(table, &[(column, filter.as_str()), NEWEST_FIRST])
            .await
    }

    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(body);

        let response = ensure_success(table, self.authorized(request).send().await?).await?;
        first_row(table, response).await
    }

    /// Like [`insert`](Self::insert) but the stored row is not needed.
    pub async fn append<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<(), Error> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(body);

        ensure_success(table, self.authorized(request).send().await?).await?;
        Ok(())
    }

    /// `None` when no row has that id.
    pub async fn update<B, T>(&self, table: &str, id: &str, body: &B) -> Result<Option<T>, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(body);

        let response = ensure_success(table, self.authorized(request).send().await?).await?;
        let rows: Vec<T> = decode_rows(table, response).await?;

        Ok(rows.into_iter().next())
    }

    pub async fn delete(&self, table: &str, id: &str) -> Result<(), Error> {
        let request = self
            .http
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);

        ensure_success(table, self.authorized(request).send().await?).await?;
        Ok(())
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }

    /// Stores `bytes` at `bucket/path` and returns the public download URL.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, Error> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.base_url);
        let request = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);

        ensure_success(bucket, self.authorized(request).send().await?).await?;

        Ok(self.public_url(bucket, path))
    }

    pub async fn remove_object(&self, bucket: &str, path: &str) -> Result<(), Error> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.base_url);
        let request = self.http.delete(url);

        ensure_success(bucket, self.authorized(request).send().await?).await?;
        Ok(())
    }
}

async fn ensure_success(target: &str, response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    bail!("{target}: store responded {status}: {}", body.trim());
}

async fn decode_rows<T: DeserializeOwned>(table: &str, response: Response) -> Result<Vec<T>, Error> {
    response
        .json()
        .await
        .with_context(|| format!("decoding {table} rows"))
}

async fn first_row<T: DeserializeOwned>(table: &str, response: Response) -> Result<T, Error> {
    let rows: Vec<T> = decode_rows(table, response).await?;

    match rows.into_iter().next() {
        Some(row) => Ok(row),
        None => bail!("{table}: store returned no row"),
    }
}

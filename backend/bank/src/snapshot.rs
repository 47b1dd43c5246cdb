//! # Catalog
//!
//! Everything the public pages list: resources, approved and pending notes,
//! videos and playlists. Held in memory by the server and refreshed from the
//! store on an interval.
//!
//! ## Ordering
//! - Every list is kept newest first (`created_at` descending)
//! - Store queries already ask for that order, [`Catalog::sort`] enforces it
//!   for snapshots and in-memory inserts
//!
//! ## Snapshot
//! - JSON copy of the catalog on disk, written by `process snapshot`
//! - Read by the server when the store cannot be reached at startup
use std::{fs, path::Path};

use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
    models::{PeerNote, Playlist, Resource, Video},
    remote::{NEWEST_FIRST, PEER_NOTES, PLAYLISTS, RESOURCES, StoreClient, VIDEOS},
    rows::{PeerNoteRow, PlaylistRow, ResourceRow, RowError, VideoRow},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub resources: Vec<Resource>,
    pub notes: Vec<PeerNote>,
    pub videos: Vec<Video>,
    pub playlists: Vec<Playlist>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Rows that survived conversion plus how many were dropped.
pub struct Fetched<M> {
    pub items: Vec<M>,
    pub skipped: usize,
}

pub fn convert_rows<R, M>(table: &str, rows: Vec<R>) -> Fetched<M>
where
    M: TryFrom<R, Error = RowError>,
{
    let mut skipped = 0;
    let items = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            M::try_from(row)
                .map_err(|e| {
                    warn!("Skipping {table} row {index}: {e}");
                    skipped += 1;
                })
                .ok()
        })
        .collect();

    Fetched { items, skipped }
}

pub async fn fetch_table<R, M>(store: &StoreClient, table: &str) -> Result<Fetched<M>, Error>
where
    R: DeserializeOwned,
    M: TryFrom<R, Error = RowError>,
{
    let rows: Vec<R> = store.select(table, &[NEWEST_FIRST]).await?;
    Ok(convert_rows(table, rows))
}

impl Catalog {
    pub async fn fetch(store: &StoreClient) -> Result<Self, Error> {
        let (resources, notes, videos, playlists) = tokio::try_join!(
            fetch_table::<ResourceRow, Resource>(store, RESOURCES),
            fetch_table::<PeerNoteRow, PeerNote>(store, PEER_NOTES),
            fetch_table::<VideoRow, Video>(store, VIDEOS),
            fetch_table::<PlaylistRow, Playlist>(store, PLAYLISTS),
        )?;

        let mut catalog = Self {
            resources: resources.items,
            notes: notes.items,
            videos: videos.items,
            playlists: playlists.items,
            fetched_at: Some(Utc::now()),
        };
        catalog.sort();

        Ok(catalog)
    }

    pub fn read(path: &Path) -> Result<Self, Error> {
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut catalog: Self =
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        catalog.sort();

        Ok(catalog)
    }

    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).with_context(|| format!("writing {}", path.display()))
    }

    /// Stable, so equal timestamps keep their fetched order.
    pub fn sort(&mut self) {
        self.resources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn note(&self, id: &str) -> Option<&PeerNote> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn video(&self, id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == id)
    }

    pub fn approved_notes(&self) -> Vec<PeerNote> {
        self.notes.iter().filter(|n| n.approved).cloned().collect()
    }

    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.retain(|r| r.id != resource.id);
        self.resources.insert(0, resource);
        self.resources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    pub fn remove_resource(&mut self, id: &str) -> bool {
        let before = self.resources.len();
        self.resources.retain(|r| r.id != id);
        before != self.resources.len()
    }

    pub fn upsert_note(&mut self, note: PeerNote) {
        self.notes.retain(|n| n.id != note.id);
        self.notes.insert(0, note);
        self.notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    pub fn remove_note(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        before != self.notes.len()
    }

    pub fn add_video(&mut self, video: Video) {
        self.videos.retain(|v| v.id != video.id);
        self.videos.insert(0, video);
        self.videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    pub fn remove_video(&mut self, id: &str) -> bool {
        let before = self.videos.len();
        self.videos.retain(|v| v.id != id);
        before != self.videos.len()
    }

    pub fn add_playlist(&mut self, playlist: Playlist) {
        self.playlists.retain(|p| p.id != playlist.id);
        self.playlists.insert(0, playlist);
        self.playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

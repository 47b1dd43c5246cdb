//! # Operator Tasks
//!
//! Offline chores run by hand or from a cron job, outside the server.
//!
//! ## Snapshot
//! Pulls the four catalog tables from the store and writes them as one JSON
//! file. The server reads that file when the store is unreachable at boot, so
//! run it after bulk uploads.
//!
//! - Tables are fetched one by one behind a progress bar
//! - Rows that do not convert are skipped and counted, never fatal
//! - Lists are written newest first
//!
//! ## Password hashes
//! Admin accounts are seeded by inserting a row with a hash printed here.
use std::path::Path;

use anyhow::{Context, Error};
use bank::{
    Catalog, StoreClient,
    credentials,
    models::{PeerNote, Playlist, Resource, Video},
    remote::{PEER_NOTES, PLAYLISTS, RESOURCES, VIDEOS},
    rows::{PeerNoteRow, PlaylistRow, ResourceRow, VideoRow},
    snapshot::{Fetched, fetch_table},
};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

const TABLES: [&str; 4] = [RESOURCES, PEER_NOTES, VIDEOS, PLAYLISTS];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub kept: usize,
    pub skipped: usize,
}

impl TableReport {
    fn of<M>(table: &'static str, fetched: &Fetched<M>) -> Self {
        Self {
            table,
            kept: fetched.items.len(),
            skipped: fetched.skipped,
        }
    }

    pub fn line(&self) -> String {
        if self.skipped == 0 {
            format!("{:<16} {}", self.table, self.kept)
        } else {
            format!("{:<16} {} ({} skipped)", self.table, self.kept, self.skipped)
        }
    }
}

pub async fn write_snapshot(store_url: &str, store_key: &str, out: &Path) -> Result<(), Error> {
    let store = StoreClient::new(store_url, store_key)?;

    println!("Fetching catalog from {}\n", store.base_url());

    let pb = ProgressBar::new(TABLES.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut reports = Vec::with_capacity(TABLES.len());

    pb.set_message(format!("Fetching {RESOURCES}"));
    let resources = fetch_table::<ResourceRow, Resource>(&store, RESOURCES).await?;
    reports.push(TableReport::of(RESOURCES, &resources));
    pb.inc(1);

    pb.set_message(format!("Fetching {PEER_NOTES}"));
    let notes = fetch_table::<PeerNoteRow, PeerNote>(&store, PEER_NOTES).await?;
    reports.push(TableReport::of(PEER_NOTES, &notes));
    pb.inc(1);

    pb.set_message(format!("Fetching {VIDEOS}"));
    let videos = fetch_table::<VideoRow, Video>(&store, VIDEOS).await?;
    reports.push(TableReport::of(VIDEOS, &videos));
    pb.inc(1);

    pb.set_message(format!("Fetching {PLAYLISTS}"));
    let playlists = fetch_table::<PlaylistRow, Playlist>(&store, PLAYLISTS).await?;
    reports.push(TableReport::of(PLAYLISTS, &playlists));
    pb.inc(1);

    pb.finish_with_message("Done");

    let mut catalog = Catalog {
        resources: resources.items,
        notes: notes.items,
        videos: videos.items,
        playlists: playlists.items,
        fetched_at: Some(Utc::now()),
    };
    catalog.sort();

    println!();
    for report in &reports {
        println!("{}", report.line());
    }

    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    if skipped > 0 {
        println!("\n{skipped} rows could not be read and were left out");
    }

    catalog
        .write(out)
        .with_context(|| format!("Failed to write snapshot to {}", out.display()))?;
    println!("\nSnapshot written to {}", out.display());

    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    Ok(credentials::hash_password(password)?)
}

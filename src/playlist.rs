// 🎵 Playlist Source - ordered entries to be checked
// The streaming-service fetch lives outside this crate; anything that can
// hand over entries in track order implements PlaylistSource.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// PLAYLIST ENTRY
// ============================================================================

/// One track of the playlist, exactly as the ingestion step produced it.
///
/// `creator` is already the joined artist list ("A, B"). The resolver
/// compares it byte for byte, so no normalization happens here either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    #[serde(rename = "Track Name")]
    pub title: String,

    #[serde(rename = "Artists")]
    pub creator: String,

    /// Canonical track link, unique within one playlist
    #[serde(rename = "spotify_url")]
    pub reference: String,

    #[serde(rename = "Duration (ms)")]
    pub duration_ms: u64,

    /// Streaming-service track id; older exports may not carry it
    #[serde(default)]
    pub id: String,
}

impl PlaylistEntry {
    pub fn new(
        title: impl Into<String>,
        creator: impl Into<String>,
        reference: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        PlaylistEntry {
            title: title.into(),
            creator: creator.into(),
            reference: reference.into(),
            duration_ms,
            id: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Duration as `M:SS`
    pub fn duration_display(&self) -> String {
        format_duration(self.duration_ms)
    }
}

/// Format milliseconds as `M:SS`
pub fn format_duration(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Extract the playlist id from a `https://open.spotify.com/playlist/<id>` link
pub fn playlist_url_to_id(link: &str) -> Result<String> {
    let pattern = Regex::new(r"^https://open\.spotify\.com/playlist/([a-zA-Z0-9]+)")?;

    pattern
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            anyhow!(
                "Expected format: https://open.spotify.com/playlist/..., got {}",
                link
            )
        })
}

// ============================================================================
// SOURCES
// ============================================================================

/// PlaylistSource - anything that yields entries in native track order
pub trait PlaylistSource {
    /// Load every entry, preserving playlist order
    fn entries(&self) -> Result<Vec<PlaylistEntry>>;

    /// Human-readable origin for logs and summaries
    fn describe(&self) -> String;
}

/// Playlist export CSV (`Track Name`, `Artists`, `Duration (ms)`, `spotify_url`, optional `id`)
pub struct CsvPlaylistSource {
    path: PathBuf,
}

impl CsvPlaylistSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvPlaylistSource { path: path.into() }
    }
}

impl PlaylistSource for CsvPlaylistSource {
    fn entries(&self) -> Result<Vec<PlaylistEntry>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open playlist CSV: {}", self.path.display()))?;

        let mut entries = Vec::new();
        for (row, result) in reader.deserialize().enumerate() {
            let entry: PlaylistEntry = result.with_context(|| {
                format!(
                    "Failed to parse playlist line {} in {}",
                    row + 2,
                    self.path.display()
                )
            })?;
            entries.push(entry);
        }

        tracing::info!(
            source = %self.path.display(),
            entries = entries.len(),
            "loaded playlist"
        );
        Ok(entries)
    }

    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }
}

// ============================================================================
// TESTS
// ============================================================================

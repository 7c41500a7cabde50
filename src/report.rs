// 📋 Report Assembly - verdicts back onto the playlist, in playlist order
// Rows are never dropped or reordered; everything except the dance and the
// verdict is passed through from the entry (and the matched catalog row).

use crate::error::CheckError;
use crate::playlist::{format_duration, PlaylistEntry};
use crate::resolver::{CatalogAmbiguity, ResolvedAssignment};
use crate::schedule::Schedule;
use crate::validator::{ValidationReport, NO_CATEGORY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

// ============================================================================
// ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// 0-based playlist position
    pub index: usize,
    pub title: String,
    pub creator: String,
    pub reference: String,
    pub id: String,
    pub duration_ms: u64,
    pub category: Option<String>,
    pub valid_transition: bool,
    pub tags: Vec<String>,
    pub tempo: Option<String>,
    pub start_time: Option<String>,
}

impl ReportRow {
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(NO_CATEGORY)
    }

    pub fn duration_display(&self) -> String {
        format_duration(self.duration_ms)
    }

    pub fn is_resolved(&self) -> bool {
        self.category.is_some()
    }
}

/// Flat CSV shape of a row
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "index")]
    index: usize,
    #[serde(rename = "Track Name")]
    title: &'a str,
    #[serde(rename = "Artists")]
    creator: &'a str,
    #[serde(rename = "Duration (ms)")]
    duration_ms: u64,
    #[serde(rename = "Duration (min:sec)")]
    duration: String,
    #[serde(rename = "id")]
    id: &'a str,
    #[serde(rename = "spotify_url")]
    reference: &'a str,
    #[serde(rename = "Suggested Dance")]
    category: &'a str,
    #[serde(rename = "Valid Transition")]
    valid_transition: bool,
    #[serde(rename = "Tags")]
    tags: String,
    #[serde(rename = "BPM")]
    tempo: &'a str,
    #[serde(rename = "Start Time")]
    start_time: &'a str,
}

impl<'a> From<&'a ReportRow> for ExportRow<'a> {
    fn from(row: &'a ReportRow) -> Self {
        ExportRow {
            index: row.index,
            title: &row.title,
            creator: &row.creator,
            duration_ms: row.duration_ms,
            duration: row.duration_display(),
            id: &row.id,
            reference: &row.reference,
            category: row.category_label(),
            valid_transition: row.valid_transition,
            tags: row.tags.join(" "),
            tempo: row.tempo.as_deref().unwrap_or(""),
            start_time: row.start_time.as_deref().unwrap_or(""),
        }
    }
}

/// Merge entries, their assignments and the per-position verdicts.
/// All three must line up one to one.
pub fn assemble(
    entries: &[PlaylistEntry],
    assignments: &[ResolvedAssignment<'_>],
    verdicts: &[bool],
) -> Result<Vec<ReportRow>, CheckError> {
    if entries.len() != assignments.len() || entries.len() != verdicts.len() {
        return Err(CheckError::LengthMismatch {
            entries: entries.len(),
            assignments: assignments.len(),
            verdicts: verdicts.len(),
        });
    }

    let rows = entries
        .iter()
        .zip(assignments)
        .zip(verdicts)
        .enumerate()
        .map(|(index, ((entry, assignment), valid))| {
            let record = assignment.resolution.record();
            ReportRow {
                index,
                title: entry.title.clone(),
                creator: entry.creator.clone(),
                reference: entry.reference.clone(),
                id: entry.id.clone(),
                duration_ms: entry.duration_ms,
                category: assignment.category().map(str::to_string),
                valid_transition: *valid,
                tags: record.map(|r| r.tags.clone()).unwrap_or_default(),
                tempo: record.and_then(|r| r.tempo.clone()),
                start_time: None,
            }
        })
        .collect();

    Ok(rows)
}

/// Fill in start-time labels
pub fn apply_schedule(rows: &mut [ReportRow], schedule: &Schedule) {
    let durations: Vec<u64> = rows.iter().map(|r| r.duration_ms).collect();
    for (row, label) in rows.iter_mut().zip(schedule.annotate(&durations)) {
        row.start_time = label;
    }
}

// ============================================================================
// PLAYLIST REPORT
// ============================================================================

/// Everything a finished check run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistReport {
    pub rows: Vec<ReportRow>,
    pub validation: ValidationReport,
    pub ambiguities: Vec<CatalogAmbiguity>,
    pub policy_name: String,
    pub policy_fingerprint: String,
}

impl PlaylistReport {
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        self.write_rows(writer)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        tracing::info!(report = %path.display(), rows = self.rows.len(), "report written");
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_rows(csv::Writer::from_writer(&mut buffer))?;
        String::from_utf8(buffer).context("Report is not valid UTF-8")
    }

    fn write_rows<W: io::Write>(&self, mut writer: csv::Writer<W>) -> Result<()> {
        for row in &self.rows {
            writer.serialize(ExportRow::from(row))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn invalid_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| !r.valid_transition)
    }

    pub fn has_findings(&self) -> bool {
        !self.validation.is_clean()
    }

    /// Human-readable summary, one line per item
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let short_fingerprint: String = self.policy_fingerprint.chars().take(12).collect();
        lines.push(format!("Policy: {} ({})", self.policy_name, short_fingerprint));
        lines.push(self.validation.summary());

        lines.push(String::new());
        lines.push("Dance counts:".to_string());
        for (category, count) in &self.validation.counts {
            lines.push(format!("  {:<16} {:>3}", category, count));
        }

        if !self.validation.unresolved_positions.is_empty() {
            lines.push(String::new());
            lines.push("Entries without a dance:".to_string());
            for position in &self.validation.unresolved_positions {
                if let Some(row) = self.rows.get(position - 1) {
                    lines.push(format!("  #{} {} - {}", position, row.title, row.creator));
                }
            }
        }

        if !self.ambiguities.is_empty() {
            lines.push(String::new());
            lines.push("Catalog ambiguities:".to_string());
            for ambiguity in &self.ambiguities {
                lines.push(format!("  {}", ambiguity));
            }
        }

        if !self.validation.violations.is_empty() {
            lines.push(String::new());
            lines.push("Violations:".to_string());
            for message in self.validation.messages() {
                lines.push(format!("  {}", message));
            }
        }

        lines
    }
}

// ============================================================================
// TESTS
// ============================================================================

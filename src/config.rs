// ⚙️ Run Configuration
// One TOML file describes a check run; CLI flags override single fields.
//
//   playlist = "open-dancing-playlist.csv"
//   notes = "notes.md"
//   policy = "policy/open-dancing.json"   # optional, built-in policy otherwise
//   output = "open-dancing-report.csv"
//   reference_label = "Spotify"
//
//   [schedule]
//   start = "20:20"
//   interval_minutes = 15
//   break_before = 14
//   break_minutes = 5

use crate::resolver::DEFAULT_REFERENCE_LABEL;
use crate::schedule::DEFAULT_INTERVAL_MINUTES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub playlist: PathBuf,
    pub notes: PathBuf,
    pub policy: Option<PathBuf>,
    pub output: PathBuf,
    /// Link label in the notes that holds the playlist's track links
    pub reference_label: String,
    pub schedule: Option<ScheduleConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            playlist: PathBuf::from("open-dancing-playlist.csv"),
            notes: PathBuf::from("notes.md"),
            policy: None,
            output: PathBuf::from("open-dancing-report.csv"),
            reference_label: DEFAULT_REFERENCE_LABEL.to_string(),
            schedule: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// `HH:MM`
    pub start: String,

    #[serde(default = "default_interval")]
    pub interval_minutes: u32,

    /// 0-based index of the track that follows the pause
    #[serde(default)]
    pub break_before: Option<usize>,

    #[serde(default)]
    pub break_minutes: u32,
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

impl RunConfig {
    /// Load a config file. Relative paths inside it are taken relative to the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let rebase = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        self.playlist = rebase(&self.playlist);
        self.notes = rebase(&self.notes);
        self.output = rebase(&self.output);
        self.policy = self.policy.as_deref().map(rebase);
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

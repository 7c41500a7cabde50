// 🎶 Check Run - playlist in, annotated report out
//
//   config → playlist → catalog → policy → resolve → validate → assemble → schedule → CSV
//
// Every stage is synchronous and runs once. The first fatal error (conflict,
// malformed catalog, bad policy, I/O) stops the run; findings never do.

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::playlist::{CsvPlaylistSource, PlaylistEntry, PlaylistSource};
use crate::policy::Policy;
use crate::report::{self, PlaylistReport};
use crate::resolver::CategoryResolver;
use crate::schedule::Schedule;
use crate::validator::SequenceValidator;
use anyhow::Result;

/// Everything a run reads before it starts checking
#[derive(Debug, Clone)]
pub struct CheckInputs {
    pub entries: Vec<PlaylistEntry>,
    pub catalog: Catalog,
    pub policy: Policy,
    pub schedule: Option<Schedule>,
}

pub struct CheckRun {
    config: RunConfig,
}

impl CheckRun {
    pub fn new(config: RunConfig) -> Self {
        CheckRun { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Policy file from the config, or the built-in one
    pub fn load_policy(&self) -> Result<Policy> {
        match &self.config.policy {
            Some(path) => Policy::from_file(path),
            None => {
                tracing::info!("using built-in policy");
                Policy::builtin()
            }
        }
    }

    pub fn load_inputs(&self) -> Result<CheckInputs> {
        let source = CsvPlaylistSource::new(&self.config.playlist);
        tracing::info!(source = %source.describe(), "reading playlist");
        let entries = source.entries()?;
        let catalog = Catalog::load(&self.config.notes)?;
        let policy = self.load_policy()?;
        let schedule = self
            .config
            .schedule
            .as_ref()
            .map(Schedule::from_config)
            .transpose()?;

        Ok(CheckInputs {
            entries,
            catalog,
            policy,
            schedule,
        })
    }

    /// Check without writing anything
    pub fn evaluate(&self) -> Result<PlaylistReport> {
        let inputs = self.load_inputs()?;
        check_playlist(
            &inputs.entries,
            &inputs.catalog,
            &inputs.policy,
            &self.config.reference_label,
            inputs.schedule.as_ref(),
        )
    }

    /// Full run: check, then write the report CSV to the configured output
    pub fn execute(&self) -> Result<PlaylistReport> {
        let report = self.evaluate()?;
        report.write_csv(&self.config.output)?;
        Ok(report)
    }
}

/// The core check over already-loaded inputs
pub fn check_playlist(
    entries: &[PlaylistEntry],
    catalog: &Catalog,
    policy: &Policy,
    reference_label: &str,
    schedule: Option<&Schedule>,
) -> Result<PlaylistReport> {
    let resolver = CategoryResolver::with_reference_label(catalog, reference_label);
    let assignments = resolver.resolve_all(entries)?;

    let validation = SequenceValidator::new(policy).validate_assignments(&assignments);
    tracing::info!(summary = %validation.summary(), "validation finished");

    let mut rows = report::assemble(entries, &assignments, &validation.verdicts)?;
    if let Some(schedule) = schedule {
        report::apply_schedule(&mut rows, schedule);
    }

    Ok(PlaylistReport {
        rows,
        validation,
        ambiguities: resolver.ambiguities().to_vec(),
        policy_name: policy.name.clone(),
        policy_fingerprint: policy.fingerprint()?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use std::fs;
    use std::path::Path;

    const NOTES: &str = "\
# Dance notes

### Waltz

| Song | Artist | Links | Tags | BPM |
|------|--------|-------|------|-----|
| Moon River | Andy Williams | [Spotify](https://open.spotify.com/track/w1) | #slow | 84 |

### Tango

| Song | Artist | Links | Tags |
|------|--------|-------|------|
| Por una Cabeza | Carlos Gardel | [Spotify](https://open.spotify.com/track/t1) | #classic |

### Jive

| Song | Artist | Links |
|------|--------|-------|
| Hound Dog | Elvis Presley | [Spotify](https://open.spotify.com/track/j1) |
";

    const PLAYLIST: &str = "\
Track Name,Artists,Duration (ms),spotify_url
Moon River,Andy Williams,163000,https://open.spotify.com/track/w1
Por una Cabeza,Carlos Gardel,150000,https://open.spotify.com/track/t1
Hound Dog,Elvis Presley,136000,https://open.spotify.com/track/j1
Unknown Song,Nobody,180000,https://open.spotify.com/track/x
";

    const POLICY: &str = r#"{
        "name": "tiny",
        "anchor": "Waltz",
        "transitions": {
            "Waltz": ["Tango"],
            "Tango": ["Waltz", "Jive"],
            "Jive": ["Waltz"]
        },
        "frequency": {
            "Jive": { "kind": "at_most", "max": 2 },
            "Tango": { "kind": "exactly_once" }
        }
    }"#;

    fn write_fixtures(dir: &Path, playlist: &str) -> RunConfig {
        fs::write(dir.join("playlist.csv"), playlist).unwrap();
        fs::write(dir.join("notes.md"), NOTES).unwrap();
        fs::write(dir.join("policy.json"), POLICY).unwrap();

        RunConfig {
            playlist: dir.join("playlist.csv"),
            notes: dir.join("notes.md"),
            policy: Some(dir.join("policy.json")),
            output: dir.join("report.csv"),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_execute_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixtures(dir.path(), PLAYLIST);
        let output = config.output.clone();

        let report = CheckRun::new(config).execute().unwrap();

        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.policy_name, "tiny");
        assert_eq!(report.policy_fingerprint.len(), 64);
        assert_eq!(report.validation.verdicts, vec![true, true, true, false]);
        assert_eq!(report.validation.block_count, 1);
        assert_eq!(report.validation.unresolved_positions, vec![4]);
        assert_eq!(report.rows[0].tempo.as_deref(), Some("84"));
        assert_eq!(report.rows[3].category, None);
        assert!(report.has_findings());

        let mut reader = csv::Reader::from_path(&output).unwrap();
        assert_eq!(reader.records().count(), 4);
    }

    #[test]
    fn test_frequency_findings_do_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let playlist = "\
Track Name,Artists,Duration (ms),spotify_url
Moon River,Andy Williams,163000,https://open.spotify.com/track/w1
Por una Cabeza,Carlos Gardel,150000,https://open.spotify.com/track/t1
Moon River,Andy Williams,163000,https://open.spotify.com/track/w1
Por una Cabeza,Carlos Gardel,150000,https://open.spotify.com/track/t1
";
        let config = write_fixtures(dir.path(), playlist);

        let report = CheckRun::new(config).evaluate().unwrap();

        assert!(report.validation.verdicts.iter().all(|v| *v));
        assert_eq!(
            report.validation.messages(),
            vec!["Tango should be played exactly once, found 2".to_string()]
        );
    }

    #[test]
    fn test_conflict_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        // Tango's link with the Waltz's title and artist
        let playlist = "\
Track Name,Artists,Duration (ms),spotify_url
Moon River,Andy Williams,163000,https://open.spotify.com/track/t1
";
        let config = write_fixtures(dir.path(), playlist);
        let output = config.output.clone();

        let err = CheckRun::new(config).execute().unwrap_err();

        match err.downcast_ref::<CheckError>() {
            Some(CheckError::ResolutionConflict {
                by_reference,
                by_attributes,
                ..
            }) => {
                assert_eq!(by_reference, "Tango");
                assert_eq!(by_attributes, "Waltz");
            }
            other => panic!("expected a resolution conflict, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_builtin_policy_when_none_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixtures(dir.path(), PLAYLIST);
        config.policy = None;

        let run = CheckRun::new(config);
        let policy = run.load_policy().unwrap();

        assert_eq!(policy.name, "open-dancing");
        assert_eq!(policy.anchor, "Waltz");
    }

    #[test]
    fn test_schedule_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixtures(dir.path(), PLAYLIST);
        config.schedule = Some(crate::config::ScheduleConfig {
            start: "20:20".to_string(),
            interval_minutes: 15,
            break_before: None,
            break_minutes: 0,
        });

        let report = CheckRun::new(config).evaluate().unwrap();

        assert_eq!(report.rows[0].start_time.as_deref(), Some("20:20"));
        assert_eq!(report.rows[1].start_time, None);
    }

    #[test]
    fn test_missing_playlist_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixtures(dir.path(), PLAYLIST);
        config.playlist = dir.path().join("missing.csv");

        let err = CheckRun::new(config).evaluate().unwrap_err();
        assert!(err.to_string().contains("Failed to open playlist CSV"));
    }

    #[test]
    fn test_check_playlist_in_memory() {
        let catalog = Catalog::from_records(vec![crate::catalog::CategoryRecord::new(
            "Waltz", "A", "B",
        )]);
        let policy = Policy::builtin().unwrap();
        let entries = vec![PlaylistEntry::new("A", "B", "ref", 1000)];

        let report = check_playlist(&entries, &catalog, &policy, "Spotify", None).unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.validation.count("Waltz"), 1);
    }
}

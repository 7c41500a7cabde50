// Open Dancing - Core Library
// Playlist → dance resolution → ordering/frequency validation → annotated report.
// Used by the CLI and by tests.

pub mod error;
pub mod config;
pub mod playlist;
pub mod notes;
pub mod catalog;
pub mod resolver;
pub mod policy;
pub mod validator;
pub mod schedule;
pub mod report;
pub mod check;

// Terminal browser, only with the TUI feature
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use error::CheckError;
pub use config::{RunConfig, ScheduleConfig};
pub use playlist::{
    PlaylistEntry, PlaylistSource, CsvPlaylistSource,
    format_duration, playlist_url_to_id,
};
pub use notes::{CategoryTable, NotesParser};
pub use catalog::{Catalog, CategoryRecord};
pub use resolver::{
    CategoryResolver, Resolution, ResolvedAssignment, CatalogAmbiguity, AmbiguousKey,
};
pub use policy::{Policy, TransitionGraph, FrequencyRule};
pub use validator::{
    SequenceValidator, ValidationReport, Violation, FrequencyProblem, NO_CATEGORY,
};
pub use schedule::Schedule;
pub use report::{PlaylistReport, ReportRow};
pub use check::{CheckRun, CheckInputs, check_playlist};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ❌ Fatal error conditions
// Anything here aborts a run. Violations are data, see validator.rs.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Link lookup and title/artist lookup disagree for one entry
    #[error(
        "conflicting categories for \"{title}\" by {creator} ({reference}): \
         link matches {by_reference}, title and artist match {by_attributes}"
    )]
    ResolutionConflict {
        title: String,
        creator: String,
        reference: String,
        by_reference: String,
        by_attributes: String,
    },

    /// A category table lacks a column every row needs
    #[error("category table \"{table}\" is missing required column \"{column}\"")]
    MalformedCatalog { table: String, column: String },

    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    #[error(
        "cannot assemble report: {entries} entries, {assignments} assignments, {verdicts} verdicts"
    )]
    LengthMismatch {
        entries: usize,
        assignments: usize,
        verdicts: usize,
    },

    #[error("invalid schedule start time \"{value}\" (expected HH:MM)")]
    InvalidScheduleTime { value: String },
}

impl CheckError {
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        CheckError::InvalidPolicy {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_categories() {
        let err = CheckError::ResolutionConflict {
            title: "Quizás".to_string(),
            creator: "Orquesta".to_string(),
            reference: "https://open.spotify.com/track/abc".to_string(),
            by_reference: "Rumba".to_string(),
            by_attributes: "Jive".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("Rumba"));
        assert!(msg.contains("Jive"));
        assert!(msg.contains("https://open.spotify.com/track/abc"));
    }

    #[test]
    fn test_malformed_catalog_message() {
        let err = CheckError::MalformedCatalog {
            table: "Waltz".to_string(),
            column: "Artist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "category table \"Waltz\" is missing required column \"Artist\""
        );
    }
}

// 📚 Category Catalog - annotated songs, grouped by dance
// Built once from the notes, read-only afterwards. Passed by reference into
// the resolver; there is no global copy.

use crate::error::CheckError;
use crate::notes::{CategoryTable, NotesParser};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SONG_COLUMN: &str = "Song";
pub const ARTIST_COLUMN: &str = "Artist";
pub const LINKS_COLUMN: &str = "Links";
pub const TAGS_COLUMN: &str = "Tags";
pub const TEMPO_COLUMN: &str = "BPM";

const REQUIRED_COLUMNS: [&str; 2] = [SONG_COLUMN, ARTIST_COLUMN];

// ============================================================================
// CATEGORY RECORD
// ============================================================================

/// One annotated song: its matching attributes plus the dance it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Dance name, taken from the table heading
    pub category: String,

    pub title: String,
    pub creator: String,

    /// Link label → link, e.g. "Spotify" → "https://open.spotify.com/track/..."
    pub references: BTreeMap<String, String>,

    pub tags: Vec<String>,

    /// Reporting only
    pub tempo: Option<String>,
}

impl CategoryRecord {
    pub fn new(
        category: impl Into<String>,
        title: impl Into<String>,
        creator: impl Into<String>,
    ) -> Self {
        CategoryRecord {
            category: category.into(),
            title: title.into(),
            creator: creator.into(),
            references: BTreeMap::new(),
            tags: Vec::new(),
            tempo: None,
        }
    }

    pub fn with_reference(mut self, label: impl Into<String>, link: impl Into<String>) -> Self {
        self.references.insert(label.into(), link.into());
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tempo(mut self, tempo: impl Into<String>) -> Self {
        self.tempo = Some(tempo.into());
        self
    }

    pub fn reference(&self, label: &str) -> Option<&str> {
        self.references.get(label).map(|s| s.as_str())
    }
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CategoryRecord>,
}

impl Catalog {
    pub fn from_records(records: Vec<CategoryRecord>) -> Self {
        Catalog { records }
    }

    /// Type the raw notes tables. Every table must carry `Song` and `Artist`;
    /// `Links`, `Tags` and `BPM` are optional.
    pub fn from_tables(tables: &[CategoryTable], parser: &NotesParser) -> Result<Self, CheckError> {
        let mut records = Vec::new();

        for table in tables {
            for column in REQUIRED_COLUMNS {
                if table.column(column).is_none() {
                    return Err(CheckError::MalformedCatalog {
                        table: table.name.clone(),
                        column: column.to_string(),
                    });
                }
            }

            let song = table.column(SONG_COLUMN);
            let artist = table.column(ARTIST_COLUMN);
            let links = table.column(LINKS_COLUMN);
            let tags = table.column(TAGS_COLUMN);
            let tempo = table.column(TEMPO_COLUMN);

            for row in 0..table.rows.len() {
                let title = cell_at(table, row, song);
                let creator = cell_at(table, row, artist);

                if title.is_empty() && creator.is_empty() {
                    tracing::debug!(table = %table.name, row, "skipping blank catalog row");
                    continue;
                }

                let tempo_value = cell_at(table, row, tempo);
                records.push(CategoryRecord {
                    category: table.name.clone(),
                    title: title.to_string(),
                    creator: creator.to_string(),
                    references: parser.parse_links(cell_at(table, row, links)),
                    tags: parser.extract_tags(cell_at(table, row, tags)),
                    tempo: (!tempo_value.is_empty()).then(|| tempo_value.to_string()),
                });
            }
        }

        Ok(Catalog { records })
    }

    /// Parse a notes file and build the catalog from it
    pub fn load(path: &Path) -> Result<Self> {
        let parser = NotesParser::new()?;
        let tables = parser.parse_file(path)?;
        let catalog = Catalog::from_tables(&tables, &parser)?;

        tracing::info!(
            records = catalog.len(),
            categories = catalog.categories().len(),
            "catalog ready"
        );
        Ok(catalog)
    }

    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct category names, in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.category.as_str()) {
                seen.push(&record.category);
            }
        }
        seen
    }

    pub fn records_for<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a CategoryRecord> {
        self.records.iter().filter(move |r| r.category == category)
    }
}

fn cell_at(table: &CategoryTable, row: usize, column: Option<usize>) -> &str {
    column.map(|c| table.cell(row, c)).unwrap_or("")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, headers: &[&str], rows: &[&[&str]]) -> CategoryTable {
        CategoryTable::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_from_tables_builds_typed_records() {
        let parser = NotesParser::new().unwrap();
        let tables = vec![table(
            "Waltz",
            &["Song", "Artist", "Links", "Tags", "BPM"],
            &[&[
                "Moon River",
                "Andy Williams",
                "[Spotify](https://open.spotify.com/track/w1)",
                "#slow #classic",
                "84",
            ]],
        )];

        let catalog = Catalog::from_tables(&tables, &parser).unwrap();
        let record = &catalog.records()[0];

        assert_eq!(catalog.len(), 1);
        assert_eq!(record.category, "Waltz");
        assert_eq!(record.title, "Moon River");
        assert_eq!(record.creator, "Andy Williams");
        assert_eq!(record.reference("Spotify"), Some("https://open.spotify.com/track/w1"));
        assert_eq!(record.tags, vec!["#slow", "#classic"]);
        assert_eq!(record.tempo.as_deref(), Some("84"));
    }

    #[test]
    fn test_optional_columns_may_be_missing() {
        let parser = NotesParser::new().unwrap();
        let tables = vec![table("Tango", &["Artist", "Song"], &[&["Gotan Project", "Santa Maria"]])];

        let catalog = Catalog::from_tables(&tables, &parser).unwrap();
        let record = &catalog.records()[0];

        assert_eq!(record.title, "Santa Maria");
        assert_eq!(record.creator, "Gotan Project");
        assert!(record.references.is_empty());
        assert!(record.tags.is_empty());
        assert_eq!(record.tempo, None);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let parser = NotesParser::new().unwrap();
        let tables = vec![
            table("Waltz", &["Song", "Artist"], &[&["A", "B"]]),
            table("Jive", &["Song", "Links"], &[&["C", ""]]),
        ];

        let err = Catalog::from_tables(&tables, &parser).unwrap_err();
        assert_eq!(
            err,
            CheckError::MalformedCatalog {
                table: "Jive".to_string(),
                column: "Artist".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let parser = NotesParser::new().unwrap();
        let tables = vec![table("Samba", &["Song", "Artist", "Tags"], &[&["", "", "#x"], &["Mas Que Nada", "Sergio Mendes", ""]])];

        let catalog = Catalog::from_tables(&tables, &parser).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records()[0].title, "Mas Que Nada");
    }

    #[test]
    fn test_categories_in_first_seen_order() {
        let catalog = Catalog::from_records(vec![
            CategoryRecord::new("Waltz", "A", "X"),
            CategoryRecord::new("Tango", "B", "Y"),
            CategoryRecord::new("Waltz", "C", "Z"),
        ]);

        assert_eq!(catalog.categories(), vec!["Waltz", "Tango"]);
        assert_eq!(catalog.records_for("Waltz").count(), 2);
        assert_eq!(catalog.records_for("Jive").count(), 0);
    }

    #[test]
    fn test_record_builders() {
        let record = CategoryRecord::new("Rumba", "Quizás", "Trio")
            .with_reference("Spotify", "https://s/1")
            .with_tags(["#latin"])
            .with_tempo("100");

        assert_eq!(record.reference("Spotify"), Some("https://s/1"));
        assert_eq!(record.reference("YouTube"), None);
        assert_eq!(record.tags, vec!["#latin"]);
        assert_eq!(record.tempo.as_deref(), Some("100"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(
            &path,
            "### Jive\n\n| Song | Artist | Links | Tags |\n|---|---|---|---|\n| Hound Dog | Elvis Presley | [Spotify](https://s/j1) | #rock |\n",
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records()[0].category, "Jive");
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "### Jive\n\n| Title | Artist |\n|---|---|\n| A | B |\n").unwrap();

        let err = Catalog::load(&path).unwrap_err();
        assert!(err.to_string().contains("missing required column \"Song\""));
    }
}

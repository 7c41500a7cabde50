// 📝 Notes Parser - markdown notes → raw category tables
//
// Notes layout:
//   ### Waltz
//   | Song | Artist | Links | Tags | BPM |
//   |------|--------|-------|------|-----|
//   | Moon River | Andy Williams | [Spotify](https://...) | #slow #classic | 84 |
//
// Every level-3 heading names a category; the first pipe table after it
// belongs to that category. Tables without a pending heading are skipped.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// RAW TABLE
// ============================================================================

/// One category table as written in the notes, cells trimmed, nothing typed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    /// Heading text, used as the category name
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CategoryTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        CategoryTable {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Index of a header, exact match
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell value; short rows read as empty cells
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

// ============================================================================
// NOTES PARSER
// ============================================================================

pub struct NotesParser {
    link_pattern: Regex,
    tag_pattern: Regex,
}

impl NotesParser {
    pub fn new() -> Result<Self> {
        Ok(NotesParser {
            link_pattern: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)")?,
            tag_pattern: Regex::new(r"#\w[\w-]*")?,
        })
    }

    /// Read and parse a notes file
    pub fn parse_file(&self, path: &Path) -> Result<Vec<CategoryTable>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read notes file: {}", path.display()))?;

        let tables = self.parse(&content);
        tracing::info!(
            notes = %path.display(),
            tables = tables.len(),
            "parsed category tables"
        );
        Ok(tables)
    }

    /// Split a markdown document into its headed tables, in document order
    pub fn parse(&self, markdown: &str) -> Vec<CategoryTable> {
        let mut tables = Vec::new();
        let mut pending_heading: Option<String> = None;
        let mut table_lines: Vec<&str> = Vec::new();
        let mut in_fence = false;

        let lines: Vec<&str> = markdown.lines().map(str::trim).collect();

        for (index, trimmed) in lines.iter().copied().enumerate() {
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                flush_table(&mut table_lines, &mut pending_heading, &mut tables);
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            // outer pipes are optional; a table starts at a header row that
            // is followed by a matching delimiter row
            let continues_table = !table_lines.is_empty() && trimmed.contains('|');
            let starts_table = table_lines.is_empty()
                && lines
                    .get(index + 1)
                    .is_some_and(|next| is_header_pair(trimmed, next));
            if continues_table || starts_table {
                table_lines.push(trimmed);
                continue;
            }

            flush_table(&mut table_lines, &mut pending_heading, &mut tables);

            if let Some(heading) = level_three_heading(trimmed) {
                pending_heading = Some(heading);
            }
        }
        flush_table(&mut table_lines, &mut pending_heading, &mut tables);

        tables
    }

    /// `[label](url)` pairs → label → url. Later duplicates of a label win.
    pub fn parse_links(&self, text: &str) -> BTreeMap<String, String> {
        self.link_pattern
            .captures_iter(text)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect()
    }

    /// Tags like `#latin`, `#cha-cha-2`, in order of appearance
    pub fn extract_tags(&self, text: &str) -> Vec<String> {
        self.tag_pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

fn level_three_heading(line: &str) -> Option<String> {
    let rest = line.strip_prefix("###")?;
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t')) {
        return None;
    }

    // optional closing sequence: "### Waltz ###"
    let text = rest.trim().trim_end_matches('#').trim();
    Some(text.to_string())
}

fn flush_table<'a>(
    lines: &mut Vec<&'a str>,
    pending_heading: &mut Option<String>,
    tables: &mut Vec<CategoryTable>,
) {
    if lines.is_empty() {
        return;
    }
    let block = std::mem::take(lines);

    // header row + delimiter row, otherwise it is just text with pipes
    if block.len() < 2 || !is_delimiter_row(block[1]) {
        return;
    }

    let headers = split_row(block[0]);
    let rows: Vec<Vec<String>> = block[2..].iter().map(|line| split_row(line)).collect();

    match pending_heading.take() {
        Some(name) => tables.push(CategoryTable::new(name, headers, rows)),
        None => tracing::debug!(?headers, "skipping table without a category heading"),
    }
}

fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = if inner.ends_with('|') && !inner.ends_with("\\|") {
        &inner[..inner.len() - 1]
    } else {
        inner
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    cells
}

fn is_header_pair(header: &str, delimiter: &str) -> bool {
    header.contains('|')
        && delimiter.contains('|')
        && is_delimiter_row(delimiter)
        && split_row(header).len() == split_row(delimiter).len()
}

fn is_delimiter_row(line: &str) -> bool {
    let cells = split_row(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let body = cell.trim_start_matches(':').trim_end_matches(':');
            !body.is_empty() && body.chars().all(|c| c == '-')
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NOTES: &str = "\
# Open Dancing notes

Some intro text.

### Waltz

| Song | Artist | Links | Tags | BPM |
|------|--------|-------|------|-----|
| Moon River | Andy Williams | [Spotify](https://open.spotify.com/track/w1) | #slow #classic | 84 |
| Kiss from a Rose | Seal | | #pop | 87 |

### Cha Cha

| Song | Artist | Links | Tags |
|:-----|:------:|------:|------|
| Sway | Michael Bublé | [Spotify](https://open.spotify.com/track/c1) [YouTube](https://youtu.be/c1) | #latin |

| Orphan | Table |
|--------|-------|
| x | y |
";

    #[test]
    fn test_parse_headed_tables() {
        let parser = NotesParser::new().unwrap();
        let tables = parser.parse(NOTES);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "Waltz");
        assert_eq!(tables[0].headers, vec!["Song", "Artist", "Links", "Tags", "BPM"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1][0], "Kiss from a Rose");
        assert_eq!(tables[0].rows[1][2], "");

        assert_eq!(tables[1].name, "Cha Cha");
        assert_eq!(tables[1].rows[0][1], "Michael Bublé");
    }

    #[test]
    fn test_table_without_heading_is_skipped() {
        let parser = NotesParser::new().unwrap();
        let tables = parser.parse(NOTES);

        assert!(tables.iter().all(|t| t.name != "Orphan"));
        assert!(tables.iter().all(|t| !t.headers.contains(&"Orphan".to_string())));
    }

    #[test]
    fn test_only_first_table_after_heading_counts() {
        let parser = NotesParser::new().unwrap();
        let md = "### Tango\n\n| Song | Artist |\n|---|---|\n| A | B |\n\ntext\n\n| Song | Artist |\n|---|---|\n| C | D |\n";
        let tables = parser.parse(md);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn test_other_heading_levels_do_not_name_tables() {
        let parser = NotesParser::new().unwrap();
        let md = "## Standard\n\n| Song | Artist |\n|---|---|\n| A | B |\n\n#### Detail\n\n| Song | Artist |\n|---|---|\n| C | D |\n";
        assert!(parser.parse(md).is_empty());
    }

    #[test]
    fn test_fenced_code_is_ignored() {
        let parser = NotesParser::new().unwrap();
        let md = "### Jive\n```\n| Song | Artist |\n|---|---|\n| In | Fence |\n```\n| Song | Artist |\n|---|---|\n| Real | Row |\n";
        let tables = parser.parse(md);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0][0], "Real");
    }

    #[test]
    fn test_closing_hashes_and_escaped_pipes() {
        let parser = NotesParser::new().unwrap();
        let md = "### Samba ###\n| Song | Artist |\n|---|---|\n| A \\| B | C |\n";
        let tables = parser.parse(md);

        assert_eq!(tables[0].name, "Samba");
        assert_eq!(tables[0].rows[0][0], "A | B");
    }

    #[test]
    fn test_pipe_text_without_delimiter_is_not_a_table() {
        let parser = NotesParser::new().unwrap();
        let md = "### Rumba\n| just | text |\n\n| Song | Artist |\n|---|---|\n| A | B |\n";
        let tables = parser.parse(md);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "Rumba");
        assert_eq!(tables[0].headers, vec!["Song", "Artist"]);
    }

    #[test]
    fn test_table_without_outer_pipes() {
        let parser = NotesParser::new().unwrap();
        let md = "### Waltz\n\nSong | Artist\n--- | ---\nMoon River | Andy Williams\nKiss from a Rose | Seal\n";
        let tables = parser.parse(md);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "Waltz");
        assert_eq!(tables[0].headers, vec!["Song", "Artist"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[0], vec!["Moon River".to_string(), "Andy Williams".to_string()]);
    }

    #[test]
    fn test_delimiter_must_match_header_width() {
        let parser = NotesParser::new().unwrap();
        let md = "### Tango\nSong | Artist | Links\n--- | ---\nA | B | C\n";
        assert!(parser.parse(md).is_empty());

        // a lone rule under a line of text is not a table either
        let md = "### Tango\nSong | Artist\n---\n";
        assert!(parser.parse(md).is_empty());
    }

    #[test]
    fn test_parse_links() {
        let parser = NotesParser::new().unwrap();
        let links = parser.parse_links(
            "[Spotify](https://open.spotify.com/track/c1) [YouTube](https://youtu.be/c1)",
        );

        assert_eq!(links.len(), 2);
        assert_eq!(links["Spotify"], "https://open.spotify.com/track/c1");
        assert_eq!(links["YouTube"], "https://youtu.be/c1");
    }

    #[test]
    fn test_parse_links_later_label_wins() {
        let parser = NotesParser::new().unwrap();
        let links = parser.parse_links("[Spotify](https://a) [Spotify](https://b)");
        assert_eq!(links["Spotify"], "https://b");
    }

    #[test]
    fn test_extract_tags() {
        let parser = NotesParser::new().unwrap();
        let tags = parser.extract_tags("#slow, #cha-cha-2 and # not-a-tag #x");
        assert_eq!(tags, vec!["#slow", "#cha-cha-2", "#x"]);
    }

    #[test]
    fn test_table_cell_access() {
        let table = CategoryTable::new(
            "Waltz",
            vec!["Song".to_string(), "Artist".to_string()],
            vec![vec!["Only song".to_string()]],
        );

        assert_eq!(table.column("Artist"), Some(1));
        assert_eq!(table.column("Links"), None);
        assert_eq!(table.cell(0, 0), "Only song");
        assert_eq!(table.cell(0, 1), "");
        assert_eq!(table.cell(5, 0), "");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, NOTES).unwrap();

        let parser = NotesParser::new().unwrap();
        let tables = parser.parse_file(&path).unwrap();
        assert_eq!(tables.len(), 2);
    }
}

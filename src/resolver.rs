// 🔎 Category Resolver - which dance is this track?
//
// Two independent keys:
//   1. Reference: catalog link with the configured label == entry link
//   2. Attributes: (title, creator) == (title, creator), byte for byte
//
// Both indexes are built once; each lookup is a pair of hash probes.
// If both keys hit and name different dances the run stops.

use crate::catalog::{Catalog, CategoryRecord};
use crate::error::{CheckError, Result};
use crate::playlist::PlaylistEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Link label used when none is configured
pub const DEFAULT_REFERENCE_LABEL: &str = "Spotify";

// ============================================================================
// RESOLUTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved(&'a CategoryRecord),
    Unresolved,
}

impl<'a> Resolution<'a> {
    pub fn category(&self) -> Option<&'a str> {
        match self {
            Resolution::Resolved(record) => Some(record.category.as_str()),
            Resolution::Unresolved => None,
        }
    }

    pub fn record(&self) -> Option<&'a CategoryRecord> {
        match self {
            Resolution::Resolved(record) => Some(record),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// A playlist entry paired with what the catalog says about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAssignment<'a> {
    pub entry: &'a PlaylistEntry,
    pub resolution: Resolution<'a>,
}

impl<'a> ResolvedAssignment<'a> {
    pub fn category(&self) -> Option<&'a str> {
        self.resolution.category()
    }
}

/// Which lookup key collided inside the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmbiguousKey {
    Reference(String),
    Attributes { title: String, creator: String },
}

/// Two records of different dances share a lookup key. The first one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAmbiguity {
    pub key: AmbiguousKey,
    pub kept: String,
    pub ignored: String,
}

impl std::fmt::Display for CatalogAmbiguity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            AmbiguousKey::Reference(link) => write!(
                f,
                "link {} is listed under {} and {}; using {}",
                link, self.kept, self.ignored, self.kept
            ),
            AmbiguousKey::Attributes { title, creator } => write!(
                f,
                "\"{}\" by {} is listed under {} and {}; using {}",
                title, creator, self.kept, self.ignored, self.kept
            ),
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct CategoryResolver<'a> {
    reference_label: String,
    by_reference: HashMap<&'a str, &'a CategoryRecord>,
    by_attributes: HashMap<(&'a str, &'a str), &'a CategoryRecord>,
    ambiguities: Vec<CatalogAmbiguity>,
}

impl<'a> CategoryResolver<'a> {
    /// Index the catalog using the default link label
    pub fn new(catalog: &'a Catalog) -> Self {
        Self::with_reference_label(catalog, DEFAULT_REFERENCE_LABEL)
    }

    /// Index the catalog, matching links stored under `reference_label`
    pub fn with_reference_label(catalog: &'a Catalog, reference_label: &str) -> Self {
        let mut by_reference: HashMap<&'a str, &'a CategoryRecord> = HashMap::new();
        let mut by_attributes: HashMap<(&'a str, &'a str), &'a CategoryRecord> = HashMap::new();
        let mut ambiguities = Vec::new();

        for record in catalog.records() {
            if let Some(link) = record.reference(reference_label) {
                match by_reference.get(link) {
                    Some(kept) if kept.category != record.category => {
                        ambiguities.push(CatalogAmbiguity {
                            key: AmbiguousKey::Reference(link.to_string()),
                            kept: kept.category.clone(),
                            ignored: record.category.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        by_reference.insert(link, record);
                    }
                }
            }

            let key = (record.title.as_str(), record.creator.as_str());
            match by_attributes.get(&key) {
                Some(kept) if kept.category != record.category => {
                    ambiguities.push(CatalogAmbiguity {
                        key: AmbiguousKey::Attributes {
                            title: record.title.clone(),
                            creator: record.creator.clone(),
                        },
                        kept: kept.category.clone(),
                        ignored: record.category.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    by_attributes.insert(key, record);
                }
            }
        }

        for ambiguity in &ambiguities {
            tracing::warn!("catalog ambiguity: {}", ambiguity);
        }

        CategoryResolver {
            reference_label: reference_label.to_string(),
            by_reference,
            by_attributes,
            ambiguities,
        }
    }

    pub fn reference_label(&self) -> &str {
        &self.reference_label
    }

    /// Key collisions found while indexing
    pub fn ambiguities(&self) -> &[CatalogAmbiguity] {
        &self.ambiguities
    }

    /// Strategy 1: exact link match
    pub fn find_by_reference(&self, reference: &str) -> Option<&'a CategoryRecord> {
        self.by_reference.get(reference).copied()
    }

    /// Strategy 2: exact (title, creator) match
    pub fn find_by_attributes(&self, title: &str, creator: &str) -> Option<&'a CategoryRecord> {
        self.by_attributes.get(&(title, creator)).copied()
    }

    /// Resolve one entry. Pure: same entry, same catalog, same answer.
    pub fn resolve(&self, entry: &PlaylistEntry) -> Result<Resolution<'a>> {
        let via_reference = self.find_by_reference(&entry.reference);
        let via_attributes = self.find_by_attributes(&entry.title, &entry.creator);

        let resolution = match (via_reference, via_attributes) {
            (Some(by_ref), Some(by_attr)) if by_ref.category != by_attr.category => {
                return Err(CheckError::ResolutionConflict {
                    title: entry.title.clone(),
                    creator: entry.creator.clone(),
                    reference: entry.reference.clone(),
                    by_reference: by_ref.category.clone(),
                    by_attributes: by_attr.category.clone(),
                });
            }
            // same dance either way; the attribute row is the one describing this song
            (_, Some(record)) | (Some(record), None) => Resolution::Resolved(record),
            (None, None) => Resolution::Unresolved,
        };

        tracing::debug!(
            title = %entry.title,
            creator = %entry.creator,
            category = resolution.category().unwrap_or("-"),
            "resolved entry"
        );
        Ok(resolution)
    }

    /// Resolve a whole playlist in order. One assignment per entry, always;
    /// the first conflict aborts.
    pub fn resolve_all<'e>(&'e self, entries: &'e [PlaylistEntry]) -> Result<Vec<ResolvedAssignment<'e>>> {
        let mut assignments = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let resolution = self.resolve(entry).map_err(|err| {
                tracing::error!(position = index + 1, "{}", err);
                err
            })?;

            if !resolution.is_resolved() {
                tracing::warn!(
                    position = index + 1,
                    title = %entry.title,
                    creator = %entry.creator,
                    "no category found"
                );
            }

            assignments.push(ResolvedAssignment { entry, resolution });
        }

        Ok(assignments)
    }
}

// ============================================================================
// TESTS
// ============================================================================

// 🧭 Ordering Policy - Rules as Data
// Which dance may follow which, and how often each dance may appear.
// Loaded once from JSON, validated, then shared read-only by the validator.

use crate::error::CheckError;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Built-in open-dancing policy
const BUILTIN_POLICY: &str = include_str!("../policy/open-dancing.json");

// ============================================================================
// TRANSITION GRAPH
// ============================================================================

/// Dance → dances allowed to come right after it.
///
/// Cycles are expected: the evening repeats its block structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl TransitionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(from, to)` pairs; both ends become nodes
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut graph = TransitionGraph::new();
        for (from, to) in edges {
            let to = to.into();
            graph.edges.entry(to.clone()).or_default();
            graph.edges.entry(from.into()).or_default().insert(to);
        }
        graph
    }

    pub fn allows(&self, from: &str, to: &str) -> bool {
        self.edges
            .get(from)
            .map(|next| next.contains(to))
            .unwrap_or(false)
    }

    pub fn successors(&self, from: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(from)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.edges.contains_key(category)
    }

    /// Declared dances, sorted
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(|k| k.as_str())
    }

    /// Every permitted pair, sorted by source then target
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges
            .iter()
            .flat_map(|(from, next)| next.iter().map(move |to| (from.as_str(), to.as_str())))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|next| next.len()).sum()
    }
}

// ============================================================================
// FREQUENCY RULES
// ============================================================================

/// How often one dance may occur across the whole playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrequencyRule {
    ExactlyOnce,

    AtLeast {
        #[serde(default = "default_minimum")]
        min: usize,
    },

    AtMost { max: usize },

    /// Bounded by the number of blocks (anchor occurrences):
    /// at most ceil(blocks / 2), at least floor((blocks - 1) / 2)
    PerBlock,
}

fn default_minimum() -> usize {
    1
}

impl FrequencyRule {
    pub fn at_least_once() -> Self {
        FrequencyRule::AtLeast { min: 1 }
    }

    pub fn describe(&self) -> String {
        match self {
            FrequencyRule::ExactlyOnce => "exactly once".to_string(),
            FrequencyRule::AtLeast { min } => format!("at least {}", min),
            FrequencyRule::AtMost { max } => format!("at most {}", max),
            FrequencyRule::PerBlock => "about every other block".to_string(),
        }
    }
}

/// Most occurrences a per-block dance may have
pub fn per_block_ceiling(block_count: usize) -> usize {
    block_count.div_ceil(2)
}

/// Fewest occurrences a per-block dance may have
pub fn per_block_floor(block_count: usize) -> usize {
    block_count.saturating_sub(1) / 2
}

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default = "default_policy_name")]
    pub name: String,

    /// Dance that opens each block; its occurrences are the block count
    pub anchor: String,

    pub transitions: TransitionGraph,

    #[serde(default)]
    pub frequency: BTreeMap<String, FrequencyRule>,
}

fn default_policy_name() -> String {
    "unnamed".to_string()
}

impl Policy {
    /// Load and validate a policy JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read policy file: {:?}", path.as_ref()))?;

        let policy = Self::from_json_str(&content)
            .with_context(|| format!("Failed to load policy from {:?}", path.as_ref()))?;

        tracing::info!(
            policy = %policy.name,
            categories = policy.transitions.categories().count(),
            edges = policy.transitions.edge_count(),
            rules = policy.frequency.len(),
            "policy loaded"
        );
        Ok(policy)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: Policy = serde_json::from_str(json).context("Failed to parse policy JSON")?;
        policy.validate()?;
        Ok(policy)
    }

    /// The open-dancing policy shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_POLICY)
    }

    /// Every name the policy mentions must be a declared graph node
    pub fn validate(&self) -> Result<(), CheckError> {
        if !self.transitions.contains(&self.anchor) {
            return Err(CheckError::invalid_policy(format!(
                "anchor \"{}\" is not a category of the transition graph",
                self.anchor
            )));
        }

        for (from, to) in self.transitions.edges() {
            if !self.transitions.contains(to) {
                return Err(CheckError::invalid_policy(format!(
                    "\"{}\" may be followed by undeclared category \"{}\"",
                    from, to
                )));
            }
        }

        for category in self.frequency.keys() {
            if !self.transitions.contains(category) {
                return Err(CheckError::invalid_policy(format!(
                    "frequency rule for undeclared category \"{}\"",
                    category
                )));
            }
        }

        Ok(())
    }

    pub fn rule_for(&self, category: &str) -> Option<FrequencyRule> {
        self.frequency.get(category).copied()
    }

    /// SHA-256 of the canonical JSON form, hex encoded
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_string(self).context("Failed to serialize policy")?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize policy")
    }
}

// ============================================================================
// TESTS
// ============================================================================

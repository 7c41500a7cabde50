// ✅ Sequence Validator - does the dance order follow the policy?
//
// Two passes over one resolved sequence:
//   1. Transitions: position i is valid iff sequence[i] is an allowed
//      successor of sequence[i-1]. Position 0 is always valid.
//   2. Frequencies: per-dance counts (and the block count) against the rules.
//
// Violations are collected, never thrown. Validation never stops early.

use crate::policy::{per_block_ceiling, per_block_floor, FrequencyRule, Policy};
use crate::resolver::ResolvedAssignment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How an entry without a dance shows up in messages and exports
pub const NO_CATEGORY: &str = "(no category)";

// ============================================================================
// VIOLATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyProblem {
    NotExactlyOnce,
    TooFew { min: usize },
    TooMany { max: usize },
    TooFrequent { max: usize, blocks: usize },
    TooRare { min: usize, blocks: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    /// `position` is 1-based; `None` marks an entry without a dance
    Transition {
        position: usize,
        from: Option<String>,
        to: Option<String>,
    },
    Frequency {
        category: String,
        observed: usize,
        problem: FrequencyProblem,
    },
}

impl Violation {
    pub fn is_transition(&self) -> bool {
        matches!(self, Violation::Transition { .. })
    }

    pub fn is_frequency(&self) -> bool {
        matches!(self, Violation::Frequency { .. })
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Violation::Transition { position, .. } => Some(*position),
            Violation::Frequency { .. } => None,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Violation::Frequency { category, .. } => Some(category),
            Violation::Transition { .. } => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Transition { position, from, to } => write!(
                f,
                "Invalid transition at position {}: {} -> {}",
                position,
                from.as_deref().unwrap_or(NO_CATEGORY),
                to.as_deref().unwrap_or(NO_CATEGORY)
            ),
            Violation::Frequency {
                category,
                observed,
                problem,
            } => match problem {
                FrequencyProblem::NotExactlyOnce => write!(
                    f,
                    "{} should be played exactly once, found {}",
                    category, observed
                ),
                FrequencyProblem::TooFew { min } => write!(
                    f,
                    "{} should be played at least {} time(s), found {}",
                    category, min, observed
                ),
                FrequencyProblem::TooMany { max } => write!(
                    f,
                    "{} should be played at most {} time(s), found {}",
                    category, max, observed
                ),
                FrequencyProblem::TooFrequent { max, blocks } => write!(
                    f,
                    "{} is too frequent: {} in {} blocks (at most {})",
                    category, observed, blocks, max
                ),
                FrequencyProblem::TooRare { min, blocks } => write!(
                    f,
                    "{} is too rare: {} in {} blocks (at least {})",
                    category, observed, blocks, min
                ),
            },
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Output of the transition pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionCheck {
    /// One verdict per input position
    pub verdicts: Vec<bool>,
    pub violations: Vec<Violation>,
    pub counts: BTreeMap<String, usize>,
    pub block_count: usize,
    /// 1-based positions of entries without a dance
    pub unresolved_positions: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub verdicts: Vec<bool>,
    pub counts: BTreeMap<String, usize>,
    /// Transition violations first, then frequency violations, each in discovery order
    pub violations: Vec<Violation>,
    pub block_count: usize,
    pub unresolved_positions: Vec<usize>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.unresolved_positions.is_empty()
    }

    pub fn transition_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_transition())
    }

    pub fn frequency_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_frequency())
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }

    pub fn count(&self, category: &str) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} entries, {} blocks, {} invalid transitions, {} frequency violations, {} unresolved",
            self.verdicts.len(),
            self.block_count,
            self.transition_violations().count(),
            self.frequency_violations().count(),
            self.unresolved_positions.len()
        )
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct SequenceValidator<'p> {
    policy: &'p Policy,
}

impl<'p> SequenceValidator<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        SequenceValidator { policy }
    }

    pub fn policy(&self) -> &Policy {
        self.policy
    }

    /// Walk the sequence against the transition graph.
    ///
    /// `None` is an entry without a dance. It counts toward nothing, and any
    /// step into or out of it is invalid.
    pub fn check_transitions(&self, sequence: &[Option<&str>]) -> TransitionCheck {
        let graph = &self.policy.transitions;
        let mut check = TransitionCheck {
            verdicts: Vec::with_capacity(sequence.len()),
            ..TransitionCheck::default()
        };

        for (index, current) in sequence.iter().enumerate() {
            let position = index + 1;

            match current {
                Some(category) => {
                    *check.counts.entry(category.to_string()).or_insert(0) += 1;
                    if *category == self.policy.anchor {
                        check.block_count += 1;
                    }
                }
                None => check.unresolved_positions.push(position),
            }

            if index == 0 {
                check.verdicts.push(true);
                continue;
            }

            let previous = sequence[index - 1];
            let valid = match (previous, *current) {
                (Some(from), Some(to)) => graph.allows(from, to),
                _ => false,
            };

            if !valid {
                let violation = Violation::Transition {
                    position,
                    from: previous.map(str::to_string),
                    to: current.map(str::to_string),
                };
                tracing::debug!("{}", violation);
                check.violations.push(violation);
            }
            check.verdicts.push(valid);
        }

        check
    }

    /// Evaluate every frequency rule of the policy
    pub fn check_frequencies(&self, counts: &BTreeMap<String, usize>, block_count: usize) -> Vec<Violation> {
        check_frequencies(counts, block_count, &self.policy.frequency)
    }

    /// Both passes over one sequence
    pub fn validate(&self, sequence: &[Option<&str>]) -> ValidationReport {
        let TransitionCheck {
            verdicts,
            mut violations,
            counts,
            block_count,
            unresolved_positions,
        } = self.check_transitions(sequence);

        violations.extend(self.check_frequencies(&counts, block_count));

        ValidationReport {
            verdicts,
            counts,
            violations,
            block_count,
            unresolved_positions,
        }
    }

    /// Validate a sequence where every entry has a dance
    pub fn validate_categories<S: AsRef<str>>(&self, categories: &[S]) -> ValidationReport {
        let sequence: Vec<Option<&str>> = categories.iter().map(|c| Some(c.as_ref())).collect();
        self.validate(&sequence)
    }

    /// Validate resolver output
    pub fn validate_assignments(&self, assignments: &[ResolvedAssignment<'_>]) -> ValidationReport {
        let sequence: Vec<Option<&str>> = assignments.iter().map(|a| a.category()).collect();
        self.validate(&sequence)
    }
}

/// Check observed counts against a rule table. Every rule is evaluated;
/// violations come out in category-name order.
pub fn check_frequencies(
    counts: &BTreeMap<String, usize>,
    block_count: usize,
    rules: &BTreeMap<String, FrequencyRule>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (category, rule) in rules {
        let observed = counts.get(category).copied().unwrap_or(0);
        let mut report = |problem: FrequencyProblem| {
            violations.push(Violation::Frequency {
                category: category.clone(),
                observed,
                problem,
            });
        };

        match *rule {
            FrequencyRule::ExactlyOnce => {
                if observed != 1 {
                    report(FrequencyProblem::NotExactlyOnce);
                }
            }
            FrequencyRule::AtLeast { min } => {
                if observed < min {
                    report(FrequencyProblem::TooFew { min });
                }
            }
            FrequencyRule::AtMost { max } => {
                if observed > max {
                    report(FrequencyProblem::TooMany { max });
                }
            }
            FrequencyRule::PerBlock => {
                let max = per_block_ceiling(block_count);
                let min = per_block_floor(block_count);
                if observed > max {
                    report(FrequencyProblem::TooFrequent {
                        max,
                        blocks: block_count,
                    });
                }
                if observed < min {
                    report(FrequencyProblem::TooRare {
                        min,
                        blocks: block_count,
                    });
                }
            }
        }
    }

    for violation in &violations {
        tracing::debug!("{}", violation);
    }
    violations
}

// ============================================================================
// TESTS
// ============================================================================

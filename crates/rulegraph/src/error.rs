//! # Error Types
//!
//! Error types for rule construction and matching.
//!
//! ## Overview
//!
//! Errors fall into three layers:
//!
//! - [`ConstructionError`]: a rule factory body failed. Propagated unchanged
//!   to the caller; the cache slot for the failed rule is rolled back so a
//!   corrected attempt can retry.
//! - [`GrammarShapeError`]: the finished graph is structurally wrong (an
//!   ordered-choice alternative can match empty input). Fatal at
//!   construction time, surfaced to the grammar author.
//! - [`ForwardingError`]: the allocate-then-arm protocol was violated. These
//!   indicate a bug in the construction core itself, not a grammar-author
//!   mistake, and are unrecoverable.
//!
//! Match *failure* is never an error: an alternative that does not match is
//! the ordinary, recoverable outcome of backtracking and is reported as a
//! plain `false`. [`MatchError`] is reserved for protocol violations and for
//! enforced matches, whose failure aborts the whole parse attempt.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with
//! [`miette`] for rich error reporting.

use crate::rule::RuleId;
use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// A rule factory body failed to produce a rule.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ConstructionError {
    #[error("rule '{rule}' failed to construct: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(rulegraph::construction)))]
    Failed {
        rule: CompactString,
        message: String,
    },

    /// The forwarding protocol broke while completing a construction.
    #[error(transparent)]
    Forwarding(#[from] ForwardingError),
}

impl ConstructionError {
    /// Create a construction failure for the named rule.
    #[must_use]
    pub fn new(rule: impl Into<CompactString>, message: impl Into<String>) -> Self {
        Self::Failed {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// An ordered-choice alternative can match the empty input.
///
/// An alternative that can match nothing makes every alternative after it
/// unreachable, so this is rejected for every alternative at construction
/// time. The message carries both the choice's description and the offending
/// alternative so the author can locate it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(rulegraph::grammar_shape)))]
#[error(
    "rule '{alternative}' allows empty matches as an alternative of choice '{choice}'; \
     every later alternative would be unreachable"
)]
pub struct GrammarShapeError {
    /// Description of the ordered choice holding the faulty alternative.
    pub choice: String,
    /// Description of the alternative that can match empty input.
    pub alternative: String,
}

/// Violations of the allocate-then-arm forwarding protocol.
///
/// Both variants are internal consistency violations: correct usage arms
/// every forwarding slot exactly once before the graph is handed to
/// matching.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ForwardingError {
    #[error("forwarding rule {rule:?} was armed twice")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(rulegraph::double_arm)))]
    AlreadyArmed { rule: RuleId },

    #[error("forwarding rule {rule:?} was used before being armed")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(rulegraph::unarmed_use)))]
    Unarmed { rule: RuleId },
}

/// Errors surfaced while finishing a rule set.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum BuildError {
    #[error(transparent)]
    Shape(#[from] GrammarShapeError),

    #[error(transparent)]
    Forwarding(#[from] ForwardingError),
}

/// Errors surfaced while driving matchers over input.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum MatchError {
    /// The rule graph contained an unresolved forwarding slot. Cannot happen
    /// for graphs produced by a successful `finish`.
    #[error(transparent)]
    Forwarding(#[from] ForwardingError),

    /// An enforced match failed; the parse attempt is not recoverable.
    #[error("expected {expected} at offset {offset}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(rulegraph::enforced)))]
    Enforced { expected: String, offset: usize },
}

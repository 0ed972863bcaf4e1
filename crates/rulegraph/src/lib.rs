//! # Rulegraph
//!
//! Memoized, cycle-tolerant rule construction for recursive-descent parsers.
//!
//! ## Overview
//!
//! Grammar rules are written as ordinary factory functions — one function
//! per production — whose call graph may be cyclic (`expr → term → factor →
//! parens → expr`). Rulegraph makes that safe and cheap:
//!
//! - **Memoized construction**: each distinct (rule name, argument tuple) is
//!   constructed at most once per builder; repeat calls return the same rule.
//! - **Forwarding placeholders**: a recursive reference to a rule still being
//!   built receives a placeholder that is armed with the real rule once its
//!   construction completes, so cycles settle on one shared rule instead of
//!   recursing forever.
//! - **Ordered choice**: the canonical consumer of the machinery — first
//!   matching alternative wins, with starter-set lookahead and
//!   "A, B or C" expected-input descriptions.
//!
//! The finished [`RuleSet`] is immutable and safe to reuse across any number
//! of parse attempts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rulegraph::{ConstructionError, RuleId, RuleSetBuilder};
//!
//! fn number(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
//!     b.rule("number", |b| {
//!         let digit = b.char_range('0', '9');
//!         Ok(b.one_or_more(digit))
//!     })
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut b = RuleSetBuilder::new();
//! let entry = number(&mut b)?;
//! let rules = b.finish(entry)?;
//!
//! let tree = rules.parse("42")?;
//! assert_eq!(tree.text("42"), "42");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`rule`] - Rule arena, forwarding protocol, builder, and memoization
//! - [`matcher`] - The closed set of matcher kinds
//! - [`engine`] - The match-time context boundary and the `&str` engine
//! - [`chars`] - Starter-character sets for lookahead
//! - [`error`] - Construction, shape, forwarding, and match errors

pub mod chars;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod rule;

pub use chars::Starters;
pub use engine::{MatchContext, MatchEngine, Mark, ParseNode};
pub use error::{
    BuildError, ConstructionError, ForwardingError, GrammarShapeError, MatchError,
};
pub use matcher::{Matcher, MatcherKind};
pub use rule::{
    key::{ArgKey, RuleArg},
    RuleId, RuleSet, RuleSetBuilder,
};

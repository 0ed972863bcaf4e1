//! # Matchers
//!
//! The closed set of matcher kinds a rule graph is built from.
//!
//! A [`Matcher`] is immutable once its owning rule's construction completes:
//! children are fixed at construction, and the label is written at most once
//! (the first completed construction labels the matcher with its rule name
//! and locks it). The matcher kinds form a closed tagged variant rather than
//! an open hierarchy; every kind supports the same capability set — match
//! against an engine context, report its starter characters, and describe
//! itself for error messages.

pub mod choice;

use crate::chars::Starters;
use crate::engine::MatchContext;
use crate::error::{BuildError, MatchError};
use crate::rule::{RuleId, RuleSet};
use hashbrown::HashSet;
use lasso::Spur;
use smallvec::SmallVec;

/// The matcher variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatcherKind {
    /// Ordered choice: first matching alternative wins.
    FirstOf { children: SmallVec<[RuleId; 4]> },
    /// All children in declaration order. When `enforced`, a child failing
    /// after the first has matched is a fatal grammar error instead of a
    /// backtrack.
    Sequence {
        children: SmallVec<[RuleId; 4]>,
        enforced: bool,
    },
    /// Zero or one occurrence of the child.
    Optional { child: RuleId },
    /// Any number of occurrences of the child, including none.
    ZeroOrMore { child: RuleId },
    /// At least one occurrence of the child.
    OneOrMore { child: RuleId },
    /// A single specific character.
    Ch(char),
    /// A single character in the inclusive range.
    CharRange { lo: char, hi: char },
    /// Any single character.
    AnyChar,
    /// Matches without consuming input.
    Empty,
    /// Matches end of input.
    Eoi,
}

/// A matcher plus its label/lock state.
#[derive(Debug)]
pub struct Matcher {
    kind: MatcherKind,
    label: Option<Spur>,
    locked: bool,
}

impl Matcher {
    pub(crate) fn new(kind: MatcherKind) -> Self {
        Self {
            kind,
            label: None,
            locked: false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &MatcherKind {
        &self.kind
    }

    #[must_use]
    pub const fn label(&self) -> Option<Spur> {
        self.label
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Assign the human-readable label. Callers check the lock first.
    pub(crate) fn set_label(&mut self, label: Spur) {
        debug_assert!(!self.locked, "relabeling a locked matcher");
        self.label = Some(label);
    }

    /// Freeze label state. Happens at most once, on the first completed
    /// construction of the owning rule.
    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }

    /// Child rules, in declaration order.
    #[must_use]
    pub fn children(&self) -> &[RuleId] {
        match &self.kind {
            MatcherKind::FirstOf { children } | MatcherKind::Sequence { children, .. } => children,
            MatcherKind::Optional { child }
            | MatcherKind::ZeroOrMore { child }
            | MatcherKind::OneOrMore { child } => std::slice::from_ref(child),
            _ => &[],
        }
    }

    /// Run this matcher against an engine context.
    ///
    /// Returns `Ok(false)` for ordinary, recoverable match failure; the
    /// context is responsible for restoring input position around a failed
    /// attempt. `enforced` marks that a failure of this matcher is not a
    /// choice point; it is threaded into sequence children so that an
    /// enforced sequence aborts the parse when a child after the first
    /// fails.
    pub fn match_in<C: MatchContext + ?Sized>(
        &self,
        ctx: &mut C,
        enforced: bool,
    ) -> Result<bool, MatchError> {
        match &self.kind {
            MatcherKind::FirstOf { children } => choice::match_first_of(ctx, children),
            MatcherKind::Sequence {
                children,
                enforced: chain,
            } => match_sequence(ctx, children, *chain, enforced),
            MatcherKind::Optional { child } => match_optional(ctx, *child),
            MatcherKind::ZeroOrMore { child } => match_zero_or_more(ctx, *child),
            MatcherKind::OneOrMore { child } => match_one_or_more(ctx, *child, enforced),
            MatcherKind::Ch(c) => Ok(match_char_with(ctx, |x| x == *c)),
            MatcherKind::CharRange { lo, hi } => {
                Ok(match_char_with(ctx, |x| *lo <= x && x <= *hi))
            }
            MatcherKind::AnyChar => Ok(match_char_with(ctx, |_| true)),
            MatcherKind::Empty => {
                ctx.create_node();
                Ok(true)
            }
            MatcherKind::Eoi => {
                if ctx.at_end() {
                    ctx.create_node();
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

fn match_char_with<C: MatchContext + ?Sized>(ctx: &mut C, accept: impl Fn(char) -> bool) -> bool {
    match ctx.peek() {
        Some(c) if accept(c) => {
            ctx.advance();
            ctx.create_node();
            true
        }
        _ => false,
    }
}

fn match_sequence<C: MatchContext + ?Sized>(
    ctx: &mut C,
    children: &[RuleId],
    chain: bool,
    enforced: bool,
) -> Result<bool, MatchError> {
    for (i, &child) in children.iter().enumerate() {
        let child_enforced = enforced || (chain && i > 0);
        if !ctx.run_matcher(child, child_enforced)? {
            return Ok(false);
        }
    }
    ctx.create_node();
    Ok(true)
}

fn match_optional<C: MatchContext + ?Sized>(ctx: &mut C, child: RuleId) -> Result<bool, MatchError> {
    let _ = ctx.run_matcher(child, false)?;
    ctx.create_node();
    Ok(true)
}

fn match_zero_or_more<C: MatchContext + ?Sized>(
    ctx: &mut C,
    child: RuleId,
) -> Result<bool, MatchError> {
    loop {
        let before = ctx.mark();
        if !ctx.run_matcher(child, false)? {
            break;
        }
        if ctx.mark().offset == before.offset {
            // Child matched without consuming; repeating it would never end.
            break;
        }
    }
    ctx.create_node();
    Ok(true)
}

fn match_one_or_more<C: MatchContext + ?Sized>(
    ctx: &mut C,
    child: RuleId,
    enforced: bool,
) -> Result<bool, MatchError> {
    if !ctx.run_matcher(child, enforced)? {
        return Ok(false);
    }
    loop {
        let before = ctx.mark();
        if !ctx.run_matcher(child, false)? {
            break;
        }
        if ctx.mark().offset == before.offset {
            break;
        }
    }
    ctx.create_node();
    Ok(true)
}

/// Compute the starter set of a rule, recursing through the graph.
///
/// `visited` breaks recursion through cyclic rule references: a rule already
/// on the current path contributes nothing further, which is sound because
/// its first-character contribution is collected where it was first
/// reached.
pub(crate) fn compute_starters(
    rules: &RuleSet,
    id: RuleId,
    visited: &mut HashSet<RuleId, ahash::RandomState>,
) -> Result<Starters, BuildError> {
    let canonical = rules.resolve(id)?;
    if !visited.insert(canonical) {
        return Ok(Starters::none());
    }
    let matcher = rules.matcher(canonical)?;
    let starters = match matcher.kind() {
        MatcherKind::FirstOf { children } => {
            choice::starters(rules, canonical, children, visited)?
        }
        MatcherKind::Sequence { children, .. } => {
            let mut acc = Starters::none();
            let mut all_nullable = true;
            for &child in children {
                let s = compute_starters(rules, child, visited)?;
                let nullable = s.contains_empty();
                acc = acc.union(&s.without_empty());
                if !nullable {
                    all_nullable = false;
                    break;
                }
            }
            if all_nullable {
                acc = acc.with_empty();
            }
            acc
        }
        MatcherKind::Optional { child } | MatcherKind::ZeroOrMore { child } => {
            compute_starters(rules, *child, visited)?.with_empty()
        }
        MatcherKind::OneOrMore { child } => compute_starters(rules, *child, visited)?,
        MatcherKind::Ch(c) => Starters::of(*c),
        MatcherKind::CharRange { lo, hi } => Starters::range(*lo, *hi),
        MatcherKind::AnyChar => Starters::any(),
        MatcherKind::Empty => Starters::empty(),
        MatcherKind::Eoi => Starters::eoi(),
    };
    visited.remove(&canonical);
    Ok(starters)
}

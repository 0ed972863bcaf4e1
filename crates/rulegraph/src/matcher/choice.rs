//! Ordered choice: first matching alternative wins.

use crate::chars::Starters;
use crate::engine::MatchContext;
use crate::error::{BuildError, GrammarShapeError, MatchError};
use crate::rule::{RuleId, RuleSet};
use hashbrown::HashSet;

/// Try each alternative in declaration order.
///
/// The first alternative that matches produces the node for this choice and
/// ends the attempt; later alternatives are never tried and leave no side
/// effects. The engine restores the input position between failed attempts,
/// so when every alternative fails the position is exactly where it was
/// before the choice ran.
pub(crate) fn match_first_of<C: MatchContext + ?Sized>(
    ctx: &mut C,
    children: &[RuleId],
) -> Result<bool, MatchError> {
    for &child in children {
        if ctx.run_matcher(child, false)? {
            ctx.create_node();
            return Ok(true);
        }
    }
    Ok(false)
}

/// Union the alternatives' starter sets, rejecting empty-capable ones.
///
/// An alternative that can match empty input would make every alternative
/// after it unreachable; that is almost always an authoring mistake, so it
/// is rejected outright for every alternative.
pub(crate) fn starters(
    rules: &RuleSet,
    choice: RuleId,
    children: &[RuleId],
    visited: &mut HashSet<RuleId, ahash::RandomState>,
) -> Result<Starters, BuildError> {
    let mut acc = Starters::none();
    for &child in children {
        let s = super::compute_starters(rules, child, visited)?;
        acc = acc.union(&s);
        if acc.contains_empty() {
            return Err(GrammarShapeError {
                choice: rules.description(choice),
                alternative: rules.description(child),
            }
            .into());
        }
    }
    Ok(acc)
}

/// Human-readable "A, B or C" listing of the alternatives.
pub(crate) fn expected_description(rules: &RuleSet, children: &[RuleId]) -> String {
    match children {
        [] => String::new(),
        [only] => rules.description(*only),
        [init @ .., last] => {
            let mut out = init
                .iter()
                .map(|&c| rules.description(c))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(" or ");
            out.push_str(&rules.description(*last));
            out
        }
    }
}

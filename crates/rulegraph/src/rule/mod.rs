//! # Rule Graph Construction
//!
//! Rules live in an arena addressed by stable index ([`RuleId`]). During
//! construction a slot is either a *forwarding* placeholder (allocated and
//! published before its rule's factory body runs) or a concrete
//! [`Matcher`]. Arming a forwarding slot points it at the real rule;
//! afterwards every operation on the placeholder resolves to the target, so
//! cyclic rule references — `expr → term → factor → parens → expr` — settle
//! on one shared rule instead of recursing forever.
//!
//! [`RuleSetBuilder`] owns the arena together with the per-builder
//! memoization cache: each distinct (rule name, argument key) pair is
//! constructed at most once, and a recursive call made while that
//! construction is still running receives the forwarding placeholder. Two
//! builders share no state.
//!
//! ## Construction protocol
//!
//! ```rust,no_run
//! use rulegraph::{ConstructionError, RuleId, RuleSetBuilder};
//!
//! fn list(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
//!     b.rule("list", |b| {
//!         // A recursive reference: this inner call returns a placeholder
//!         // that is armed once the outer call completes.
//!         let rec = list(b)?;
//!         let item = b.char_range('a', 'z');
//!         let nested = b.sequence([item, rec]);
//!         Ok(b.first_of([nested, item]))
//!     })
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut b = RuleSetBuilder::new();
//! let entry = list(&mut b)?;
//! let rules = b.finish(entry)?;
//! let tree = rules.parse("abc")?;
//! assert_eq!(tree.end, 3);
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod key;

use crate::chars::Starters;
use crate::error::{BuildError, ConstructionError, ForwardingError};
use crate::matcher::{self, choice, Matcher, MatcherKind};
use cache::{ConstructionTracker, RuleCache};
use hashbrown::{HashMap, HashSet};
use key::{ArgKey, RuleArg};
use lasso::Rodeo;
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Stable index of a rule within its owning builder's arena.
///
/// Ids are only meaningful for the builder (and the [`RuleSet`]) that minted
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
enum RuleSlot {
    /// Placeholder published before its rule's body has been evaluated.
    /// `target` is written exactly once, by arming.
    Forwarding { target: Option<RuleId> },
    Matcher(Matcher),
}

#[derive(Debug, Default)]
pub(crate) struct RuleArena {
    slots: Vec<RuleSlot>,
}

impl RuleArena {
    fn alloc_forwarding(&mut self) -> RuleId {
        let id = RuleId::from_index(self.slots.len());
        self.slots.push(RuleSlot::Forwarding { target: None });
        id
    }

    fn alloc_matcher(&mut self, m: Matcher) -> RuleId {
        let id = RuleId::from_index(self.slots.len());
        self.slots.push(RuleSlot::Matcher(m));
        id
    }

    /// Point a forwarding slot at its real rule. Exactly once per slot.
    fn arm(&mut self, fwd: RuleId, target: RuleId) -> Result<(), ForwardingError> {
        match self.slots.get_mut(fwd.index()) {
            Some(RuleSlot::Forwarding { target: slot @ None }) => {
                *slot = Some(target);
                Ok(())
            }
            Some(_) => Err(ForwardingError::AlreadyArmed { rule: fwd }),
            None => Err(ForwardingError::Unarmed { rule: fwd }),
        }
    }

    /// Chase forwarding links to the id of a concrete matcher slot.
    ///
    /// The hop limit bounds degenerate graphs in which forwarding slots
    /// only ever reach other forwarding slots; such a graph contains no
    /// matcher, so "never resolved" is the accurate diagnosis.
    fn resolve(&self, id: RuleId) -> Result<RuleId, ForwardingError> {
        let mut current = id;
        for _ in 0..=self.slots.len() {
            match self.slots.get(current.index()) {
                Some(RuleSlot::Matcher(_)) => return Ok(current),
                Some(RuleSlot::Forwarding { target: Some(next) }) => current = *next,
                Some(RuleSlot::Forwarding { target: None }) | None => {
                    return Err(ForwardingError::Unarmed { rule: current })
                }
            }
        }
        Err(ForwardingError::Unarmed { rule: id })
    }

    /// Matcher stored at a resolved id.
    fn matcher(&self, id: RuleId) -> Result<&Matcher, ForwardingError> {
        match self.slots.get(id.index()) {
            Some(RuleSlot::Matcher(m)) => Ok(m),
            _ => Err(ForwardingError::Unarmed { rule: id }),
        }
    }

    fn matcher_mut(&mut self, id: RuleId) -> Option<&mut Matcher> {
        match self.slots.get_mut(id.index()) {
            Some(RuleSlot::Matcher(m)) => Some(m),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Build context for one parser instance's rule graph.
///
/// Owns the arena, the memoization cache, the construction tracker, and the
/// rule-name interner. Factories written against this builder may recurse
/// freely; each distinct (name, arguments) pair is evaluated at most once.
pub struct RuleSetBuilder {
    arena: RuleArena,
    cache: RuleCache,
    tracker: ConstructionTracker,
    names: Rodeo,
}

impl Default for RuleSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: RuleArena::default(),
            cache: RuleCache::new(),
            tracker: ConstructionTracker::default(),
            names: Rodeo::new(),
        }
    }

    /// Define (or look up) the rule named `name`.
    ///
    /// The body runs at most once per builder; repeat calls return the
    /// cached rule without evaluating the body. A recursive call to the same
    /// rule made from inside the body receives a forwarding placeholder
    /// that is armed once the outer call completes.
    pub fn rule(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Self) -> Result<RuleId, ConstructionError>,
    ) -> Result<RuleId, ConstructionError> {
        self.rule_with_args(name, std::iter::empty::<RuleArg>(), body)
    }

    /// Define (or look up) a parameterized rule.
    ///
    /// Arguments are flattened into the cache key: nested argument lists
    /// compare element-for-element against the same values passed flat, so
    /// a factory may accept separate scalars or one aggregate list
    /// interchangeably.
    pub fn rule_with_args<I>(
        &mut self,
        name: &str,
        args: I,
        body: impl FnOnce(&mut Self) -> Result<RuleId, ConstructionError>,
    ) -> Result<RuleId, ConstructionError>
    where
        I: IntoIterator,
        I::Item: Into<RuleArg>,
    {
        let key = ArgKey::new(args);
        let spur = self.names.get_or_intern(name);

        if let Some(id) = self.cache.get(spur, &key) {
            trace!(rule = name, "rule cache hit");
            return Ok(id);
        }

        // Publish the placeholder before the body runs: a recursive call
        // with the same key hits the cache and receives it instead of
        // recursing forever.
        let fwd = self.arena.alloc_forwarding();
        self.cache.insert(spur, key.clone(), fwd);

        let depth = self.tracker.enter();
        trace!(rule = name, depth, "constructing rule");
        let built = body(self);
        self.tracker.exit();

        let real = match built {
            Ok(id) => id,
            Err(err) => {
                // Roll the slot back to empty so a corrected attempt can
                // retry; the error itself propagates unchanged.
                self.cache.remove(spur, &key);
                return Err(err);
            }
        };

        // First construction of this rule: label the matcher with the rule
        // name and lock it, unless an earlier construction already did.
        if let Ok(resolved) = self.arena.resolve(real) {
            if let Some(m) = self.arena.matcher_mut(resolved) {
                if !m.is_locked() {
                    m.set_label(spur);
                    m.lock();
                }
            }
        }

        self.arena.arm(fwd, real)?;
        self.cache.complete(spur, &key, real);
        trace!(rule = name, id = ?real, "rule constructed");
        Ok(real)
    }

    /// Number of factory bodies evaluated so far.
    #[must_use]
    pub const fn constructions(&self) -> usize {
        self.tracker.constructions()
    }

    pub fn ch(&mut self, c: char) -> RuleId {
        self.arena.alloc_matcher(Matcher::new(MatcherKind::Ch(c)))
    }

    pub fn char_range(&mut self, lo: char, hi: char) -> RuleId {
        self.arena
            .alloc_matcher(Matcher::new(MatcherKind::CharRange { lo, hi }))
    }

    pub fn any_char(&mut self) -> RuleId {
        self.arena.alloc_matcher(Matcher::new(MatcherKind::AnyChar))
    }

    pub fn empty(&mut self) -> RuleId {
        self.arena.alloc_matcher(Matcher::new(MatcherKind::Empty))
    }

    pub fn eoi(&mut self) -> RuleId {
        self.arena.alloc_matcher(Matcher::new(MatcherKind::Eoi))
    }

    pub fn sequence<I: IntoIterator<Item = RuleId>>(&mut self, children: I) -> RuleId {
        let children: SmallVec<[RuleId; 4]> = children.into_iter().collect();
        self.arena.alloc_matcher(Matcher::new(MatcherKind::Sequence {
            children,
            enforced: false,
        }))
    }

    /// A sequence whose children after the first are enforced: once the
    /// first child has matched, a later child failing is a fatal grammar
    /// error rather than a backtrackable failure.
    pub fn enforced_sequence<I: IntoIterator<Item = RuleId>>(&mut self, children: I) -> RuleId {
        let children: SmallVec<[RuleId; 4]> = children.into_iter().collect();
        self.arena.alloc_matcher(Matcher::new(MatcherKind::Sequence {
            children,
            enforced: true,
        }))
    }

    /// Ordered choice over the given alternatives.
    pub fn first_of<I: IntoIterator<Item = RuleId>>(&mut self, children: I) -> RuleId {
        let children: SmallVec<[RuleId; 4]> = children.into_iter().collect();
        self.arena
            .alloc_matcher(Matcher::new(MatcherKind::FirstOf { children }))
    }

    pub fn optional(&mut self, child: RuleId) -> RuleId {
        self.arena
            .alloc_matcher(Matcher::new(MatcherKind::Optional { child }))
    }

    pub fn zero_or_more(&mut self, child: RuleId) -> RuleId {
        self.arena
            .alloc_matcher(Matcher::new(MatcherKind::ZeroOrMore { child }))
    }

    pub fn one_or_more(&mut self, child: RuleId) -> RuleId {
        self.arena
            .alloc_matcher(Matcher::new(MatcherKind::OneOrMore { child }))
    }

    /// Validate the graph reachable from `entry` and freeze it.
    ///
    /// Every reachable forwarding slot must have been armed, and every
    /// reachable ordered choice must pass the empty-alternative check.
    /// Starter sets for the reachable rules are computed here, once, and
    /// kept for the engine's lookahead pre-check.
    pub fn finish(self, entry: RuleId) -> Result<RuleSet, BuildError> {
        let mut rules = RuleSet {
            arena: self.arena,
            names: self.names,
            entry,
            starters: HashMap::with_hasher(ahash::RandomState::new()),
        };

        let mut table = HashMap::with_hasher(ahash::RandomState::new());
        let mut seen: HashSet<RuleId, ahash::RandomState> =
            HashSet::with_hasher(ahash::RandomState::new());
        let mut stack = vec![entry];
        while let Some(id) = stack.pop() {
            let canonical = rules.resolve(id)?;
            if !seen.insert(canonical) {
                continue;
            }
            let mut visited = HashSet::with_hasher(ahash::RandomState::new());
            let starters = matcher::compute_starters(&rules, canonical, &mut visited)?;
            table.insert(canonical, starters);
            stack.extend_from_slice(rules.matcher(canonical)?.children());
        }

        debug!(
            rules = seen.len(),
            slots = rules.arena.len(),
            "rule set finished"
        );
        rules.starters = table;
        Ok(rules)
    }
}

/// An immutable, validated rule graph.
///
/// Safe to reuse across any number of parse attempts; nothing in the graph
/// is mutated after [`RuleSetBuilder::finish`] returns.
#[derive(Debug)]
pub struct RuleSet {
    arena: RuleArena,
    names: Rodeo,
    entry: RuleId,
    starters: HashMap<RuleId, Starters, ahash::RandomState>,
}

impl RuleSet {
    /// The entry rule handed to `finish`.
    #[must_use]
    pub const fn entry(&self) -> RuleId {
        self.entry
    }

    /// Canonical id of a rule, chasing forwarding links.
    ///
    /// After arming, a forwarding placeholder and its target are the same
    /// rule; this returns the concrete slot both share.
    pub fn resolve(&self, id: RuleId) -> Result<RuleId, ForwardingError> {
        self.arena.resolve(id)
    }

    /// The matcher a rule resolves to.
    pub fn matcher(&self, id: RuleId) -> Result<&Matcher, ForwardingError> {
        let canonical = self.arena.resolve(id)?;
        self.arena.matcher(canonical)
    }

    /// The label assigned by the rule's first construction, if any.
    #[must_use]
    pub fn label(&self, id: RuleId) -> Option<&str> {
        let m = self.matcher(id).ok()?;
        m.label().map(|spur| self.names.resolve(&spur))
    }

    /// Human-readable description: the label when one was assigned, a
    /// structural description otherwise.
    #[must_use]
    pub fn description(&self, id: RuleId) -> String {
        let Ok(m) = self.matcher(id) else {
            return "<unarmed>".to_string();
        };
        if let Some(spur) = m.label() {
            return self.names.resolve(&spur).to_string();
        }
        match m.kind() {
            MatcherKind::FirstOf { .. } => "choice".to_string(),
            MatcherKind::Sequence { .. } => "sequence".to_string(),
            MatcherKind::Optional { .. } => "optional".to_string(),
            MatcherKind::ZeroOrMore { .. } => "zero-or-more".to_string(),
            MatcherKind::OneOrMore { .. } => "one-or-more".to_string(),
            MatcherKind::Ch(c) => format!("'{c}'"),
            MatcherKind::CharRange { lo, hi } => format!("'{lo}'..'{hi}'"),
            MatcherKind::AnyChar => "ANY".to_string(),
            MatcherKind::Empty => "EMPTY".to_string(),
            MatcherKind::Eoi => "EOI".to_string(),
        }
    }

    /// What input the rule expects, for error messages.
    ///
    /// For an ordered choice this lists the alternatives as
    /// `"A, B or C"`; for everything else it is the description.
    #[must_use]
    pub fn expected(&self, id: RuleId) -> String {
        match self.matcher(id) {
            Ok(m) => match m.kind() {
                MatcherKind::FirstOf { children } => choice::expected_description(self, children),
                _ => self.description(id),
            },
            Err(_) => "<unarmed>".to_string(),
        }
    }

    /// The rule's starter-character set.
    ///
    /// Computed during `finish` for every reachable rule; rules outside the
    /// finished graph are computed on demand. Fails if the rule is an
    /// ordered choice with an empty-capable alternative, or if it reaches
    /// an unarmed forwarding slot.
    pub fn starters(&self, id: RuleId) -> Result<Starters, BuildError> {
        let canonical = self.resolve(id)?;
        if let Some(hit) = self.starters.get(&canonical) {
            return Ok(hit.clone());
        }
        let mut visited = HashSet::with_hasher(ahash::RandomState::new());
        matcher::compute_starters(self, canonical, &mut visited)
    }

    /// Precomputed starter set, if this canonical rule was reachable at
    /// `finish` time.
    pub(crate) fn starter_hint(&self, canonical: RuleId) -> Option<&Starters> {
        self.starters.get(&canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_exactly_once() {
        let mut arena = RuleArena::default();
        let fwd = arena.alloc_forwarding();
        let real = arena.alloc_matcher(Matcher::new(MatcherKind::Ch('x')));

        assert!(arena.arm(fwd, real).is_ok());
        assert_eq!(
            arena.arm(fwd, real),
            Err(ForwardingError::AlreadyArmed { rule: fwd })
        );
    }

    #[test]
    fn test_resolve_before_arming_fails() {
        let mut arena = RuleArena::default();
        let fwd = arena.alloc_forwarding();
        assert_eq!(
            arena.resolve(fwd),
            Err(ForwardingError::Unarmed { rule: fwd })
        );
    }

    #[test]
    fn test_resolve_chases_chains() {
        let mut arena = RuleArena::default();
        let outer = arena.alloc_forwarding();
        let inner = arena.alloc_forwarding();
        let real = arena.alloc_matcher(Matcher::new(MatcherKind::Empty));

        arena.arm(inner, real).unwrap();
        arena.arm(outer, inner).unwrap();
        assert_eq!(arena.resolve(outer), Ok(real));
    }

    #[test]
    fn test_forward_cycle_is_reported_as_unarmed() {
        let mut arena = RuleArena::default();
        let a = arena.alloc_forwarding();
        let b = arena.alloc_forwarding();
        arena.arm(a, b).unwrap();
        arena.arm(b, a).unwrap();

        assert!(matches!(
            arena.resolve(a),
            Err(ForwardingError::Unarmed { .. })
        ));
    }

    #[test]
    fn test_arming_a_matcher_slot_fails() {
        let mut arena = RuleArena::default();
        let real = arena.alloc_matcher(Matcher::new(MatcherKind::Eoi));
        assert_eq!(
            arena.arm(real, real),
            Err(ForwardingError::AlreadyArmed { rule: real })
        );
    }
}

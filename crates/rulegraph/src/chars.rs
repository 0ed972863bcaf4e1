//! Starter-character sets.
//!
//! A [`Starters`] value describes the set of input characters with which a
//! rule could begin a successful match, plus two markers that ordinary
//! characters cannot express: whether the rule can match *empty* input
//! (consuming nothing), and whether it matches *end of input*. The matching
//! engine uses starter sets as a cheap pre-check before attempting a rule,
//! and the ordered-choice matcher uses the empty marker to reject
//! alternatives that could never let a later alternative run.

use smallvec::SmallVec;

/// Set of characters a rule can start with.
///
/// Characters are stored as inclusive ranges, which keeps grammar-typical
/// sets (`'0'..'9'`, a handful of operators) small and cheap to union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Starters {
    ranges: SmallVec<[(char, char); 4]>,
    any: bool,
    empty: bool,
    eoi: bool,
}

impl Starters {
    /// The empty set: no character starts a match.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A single starter character.
    #[must_use]
    pub fn of(c: char) -> Self {
        Self::range(c, c)
    }

    /// An inclusive character range.
    #[must_use]
    pub fn range(lo: char, hi: char) -> Self {
        let mut ranges = SmallVec::new();
        ranges.push((lo, hi));
        Self {
            ranges,
            ..Self::default()
        }
    }

    /// Every character starts a match.
    #[must_use]
    pub fn any() -> Self {
        Self {
            any: true,
            ..Self::default()
        }
    }

    /// Only the empty-match marker.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::default()
        }
    }

    /// Only the end-of-input marker.
    #[must_use]
    pub fn eoi() -> Self {
        Self {
            eoi: true,
            ..Self::default()
        }
    }

    /// Union with another set, markers included.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.any |= other.any;
        self.empty |= other.empty;
        self.eoi |= other.eoi;
        if self.any {
            self.ranges.clear();
        } else {
            for range in &other.ranges {
                if !self.covers(range.0, range.1) {
                    self.ranges.push(*range);
                }
            }
        }
        self
    }

    fn covers(&self, lo: char, hi: char) -> bool {
        self.ranges.iter().any(|(a, b)| *a <= lo && hi <= *b)
    }

    /// Whether `c` is a possible first character.
    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        self.any || self.ranges.iter().any(|(lo, hi)| *lo <= c && c <= *hi)
    }

    /// Whether the set carries the empty-match marker.
    #[must_use]
    pub const fn contains_empty(&self) -> bool {
        self.empty
    }

    /// Whether the set carries the end-of-input marker.
    #[must_use]
    pub const fn contains_eoi(&self) -> bool {
        self.eoi
    }

    /// Whether every character is a starter.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        self.any
    }

    /// Copy of this set with the empty-match marker added.
    #[must_use]
    pub fn with_empty(mut self) -> Self {
        self.empty = true;
        self
    }

    /// Copy of this set with the empty-match marker removed.
    #[must_use]
    pub fn without_empty(mut self) -> Self {
        self.empty = false;
        self
    }
}

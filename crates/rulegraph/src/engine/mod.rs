//! # Matching Engine
//!
//! The match-time boundary between the rule graph and input.
//!
//! Matchers never touch input directly; they drive a [`MatchContext`] — run
//! a child rule, create a node, read or move the cursor. [`MatchEngine`] is
//! the concrete single-threaded recursive implementation over a `&str`:
//! matching is ordinary nested function evaluation over one shared cursor,
//! a failed attempt restores the cursor and discards the nodes the attempt
//! produced, and an *enforced* failure aborts the whole parse attempt with
//! the failed rule's expected-input description.

use crate::error::MatchError;
use crate::rule::{RuleId, RuleSet};
use tracing::trace;

/// A saved engine position: input offset plus pending-node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    /// Byte offset into the input.
    pub offset: usize,
    /// Number of completed nodes at the time of the mark.
    pub nodes: usize,
}

/// What matchers consume from the engine.
///
/// Implemented by [`MatchEngine`]; tests may substitute scripted contexts.
pub trait MatchContext {
    /// Attempt a child rule. Returns `Ok(false)` on ordinary failure with
    /// the input position fully restored. When `enforced`, failure becomes
    /// [`MatchError::Enforced`] instead.
    fn run_matcher(&mut self, rule: RuleId, enforced: bool) -> Result<bool, MatchError>;

    /// Wrap everything matched since the current rule began into a node.
    fn create_node(&mut self);

    /// Save the current position.
    fn mark(&self) -> Mark;

    /// Restore a previously saved position, discarding nodes made since.
    fn reset(&mut self, mark: Mark);

    /// The character at the cursor, if any.
    fn peek(&self) -> Option<char>;

    /// Move the cursor past the character at it.
    fn advance(&mut self);

    /// Whether the cursor is at end of input.
    fn at_end(&self) -> bool;
}

/// A node of the resulting parse tree.
///
/// Spans are byte offsets into the parsed input; `rule` is the canonical id
/// of the rule that produced the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub rule: RuleId,
    pub start: usize,
    pub end: usize,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    /// The input text this node covers.
    #[must_use]
    pub fn text<'i>(&self, input: &'i str) -> &'i str {
        &input[self.start..self.end]
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    rule: RuleId,
    start: usize,
    floor: usize,
}

/// Recursive-descent engine over one input string.
pub struct MatchEngine<'a> {
    rules: &'a RuleSet,
    input: &'a str,
    pos: usize,
    nodes: Vec<ParseNode>,
    frames: Vec<Frame>,
}

impl<'a> MatchEngine<'a> {
    #[must_use]
    pub fn new(rules: &'a RuleSet, input: &'a str) -> Self {
        Self {
            rules,
            input,
            pos: 0,
            nodes: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Current byte offset of the cursor.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.pos
    }

    /// Completed top-level nodes, consuming the engine.
    #[must_use]
    pub fn into_nodes(self) -> Vec<ParseNode> {
        self.nodes
    }
}

impl MatchContext for MatchEngine<'_> {
    fn run_matcher(&mut self, rule: RuleId, enforced: bool) -> Result<bool, MatchError> {
        let rules = self.rules;
        let canonical = rules.resolve(rule)?;

        // Lookahead pre-check: a rule whose starter set cannot begin at the
        // cursor is failed without attempting it. Rules that can match
        // empty input, or anything, are always attempted.
        if let Some(starters) = rules.starter_hint(canonical) {
            if !starters.contains_empty() && !starters.is_any() {
                let viable = match self.peek() {
                    Some(c) => starters.matches(c),
                    None => starters.contains_eoi(),
                };
                if !viable {
                    return if enforced {
                        Err(MatchError::Enforced {
                            expected: rules.expected(canonical),
                            offset: self.pos,
                        })
                    } else {
                        Ok(false)
                    };
                }
            }
        }

        let matcher = rules.matcher(canonical)?;
        let mark = self.mark();
        self.frames.push(Frame {
            rule: canonical,
            start: self.pos,
            floor: mark.nodes,
        });
        let outcome = matcher.match_in(self, enforced);
        self.frames.pop();

        match outcome {
            Ok(true) => {
                trace!(rule = ?canonical, from = mark.offset, to = self.pos, "matched");
                Ok(true)
            }
            Ok(false) => {
                self.reset(mark);
                if enforced {
                    Err(MatchError::Enforced {
                        expected: rules.expected(canonical),
                        offset: mark.offset,
                    })
                } else {
                    Ok(false)
                }
            }
            Err(err) => Err(err),
        }
    }

    fn create_node(&mut self) {
        let Some(frame) = self.frames.last().copied() else {
            debug_assert!(false, "node created outside any rule frame");
            return;
        };
        let children = self.nodes.split_off(frame.floor);
        self.nodes.push(ParseNode {
            rule: frame.rule,
            start: frame.start,
            end: self.pos,
            children,
        });
    }

    fn mark(&self) -> Mark {
        Mark {
            offset: self.pos,
            nodes: self.nodes.len(),
        }
    }

    fn reset(&mut self, mark: Mark) {
        self.pos = mark.offset;
        self.nodes.truncate(mark.nodes);
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

impl RuleSet {
    /// Run the entry rule over `input` as an enforced match.
    ///
    /// A non-match of the entry rule is therefore an error, carrying the
    /// entry's expected-input description. Grammars that must consume the
    /// whole input end their entry rule with an end-of-input matcher.
    pub fn parse(&self, input: &str) -> Result<ParseNode, MatchError> {
        let mut engine = MatchEngine::new(self, input);
        let matched = engine.run_matcher(self.entry(), true)?;
        debug_assert!(matched, "enforced entry match cannot report plain failure");
        let mut nodes = engine.into_nodes();
        match nodes.pop() {
            Some(root) => Ok(root),
            // Every successful matcher creates its node, so a matched entry
            // rule always leaves exactly one root behind.
            None => Err(MatchError::Enforced {
                expected: self.expected(self.entry()),
                offset: 0,
            }),
        }
    }
}

//! End-to-end tests over a small arithmetic grammar.
//!
//! The grammar is deliberately cyclic — `expression → term → factor →
//! parens → expression` — so a full parse exercises memoized construction,
//! forwarding, ordered choice, and enforced sequences together.

use pretty_assertions::assert_eq;
use rulegraph::{ConstructionError, MatchError, ParseNode, RuleId, RuleSet, RuleSetBuilder};

fn input_line(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
    b.rule("input_line", |b| {
        let expr = expression(b)?;
        let eoi = b.eoi();
        Ok(b.enforced_sequence([expr, eoi]))
    })
}

fn expression(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
    b.rule("expression", |b| {
        let head = term(b)?;
        let plus = b.ch('+');
        let minus = b.ch('-');
        let op = b.first_of([plus, minus]);
        let operand = term(b)?;
        let tail = b.enforced_sequence([op, operand]);
        let more = b.zero_or_more(tail);
        Ok(b.sequence([head, more]))
    })
}

fn term(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
    b.rule("term", |b| {
        let head = factor(b)?;
        let times = b.ch('*');
        let divide = b.ch('/');
        let op = b.first_of([times, divide]);
        let operand = factor(b)?;
        let tail = b.enforced_sequence([op, operand]);
        let more = b.zero_or_more(tail);
        Ok(b.sequence([head, more]))
    })
}

fn factor(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
    b.rule("factor", |b| {
        let number = number(b)?;
        let parens = parens(b)?;
        Ok(b.first_of([number, parens]))
    })
}

fn parens(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
    b.rule("parens", |b| {
        let open = b.ch('(');
        let expr = expression(b)?;
        let close = b.ch(')');
        Ok(b.enforced_sequence([open, expr, close]))
    })
}

fn number(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
    b.rule("number", |b| {
        let digit = digit(b)?;
        Ok(b.one_or_more(digit))
    })
}

fn digit(b: &mut RuleSetBuilder) -> Result<RuleId, ConstructionError> {
    b.rule("digit", |b| Ok(b.char_range('0', '9')))
}

fn calculator() -> RuleSet {
    let mut b = RuleSetBuilder::new();
    let entry = input_line(&mut b).unwrap();
    // Seven rule bodies, each evaluated once despite the cycle and the
    // repeated references.
    assert_eq!(b.constructions(), 7);
    b.finish(entry).unwrap()
}

fn find_labeled<'t>(rules: &RuleSet, node: &'t ParseNode, label: &str) -> Option<&'t ParseNode> {
    if rules.label(node.rule) == Some(label) {
        return Some(node);
    }
    node.children
        .iter()
        .find_map(|child| find_labeled(rules, child, label))
}

fn count_labeled(rules: &RuleSet, node: &ParseNode, label: &str) -> usize {
    let own = usize::from(rules.label(node.rule) == Some(label));
    own + node
        .children
        .iter()
        .map(|child| count_labeled(rules, child, label))
        .sum::<usize>()
}

#[test]
fn test_parses_a_single_number() {
    let rules = calculator();
    let tree = rules.parse("42").unwrap();
    assert_eq!(rules.label(tree.rule), Some("input_line"));
    assert_eq!((tree.start, tree.end), (0, 2));
}

#[test]
fn test_parses_nested_expression() {
    let rules = calculator();
    let input = "1+2*(3+4)";
    let tree = rules.parse(input).unwrap();
    assert_eq!(tree.end, input.len());

    let number = find_labeled(&rules, &tree, "number").unwrap();
    assert_eq!(number.text(input), "1");
    assert_eq!(count_labeled(&rules, &tree, "number"), 4);
    // The parenthesized group covers "(3+4)".
    let group = find_labeled(&rules, &tree, "parens").unwrap();
    assert_eq!(group.text(input), "(3+4)");
}

#[test]
fn test_operator_chains_associate_in_order() {
    let rules = calculator();
    let input = "8/2/2";
    let tree = rules.parse(input).unwrap();
    assert_eq!(tree.end, input.len());
    assert_eq!(count_labeled(&rules, &tree, "factor"), 3);
}

#[test]
fn test_trailing_operator_is_an_enforced_failure() {
    let rules = calculator();
    match rules.parse("1+") {
        Err(MatchError::Enforced { expected, offset }) => {
            assert_eq!(expected, "term");
            assert_eq!(offset, 2);
        }
        other => panic!("expected an enforced failure, got {other:?}"),
    }
}

#[test]
fn test_unclosed_paren_reports_the_missing_brace() {
    let rules = calculator();
    match rules.parse("(1+2") {
        Err(MatchError::Enforced { expected, offset }) => {
            assert_eq!(expected, "')'");
            assert_eq!(offset, 4);
        }
        other => panic!("expected an enforced failure, got {other:?}"),
    }
}

#[test]
fn test_garbage_input_names_the_entry_rule() {
    let rules = calculator();
    match rules.parse("hello") {
        Err(MatchError::Enforced { expected, offset }) => {
            assert_eq!(expected, "input_line");
            assert_eq!(offset, 0);
        }
        other => panic!("expected an enforced failure, got {other:?}"),
    }
}

#[test]
fn test_trailing_garbage_fails_at_end_of_input() {
    let rules = calculator();
    match rules.parse("1+2x") {
        Err(MatchError::Enforced { offset, .. }) => assert_eq!(offset, 3),
        other => panic!("expected an enforced failure, got {other:?}"),
    }
}

#[test]
fn test_rule_set_is_reusable_across_parses() {
    let rules = calculator();
    for input in ["1", "(2)", "1+1", "9*(8-7)", "((((5))))"] {
        let tree = rules.parse(input).unwrap();
        assert_eq!(tree.end, input.len(), "failed to consume {input:?}");
    }
    assert!(rules.parse(")").is_err());
}

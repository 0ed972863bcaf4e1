//! Arithmetic expression parser built from mutually recursive rule
//! factories.
//!
//! Run with an expression argument:
//!
//! ```text
//! cargo run --example calculator -- "1+2*(3+4)"
//! ```

use rulegraph::{ConstructionError, ParseNode, RuleId, RuleSet, RuleSetBuilder};

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
        let digit = b.char_range('0', '9');
        Ok(b.one_or_more(digit))
    })
}

fn print_tree(rules: &RuleSet, input: &str, node: &ParseNode, depth: usize) {
    let name = rules
        .label(node.rule)
        .map_or_else(|| rules.description(node.rule), str::to_string);
    println!(
        "{:indent$}{name} [{}..{}] {:?}",
        "",
        node.start,
        node.end,
        node.text(input),
        indent = depth * 2
    );
    for child in &node.children {
        print_tree(rules, input, child, depth + 1);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "1+2*(3+4)".to_string());

    let mut b = RuleSetBuilder::new();
    let entry = input_line(&mut b)?;
    let rules = b.finish(entry)?;

    match rules.parse(&input) {
        Ok(tree) => print_tree(&rules, &input, &tree, 0),
        Err(err) => eprintln!("parse failed: {err}"),
    }
    Ok(())
}

//! Helpers behind the search bar: filter chips and query extension.

use super::ast::{LogicalOperator, Node};
use super::containment::{is_in_query, node_contains};
use super::parser::{ParseError, parse};

/// Canonical text of an expression: parentheses only where needed.
pub fn render(node: &Node) -> String {
    match node.unwrap_parens() {
        Node::Logical { operator, left, right } => {
            let side = |n: &Node| match (operator, n.unwrap_parens()) {
                (
                    LogicalOperator::And,
                    inner @ Node::Logical {
                        operator: LogicalOperator::Or,
                        ..
                    },
                ) => format!("({})", render(inner)),
                (_, inner) => render(inner),
            };
            format!("{} {} {}", side(&**left), operator, side(&**right))
        }
        other => other.to_string(),
    }
}

/// One label per top-level OR disjunct, skipping disjuncts already covered
/// by an earlier one.
pub fn summarize(text: &str) -> Result<Vec<String>, ParseError> {
    let node = parse(text)?;
    let mut kept: Vec<&Node> = Vec::new();
    for disjunct in node.flatten(LogicalOperator::Or) {
        if disjunct.is_empty() {
            continue;
        }
        if kept.iter().any(|k| node_contains(k, disjunct)) {
            continue;
        }
        kept.push(disjunct);
    }
    Ok(kept.into_iter().map(render).collect())
}

/// Add `addition` to `current` as another OR alternative unless it is
/// already covered.
pub fn extend_query(current: &str, addition: &str) -> String {
    let addition = addition.trim();
    if addition.is_empty() {
        return current.to_string();
    }
    if current.trim().is_empty() {
        return addition.to_string();
    }
    if is_in_query(current, addition) {
        return current.to_string();
    }
    let wrap = |text: &str| match parse(text) {
        Ok(node) if matches!(node.unwrap_parens(), Node::Logical { operator: LogicalOperator::And, .. }) => {
            format!("({})", text.trim())
        }
        _ => text.trim().to_string(),
    };
    format!("{} OR {}", current.trim(), wrap(addition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_keeps_needed_parentheses() {
        let node = parse("(a:1 OR a:2) AND b:3").unwrap();
        assert_eq!(render(&node), "(a:1 OR a:2) AND b:3");
        let node = parse("((a:1))").unwrap();
        assert_eq!(render(&node), "a:1");
    }

    #[test]
    fn test_summarize_splits_disjuncts() {
        assert_eq!(
            summarize("color:red OR (fruit:apple AND fruit:pear) OR color:red").unwrap(),
            vec!["color:red".to_string(), "fruit:apple AND fruit:pear".to_string()]
        );
        assert_eq!(summarize("").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_summarize_keeps_term_next_to_its_conjunction() {
        assert_eq!(
            summarize("(fruit:apple AND fruit:banana) OR fruit:apple").unwrap(),
            vec!["fruit:apple AND fruit:banana".to_string(), "fruit:apple".to_string()]
        );
    }

    #[test]
    fn test_extend_query() {
        assert_eq!(extend_query("", "color:red"), "color:red");
        assert_eq!(extend_query("color:red", "color:red"), "color:red");
        assert_eq!(extend_query("color:red", "color:blue"), "color:red OR color:blue");
        assert_eq!(
            extend_query("color:red", "fruit:apple AND fruit:pear"),
            "color:red OR (fruit:apple AND fruit:pear)"
        );
    }
}

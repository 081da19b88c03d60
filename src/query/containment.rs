//! Whether one query is already covered by another.
//!
//! Used to avoid showing the same filter twice. An AND filter and one of its
//! terms are distinct filters here: `a AND b` does not contain `a`.

use tracing::trace;

use super::ast::{LogicalOperator, Node, Tag};
use super::parser::parse;

/// Whether `candidate` is already represented by `outer`.
///
/// Unparseable input on either side is never contained.
pub fn is_in_query(outer: &str, candidate: &str) -> bool {
    let (Ok(outer), Ok(candidate)) = (parse(outer), parse(candidate)) else {
        trace!("containment check on unparseable input");
        return false;
    };
    node_contains(&outer, &candidate)
}

/// [`is_in_query`] over parsed expressions.
pub fn node_contains(outer: &Node, candidate: &Node) -> bool {
    let candidate = candidate.unwrap_parens();
    match outer.unwrap_parens() {
        Node::Empty => false,
        Node::Tag(tag) => single_tag(candidate).is_some_and(|c| c.same_term(tag)),
        Node::Logical {
            operator: LogicalOperator::Or,
            ..
        } => outer
            .flatten(LogicalOperator::Or)
            .into_iter()
            .any(|disjunct| node_contains(disjunct, candidate)),
        and @ Node::Logical {
            operator: LogicalOperator::And,
            ..
        } => match candidate {
            Node::Logical {
                operator: LogicalOperator::And,
                ..
            } => same_terms(and.tags(), candidate.tags()),
            _ => false,
        },
        // unwrap_parens never yields a parenthesized node
        Node::Parenthesized(_) => false,
    }
}

fn single_tag(node: &Node) -> Option<&Tag> {
    match node.unwrap_parens() {
        Node::Tag(tag) => Some(tag),
        _ => None,
    }
}

/// Multiset equality of terms, ignoring order.
fn same_terms(left: Vec<&Tag>, mut right: Vec<&Tag>) -> bool {
    if left.len() != right.len() {
        return false;
    }
    for tag in left {
        match right.iter().position(|r| r.same_term(tag)) {
            Some(i) => {
                right.swap_remove(i);
            }
            None => return false,
        }
    }
    right.is_empty()
}

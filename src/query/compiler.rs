//! Compiles a parsed query into per-column filter assignments.

use serde::{Deserialize, Serialize};

use super::ast::{LogicalOperator, Node};

/// Joins the terms of a composite filter value. Every joined term must match.
///
/// The parser refuses any tag value containing it, so a compiled term never
/// holds the separator.
pub const COMPOSITE_SEPARATOR: &str = "AND";

/// One `column <- value` assignment produced by [`compile`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterEntry {
    pub column: String,
    pub value: String,
}

impl FilterEntry {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.value.contains(COMPOSITE_SEPARATOR)
    }
}

/// Join terms into a composite filter value.
pub fn join_composite<S: AsRef<str>>(terms: &[S]) -> String {
    terms
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<&str>>()
        .join(COMPOSITE_SEPARATOR)
}

/// Split a filter value into its terms. A simple value yields itself.
pub fn split_composite(value: &str) -> Vec<&str> {
    value.split(COMPOSITE_SEPARATOR).collect()
}

/// Walk the expression and produce the filter entries it implies.
///
/// - tags without a field or with an empty value are dropped
/// - OR concatenates both sides
/// - AND with an empty side contributes nothing
/// - AND over a single shared column combines values pairwise into composites
/// - AND across different columns keeps every entry as an independent filter
pub fn compile(node: &Node) -> Vec<FilterEntry> {
    match node {
        Node::Tag(tag) => match &tag.field {
            Some(field) if !field.is_empty() && !tag.value.is_empty() => {
                vec![FilterEntry::new(field.clone(), tag.value.clone())]
            }
            _ => Vec::new(),
        },
        Node::Logical {
            operator: LogicalOperator::Or,
            left,
            right,
        } => {
            let mut entries = compile(left);
            entries.extend(compile(right));
            entries
        }
        Node::Logical {
            operator: LogicalOperator::And,
            left,
            right,
        } => {
            let left = compile(left);
            let right = compile(right);
            if left.is_empty() || right.is_empty() {
                return Vec::new();
            }
            match shared_column(&left, &right) {
                Some(column) => left
                    .iter()
                    .flat_map(|l| {
                        right
                            .iter()
                            .map(|r| FilterEntry::new(column, join_composite(&[&l.value, &r.value])))
                    })
                    .collect(),
                None => left.into_iter().chain(right).collect(),
            }
        }
        Node::Parenthesized(inner) => compile(inner),
        Node::Empty => Vec::new(),
    }
}

fn shared_column<'a>(left: &'a [FilterEntry], right: &[FilterEntry]) -> Option<&'a str> {
    let column = left.first()?.column.as_str();
    left.iter()
        .chain(right.iter())
        .all(|e| e.column == column)
        .then_some(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;
    use pretty_assertions::assert_eq;

    fn compiled(text: &str) -> Vec<FilterEntry> {
        compile(&parse(text).unwrap())
    }

    #[test]
    fn test_single_tag() {
        assert_eq!(compiled("color:red"), vec![FilterEntry::new("color", "red")]);
    }

    #[test]
    fn test_and_same_column_merges() {
        assert_eq!(
            compiled("color:red AND color:yellow"),
            vec![FilterEntry::new("color", "redANDyellow")]
        );
    }

    #[test]
    fn test_and_chain_same_column() {
        assert_eq!(
            compiled("color:red AND color:yellow AND color:brown"),
            vec![FilterEntry::new("color", "redANDyellowANDbrown")]
        );
    }

    #[test]
    fn test_and_across_columns_keeps_both() {
        assert_eq!(
            compiled("fruit:apple AND color:red"),
            vec![FilterEntry::new("fruit", "apple"), FilterEntry::new("color", "red")]
        );
    }

    #[test]
    fn test_or_keeps_duplicates() {
        assert_eq!(
            compiled("color:red OR color:red"),
            vec![FilterEntry::new("color", "red"), FilterEntry::new("color", "red")]
        );
    }

    #[test]
    fn test_and_with_dropped_side_vanishes() {
        assert_eq!(compiled("color:red AND hello"), vec![]);
        assert_eq!(compiled("color: AND color:red"), vec![]);
        assert_eq!(
            compiled("(color:red AND hello) OR fruit:apple"),
            vec![FilterEntry::new("fruit", "apple")]
        );
    }

    #[test]
    fn test_and_distributes_over_same_column_or() {
        assert_eq!(
            compiled("(color:red OR color:yellow) AND color:brown"),
            vec![
                FilterEntry::new("color", "redANDbrown"),
                FilterEntry::new("color", "yellowANDbrown"),
            ]
        );
    }

    #[test]
    fn test_parentheses_do_not_change_entries() {
        assert_eq!(compiled("(color:red)"), compiled("color:red"));
    }

    #[test]
    fn test_composite_terms_split_back_exactly() {
        let entries = compiled("maker:Bandai AND maker:\"grand tour\"");
        assert_eq!(entries, vec![FilterEntry::new("maker", "BandaiANDgrand tour")]);
        assert_eq!(split_composite(&entries[0].value), vec!["Bandai", "grand tour"]);
        assert!(parse("maker:BANDAI AND maker:x").is_err());
    }

    #[test]
    fn test_split_composite() {
        assert_eq!(split_composite("redANDyellow"), vec!["red", "yellow"]);
        assert_eq!(split_composite("red"), vec!["red"]);
    }
}

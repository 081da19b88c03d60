use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

/// Comparison written between a tag's field and its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr, EnumString, Serialize, Deserialize)]
pub enum TagOperator {
    #[default]
    #[strum(serialize = ":")]
    Contains,
    #[strum(serialize = ":=")]
    Equals,
    #[strum(serialize = ":>")]
    GreaterThan,
    #[strum(serialize = ":>=")]
    GreaterThanOrEqual,
    #[strum(serialize = ":<")]
    LessThan,
    #[strum(serialize = ":<=")]
    LessThanOrEqual,
}

/// Boolean connective of a logical expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
}

/// A single `field:value` term. `field` is `None` for bare terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub field: Option<String>,
    pub operator: TagOperator,
    pub value: String,
    /// Whether the value was written in quotes
    #[serde(default)]
    pub quoted: bool,
}

impl Tag {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            operator: TagOperator::Contains,
            value: value.into(),
            quoted: false,
        }
    }

    /// Equality used when comparing query terms: field, operator and value.
    pub fn same_term(&self, other: &Tag) -> bool {
        self.field == other.field && self.operator == other.operator && self.value == other.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let needs_quotes = self.quoted
            || self.value.is_empty()
            || self
                .value
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'' | ':'));
        let value = if needs_quotes {
            format!("\"{}\"", self.value.replace('\\', "\\\\").replace('"', "\\\""))
        } else {
            self.value.clone()
        };
        match &self.field {
            Some(field) => write!(f, "{}{}{}", field, self.operator, value),
            None => write!(f, "{}", value),
        }
    }
}

/// Parsed query expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Tag(Tag),
    Logical {
        operator: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Parenthesized(Box<Node>),
    Empty,
}

impl Node {
    pub fn and(left: Node, right: Node) -> Self {
        Node::Logical {
            operator: LogicalOperator::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Logical {
            operator: LogicalOperator::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// The node with any enclosing parentheses removed
    pub fn unwrap_parens(&self) -> &Node {
        let mut node = self;
        while let Node::Parenthesized(inner) = node {
            node = inner;
        }
        node
    }

    /// All tags in the tree, left to right.
    pub fn tags(&self) -> Vec<&Tag> {
        let mut out = Vec::new();
        self.collect_tags(&mut out);
        out
    }

    fn collect_tags<'a>(&'a self, out: &mut Vec<&'a Tag>) {
        match self {
            Node::Tag(tag) => out.push(tag),
            Node::Logical { left, right, .. } => {
                left.collect_tags(out);
                right.collect_tags(out);
            }
            Node::Parenthesized(inner) => inner.collect_tags(out),
            Node::Empty => {}
        }
    }

    /// Operands of a chain of `operator`, looking through parentheses.
    pub fn flatten(&self, operator: LogicalOperator) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_operands(operator, &mut out);
        out
    }

    fn collect_operands<'a>(&'a self, operator: LogicalOperator, out: &mut Vec<&'a Node>) {
        match self.unwrap_parens() {
            Node::Logical { operator: op, left, right } if *op == operator => {
                left.collect_operands(operator, out);
                right.collect_operands(operator, out);
            }
            other => out.push(other),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Tag(tag) => write!(f, "{tag}"),
            Node::Logical { operator, left, right } => write!(f, "{left} {operator} {right}"),
            Node::Parenthesized(inner) => write!(f, "({inner})"),
            Node::Empty => Ok(()),
        }
    }
}

//! Query text to [`Node`] parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! query   := or?
//! or      := and ("OR" and)*
//! and     := unary ("AND"? unary)*
//! unary   := ("NOT" | "-") unary | primary
//! primary := "(" or ")" | term
//! term    := field op value | value
//! op      := ":" | ":=" | ":>" | ":>=" | ":<" | ":<="
//! ```
//!
//! Both connectives are left-associative and AND binds tighter than OR.
//! Adjacent terms are joined with an implicit AND. Negation is recognized so
//! it can be rejected with a precise error instead of being dropped.

use std::str::FromStr;

use thiserror::Error;
use tracing::trace;

use super::ast::{Node, Tag, TagOperator};
use super::compiler::COMPOSITE_SEPARATOR;

/// Errors raised while parsing query text. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { position: usize, found: String },
    #[error("query ended unexpectedly")]
    UnexpectedEnd,
    #[error("unterminated quote starting at position {position}")]
    UnterminatedQuote { position: usize },
    #[error("unbalanced parenthesis at position {position}")]
    UnbalancedParenthesis { position: usize },
    #[error("negation at position {position} is not supported")]
    UnsupportedNegation { position: usize },
    #[error("'{word}' at position {position} is a reserved word and cannot be used as a value")]
    ReservedWord { position: usize, word: String },
    #[error("value '{value}' at position {position} contains '{separator}', which joins filter terms")]
    SeparatorInValue {
        position: usize,
        value: String,
        separator: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Term(Tag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

impl Token {
    fn describe(&self) -> String {
        match &self.kind {
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::And => "AND".to_string(),
            TokenKind::Or => "OR".to_string(),
            TokenKind::Not => "NOT".to_string(),
            TokenKind::Term(tag) => tag.to_string(),
        }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    if word.eq_ignore_ascii_case("AND") {
        Some(TokenKind::And)
    } else if word.eq_ignore_ascii_case("OR") {
        Some(TokenKind::Or)
    } else if word.eq_ignore_ascii_case("NOT") {
        Some(TokenKind::Not)
    } else {
        None
    }
}

fn is_word_end(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.pos;
            let Some(c) = self.peek() else { break };
            let kind = match c {
                '(' => {
                    self.bump();
                    TokenKind::LParen
                }
                ')' => {
                    self.bump();
                    TokenKind::RParen
                }
                '-' if self.src[self.pos + 1..].chars().next().is_some_and(|n| !is_word_end(n)) => {
                    self.bump();
                    TokenKind::Not
                }
                '"' | '\'' => {
                    let value = self.quoted()?;
                    TokenKind::Term(Tag {
                        field: None,
                        operator: TagOperator::Contains,
                        value,
                        quoted: true,
                    })
                }
                _ => self.word_or_tag(position)?,
            };
            tokens.push(Token { kind, position });
        }
        Ok(tokens)
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let Some(delim) = self.bump() else {
            return Err(ParseError::UnexpectedEnd);
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedQuote { position: start }),
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(ParseError::UnterminatedQuote { position: start }),
                },
                Some(c) if c == delim => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }

    fn read_until(&mut self, stop: impl Fn(char) -> bool) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(|c| !stop(c)) {
            self.bump();
        }
        &src[start..self.pos]
    }

    fn operator(&mut self) -> TagOperator {
        // the leading ':' has been consumed
        let rest = &self.src[self.pos..];
        let (op, len) = if rest.starts_with(">=") {
            (TagOperator::GreaterThanOrEqual, 2)
        } else if rest.starts_with("<=") {
            (TagOperator::LessThanOrEqual, 2)
        } else if rest.starts_with('>') {
            (TagOperator::GreaterThan, 1)
        } else if rest.starts_with('<') {
            (TagOperator::LessThan, 1)
        } else if rest.starts_with('=') {
            (TagOperator::Equals, 1)
        } else {
            (TagOperator::Contains, 0)
        };
        self.pos += len;
        op
    }

    fn word_or_tag(&mut self, position: usize) -> Result<TokenKind, ParseError> {
        let word = self.read_until(|c| is_word_end(c) || c == ':');
        if self.peek() != Some(':') {
            if let Some(kw) = keyword(word) {
                return Ok(kw);
            }
            return Ok(TokenKind::Term(Tag {
                field: None,
                operator: TagOperator::Contains,
                value: word.to_string(),
                quoted: false,
            }));
        }

        self.bump();
        let field = word.to_string();
        let operator = self.operator();
        let value_position = self.pos;
        let (value, quoted) = match self.peek() {
            Some('"') | Some('\'') => (self.quoted()?, true),
            _ => (self.read_until(is_word_end).to_string(), false),
        };
        if !quoted && keyword(&value).is_some() {
            return Err(ParseError::ReservedWord {
                position: value_position,
                word: value,
            });
        }
        if value.contains(COMPOSITE_SEPARATOR) {
            return Err(ParseError::SeparatorInValue {
                position: value_position,
                value,
                separator: COMPOSITE_SEPARATOR,
            });
        }
        if field.is_empty() {
            return Err(ParseError::UnexpectedToken {
                position,
                found: ":".to_string(),
            });
        }
        Ok(TokenKind::Term(Tag {
            field: Some(field),
            operator,
            value,
            quoted,
        }))
    }
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_and()?;
        while matches!(self.peek(), Some(Token { kind: TokenKind::Or, .. })) {
            self.next();
            let right = self.parse_and()?;
            node = Node::or(node, right);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_unary()?;
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::And) => {
                    self.next();
                }
                // implicit AND between adjacent operands
                Some(TokenKind::Term(_)) | Some(TokenKind::LParen) | Some(TokenKind::Not) => {}
                _ => break,
            }
            let right = self.parse_unary()?;
            node = Node::and(node, right);
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(Token { kind: TokenKind::Not, position }) => {
                Err(ParseError::UnsupportedNegation { position: *position })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.next().ok_or(ParseError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Term(tag) => Ok(Node::Tag(tag)),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(Node::Parenthesized(Box::new(inner))),
                    Some(other) => Err(ParseError::UnexpectedToken {
                        position: other.position,
                        found: other.describe(),
                    }),
                    None => Err(ParseError::UnbalancedParenthesis {
                        position: token.position,
                    }),
                }
            }
            _ => Err(ParseError::UnexpectedToken {
                position: token.position,
                found: token.describe(),
            }),
        }
    }
}

/// Parse query text into an expression tree.
///
/// Empty or whitespace-only text yields [`Node::Empty`].
pub fn parse(text: &str) -> Result<Node, ParseError> {
    let tokens = Lexer::new(text).tokenize()?;
    if tokens.is_empty() {
        return Ok(Node::Empty);
    }
    let mut parser = Parser { tokens, index: 0 };
    let node = parser.parse_or()?;
    if let Some(extra) = parser.next() {
        return Err(match extra.kind {
            TokenKind::RParen => ParseError::UnbalancedParenthesis {
                position: extra.position,
            },
            _ => ParseError::UnexpectedToken {
                position: extra.position,
                found: extra.describe(),
            },
        });
    }
    trace!("parsed query {:?} into {:?}", text, node);
    Ok(node)
}

impl FromStr for Node {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::LogicalOperator;
    use pretty_assertions::assert_eq;

    fn tag(field: &str, value: &str) -> Node {
        Node::Tag(Tag::new(field, value))
    }

    #[test]
    fn test_parse_empty_and_whitespace() {
        assert_eq!(parse("").unwrap(), Node::Empty);
        assert_eq!(parse("   \t ").unwrap(), Node::Empty);
    }

    #[test]
    fn test_parse_single_tag() {
        assert_eq!(parse("color:red").unwrap(), tag("color", "red"));
    }

    #[test]
    fn test_parse_quoted_value() {
        let node = parse("place:\"Tell el-Amarna\"").unwrap();
        let Node::Tag(t) = node else { panic!("expected tag") };
        assert_eq!(t.field.as_deref(), Some("place"));
        assert_eq!(t.value, "Tell el-Amarna");
        assert!(t.quoted);
    }

    #[test]
    fn test_parse_escaped_quote() {
        let Node::Tag(t) = parse(r#"title:"say \"hi\"""#).unwrap() else {
            panic!("expected tag")
        };
        assert_eq!(t.value, "say \"hi\"");
    }

    #[test]
    fn test_parse_non_latin_value() {
        let Node::Tag(t) = parse("word:كتاب").unwrap() else { panic!("expected tag") };
        assert_eq!(t.value, "كتاب");
    }

    #[test]
    fn test_parse_operators() {
        let Node::Tag(t) = parse("year:>=1900").unwrap() else { panic!("expected tag") };
        assert_eq!(t.operator, TagOperator::GreaterThanOrEqual);
        assert_eq!(t.value, "1900");
        let Node::Tag(t) = parse("id:=abc").unwrap() else { panic!("expected tag") };
        assert_eq!(t.operator, TagOperator::Equals);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let node = parse("a:1 OR b:2 AND c:3").unwrap();
        assert_eq!(node, Node::or(tag("a", "1"), Node::and(tag("b", "2"), tag("c", "3"))));
    }

    #[test]
    fn test_left_associative() {
        let node = parse("a:1 OR a:2 OR a:3").unwrap();
        assert_eq!(node, Node::or(Node::or(tag("a", "1"), tag("a", "2")), tag("a", "3")));
    }

    #[test]
    fn test_implicit_and() {
        let node = parse("a:1 b:2").unwrap();
        assert_eq!(node, Node::and(tag("a", "1"), tag("b", "2")));
    }

    #[test]
    fn test_parentheses() {
        let node = parse("(a:1 OR a:2) AND b:3").unwrap();
        let Node::Logical { operator, left, .. } = node else { panic!("expected logical") };
        assert_eq!(operator, LogicalOperator::And);
        assert!(matches!(*left, Node::Parenthesized(_)));
    }

    #[test]
    fn test_lowercase_keywords() {
        assert_eq!(parse("a:1 or a:2").unwrap(), Node::or(tag("a", "1"), tag("a", "2")));
    }

    #[test]
    fn test_bare_term_has_no_field() {
        let Node::Tag(t) = parse("hello").unwrap() else { panic!("expected tag") };
        assert_eq!(t.field, None);
        assert_eq!(t.value, "hello");
    }

    #[test]
    fn test_hyphen_inside_value_is_not_negation() {
        assert_eq!(parse("place:el-Amarna").unwrap(), tag("place", "el-Amarna"));
    }

    #[test]
    fn test_negation_is_rejected() {
        assert_eq!(parse("NOT a:1"), Err(ParseError::UnsupportedNegation { position: 0 }));
        assert_eq!(parse("b:2 -a:1"), Err(ParseError::UnsupportedNegation { position: 4 }));
    }

    #[test]
    fn test_malformed_queries() {
        assert!(matches!(parse("a:1 AND"), Err(ParseError::UnexpectedEnd)));
        assert!(matches!(parse("(a:1"), Err(ParseError::UnbalancedParenthesis { .. })));
        assert!(matches!(parse("a:1)"), Err(ParseError::UnbalancedParenthesis { .. })));
        assert!(matches!(parse("a:\"open"), Err(ParseError::UnterminatedQuote { .. })));
        assert!(matches!(parse("OR a:1"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse("a:AND"), Err(ParseError::ReservedWord { .. })));
    }

    #[test]
    fn test_value_containing_separator_is_rejected() {
        assert!(matches!(
            parse("brand:BANDIT"),
            Err(ParseError::SeparatorInValue { position: 6, .. })
        ));
        assert!(matches!(parse("brand:\"AND\""), Err(ParseError::SeparatorInValue { .. })));
        assert!(matches!(parse("place:'al ANDALUS'"), Err(ParseError::SeparatorInValue { .. })));
        // only the exact separator spelling joins terms
        assert!(parse("brand:Bandit").is_ok());
    }

    #[test]
    fn test_empty_value_is_kept() {
        let Node::Tag(t) = parse("a:").unwrap() else { panic!("expected tag") };
        assert_eq!(t.value, "");
    }
}

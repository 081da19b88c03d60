//! Search-bar query language: parsing, compilation into column filters,
//! and containment between queries.

pub mod ast;
pub mod bar;
pub mod compiler;
pub mod containment;
pub mod parser;
pub mod table;

pub use ast::{LogicalOperator, Node, Tag, TagOperator};
pub use bar::{extend_query, render, summarize};
pub use compiler::{COMPOSITE_SEPARATOR, FilterEntry, compile};
pub use containment::is_in_query;
pub use parser::{ParseError, parse};
pub use table::{FilterTable, FilterValueSet, InMemoryTable, Row, apply_entries, apply_query, clear_filters, row_matches};

//! Column filter contract between the query compiler and a tabular view,
//! plus the row predicate the resulting filter sets imply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::compiler::{FilterEntry, compile, split_composite};
use super::parser::{ParseError, parse};

/// Filter values of one column, keyed by (possibly composite) value.
pub type FilterValueSet = BTreeMap<String, u32>;

/// A row of a table: column id to the column's (possibly multiple) values.
pub type Row = BTreeMap<String, Vec<String>>;

/// What the filter compiler needs from a table.
pub trait FilterTable {
    fn has_column(&self, id: &str) -> bool;
    fn filter_value(&self, id: &str) -> Option<&FilterValueSet>;
    fn set_filter_value(&mut self, id: &str, value: FilterValueSet);
    fn toggle_visibility(&mut self, id: &str, visible: bool);
    fn reset_column_filters(&mut self);
    fn reset_column_visibility(&mut self);
}

/// Reset every column filter and column visibility.
pub fn clear_filters<T: FilterTable + ?Sized>(table: &mut T) {
    table.reset_column_filters();
    table.reset_column_visibility();
}

/// Replace the table's filter state with `entries`.
pub fn apply_entries<T: FilterTable + ?Sized>(table: &mut T, entries: &[FilterEntry]) {
    clear_filters(table);
    for entry in entries {
        if !table.has_column(&entry.column) {
            warn!("Query names unknown column '{}', skipping", entry.column);
            continue;
        }
        table.toggle_visibility(&entry.column, true);
        let mut values = table.filter_value(&entry.column).cloned().unwrap_or_default();
        values.insert(entry.value.clone(), 1);
        table.set_filter_value(&entry.column, values);
    }
}

/// Parse, compile and apply a query. On a parse error the table is untouched.
pub fn apply_query<T: FilterTable + ?Sized>(
    table: &mut T,
    text: &str,
) -> Result<Vec<FilterEntry>, ParseError> {
    let node = parse(text)?;
    let entries = compile(&node);
    debug!("Applying {} filter entries for {:?}", entries.len(), text);
    apply_entries(table, &entries);
    Ok(entries)
}

fn term_found(values: &[String], term: &str) -> bool {
    values.iter().any(|v| v.contains(term))
}

/// Whether a cell satisfies a column's filter set.
///
/// An empty set matches everything. Otherwise one key must match: a composite
/// key needs every term found in the cell, a simple key needs its one term.
pub fn row_matches(values: &[String], filter: &FilterValueSet) -> bool {
    if filter.is_empty() {
        return true;
    }
    filter
        .keys()
        .any(|key| split_composite(key).into_iter().all(|term| term_found(values, term)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ColumnState {
    visible: bool,
    filter: Option<FilterValueSet>,
}

/// Table state held in memory: column visibility and filter sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryTable {
    columns: BTreeMap<String, ColumnState>,
    default_visible: BTreeMap<String, bool>,
}

impl InMemoryTable {
    /// Columns are visible by default.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_visibility(columns.into_iter().map(|c| (c, true)))
    }

    pub fn with_visibility<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let default_visible: BTreeMap<String, bool> =
            columns.into_iter().map(|(c, v)| (c.into(), v)).collect();
        let columns = default_visible
            .iter()
            .map(|(c, v)| {
                (
                    c.clone(),
                    ColumnState {
                        visible: *v,
                        filter: None,
                    },
                )
            })
            .collect();
        Self {
            columns,
            default_visible,
        }
    }

    pub fn column_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.columns.get(id).is_some_and(|c| c.visible)
    }

    /// Columns that currently carry a filter
    pub fn active_filters(&self) -> BTreeMap<&str, &FilterValueSet> {
        self.columns
            .iter()
            .filter_map(|(id, c)| c.filter.as_ref().map(|f| (id.as_str(), f)))
            .collect()
    }

    /// Whether a row passes every column filter.
    pub fn matches(&self, row: &Row) -> bool {
        let empty = Vec::new();
        self.active_filters()
            .into_iter()
            .all(|(id, filter)| row_matches(row.get(id).unwrap_or(&empty), filter))
    }

    /// Rows that pass every column filter, in input order.
    pub fn filter_rows<'a>(&self, rows: &'a [Row]) -> Vec<&'a Row> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

impl FilterTable for InMemoryTable {
    fn has_column(&self, id: &str) -> bool {
        self.columns.contains_key(id)
    }

    fn filter_value(&self, id: &str) -> Option<&FilterValueSet> {
        self.columns.get(id).and_then(|c| c.filter.as_ref())
    }

    fn set_filter_value(&mut self, id: &str, value: FilterValueSet) {
        if let Some(column) = self.columns.get_mut(id) {
            column.filter = Some(value);
        }
    }

    fn toggle_visibility(&mut self, id: &str, visible: bool) {
        if let Some(column) = self.columns.get_mut(id) {
            column.visible = visible;
        }
    }

    fn reset_column_filters(&mut self) {
        for column in self.columns.values_mut() {
            column.filter = None;
        }
    }

    fn reset_column_visibility(&mut self) {
        for (id, column) in self.columns.iter_mut() {
            column.visible = self.default_visible.get(id).copied().unwrap_or(true);
        }
    }
}

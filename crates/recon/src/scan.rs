//! Relation-scan collaborator.
//!
//! The engine never touches storage directly: it asks a [`RelationScanner`]
//! for a projection of a named relation and consumes the rows as a stream.
//! [`MemoryCatalog`] is the in-process implementation used by the CLI and tests.

use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::Row;
use crate::value::Value;

/// Stream of projected rows. Per-row read failures are yielded as `Err`.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Row, ReconError>> + 'a>;

#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    pub relation: &'a str,
    /// Rows come back with values in exactly this order.
    pub columns: &'a [String],
}

pub trait RelationScanner {
    /// Start a scan. Unknown relations and columns fail here with a schema error.
    fn scan<'a>(&'a self, request: &ScanRequest<'_>) -> Result<RowIter<'a>, ReconError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with `Null`.
    pub fn push(&mut self, mut row: Row) {
        if row.len() < self.columns.len() {
            row.resize(self.columns.len(), Value::Null);
        }
        self.rows.push(row);
    }

    pub fn with_row(mut self, row: Row) -> Self {
        self.push(row);
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Named tables held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: HashMap<String, Table>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.insert(name, table);
        self
    }
}

impl RelationScanner for MemoryCatalog {
    fn scan<'a>(&'a self, request: &ScanRequest<'_>) -> Result<RowIter<'a>, ReconError> {
        let table = self
            .tables
            .get(request.relation)
            .ok_or_else(|| ReconError::schema(request.relation, "relation not found"))?;

        let indices = request
            .columns
            .iter()
            .map(|c| {
                table
                    .column_index(c)
                    .ok_or_else(|| ReconError::missing_column(request.relation, c))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Box::new(table.rows.iter().map(move |row| {
            Ok(indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect())
        })))
    }
}

use std::collections::HashMap;
use std::sync::Arc;

pub use rusqlite::types::Value;

/// A row from a query result.
///
/// Column names are shared across all rows of one result set.
#[derive(Debug, Clone)]
pub struct Row {
    /// The column names for this row
    pub columns: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<Value>,
    // Lookup cache built once per result set, shared by all of its rows
    column_index: Arc<HashMap<String, usize>>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        let column_index = Arc::new(index_columns(&columns));
        Self {
            columns,
            values,
            column_index,
        }
    }

    pub(crate) fn with_shared_index(
        columns: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<Value>,
    ) -> Self {
        Self {
            columns,
            values,
            column_index,
        }
    }

    /// Get a value by column name, or `None` if the column is absent.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self
            .column_index
            .get(column)
            .copied()
            .or_else(|| self.columns.iter().position(|c| c == column))?;
        self.values.get(idx)
    }

    /// Get a value by column index, or `None` if out of bounds.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Build the name-to-position lookup for one result set's columns.
pub(crate) fn index_columns(columns: &[String]) -> HashMap<String, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

/// Convenience accessors for result values.
pub trait ValueExt {
    fn as_int(&self) -> Option<i64>;
    fn as_real(&self) -> Option<f64>;
    fn as_text(&self) -> Option<&str>;
    fn is_null(&self) -> bool;
}

impl ValueExt for Value {
    fn as_int(&self) -> Option<i64> {
        if let Value::Integer(i) = self { Some(*i) } else { None }
    }

    fn as_real(&self) -> Option<f64> {
        if let Value::Real(f) = self { Some(*f) } else { None }
    }

    fn as_text(&self) -> Option<&str> {
        if let Value::Text(s) = self { Some(s) } else { None }
    }

    fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

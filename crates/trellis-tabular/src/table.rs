// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Column-oriented table built from JSON payloads.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Name given to the single column of a table built from a plain array.
pub const SCALAR_COLUMN: &str = "0";

/// Errors raised while shaping a payload into a [`Table`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    /// The payload has no tabular interpretation.
    #[error("payload is not tabular: {0}")]
    NotTabular(&'static str),
    /// A column's length disagrees with the table's row count.
    #[error("column '{name}' has {len} rows, expected {expected}")]
    RaggedColumn {
        /// Column name.
        name: String,
        /// Rows found in the column.
        len: usize,
        /// Rows the table already has.
        expected: usize,
    },
    /// Two columns share a name.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// A named column of JSON cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Cells, one per row.
    pub values: Vec<Value>,
}

/// Ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Empty table (no columns, no rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, cells)` pairs in order.
    pub fn from_columns<I, N>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (N, Vec<Value>)>,
        N: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Appends a column. The first column fixes the row count.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(TableError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.values.len() != values.len() {
                return Err(TableError::RaggedColumn {
                    name,
                    len: values.len(),
                    expected: first.values.len(),
                });
            }
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Interprets a JSON payload as a table.
    ///
    /// Accepted shapes: `null`, an array of record objects, an array of
    /// scalars (one column named [`SCALAR_COLUMN`]), or an object mapping
    /// column names to equally long arrays.
    pub fn from_json(payload: &Value) -> Result<Self, TableError> {
        match payload {
            Value::Null => Ok(Self::new()),
            Value::Array(rows) => Self::from_rows(rows),
            Value::Object(columns) => Self::from_column_object(columns),
            _ => Err(TableError::NotTabular("expected an array, an object or null")),
        }
    }

    fn from_rows(rows: &[Value]) -> Result<Self, TableError> {
        if rows.is_empty() {
            return Ok(Self::new());
        }
        if rows.iter().all(Value::is_object) {
            return Ok(Self::from_records(rows));
        }
        if rows.iter().any(|row| row.is_object() || row.is_array()) {
            return Err(TableError::NotTabular("rows mix records and scalars"));
        }
        Self::from_columns([(SCALAR_COLUMN, rows.to_vec())])
    }

    fn from_records(rows: &[Value]) -> Self {
        let mut columns: Vec<Column> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (row_idx, row) in rows.iter().enumerate() {
            let Some(record) = row.as_object() else {
                continue;
            };
            for (key, cell) in record {
                let slot = *index.entry(key.clone()).or_insert_with(|| {
                    columns.push(Column {
                        name: key.clone(),
                        values: vec![Value::Null; row_idx],
                    });
                    columns.len() - 1
                });
                columns[slot].values.push(cell.clone());
            }
            for column in &mut columns {
                if column.values.len() <= row_idx {
                    column.values.push(Value::Null);
                }
            }
        }
        Self { columns }
    }

    fn from_column_object(object: &Map<String, Value>) -> Result<Self, TableError> {
        let mut table = Self::new();
        for (name, cells) in object {
            let Value::Array(cells) = cells else {
                return Err(TableError::NotTabular("column object values must be arrays"));
            };
            table.push_column(name.clone(), cells.clone())?;
        }
        Ok(table)
    }

    /// Columns in insertion order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Row-major view: one JSON object per row, keys in column order.
    pub fn to_records(&self) -> Vec<Value> {
        (0..self.num_rows())
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[row].clone()))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }
}

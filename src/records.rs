//! In-memory order record table.
//!
//! Rows are stored in input order as vectors of optional cells aligned with
//! [`RecordTable::columns`]. `None` is the null marker. Every pipeline stage
//! takes the table by value and hands back the transformed table, so a
//! single owner exists at each point of a run.

use crate::{
    data::{ColumnType, Value},
    error::{EtlError, Result},
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    columns: Vec<ColumnMeta>,
    rows: Vec<Row>,
}

impl RecordTable {
    /// Builds a table, padding or truncating each row to the column count.
    pub fn new(columns: Vec<ColumnMeta>, mut rows: Vec<Row>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, None);
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| EtlError::MissingColumn(name.to_string()))
    }

    pub fn rename_columns<F>(mut self, mut rename: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        for column in &mut self.columns {
            column.name = rename(&column.name);
        }
        self
    }

    /// Appends a column computed from each existing row.
    pub fn with_column<F>(mut self, meta: ColumnMeta, mut compute: F) -> Result<Self>
    where
        F: FnMut(usize, &Row) -> Result<Option<Value>>,
    {
        let mut computed = Vec::with_capacity(self.rows.len());
        for (idx, row) in self.rows.iter().enumerate() {
            computed.push(compute(idx, row)?);
        }
        for (row, value) in self.rows.iter_mut().zip(computed) {
            row.push(value);
        }
        self.columns.push(meta);
        Ok(self)
    }

    /// Removes columns by name; every name must be present.
    pub fn without_columns(mut self, names: &[&str]) -> Result<Self> {
        let mut dropped = Vec::with_capacity(names.len());
        for name in names {
            dropped.push(self.require(name)?);
        }
        let keep = (0..self.columns.len())
            .map(|idx| !dropped.contains(&idx))
            .collect::<Vec<_>>();
        self.columns = retain_by_mask(self.columns, &keep);
        self.rows = self
            .rows
            .into_iter()
            .map(|row| retain_by_mask(row, &keep))
            .collect();
        Ok(self)
    }

    /// Rewrites every cell of one column and sets its declared type.
    pub fn map_column<F>(
        mut self,
        name: &str,
        datatype: ColumnType,
        mut convert: F,
    ) -> Result<Self>
    where
        F: FnMut(usize, Option<Value>) -> Result<Option<Value>>,
    {
        let idx = self.require(name)?;
        for (row_idx, row) in self.rows.iter_mut().enumerate() {
            let current = row[idx].take();
            row[idx] = convert(row_idx, current)?;
        }
        self.columns[idx].datatype = datatype;
        Ok(self)
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}

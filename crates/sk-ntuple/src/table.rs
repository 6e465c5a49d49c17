//! Flat output table with a schema fixed at configuration time.
//!
//! Columns are grouped by dotted namespace (`event.*`, `channel.*`,
//! `finalstate.*`, `<role>.*`, `<role>Flv.*`, `l<i>.*`, ...). The schema is
//! built once from the channel descriptor; every appended record must fill
//! it exactly. Unavailable numeric fields carry the sentinel, not null.

use std::collections::HashMap;

use serde::Serialize;

use sk_core::{Error, Result};

/// Sentinel written into numeric fields with no valid source (fixed-width
/// record convention inherited from the output format).
pub const SENTINEL: f64 = -9.0;

/// Column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// 64-bit float.
    F64,
    /// 64-bit integer.
    I64,
    /// Short string (flavor tags, channel label).
    Str,
}

/// One column declaration.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSpec {
    /// Dotted column name, e.g. `z1.mass`.
    pub name: String,
    /// Column type.
    pub kind: ColumnKind,
}

impl ColumnSpec {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnSpec { name: name.into(), kind }
    }
}

/// One cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// Float cell.
    F64(f64),
    /// Integer cell.
    I64(i64),
    /// String cell.
    Str(String),
}

impl ColumnValue {
    fn kind(&self) -> ColumnKind {
        match self {
            ColumnValue::F64(_) => ColumnKind::F64,
            ColumnValue::I64(_) => ColumnKind::I64,
            ColumnValue::Str(_) => ColumnKind::Str,
        }
    }
}

/// Column storage.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ColumnData {
    /// Float column.
    F64(Vec<f64>),
    /// Integer column.
    I64(Vec<i64>),
    /// String column.
    Str(Vec<String>),
}

impl ColumnData {
    fn empty(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::F64 => ColumnData::F64(Vec::new()),
            ColumnKind::I64 => ColumnData::I64(Vec::new()),
            ColumnKind::Str => ColumnData::Str(Vec::new()),
        }
    }

    fn push(&mut self, value: ColumnValue) {
        match (self, value) {
            (ColumnData::F64(v), ColumnValue::F64(x)) => v.push(x),
            (ColumnData::I64(v), ColumnValue::I64(x)) => v.push(x),
            (ColumnData::Str(v), ColumnValue::Str(x)) => v.push(x),
            _ => unreachable!("type checked before push"),
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::F64(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    /// True when the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One materialized event, as dotted column name → value.
#[derive(Debug, Clone, Default)]
pub struct OutputRecord {
    values: HashMap<String, ColumnValue>,
}

impl OutputRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a float cell.
    pub fn set_f64(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), ColumnValue::F64(value));
    }

    /// Set an integer cell.
    pub fn set_i64(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), ColumnValue::I64(value));
    }

    /// Set a string cell.
    pub fn set_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), ColumnValue::Str(value.into()));
    }

    /// Read back a cell.
    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.values.get(name)
    }

    /// Number of cells set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no cell has been set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Columnar output sink with a fixed schema.
#[derive(Debug, Clone, Serialize)]
pub struct OutputTable {
    schema: Vec<ColumnSpec>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    columns: Vec<ColumnData>,
    n_rows: usize,
}

impl OutputTable {
    /// Build an empty table; duplicate column names are a configuration
    /// error.
    pub fn new(schema: Vec<ColumnSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(schema.len());
        let mut columns = Vec::with_capacity(schema.len());
        for (i, spec) in schema.iter().enumerate() {
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(Error::Config(format!("duplicate output column '{}'", spec.name)));
            }
            columns.push(ColumnData::empty(spec.kind));
        }
        Ok(OutputTable { schema, index, columns, n_rows: 0 })
    }

    /// Append one record. The record must provide a value of the declared
    /// type for every schema column and nothing else.
    pub fn append(&mut self, record: &OutputRecord) -> Result<()> {
        if record.len() != self.schema.len() {
            return Err(Error::Schema(format!(
                "record has {} cells, schema has {} columns",
                record.len(),
                self.schema.len()
            )));
        }
        for (i, spec) in self.schema.iter().enumerate() {
            let value = record
                .get(&spec.name)
                .ok_or_else(|| Error::Schema(format!("record missing column '{}'", spec.name)))?;
            if value.kind() != spec.kind {
                return Err(Error::Schema(format!(
                    "column '{}' expects {:?}, record holds {:?}",
                    spec.name,
                    spec.kind,
                    value.kind()
                )));
            }
            self.columns[i].push(value.clone());
        }
        self.n_rows += 1;
        Ok(())
    }

    /// Number of stored rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Declared schema.
    pub fn schema(&self) -> &[ColumnSpec] {
        &self.schema
    }

    /// Column data by name.
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.index.get(name).map(|&i| &self.columns[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("event.evt", ColumnKind::I64),
            ColumnSpec::new("z1.mass", ColumnKind::F64),
            ColumnSpec::new("z1Flv.Flv", ColumnKind::Str),
        ]
    }

    fn record() -> OutputRecord {
        let mut r = OutputRecord::new();
        r.set_i64("event.evt", 7);
        r.set_f64("z1.mass", 91.2);
        r.set_str("z1Flv.Flv", "ee");
        r
    }

    #[test]
    fn append_and_read_back() {
        let mut t = OutputTable::new(schema()).unwrap();
        t.append(&record()).unwrap();
        assert_eq!(t.n_rows(), 1);
        match t.column("z1.mass").unwrap() {
            ColumnData::F64(v) => assert_eq!(v, &[91.2]),
            _ => panic!("wrong column type"),
        }
    }

    #[test]
    fn incomplete_record_rejected() {
        let mut t = OutputTable::new(schema()).unwrap();
        let mut r = OutputRecord::new();
        r.set_i64("event.evt", 7);
        assert!(t.append(&r).is_err());
    }

    #[test]
    fn type_mismatch_rejected() {
        let mut t = OutputTable::new(schema()).unwrap();
        let mut r = record();
        r.set_f64("event.evt", 7.0);
        assert!(t.append(&r).is_err());
    }

    #[test]
    fn duplicate_column_rejected() {
        let mut s = schema();
        s.push(ColumnSpec::new("event.evt", ColumnKind::I64));
        assert!(OutputTable::new(s).is_err());
    }
}

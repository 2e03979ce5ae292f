use chrono::{NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::fmt;

/// A single scalar read from a spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Identity used when matching key columns. An integral float matches the
    /// equal integer; text is never reinterpreted as a number.
    pub fn key(&self) -> KeyValue {
        match self {
            CellValue::Empty => KeyValue::Empty,
            CellValue::Text(s) => KeyValue::Text(s.clone()),
            CellValue::Int(i) => KeyValue::Int(*i),
            CellValue::Float(f) => KeyValue::number(*f),
            CellValue::Bool(b) => KeyValue::Bool(*b),
            CellValue::DateTime(dt) => KeyValue::DateTime(*dt),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", format_datetime(dt)),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
        }
    }
}

/// Hashable form of a [`CellValue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Empty,
    Text(String),
    Int(i64),
    /// Bit pattern of a non-integral float.
    Number(u64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl KeyValue {
    fn number(value: f64) -> Self {
        if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
            KeyValue::Int(value as i64)
        } else {
            KeyValue::Number(value.to_bits())
        }
    }
}

/// Dates at midnight render without a time component.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Trims surrounding whitespace and lowercases a header.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Rows of cells under a set of normalized, unique column names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Rows shorter than the header are padded with `Empty`; longer rows are cut.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Same columns, keeping only rows accepted by `keep`, in order.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row.as_slice())).cloned().collect(),
        }
    }

    /// Splits rows into `(accepted, rejected)` by `test`, keeping order in both.
    pub fn partition_rows<F>(&self, mut test: F) -> (Table, Table)
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        let (accepted, rejected) = self
            .rows
            .iter()
            .cloned()
            .partition(|row: &Vec<CellValue>| test(row.as_slice()));
        (
            Table { columns: self.columns.clone(), rows: accepted },
            Table { columns: self.columns.clone(), rows: rejected },
        )
    }

    /// First column whose name contains `fragment`.
    pub fn find_column_containing(&self, fragment: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.contains(fragment))
    }
}

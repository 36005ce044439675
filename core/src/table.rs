//! In-memory, column-oriented table of transaction rows.
//!
//! RULE: every column holds exactly `height()` cells.
//! RULE: grouping and joining go through `group_rows` and
//! `left_join_aggregate`. Feature modules never hand-roll their own.
//!
//! Every transformation in the crate reads a `&Table` and builds a new
//! one, so a failed step never leaves a half-written table behind.

use crate::{
    error::{FeatureError, FeatureResult},
    types::{ColumnName, GroupKey},
};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};

/// Rendering used for timestamps in keys and CSV output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Physical kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Timestamp,
}

/// A single column. `None` cells are missing values.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
}

/// NaN is a missing value, never an observation.
fn present_float(x: Option<f64>) -> Option<f64> {
    x.filter(|v| !v.is_nan())
}

impl Column {
    /// Convenience constructor for a text column without missing cells.
    pub fn text<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Column::Text(values.into_iter().map(|v| Some(v.into())).collect())
    }

    pub fn ints(values: impl IntoIterator<Item = i64>) -> Self {
        Column::Int(values.into_iter().map(Some).collect())
    }

    pub fn floats(values: impl IntoIterator<Item = f64>) -> Self {
        Column::Float(values.into_iter().map(Some).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int(v)       => v.len(),
            Column::Float(v)     => v.len(),
            Column::Text(v)      => v.len(),
            Column::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Int(_)       => ColumnKind::Int,
            Column::Float(_)     => ColumnKind::Float,
            Column::Text(_)      => ColumnKind::Text,
            Column::Timestamp(_) => ColumnKind::Timestamp,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Int(_) | Column::Float(_))
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Column::Int(v)       => v[row].is_none(),
            Column::Float(v)     => present_float(v[row]).is_none(),
            Column::Text(v)      => v[row].is_none(),
            Column::Timestamp(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_null(row)).count()
    }

    /// Canonical key for grouping. `None` for a missing cell.
    pub fn key_at(&self, row: usize) -> Option<GroupKey> {
        match self {
            Column::Int(v)       => v[row].map(|x| x.to_string()),
            // Adding +0.0 folds -0.0 into 0.0.
            Column::Float(v)     => present_float(v[row]).map(|x| (x + 0.0).to_string()),
            Column::Text(v)      => v[row].clone(),
            Column::Timestamp(v) => v[row].map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        }
    }

    /// CSV rendering of a cell; missing cells render empty.
    pub fn render(&self, row: usize) -> String {
        self.key_at(row).unwrap_or_default()
    }

    /// Numeric value of a cell. `None` for missing cells and non-numeric columns.
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match self {
            Column::Int(v)   => v[row].map(|x| x as f64),
            Column::Float(v) => present_float(v[row]),
            _                => None,
        }
    }

    /// Numeric view of the whole column, or `None` if it is not numeric.
    pub fn to_f64(&self) -> Option<Vec<Option<f64>>> {
        match self {
            Column::Int(v)   => Some(v.iter().map(|x| x.map(|x| x as f64)).collect()),
            Column::Float(v) => Some(v.iter().map(|x| present_float(*x)).collect()),
            _                => None,
        }
    }

    /// Gather cells by row index; `None` indices produce missing cells.
    pub fn take(&self, indices: &[Option<usize>]) -> Column {
        fn gather<T: Clone>(src: &[Option<T>], indices: &[Option<usize>]) -> Vec<Option<T>> {
            indices
                .iter()
                .map(|i| i.and_then(|i| src[i].clone()))
                .collect()
        }
        match self {
            Column::Int(v)       => Column::Int(gather(v, indices)),
            Column::Float(v)     => Column::Float(gather(v, indices)),
            Column::Text(v)      => Column::Text(gather(v, indices)),
            Column::Timestamp(v) => Column::Timestamp(gather(v, indices)),
        }
    }
}

/// Rows sharing one grouping key. `key` is `None` for the missing-value group.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub key:  Option<GroupKey>,
    pub rows: Vec<usize>,
}

/// Per-key values produced by a grouped aggregation, ready to be joined back.
///
/// Keys are unique; construction fails otherwise.
#[derive(Debug, Clone)]
pub struct Aggregate {
    keys:    Vec<GroupKey>,
    columns: Vec<(ColumnName, Column)>,
}

impl Aggregate {
    pub fn new(keys: Vec<GroupKey>) -> FeatureResult<Self> {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert(key.as_str()) {
                return Err(FeatureError::invalid(format!(
                    "aggregate key '{key}' is not unique"
                )));
            }
        }
        Ok(Self { keys, columns: Vec::new() })
    }

    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> FeatureResult<Self> {
        let name = name.into();
        if column.len() != self.keys.len() {
            return Err(FeatureError::invalid(format!(
                "aggregate column '{name}' has {} values for {} keys",
                column.len(),
                self.keys.len()
            )));
        }
        self.columns.push((name, column));
        Ok(self)
    }

    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names:   Vec<ColumnName>,
    columns: Vec<Column>,
    height:  usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from named columns. All columns must have the same length
    /// and names must be unique.
    pub fn from_columns<N: Into<String>>(columns: Vec<(N, Column)>) -> FeatureResult<Self> {
        let mut table = Table::new();
        for (name, column) in columns {
            let name = name.into();
            if table.has_column(&name) {
                return Err(FeatureError::invalid(format!("duplicate column '{name}'")));
            }
            table.set_column(name, column)?;
        }
        Ok(table)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[ColumnName] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> FeatureResult<&Column> {
        self.position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| FeatureError::schema(name))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Fail with a schema error naming the first absent column.
    pub fn require(&self, names: &[&str]) -> FeatureResult<()> {
        match names.iter().find(|n| !self.has_column(n)) {
            Some(missing) => Err(FeatureError::schema(*missing)),
            None => Ok(()),
        }
    }

    /// Add a column, or overwrite an existing one in place.
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> FeatureResult<()> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.height {
            return Err(FeatureError::invalid(format!(
                "column '{name}' has {} rows, table has {}",
                column.len(),
                self.height
            )));
        }
        self.height = column.len();
        match self.position(&name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Builder form of [`Table::set_column`].
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> FeatureResult<Self> {
        self.set_column(name, column)?;
        Ok(self)
    }

    pub fn drop_column(&mut self, name: &str) -> FeatureResult<Column> {
        let i = self.position(name).ok_or_else(|| FeatureError::schema(name))?;
        self.names.remove(i);
        let column = self.columns.remove(i);
        if self.columns.is_empty() {
            self.height = 0;
        }
        Ok(column)
    }

    /// Group row indices by the distinct values of `key`, in order of first
    /// appearance. Missing keys form a single group with `key: None`, placed
    /// where the first missing cell appears.
    pub fn group_rows(&self, key: &str) -> FeatureResult<Vec<RowGroup>> {
        let column = self.column(key)?;
        let mut index: HashMap<Option<GroupKey>, usize> = HashMap::new();
        let mut groups: Vec<RowGroup> = Vec::new();
        for row in 0..self.height {
            let k = column.key_at(row);
            match index.get(&k) {
                Some(&g) => groups[g].rows.push(row),
                None => {
                    index.insert(k.clone(), groups.len());
                    groups.push(RowGroup { key: k, rows: vec![row] });
                }
            }
        }
        Ok(groups)
    }

    /// Left-join per-key aggregate values onto every row whose `key` matches.
    ///
    /// Every original row is kept, in order. Rows with a missing key or no
    /// matching aggregate key get missing values. Aggregate columns overwrite
    /// same-named columns already in the table.
    pub fn left_join_aggregate(&self, key: &str, aggregate: &Aggregate) -> FeatureResult<Table> {
        let column = self.column(key)?;
        let lookup: HashMap<&str, usize> = aggregate
            .keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();
        let indices: Vec<Option<usize>> = (0..self.height)
            .map(|row| {
                column
                    .key_at(row)
                    .and_then(|k| lookup.get(k.as_str()).copied())
            })
            .collect();

        let mut joined = self.clone();
        for (name, values) in &aggregate.columns {
            joined.set_column(name.clone(), values.take(&indices))?;
        }
        Ok(joined)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

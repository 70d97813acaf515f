//! In-memory tabular store shared by ledgers and extracts.
//!
//! Rows carry a stable [`RowId`] that survives appends and removals, so
//! callers can address a row without holding a borrow into the table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single cell value, as loaded from a spreadsheet or snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// True for `Empty` and for whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(n) => n.is_nan(),
            Self::Text(s) => s.trim().is_empty(),
        }
    }

    /// Numeric value of the cell, if it holds one.
    ///
    /// Text is accepted when it parses after trimming and dropping digit-group
    /// spaces (`"12 500"`); a lone decimal comma is read as a point.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Empty => None,
            Self::Number(n) if n.is_nan() => None,
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_number(s),
        }
    }

    /// Numeric value, or `0.0` when the cell holds no number.
    pub fn number_or_zero(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }

    /// Text used as a lookup key.
    ///
    /// Integral numbers render without a fractional part so that `42` stored
    /// as a number and `"42"` stored as text produce the same key.
    pub fn key_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Empty)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let compact: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    if compact.is_empty() {
        return None;
    }
    if let Ok(n) = compact.parse::<f64>() {
        return Some(n);
    }
    if compact.matches(',').count() == 1 && !compact.contains('.') {
        return compact.replace(',', ".").parse::<f64>().ok();
    }
    None
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Stable row identity. Never reused within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    cells: Vec<Cell>,
}

impl Row {
    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&EMPTY)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
    next_id: u64,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            next_id: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Add `name` as an empty column unless it already exists. Returns its index.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        let width = self.columns.len();
        for row in &mut self.rows {
            row.cells.resize(width, Cell::Empty);
        }
        width - 1
    }

    /// Append a row. Cells are padded or truncated to the table width.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) -> RowId {
        cells.resize(self.columns.len(), Cell::Empty);
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(Row { id, cells });
        id
    }

    /// Append a row built from `(column, value)` pairs; unknown columns are added.
    pub fn push_record<'a, I>(&mut self, values: I) -> RowId
    where
        I: IntoIterator<Item = (&'a str, Cell)>,
    {
        let values: Vec<(&str, Cell)> = values.into_iter().collect();
        for (name, _) in &values {
            self.ensure_column(name);
        }
        let mut cells = vec![Cell::Empty; self.columns.len()];
        for (name, value) in values {
            if let Some(idx) = self.column_index(name) {
                cells[idx] = value;
            }
        }
        self.push_row(cells)
    }

    fn position(&self, id: RowId) -> Option<usize> {
        // Ids are handed out in increasing order and rows are only ever
        // appended or removed, so the vector stays sorted by id.
        self.rows.binary_search_by_key(&id, |r| r.id).ok()
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.position(id).map(|pos| &self.rows[pos])
    }

    /// Value of `column` in `row`; `Empty` when the column does not exist.
    pub fn get<'a>(&self, row: &'a Row, column: &str) -> &'a Cell {
        match self.column_index(column) {
            Some(idx) => row.cell(idx),
            None => &EMPTY,
        }
    }

    pub fn cell(&self, id: RowId, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.row(id).map(|r| r.cell(idx))
    }

    /// Update one cell by row identity. Returns false if the row or column is unknown.
    pub fn set(&mut self, id: RowId, column: &str, value: Cell) -> bool {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        let Some(pos) = self.position(id) else {
            return false;
        };
        self.rows[pos].cells[idx] = value;
        true
    }

    /// Rows matching `predicate`, in table order.
    pub fn filter<F>(&self, predicate: F) -> Vec<&Row>
    where
        F: Fn(&Row) -> bool,
    {
        self.rows.iter().filter(|r| predicate(r)).collect()
    }

    /// Rows whose key text equals the given value for every `(column, value)` pair.
    pub fn filter_eq(&self, conditions: &[(String, String)]) -> Vec<&Row> {
        let resolved: Vec<(Option<usize>, &str)> = conditions
            .iter()
            .map(|(c, v)| (self.column_index(c), v.as_str()))
            .collect();
        self.filter(|row| {
            resolved.iter().all(|(idx, value)| match idx {
                Some(idx) => row.cell(*idx).key_text() == *value,
                None => false,
            })
        })
    }

    /// Remove rows matching `predicate`. Returns the number removed.
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Row) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|r| !predicate(r));
        before - self.rows.len()
    }

    /// Row ids grouped by the key text of `column`, sorted by key.
    pub fn group_by(&self, column: &str) -> BTreeMap<String, Vec<RowId>> {
        let mut groups: BTreeMap<String, Vec<RowId>> = BTreeMap::new();
        let idx = self.column_index(column);
        for row in &self.rows {
            let key = idx.map(|i| row.cell(i).key_text()).unwrap_or_default();
            groups.entry(key).or_default().push(row.id);
        }
        groups
    }

    /// Distinct non-empty key texts of `column`, in first-appearance order.
    pub fn distinct(&self, column: &str) -> Vec<String> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            let key = row.cell(idx).key_text();
            if !key.is_empty() && seen.insert(key.clone()) {
                out.push(key);
            }
        }
        out
    }

    /// New table restricted to `columns` (in that order) and to `rows`.
    pub fn project(&self, columns: &[String], rows: &[&Row]) -> Table {
        let indices: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let mut out = Table::new(columns.iter().cloned());
        for row in rows {
            let cells = indices
                .iter()
                .map(|idx| idx.map(|i| row.cell(i).clone()).unwrap_or_default())
                .collect();
            out.push_row(cells);
        }
        out
    }
}

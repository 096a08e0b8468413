pub mod key;
pub mod layout;

pub use key::{Cell, ColumnKey, Metric, MetricId, Phase, Scope};

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Row identity within a [`MetricTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    /// Per-user row, keyed by the platform account id.
    Account(String),
    /// Per-date row of a whole-project series.
    Date(NaiveDate),
    /// Per-date-per-user row of a user series.
    DateAccount(NaiveDate, String),
    /// The single whole-project summary row.
    Total,
}

impl RowKey {
    pub fn account_id(&self) -> Option<&str> {
        match self {
            RowKey::Account(a) | RowKey::DateAccount(_, a) => Some(a),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            RowKey::Date(d) | RowKey::DateAccount(d, _) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Account(a) => f.write_str(a),
            RowKey::Date(d) => write!(f, "{d}"),
            RowKey::DateAccount(d, a) => write!(f, "{d}:{a}"),
            RowKey::Total => f.write_str("total"),
        }
    }
}

/// Display attributes carried through unchanged from the user roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAttrs {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub biography: Option<String>,
}

/// One table row. Cell storage is parallel to the owning table's column list.
#[derive(Debug, Clone)]
pub struct Row {
    key: RowKey,
    pub attrs: UserAttrs,
    /// Most recent date the user worked. Merged by max, never summed.
    pub last_working_date: Option<NaiveDate>,
    cells: Vec<Cell>,
}

impl Row {
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    /// Cells in column order, parallel to [`MetricTable::columns`].
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// A rows-by-typed-columns metric table. Carries its own phase list from
/// creation; all transformations thread it through unchanged.
#[derive(Debug, Clone)]
pub struct MetricTable {
    phases: Vec<Phase>,
    columns: Vec<ColumnKey>,
    index: HashMap<ColumnKey, usize>,
    rows: Vec<Row>,
    row_index: HashMap<RowKey, usize>,
}

impl MetricTable {
    /// Creates an empty table. Phases are normalized to workflow order;
    /// duplicate columns are a schema error.
    pub fn new(phases: &[Phase], columns: Vec<ColumnKey>) -> Result<Self> {
        let phases: Vec<Phase> = Phase::ALL
            .iter()
            .copied()
            .filter(|p| phases.contains(p))
            .collect();

        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if index.insert(*col, i).is_some() {
                return Err(Error::Schema(format!("duplicate column: {col}")));
            }
        }

        Ok(MetricTable {
            phases,
            columns,
            index,
            rows: Vec::new(),
            row_index: HashMap::new(),
        })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn has_column(&self, col: ColumnKey) -> bool {
        self.index.contains_key(&col)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, key: &RowKey) -> Option<&Row> {
        self.row_index.get(key).map(|&i| &self.rows[i])
    }

    pub fn index_of(&self, key: &RowKey) -> Option<usize> {
        self.row_index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends an all-`Missing` row and returns its index. Exactly one row
    /// per identity; a duplicate key is a schema error.
    pub fn add_row(&mut self, key: RowKey) -> Result<usize> {
        if self.row_index.contains_key(&key) {
            return Err(Error::Schema(format!("duplicate row key: {key}")));
        }
        let idx = self.rows.len();
        self.row_index.insert(key.clone(), idx);
        self.rows.push(Row {
            key,
            attrs: UserAttrs::default(),
            last_working_date: None,
            cells: vec![Cell::Missing; self.columns.len()],
        });
        Ok(idx)
    }

    pub fn row_mut(&mut self, idx: usize) -> &mut Row {
        &mut self.rows[idx]
    }

    /// Cell at (row, column); `Missing` when the column is absent.
    pub fn cell(&self, row_idx: usize, col: ColumnKey) -> Cell {
        match self.index.get(&col) {
            Some(&c) => self.rows[row_idx].cells[c],
            None => Cell::Missing,
        }
    }

    /// Cell by row key; `Missing` when row or column is absent.
    pub fn get(&self, key: &RowKey, col: ColumnKey) -> Cell {
        match self.row_index.get(key) {
            Some(&r) => self.cell(r, col),
            None => Cell::Missing,
        }
    }

    pub fn set(&mut self, row_idx: usize, col: ColumnKey, value: Cell) -> Result<()> {
        let c = self
            .index
            .get(&col)
            .copied()
            .ok_or_else(|| Error::Schema(format!("unknown column: {col}")))?;
        self.rows[row_idx].cells[c] = value;
        Ok(())
    }

    /// Accumulates into a cell (`Missing` is the additive identity).
    pub fn add(&mut self, row_idx: usize, col: ColumnKey, value: Cell) -> Result<()> {
        let c = self
            .index
            .get(&col)
            .copied()
            .ok_or_else(|| Error::Schema(format!("unknown column: {col}")))?;
        let cell = &mut self.rows[row_idx].cells[c];
        *cell += value;
        Ok(())
    }

    /// Additive fill: every `Missing` in the given columns becomes zero.
    /// Called once by builders after all records are folded in, so additive
    /// columns are defined for every row.
    pub fn fill_additive_zero(&mut self, cols: &[ColumnKey]) {
        for col in cols {
            if let Some(&c) = self.index.get(col) {
                for row in &mut self.rows {
                    row.cells[c] = row.cells[c].or_zero();
                }
            }
        }
    }

    /// Schema check used by consumers that require specific input columns.
    pub fn ensure_columns(&self, required: &[ColumnKey]) -> Result<()> {
        for col in required {
            if !self.index.contains_key(col) {
                return Err(Error::Schema(format!("missing required column: {col}")));
            }
        }
        Ok(())
    }

    /// True when both tables have the same phase list and column list.
    pub fn same_schema(&self, other: &MetricTable) -> bool {
        self.phases == other.phases && self.columns == other.columns
    }

    /// Re-sorts rows and rebuilds the row lookup.
    pub fn sort_rows_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&Row, &Row) -> std::cmp::Ordering,
    {
        self.rows.sort_by(|a, b| cmp(a, b));
        self.row_index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn small_table() -> MetricTable {
        MetricTable::new(
            &[Phase::Annotation],
            vec![
                ColumnKey::phase(Metric::TaskCount, Phase::Annotation),
                ColumnKey::sum(Metric::MonitoredWorktimeHour),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_row_key_rejected() {
        let mut t = small_table();
        t.add_row(RowKey::Account("alice".into())).unwrap();
        let err = t.add_row(RowKey::Account("alice".into())).unwrap_err();
        assert!(err.to_string().contains("duplicate row key"));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let col = ColumnKey::phase(Metric::TaskCount, Phase::Annotation);
        let err = MetricTable::new(&[Phase::Annotation], vec![col, col]).unwrap_err();
        assert!(err.to_string().contains("duplicate column"));
    }

    #[test]
    fn test_set_get_and_missing_default() {
        let mut t = small_table();
        let r = t.add_row(RowKey::Account("alice".into())).unwrap();
        let col = ColumnKey::phase(Metric::TaskCount, Phase::Annotation);
        t.set(r, col, Cell::Number(3.0)).unwrap();

        assert_eq!(t.get(&RowKey::Account("alice".into()), col), Cell::Number(3.0));
        // Absent row and absent column both read as Missing
        assert_eq!(t.get(&RowKey::Account("bob".into()), col), Cell::Missing);
        assert_eq!(
            t.get(
                &RowKey::Account("alice".into()),
                ColumnKey::sum(Metric::TaskCount)
            ),
            Cell::Missing
        );
    }

    #[test]
    fn test_unknown_column_is_schema_error() {
        let mut t = small_table();
        let r = t.add_row(RowKey::Total).unwrap();
        let err = t
            .set(r, ColumnKey::sum(Metric::RejectedCount), Cell::Number(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_add_accumulates_from_missing() {
        let mut t = small_table();
        let r = t.add_row(RowKey::Account("alice".into())).unwrap();
        let col = ColumnKey::sum(Metric::MonitoredWorktimeHour);
        t.add(r, col, Cell::Number(1.5)).unwrap();
        t.add(r, col, Cell::Number(2.0)).unwrap();
        assert_eq!(t.cell(r, col), Cell::Number(3.5));
    }

    #[test]
    fn test_fill_additive_zero_leaves_indeterminate() {
        let mut t = small_table();
        let r = t.add_row(RowKey::Account("alice".into())).unwrap();
        let task = ColumnKey::phase(Metric::TaskCount, Phase::Annotation);
        let hours = ColumnKey::sum(Metric::MonitoredWorktimeHour);
        t.set(r, hours, Cell::Indeterminate).unwrap();

        t.fill_additive_zero(&[task, hours]);
        assert_eq!(t.cell(r, task), Cell::Number(0.0));
        assert_eq!(t.cell(r, hours), Cell::Indeterminate);
    }

    #[test]
    fn test_phases_normalized_to_workflow_order() {
        let t = MetricTable::new(&[Phase::Acceptance, Phase::Annotation], vec![]).unwrap();
        assert_eq!(t.phases(), &[Phase::Annotation, Phase::Acceptance]);
    }

    #[test]
    fn test_sort_rows_keeps_lookup_consistent() {
        let mut t = small_table();
        let col = ColumnKey::phase(Metric::TaskCount, Phase::Annotation);
        let r1 = t.add_row(RowKey::DateAccount(d(2024, 1, 2), "bob".into())).unwrap();
        t.set(r1, col, Cell::Number(2.0)).unwrap();
        let r2 = t.add_row(RowKey::DateAccount(d(2024, 1, 1), "alice".into())).unwrap();
        t.set(r2, col, Cell::Number(1.0)).unwrap();

        t.sort_rows_by(|a, b| a.key().cmp(b.key()));
        assert_eq!(t.rows()[0].key().date(), Some(d(2024, 1, 1)));
        assert_eq!(
            t.get(&RowKey::DateAccount(d(2024, 1, 2), "bob".into()), col),
            Cell::Number(2.0)
        );
    }
}

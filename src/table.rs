//! A small column-named table of spreadsheet values.
use crate::{util::constrain_max_rows, ArcStr, Value};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap, ops::Deref, sync::Arc};
use term_data_table as tdt;

/// A row of the table.
///
/// `index` is the zero-based position of the row in the sheet it was read from (the first row
/// under the header is 0). It survives filtering and sorting, like a dataframe index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub index: usize,
    pub cells: Vec<Value>,
}

impl Record {
    pub fn new(index: usize, cells: Vec<Value>) -> Self {
        Self { index, cells }
    }

    /// The cell at column position `col`, if there is one.
    pub fn get(&self, col: usize) -> Option<&Value> {
        self.cells.get(col)
    }
}

#[derive(Serialize, Deserialize)]
struct TableRaw {
    columns: Vec<ArcStr>,
    rows: Vec<Record>,
}

/// Rows of cells with named columns, and a pre-built index from column name to position.
///
/// Tables are cheap to clone and never modified in place: every transformation returns a new
/// table, leaving the source untouched.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "TableRaw", into = "TableRaw")]
pub struct Table {
    columns: Arc<Vec<ArcStr>>,
    rows: Arc<Vec<Record>>,
    col_idx: BTreeMap<ArcStr, usize>,
}

impl Table {
    /// Rows shorter than the header are padded with `Empty`, longer rows are truncated.
    ///
    /// If a column name repeats, lookups by name find the first one.
    pub fn new(columns: Vec<ArcStr>, rows: Vec<Record>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut rec| {
                rec.cells.resize(width, Value::Empty);
                rec
            })
            .collect::<Vec<_>>();
        let mut this = Table {
            columns: Arc::new(columns),
            rows: Arc::new(rows),
            col_idx: BTreeMap::new(),
        };
        this.rebuild_index();
        this
    }

    /// Build a table from rows of cells, numbering rows from 0.
    pub fn from_rows(
        columns: impl IntoIterator<Item = impl Into<ArcStr>>,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Self {
        Self::new(
            columns.into_iter().map(Into::into).collect(),
            rows.into_iter()
                .enumerate()
                .map(|(index, cells)| Record::new(index, cells))
                .collect(),
        )
    }

    /// A table with the given columns and no rows.
    pub fn empty(columns: impl IntoIterator<Item = impl Into<ArcStr>>) -> Self {
        Self::from_rows(columns, Vec::new())
    }

    pub fn columns(&self) -> &[ArcStr] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.col_idx.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.col_idx.contains_key(name)
    }

    /// The value of column `name` in `record`. `None` if the column doesn't exist.
    pub fn value<'a>(&self, record: &'a Record, name: &str) -> Option<&'a Value> {
        record.get(self.column_index(name)?)
    }

    /// Iterate over all values of a column, in row order.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |rec| &rec.cells[idx]))
    }

    /// Get a table containing only rows that match the predicate.
    pub fn filter(&self, f: impl Fn(&Record) -> bool) -> Self {
        self.with_rows(self.rows.iter().filter(|rec| f(rec)).cloned().collect())
    }

    /// A copy of this table with rows sorted by `cmp`. The sort is stable.
    pub fn sorted_by(&self, cmp: impl FnMut(&Record, &Record) -> Ordering) -> Self {
        let mut rows = (*self.rows).clone();
        rows.sort_by(cmp);
        self.with_rows(rows)
    }

    /// A copy of this table without the columns matching `f`.
    ///
    /// Dropping nothing is fine and returns an identical table.
    pub fn drop_columns(&self, f: impl Fn(&str) -> bool) -> Self {
        let keep = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !f(name))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        if keep.len() == self.columns.len() {
            return self.clone();
        }
        self.project(&keep)
    }

    /// A copy of this table with only the named columns, in the order given.
    ///
    /// Names that aren't columns are skipped.
    pub fn select<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Self {
        let keep = names
            .into_iter()
            .filter_map(|name| self.column_index(name))
            .collect::<Vec<_>>();
        self.project(&keep)
    }

    /// A copy of this table with an extra column (or a replaced one, if `name` exists).
    ///
    /// `values` must hold one value per row.
    pub fn with_column(&self, name: impl Into<ArcStr>, values: Vec<Value>) -> Self {
        assert_eq!(
            values.len(),
            self.rows.len(),
            "one value per row must be supplied"
        );
        let name = name.into();
        let existing = self.column_index(&name);
        let mut columns = (*self.columns).clone();
        if existing.is_none() {
            columns.push(name);
        }
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(rec, value)| {
                let mut rec = rec.clone();
                match existing {
                    Some(idx) => rec.cells[idx] = value,
                    None => rec.cells.push(value),
                }
                rec
            })
            .collect();
        Table::new(columns, rows)
    }

    /// To display in the console/terminal.
    ///
    /// With more than `max_rows` rows, the first and last `max_rows / 2` are shown with an elision
    /// row in between. `None` shows everything.
    pub fn term_table(&self, max_rows: Option<usize>) -> tdt::Table<'static> {
        let mut table = tdt::Table::new().with_row(self.columns.iter().fold(
            tdt::Row::new().with_cell(tdt::Cell::from("")),
            |row, name| row.with_cell(tdt::Cell::from(name.to_string())),
        ));
        let len = self.rows.len();
        let max_rows = max_rows.map(constrain_max_rows).unwrap_or(0);
        let (head, tail) = if max_rows == 0 || max_rows >= len {
            (len, 0)
        } else {
            (max_rows / 2, max_rows / 2)
        };
        for rec in &self.rows[..head] {
            table.add_row(term_row(rec));
        }
        if tail > 0 {
            table.add_row(
                (0..=self.columns.len()).fold(tdt::Row::new(), |row, _| {
                    row.with_cell(tdt::Cell::from("..."))
                }),
            );
            for rec in &self.rows[len - tail..] {
                table.add_row(term_row(rec));
            }
        }
        table
    }

    fn project(&self, keep: &[usize]) -> Self {
        let columns = keep.iter().map(|idx| self.columns[*idx].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|rec| {
                Record::new(
                    rec.index,
                    keep.iter().map(|idx| rec.cells[*idx].clone()).collect(),
                )
            })
            .collect();
        Table::new(columns, rows)
    }

    fn with_rows(&self, rows: Vec<Record>) -> Self {
        Table {
            columns: self.columns.clone(),
            rows: Arc::new(rows),
            col_idx: self.col_idx.clone(),
        }
    }

    fn rebuild_index(&mut self) {
        self.col_idx.clear();
        for (idx, name) in self.columns.iter().enumerate() {
            self.col_idx.entry(name.clone()).or_insert(idx);
        }
    }
}

fn term_row(rec: &Record) -> tdt::Row<'static> {
    rec.cells.iter().fold(
        tdt::Row::new().with_cell(tdt::Cell::from(rec.index.to_string())),
        |row, value| row.with_cell(tdt::Cell::from(value.to_string())),
    )
}

impl Deref for Table {
    type Target = [Record];
    fn deref(&self) -> &Self::Target {
        &self.rows
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .finish()
    }
}

impl From<TableRaw> for Table {
    fn from(raw: TableRaw) -> Self {
        Table::new(raw.columns, raw.rows)
    }
}

impl From<Table> for TableRaw {
    fn from(table: Table) -> Self {
        TableRaw {
            columns: (*table.columns).clone(),
            rows: (*table.rows).clone(),
        }
    }
}

use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;

use itertools::Itertools;

use crate::cell::Cell;
use crate::error::TableError;
use crate::row::Row;

/// An ordered header plus 1-indexed ordered rows.
///
/// Every row always has exactly one cell per header column; mutators keep
/// the row indices and that shape intact.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    header: Vec<String>,
    rows: Vec<Row>,
    /// SGR keywords applied to the header and its separator rule.
    pub header_color: Option<Vec<String>>,
}

impl TextTable {
    pub fn new() -> TextTable {
        TextTable::default()
    }

    /// Builds an empty table with the given column names.
    pub fn with_header<I>(header: I) -> Result<TextTable, TableError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut table = TextTable::new();
        for name in header {
            let name = name.into();
            if table.header.contains(&name) {
                return Err(TableError::DuplicateColumn(name));
            }
            table.header.push(name);
        }
        Ok(table)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row at 1-based position `index`.
    pub fn row(&self, index: usize) -> Option<&Row> {
        index.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        index.checked_sub(1).and_then(|i| self.rows.get_mut(i))
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// The cell at (1-based row, column name).
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.row(row)?.get(col)
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: Cell) -> Result<(), TableError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        let row = self.row_mut(row).ok_or(TableError::RowIndex(row))?;
        row.values[col] = value;
        Ok(())
    }

    /// Appends an ordered row; its length must match the header.
    pub fn append<I>(&mut self, values: I) -> Result<(), TableError>
    where
        I: IntoIterator,
        I::Item: Into<Cell>,
    {
        let values: Vec<Cell> = values.into_iter().map(Into::into).collect();
        if values.len() != self.header.len() {
            return Err(TableError::RowLength {
                want: self.header.len(),
                got: values.len(),
            });
        }
        let mut row = Row::new(values);
        row.index = self.rows.len() + 1;
        self.rows.push(row);
        Ok(())
    }

    /// Appends a row built from `(column, value)` pairs.
    ///
    /// Every header column must be present; extra entries are ignored.
    pub fn append_map<'a, I>(&mut self, entries: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = (&'a str, Cell)>,
    {
        let mut map: HashMap<&str, Cell> = entries.into_iter().collect();
        let mut values = Vec::with_capacity(self.header.len());
        for name in &self.header {
            let cell = map
                .remove(name.as_str())
                .ok_or_else(|| TableError::MissingColumn(name.clone()))?;
            values.push(cell);
        }
        self.append(values)
    }

    /// Removes the row at 1-based `index`, re-indexing the rest.
    pub fn remove(&mut self, index: usize) -> Result<(), TableError> {
        if index == 0 || index > self.rows.len() {
            return Err(TableError::RowIndex(index));
        }
        self.rows.remove(index - 1);
        self.reindex();
        Ok(())
    }

    /// Inserts a column at `index` (negative counts from the end, `-1`
    /// appends), widening every row with `default`.
    pub fn add_column(
        &mut self,
        name: &str,
        default: &str,
        index: isize,
    ) -> Result<(), TableError> {
        if self.header.iter().any(|h| h == name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        let len = self.header.len() as isize;
        let position = if index == -1 {
            len
        } else if index < 0 {
            len + index
        } else {
            index
        };
        if !(0..=len).contains(&position) {
            return Err(TableError::ColumnIndex(index));
        }
        let position = position as usize;

        self.header.insert(position, name.to_string());
        for row in &mut self.rows {
            row.values.insert(position, Cell::from(default));
        }
        Ok(())
    }

    /// Row-wise left join: fills the columns gained from `other` on each
    /// of our rows from the first row of `other` agreeing on `keys` (or on
    /// the row number when `keys` is empty).
    pub fn extend(&mut self, other: &TextTable, keys: Option<&[String]>) -> Result<(), TableError> {
        let keys = keys.unwrap_or(&[]);
        for key in keys {
            if !self.has_column(key) {
                return Err(TableError::UnknownColumn(key.clone()));
            }
            if !other.has_column(key) {
                return Err(TableError::UnknownColumn(key.clone()));
            }
        }

        let gained: Vec<String> = other
            .header
            .iter()
            .filter(|column| !self.has_column(column))
            .cloned()
            .collect();
        if gained.is_empty() {
            return Ok(());
        }
        for column in &gained {
            self.add_column(column, "", -1)?;
        }

        let self_cols: Vec<usize> = gained
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        let other_cols: Vec<usize> = gained
            .iter()
            .filter_map(|c| other.column_index(c))
            .collect();

        if keys.is_empty() {
            for (row, source) in self.rows.iter_mut().zip(&other.rows) {
                for (&dst, &src) in self_cols.iter().zip(&other_cols) {
                    row.values[dst] = source.values[src].clone();
                }
            }
            return Ok(());
        }

        let self_keys: Vec<usize> = keys.iter().filter_map(|c| self.column_index(c)).collect();
        let other_keys: Vec<usize> = keys.iter().filter_map(|c| other.column_index(c)).collect();
        for row in &mut self.rows {
            let matched = other.rows.iter().find(|source| {
                self_keys
                    .iter()
                    .zip(&other_keys)
                    .all(|(&a, &b)| row.values[a] == source.values[b])
            });
            if let Some(source) = matched {
                for (&dst, &src) in self_cols.iter().zip(&other_cols) {
                    row.values[dst] = source.values[src].clone();
                }
            }
        }
        Ok(())
    }

    /// The first row whose `column` displays as `value`.
    pub fn row_with(&self, column: &str, value: &str) -> Result<&Row, TableError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        self.rows
            .iter()
            .find(|row| row.values[col].to_string() == value)
            .ok_or_else(|| TableError::NoMatchingRow {
                column: column.to_string(),
                value: value.to_string(),
            })
    }

    /// Stable sort on `keys` (header order irrelevant), or on the whole
    /// row when `keys` is empty; ties keep their original order.
    pub fn sort_with(&mut self, keys: Option<&[String]>, reverse: bool) -> Result<(), TableError> {
        let keys = keys.unwrap_or(&[]);
        let mut columns = Vec::with_capacity(keys.len());
        for key in keys {
            columns.push(
                self.column_index(key)
                    .ok_or_else(|| TableError::UnknownColumn(key.clone()))?,
            );
        }
        if columns.is_empty() {
            columns = (0..self.header.len()).collect();
        }

        self.rows.sort_by(|a, b| {
            let lhs = columns.iter().map(|&c| a.values[c].to_string());
            let rhs = columns.iter().map(|&c| b.values[c].to_string());
            let ordering = lhs.cmp(rhs);
            if reverse { ordering.reverse() } else { ordering }
        });
        self.reindex();
        Ok(())
    }

    pub fn sort(&mut self) {
        // Whole-row keys always exist.
        let _ = self.sort_with(None, false);
    }

    /// Serializes as `# LABEL` plus one `key_values.column value` line per
    /// non-key column of every row. Defaults to the first column as key.
    pub fn label_value_table(&self, keys: Option<&[String]>) -> Result<String, TableError> {
        let keys = match keys {
            Some(keys) if !keys.is_empty() => keys.to_vec(),
            _ => self.header.iter().take(1).cloned().collect(),
        };
        for key in &keys {
            if !self.has_column(key) {
                return Err(TableError::UnknownColumn(key.clone()));
            }
        }
        // Keys follow header order, whatever order they were given in.
        let keys: Vec<&String> = self.header.iter().filter(|h| keys.contains(h)).collect();

        use std::fmt::Write as _;

        let mut out = format!("# LABEL {}\n", keys.iter().join("."));
        for row in &self.rows {
            let label = keys
                .iter()
                .filter_map(|k| self.column_index(k.as_str()))
                .map(|c| row.values[c].to_string())
                .join(".");
            for (col, name) in self.header.iter().enumerate() {
                if keys.iter().any(|k| *k == name) {
                    continue;
                }
                let _ = writeln!(out, "{label}.{name} {}", row.values[col]);
            }
        }
        Ok(out)
    }

    /// Fills the table from comma-separated text.
    ///
    /// `#` starts a comment anywhere on a line; blank lines are skipped;
    /// the first data line is the header. Rows of the wrong arity are
    /// dropped. Returns the number of rows ingested.
    pub fn csv_to_table<R: BufRead>(&mut self, reader: R) -> Result<usize, TableError> {
        self.header.clear();
        self.rows.clear();

        let mut count = 0;
        for line in reader.lines() {
            let line = line?;
            let data = line.split('#').next().unwrap_or("").trim();
            if data.is_empty() {
                continue;
            }
            let fields: Vec<&str> = data.split(',').map(str::trim).collect();
            if self.header.is_empty() {
                self.header = fields.into_iter().map(String::from).collect();
            } else if fields.len() == self.header.len() {
                self.append(fields)?;
                count += 1;
            }
        }
        Ok(count)
    }

    fn reindex(&mut self) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.index = i + 1;
        }
    }
}

impl fmt::Display for TextTable {
    /// The compact string form: `"col1, col2\nv1, v2\n"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header.iter().join(", "))?;
        for row in &self.rows {
            writeln!(f, "{}", row.values.iter().join(", "))?;
        }
        Ok(())
    }
}

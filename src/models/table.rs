//! In-memory CSV table with a dynamic column set.
//!
//! Every cell is kept as text. An empty CSV field is read as a null (`None`)
//! and a null is written back as an empty field, so a table written with
//! [`Table::write_csv`] reads back equal to itself. The exception is a table
//! without columns, which writes an empty document that does not parse.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected at most {expected} fields, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("no columns to parse: missing header row")]
    NoColumns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row number and column name. `None` for nulls and unknown columns.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Appends a row, padding short rows with nulls and dropping extra cells.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Parses CSV with a mandatory header row.
    ///
    /// Short records are padded with nulls; records with more fields than the
    /// header are rejected. Repeated header names get a `.N` suffix so that
    /// every column stays addressable by name. Input without a header row
    /// (zero bytes or only blank lines) fails with [`TableError::NoColumns`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?;
        if headers.is_empty() {
            return Err(TableError::NoColumns);
        }

        let mut table = Table::new(dedupe_headers(headers.iter()));
        let ncols = table.num_columns();

        for rec in rdr.records() {
            let rec = rec?;
            if rec.len() > ncols {
                return Err(TableError::TooManyFields {
                    line: rec.position().map(|p| p.line()).unwrap_or_default(),
                    expected: ncols,
                    found: rec.len(),
                });
            }
            let row = rec
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect();
            table.push_row(row);
        }

        Ok(table)
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), TableError> {
        // A table without columns serializes to an empty document.
        if self.columns.is_empty() {
            return Ok(());
        }

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the table to `path`, replacing any existing file.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let file = File::create(path)?;
        self.to_writer(file)
    }

    /// Appends the rows of `other`, matching columns by name.
    ///
    /// Columns unknown to `self` are added at the end and back-filled with
    /// nulls; columns `other` lacks are null in its rows.
    pub fn append(&mut self, other: Table) {
        let mut mapping = Vec::with_capacity(other.columns.len());
        for name in other.columns {
            let idx = match self.column_index(&name) {
                Some(idx) => idx,
                None => {
                    self.columns.push(name);
                    for row in &mut self.rows {
                        row.push(None);
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }

        let width = self.columns.len();
        self.rows.reserve(other.rows.len());
        for row in other.rows {
            let mut merged = vec![None; width];
            for (cell, &idx) in row.into_iter().zip(&mapping) {
                merged[idx] = cell;
            }
            self.rows.push(merged);
        }
    }

    /// Row-wise concatenation in iteration order. No rows are dropped or reordered.
    pub fn concat<I>(tables: I) -> Table
    where
        I: IntoIterator<Item = Table>,
    {
        let mut out = Table::default();
        for table in tables {
            out.append(table);
        }
        out
    }
}

fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for header in headers {
        let mut name = header.to_string();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", header, n);
            n += 1;
        }
        seen.push(name);
    }
    seen
}

// Flat CSV table loaded whole into memory and written back whole.
//
// Cells are kept verbatim so columns the tools do not understand pass through
// untouched, in their original order.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to access file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} has no header row")]
    NoHeader { path: String },
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a headed CSV. Rows whose field count differs from the header are
    /// an error.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(rdr);
        let mut headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Table { headers, rows })
    }

    pub fn to_writer<W: Write>(&self, wtr: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(wtr);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn get(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
    }
}

// ---------------------------------------------------------------------------
// Path-based I/O
// ---------------------------------------------------------------------------

pub fn load_table(path: &Path) -> Result<Table, TableError> {
    let file = File::open(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let table = Table::from_reader(file).map_err(|e| TableError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if table.headers.is_empty() {
        return Err(TableError::NoHeader {
            path: path.display().to_string(),
        });
    }
    Ok(table)
}

/// Write the table to `path` via a sibling `.partial` file that is renamed
/// into place. On failure the partial file is removed and `path` is left as
/// it was.
pub fn write_table(path: &Path, table: &Table) -> Result<(), TableError> {
    let partial = partial_path(path);

    let written = File::create(&partial)
        .map_err(|e| TableError::Io {
            path: partial.display().to_string(),
            source: e,
        })
        .and_then(|file| {
            table.to_writer(file).map_err(|e| TableError::Csv {
                path: partial.display().to_string(),
                source: e,
            })
        });

    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    fs::rename(&partial, path).map_err(|e| {
        let _ = fs::remove_file(&partial);
        TableError::Io {
            path: path.display().to_string(),
            source: e,
        }
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.csv".into());
    name.push(".partial");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

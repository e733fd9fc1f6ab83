//! Table sources and sinks. The pipeline core only sees the two traits; the CSV
//! implementations back the command-line run and the in-memory ones back tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::table::{require_product_schema, Table};

/// Tokens read as null, matching the usual NA spellings found in exported CSVs.
pub const DEFAULT_NULL_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub trait TableSource {
    fn load(&self) -> Result<Table>;
}

pub trait TableSink {
    fn save(&self, table: &Table, destination: &str) -> Result<()>;
}

/// Reads a product CSV with every column kept as nullable text.
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    path: PathBuf,
    null_tokens: Vec<String>,
}

impl CsvTableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_null_tokens(mut self, tokens: Vec<String>) -> Self {
        self.null_tokens = tokens;
        self
    }

    fn is_null_token(&self, cell: &str) -> bool {
        cell.is_empty() || self.null_tokens.iter().any(|token| token == cell)
    }
}

impl TableSource for CsvTableSource {
    fn load(&self) -> Result<Table> {
        if !self.path.is_file() {
            return Err(PipelineError::NotFound {
                path: self.path.clone(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

        for record in reader.records() {
            let record = record?;
            for (idx, column) in values.iter_mut().enumerate() {
                let cell = record
                    .get(idx)
                    .filter(|cell| !self.is_null_token(cell))
                    .map(str::to_string);
                column.push(cell);
            }
        }

        let columns = headers
            .iter()
            .zip(values)
            .map(|(name, column)| Series::new(name.as_str().into(), column).into())
            .collect::<Vec<Column>>();
        let table = DataFrame::new(columns)?;
        require_product_schema(&table)?;

        info!(
            path = %self.path.display(),
            rows = table.height(),
            columns = table.width(),
            "loaded source table"
        );
        Ok(table)
    }
}

/// Writes each table to `<dir>/<destination>.csv`. Files are staged next to the
/// target and renamed into place, so an output is either complete or absent.
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    dir: PathBuf,
}

impl CsvDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.dir.join(format!("{destination}.csv"))
    }
}

impl TableSink for CsvDirectorySink {
    fn save(&self, table: &Table, destination: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let target = self.path_for(destination);
        let staging = self.dir.join(format!(".{destination}.csv.tmp"));

        if let Err(err) = write_csv(table, &staging) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
        fs::rename(&staging, &target)?;

        info!(
            path = %target.display(),
            rows = table.height(),
            "saved table"
        );
        Ok(())
    }
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    let mut frame = table.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)?;
    Ok(())
}

/// Hands out a prepared table.
#[derive(Debug, Clone)]
pub struct MemorySource {
    table: Table,
}

impl MemorySource {
    pub fn new(table: Table) -> Self {
        Self { table }
    }
}

impl TableSource for MemorySource {
    fn load(&self) -> Result<Table> {
        Ok(self.table.clone())
    }
}

/// Keeps saved tables keyed by destination.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: RefCell<BTreeMap<String, Table>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, destination: &str) -> Option<Table> {
        self.saved.borrow().get(destination).cloned()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.saved.borrow().keys().cloned().collect()
    }
}

impl TableSink for MemorySink {
    fn save(&self, table: &Table, destination: &str) -> Result<()> {
        self.saved
            .borrow_mut()
            .insert(destination.to_string(), table.clone());
        Ok(())
    }
}

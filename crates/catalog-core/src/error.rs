// crates/catalog-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Required column '{column}' is missing from the table")]
    MissingColumn { column: String },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration could not be parsed: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

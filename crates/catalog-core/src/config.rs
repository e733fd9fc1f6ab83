use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analytics::TOP_N;
use crate::converter::DEFAULT_DATE_FORMATS;
use crate::error::{PipelineError, Result};
use crate::io::DEFAULT_NULL_TOKENS;

pub const INPUT_ENV: &str = "CATALOG_INPUT";
pub const OUTPUT_DIR_ENV: &str = "CATALOG_OUTPUT_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub date_formats: Vec<String>,
    pub null_tokens: Vec<String>,
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/raw/products_raw.csv"),
            output_dir: PathBuf::from("data/processed"),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|t| t.to_string()).collect(),
            top_n: TOP_N,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Overrides the input and output locations from `CATALOG_INPUT` and
    /// `CATALOG_OUTPUT_DIR` when they are set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(input) = env::var(INPUT_ENV) {
            self.input = PathBuf::from(input);
        }
        if let Ok(output_dir) = env::var(OUTPUT_DIR_ENV) {
            self.output_dir = PathBuf::from(output_dir);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(PipelineError::Validation(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.date_formats.is_empty() {
            return Err(PipelineError::Validation(
                "date_formats must list at least one format".to_string(),
            ));
        }
        Ok(())
    }
}

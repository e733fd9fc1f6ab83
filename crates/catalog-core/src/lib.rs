pub mod analytics;
pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod converter;
pub mod error;
pub mod flagger;
pub mod io;
pub mod pipeline;
pub mod stats;
pub mod table;

pub use error::{PipelineError, Result};
pub use table::Table;

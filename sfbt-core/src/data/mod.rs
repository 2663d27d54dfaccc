//! Signal dataset access: schema check and year discovery.
//!
//! The optimizer reads the full dataset on the compute node. Here we only
//! need the distinct calendar years of the `date` column to partition work.

pub mod schema;
pub mod years;

use std::path::PathBuf;
use thiserror::Error;

pub use schema::{SchemaError, SignalSchema, REQUIRED_COLUMNS};
pub use years::{discover_years, years_in_frame};

/// Errors from reading the signal dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data file not found: {0}")]
    NotFound(PathBuf),

    #[error("parquet I/O error for '{path}': {message}")]
    ParquetError { path: PathBuf, message: String },

    #[error("invalid signal data in '{path}': {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for gpkg-merge
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source GeoPackage does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Requested destination table name is empty or reserved
    #[error("Invalid output table name '{0}': must be non-empty and not use a reserved prefix")]
    InvalidTableName(String),

    /// Template tile table lacks required catalog rows
    #[error("Tile table '{table}' has no {missing} entry; it cannot be used as a metadata template")]
    MissingMetadata { table: String, missing: &'static str },

    /// Neither source contains a table with a tile payload column
    #[error("No tile tables found in either input file")]
    NoTileTablesFound,

    /// Post-merge verification failed; the output file is kept for inspection
    #[error("Merged output failed verification: {0}")]
    MergeCorrupted(String),
}

impl Error {
    /// Process exit code for this error
    ///
    /// Invalid invocations (missing inputs, bad table name) exit with 2 so
    /// calling scripts can tell them apart from merge failures, which exit with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InputNotFound(_) | Error::InvalidTableName(_) => 2,
            _ => 1,
        }
    }
}

/// Result type alias using gpkg-merge's Error type
pub type Result<T> = std::result::Result<T, Error>;

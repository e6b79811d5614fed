// src/db/mod.rs

//! Database layer for gpkg-merge
//!
//! This module handles all SQLite operations including:
//! - Opening source GeoPackages read-only and the output read-write
//! - Transaction handling
//! - Identifier quoting and schema lookups
//! - Post-merge verification (integrity and foreign-key checks)

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::Path;
use tracing::debug;

/// Catalog tables whose foreign keys are checked after a merge
const FK_CHECKED_TABLES: &[&str] = &["gpkg_contents", "gpkg_tile_matrix_set", "gpkg_tile_matrix"];

/// Open a source GeoPackage without write access
///
/// Reads the schema once so a file that is not an SQLite database fails here
/// rather than on first use.
///
/// # Arguments
///
/// * `path` - Path to the GeoPackage file
///
/// # Returns
///
/// * `Result<Connection>` - Read-only connection if successful
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    debug!("Opening {} read-only", path.display());
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))?;

    Ok(conn)
}

/// Open the output GeoPackage for writing
///
/// The file must already exist (it is cloned from a source before use).
pub fn open_output(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("output file {} does not exist", path.display()),
        )));
    }

    let conn = Connection::open(path)?;

    // Foreign keys are checked once by `verify` after the merge; extension
    // tables inherited from the base file may reference rows being purged.
    conn.execute_batch(
        "
        PRAGMA foreign_keys = OFF;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    Ok(conn)
}

/// Run `f` inside a transaction, committing on success
///
/// Any error returned by `f` drops the transaction, which rolls it back.
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Quote an SQL identifier, doubling any embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Check whether a table (or view) with this exact name exists
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1)",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// List the column names of a table in declaration order
///
/// A table with no readable columns yields an empty list.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(columns)
}

/// Verify the structural integrity of a database
///
/// Runs a full `PRAGMA integrity_check` followed by foreign-key checks on the
/// tile catalog tables. Anything other than a clean result is reported as
/// `Error::MergeCorrupted`.
pub fn verify(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA integrity_check")?;
    let problems = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if problems != ["ok"] {
        return Err(Error::MergeCorrupted(problems.join("; ")));
    }

    for table in FK_CHECKED_TABLES {
        if !table_exists(conn, table)? {
            continue;
        }

        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_check({})", quote_ident(table)))?;
        let violations = stmt
            .query_map([], |row| {
                let child: String = row.get(0)?;
                let parent: String = row.get(2)?;
                Ok(format!("{} references missing row in {}", child, parent))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if !violations.is_empty() {
            return Err(Error::MergeCorrupted(violations.join("; ")));
        }
    }

    debug!("Integrity check passed");
    Ok(())
}

// src/merge/inspect.rs

//! Schema inspection for source GeoPackages
//!
//! Tile tables are recognized by capability, not by name: any user table
//! with a `tile_data` column is treated as holding tiles.

use crate::db::{self, quote_ident, schema};
use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, warn};

/// List user data tables, skipping SQLite and GeoPackage catalog tables
pub fn list_data_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|name| !schema::is_reserved_name(name))
        .collect();

    Ok(tables)
}

/// List user virtual tables such as full-text indexes
///
/// Dropping one of these also drops its shadow tables.
pub fn list_virtual_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND sql LIKE 'CREATE VIRTUAL TABLE%'
         ORDER BY name",
    )?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|name| !schema::is_reserved_name(name))
        .collect();

    Ok(tables)
}

/// Whether `table` has a column named exactly `tile_data`
///
/// A table whose columns cannot be read is reported as not holding tiles.
pub fn is_tile_table(conn: &Connection, table: &str) -> Result<bool> {
    match db::table_columns(conn, table) {
        Ok(columns) => Ok(columns.iter().any(|c| c == schema::TILE_DATA_COLUMN)),
        Err(e) => {
            warn!("Cannot read columns of {}: {}", table, e);
            Ok(false)
        }
    }
}

/// List every tile table in the database
pub fn find_tile_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut tiles = Vec::new();

    for table in list_data_tables(conn)? {
        if is_tile_table(conn, &table)? {
            debug!("Found tile table {}", table);
            tiles.push(table);
        }
    }

    Ok(tiles)
}

/// Number of tiles stored in a tile table
pub fn tile_count(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(
        &format!("SELECT count(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Distinct zoom levels present in a tile table, ascending
pub fn zoom_levels(conn: &Connection, table: &str) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT zoom_level FROM {} ORDER BY zoom_level",
        quote_ident(table)
    ))?;

    let zooms = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;

    Ok(zooms)
}

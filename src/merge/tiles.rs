// src/merge/tiles.rs

//! Bulk tile copy between GeoPackages
//!
//! Rows are streamed from a read-only source connection into the output
//! connection, so the copy takes part in whatever transaction the output
//! connection has open. Conflicts on (zoom_level, tile_column, tile_row) are
//! resolved by SQLite according to the chosen [`ConflictPolicy`].

use crate::db::{self, quote_ident};
use crate::error::Result;
use crate::merge::inspect;
use rusqlite::types::Value;
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::{debug, info};

/// Rows copied between progress log lines
const PROGRESS_INTERVAL: usize = 10_000;

/// How an incoming tile whose key already exists is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The incoming tile overwrites the existing one
    Replace,
    /// The incoming tile is dropped
    Ignore,
}

impl ConflictPolicy {
    fn as_sql(&self) -> &'static str {
        match self {
            ConflictPolicy::Replace => "INSERT OR REPLACE",
            ConflictPolicy::Ignore => "INSERT OR IGNORE",
        }
    }
}

/// Copy every tile of every tile table in `source` into `target_table`
///
/// Tile tables of the source are pooled into the one destination table in
/// name order. Returns how many rows `target_table` gained, so tiles dropped
/// under [`ConflictPolicy::Ignore`] and tiles overwritten under
/// [`ConflictPolicy::Replace`] are not counted.
pub fn bulk_copy_tiles(
    target: &Connection,
    target_table: &str,
    source: &Connection,
    policy: ConflictPolicy,
) -> Result<usize> {
    let mut insert = target.prepare(&format!(
        "{} INTO {} (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
        policy.as_sql(),
        quote_ident(target_table)
    ))?;

    let mut written = 0;
    for table in inspect::find_tile_tables(source)? {
        debug!("Copying tiles from {} with {:?}", table, policy);
        let before = inspect::tile_count(target, target_table)?;

        let mut select = source.prepare(&format!(
            "SELECT zoom_level, tile_column, tile_row, tile_data FROM {}",
            quote_ident(&table)
        ))?;
        let mut rows = select.query([])?;

        let mut seen = 0;
        while let Some(row) = rows.next()? {
            let zoom_level: i64 = row.get(0)?;
            let tile_column: i64 = row.get(1)?;
            let tile_row: i64 = row.get(2)?;
            let tile_data: Value = row.get(3)?;

            insert.execute(params![zoom_level, tile_column, tile_row, tile_data])?;
            seen += 1;

            if seen % PROGRESS_INTERVAL == 0 {
                debug!("{}: {} tiles read", table, seen);
            }
        }

        // Rows are only ever added or replaced in place, never removed
        let added = (inspect::tile_count(target, target_table)? - before) as usize;
        info!("{}: {} of {} tiles added", table, added, seen);
        written += added;
    }

    Ok(written)
}

/// Open the GeoPackage at `source_path` read-only and copy its tiles into `target_table`
///
/// The source connection is closed before returning, on success or failure.
pub fn merge_into(
    target: &Connection,
    target_table: &str,
    source_path: &Path,
    policy: ConflictPolicy,
) -> Result<usize> {
    let source = db::open_read_only(source_path)?;
    bulk_copy_tiles(target, target_table, &source, policy)
}

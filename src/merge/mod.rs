// src/merge/mod.rs

//! Priority merge of two GeoPackage tile sets
//!
//! The output starts as a byte copy of the first input, loses all of its
//! data tables, and gains one tile table filled from both inputs:
//!
//! 1. tiles of the second input are inserted with `OR REPLACE`
//! 2. tiles of the first input are inserted with `OR IGNORE`
//!
//! so wherever both inputs have a tile at the same key, the second input wins.
//! Everything between dropping the old tables and stamping the format pragmas
//! runs in one transaction; if it fails the output file is removed.

pub mod inspect;
pub mod report;
pub mod template;
pub mod tiles;

pub use report::MergeReport;
pub use template::{TemplateOrigin, TileTemplate};
pub use tiles::ConflictPolicy;

use crate::db::models::TileMatrix;
use crate::db::{self, quote_ident, schema};
use crate::error::{Error, Result};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings for a single merge run
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Where to write the result; derived from the input names when `None`
    pub output: Option<PathBuf>,
    /// Name of the destination tile table
    pub table_name: String,
    /// Compact the output after the merge
    pub vacuum: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            output: None,
            table_name: schema::DEFAULT_TABLE_NAME.to_string(),
            vacuum: true,
        }
    }
}

/// Reject destination table names that are empty or reserved
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || schema::is_reserved_name(name) {
        return Err(Error::InvalidTableName(name.to_string()));
    }
    Ok(())
}

/// Removes a partially written output file unless told to keep it
struct PartialOutput<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> PartialOutput<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, keep: false }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialOutput<'_> {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(self.path) {
            Ok(()) => info!("Removed incomplete output {}", self.path.display()),
            Err(e) => warn!("Failed to remove incomplete output {}: {}", self.path.display(), e),
        }
    }
}

/// Everything learned from the inputs before the output is created
struct Plan {
    origin: TemplateOrigin,
    template: TileTemplate,
    fallback: Vec<TileMatrix>,
}

/// Inspect both inputs and pick the metadata template
///
/// Source connections are closed when this returns.
fn plan(first: &Path, second: &Path) -> Result<Plan> {
    let a = db::open_read_only(first)?;
    let b = db::open_read_only(second)?;

    let a_tables = inspect::find_tile_tables(&a)?;
    let b_tables = inspect::find_tile_tables(&b)?;
    info!(
        "Tile tables: {} in {}, {} in {}",
        a_tables.len(),
        first.display(),
        b_tables.len(),
        second.display()
    );

    let (origin, template) = template::select_template((&a, &a_tables), (&b, &b_tables))?;
    info!("Using {} ({:?} input) as metadata template", template.source_table, origin);

    let mut fallback = template::compatible_matrices(&a, &a_tables, &template.matrix_set)?;
    fallback.extend(template::compatible_matrices(&b, &b_tables, &template.matrix_set)?);

    Ok(Plan {
        origin,
        template,
        fallback,
    })
}

/// Drop every user data table and purge its catalog rows
///
/// Virtual tables go first; the remaining tables are listed only after their
/// shadow tables are gone.
fn drop_data_tables(conn: &Connection) -> Result<()> {
    for stale in inspect::list_virtual_tables(conn)? {
        debug!("Dropping virtual table {}", stale);
        conn.execute_batch(&format!("DROP TABLE {}", quote_ident(&stale)))?;
        schema::purge_catalog_entries(conn, &stale)?;
    }

    for stale in inspect::list_data_tables(conn)? {
        debug!("Dropping {}", stale);
        conn.execute_batch(&format!("DROP TABLE {}", quote_ident(&stale)))?;
        schema::purge_catalog_entries(conn, &stale)?;
    }

    Ok(())
}

/// Merge the tiles of `first` and `second` into a new GeoPackage
///
/// `second` has priority: wherever both inputs hold a tile with the same
/// (zoom_level, tile_column, tile_row), the output carries the tile from
/// `second`. Tiles only `first` has fill the remaining gaps.
///
/// # Errors
///
/// * `InputNotFound` / `InvalidTableName` - before anything is written
/// * `NoTileTablesFound` / `MissingMetadata` - before anything is written
/// * `MergeCorrupted` - after the merge; the output file is kept
pub fn merge(first: &Path, second: &Path, options: &MergeOptions) -> Result<MergeReport> {
    for input in [first, second] {
        if !input.exists() {
            return Err(Error::InputNotFound(input.to_path_buf()));
        }
    }
    validate_table_name(&options.table_name)?;

    let plan = plan(first, second)?;
    let table = options.table_name.as_str();

    let output = report::resolve_output_path(options.output.as_deref(), first, second);
    info!("Cloning {} to {}", first.display(), output.display());
    fs::copy(first, &output)?;

    let mut partial = PartialOutput::new(&output);
    let mut conn = db::open_output(&output)?;

    let (tiles_from_b, tiles_from_a) = db::transaction(&mut conn, |tx| {
        drop_data_tables(tx)?;
        schema::create_tile_table(tx, table)?;
        plan.template.register(tx, table)?;

        let from_b = tiles::merge_into(tx, table, second, ConflictPolicy::Replace)?;
        info!("{} tiles from {}", from_b, second.display());
        let from_a = tiles::merge_into(tx, table, first, ConflictPolicy::Ignore)?;
        info!("{} additional tiles from {}", from_a, first.display());

        template::reconcile_tile_matrix(tx, table, &plan.fallback)?;
        schema::set_format_pragmas(tx)?;

        Ok((from_b, from_a))
    })?;
    partial.keep();

    conn.pragma_update_and_check(None, "journal_mode", "DELETE", |row| row.get::<_, String>(0))?;
    if options.vacuum {
        debug!("Compacting {}", output.display());
        conn.execute_batch("VACUUM")?;
    }

    db::verify(&conn)?;

    let total_tiles = inspect::tile_count(&conn, table)?;
    let zoom_levels = inspect::zoom_levels(&conn, table)?;
    drop(conn);

    let file_size = fs::metadata(&output)?.len();
    info!(
        "Merge complete: {} tiles ({:?} template), {} bytes",
        total_tiles, plan.origin, file_size
    );

    Ok(MergeReport {
        output_path: output.clone(),
        table_name: table.to_string(),
        template_table: plan.template.source_table,
        tiles_from_b,
        tiles_from_a,
        total_tiles,
        zoom_levels,
        file_size,
    })
}

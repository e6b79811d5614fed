// src/merge/template.rs

//! Catalog templating for the merged tile table
//!
//! The merged table has no pyramid of its own, so its `gpkg_contents`,
//! `gpkg_tile_matrix_set` and `gpkg_tile_matrix` rows are copied from one
//! source tile table and renamed to the merged table's identity.

use crate::db::models::{Content, SpatialRefSys, TileMatrix, TileMatrixSet};
use crate::db::{self, schema};
use crate::error::{Error, Result};
use crate::merge::inspect;
use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Which input file a template was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOrigin {
    /// The first (low priority) input
    First,
    /// The second (high priority) input
    Second,
}

/// Catalog rows describing one source tile table
#[derive(Debug, Clone)]
pub struct TileTemplate {
    pub source_table: String,
    pub content: Content,
    pub matrix_set: TileMatrixSet,
    pub matrices: Vec<TileMatrix>,
    pub srs: Option<SpatialRefSys>,
}

impl TileTemplate {
    /// Load the catalog rows of `table` from a source GeoPackage
    ///
    /// Fails with `Error::MissingMetadata` if the content entry, the tile
    /// matrix set or every tile matrix row is absent.
    pub fn load(source: &Connection, table: &str) -> Result<Self> {
        let missing = |what: &'static str| Error::MissingMetadata {
            table: table.to_string(),
            missing: what,
        };

        if !db::table_exists(source, "gpkg_contents")? {
            return Err(missing("gpkg_contents"));
        }
        let content = Content::find_by_table(source, table)?.ok_or_else(|| missing("gpkg_contents"))?;

        if !db::table_exists(source, "gpkg_tile_matrix_set")? {
            return Err(missing("gpkg_tile_matrix_set"));
        }
        let matrix_set =
            TileMatrixSet::find_by_table(source, table)?.ok_or_else(|| missing("gpkg_tile_matrix_set"))?;

        if !db::table_exists(source, "gpkg_tile_matrix")? {
            return Err(missing("gpkg_tile_matrix"));
        }
        let matrices = TileMatrix::find_by_table(source, table)?;
        if matrices.is_empty() {
            return Err(missing("gpkg_tile_matrix"));
        }

        let srs = if db::table_exists(source, "gpkg_spatial_ref_sys")? {
            SpatialRefSys::find_by_id(source, matrix_set.srs_id)?
        } else {
            None
        };

        debug!(
            "Loaded template from {}: srs {}, {} zoom level(s)",
            table,
            matrix_set.srs_id,
            matrices.len()
        );

        Ok(Self {
            source_table: table.to_string(),
            content,
            matrix_set,
            matrices,
            srs,
        })
    }

    /// Write catalog rows describing `new_table` into the target database
    ///
    /// Rows already registered under `new_table` are replaced, so calling
    /// this twice leaves a single content entry and tile matrix set.
    pub fn register(&self, target: &Connection, new_table: &str) -> Result<()> {
        schema::ensure_catalog(target)?;

        if let Some(srs) = &self.srs {
            if srs.insert_if_missing(target)? {
                info!("Copied spatial reference system {} into output", srs.srs_id);
            }
        }

        let content = Content {
            table_name: new_table.to_string(),
            data_type: schema::TILES_DATA_TYPE.to_string(),
            identifier: Some(new_table.to_string()),
            description: Some(format!("Merged tile set (metadata template: {})", self.source_table)),
            last_change: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            ..self.content.clone()
        };
        content.upsert(target)?;

        TileMatrixSet {
            table_name: new_table.to_string(),
            ..self.matrix_set.clone()
        }
        .upsert(target)?;

        TileMatrix::delete_by_table(target, new_table)?;
        for matrix in &self.matrices {
            TileMatrix {
                table_name: new_table.to_string(),
                ..matrix.clone()
            }
            .upsert(target)?;
        }

        info!(
            "Registered {} using metadata from {} ({} zoom level(s))",
            new_table,
            self.source_table,
            self.matrices.len()
        );
        Ok(())
    }
}

/// Copy the catalog rows of `source_table` into `target` under `new_table`
pub fn register_merged_table(
    source: &Connection,
    source_table: &str,
    target: &Connection,
    new_table: &str,
) -> Result<TileTemplate> {
    let template = TileTemplate::load(source, source_table)?;
    template.register(target, new_table)?;
    Ok(template)
}

/// Collect tile matrices of `tables` that share the template's tile grid
///
/// Only tables whose tile matrix set has the same SRS and bounds qualify.
pub fn compatible_matrices(
    conn: &Connection,
    tables: &[String],
    grid: &TileMatrixSet,
) -> Result<Vec<TileMatrix>> {
    if !db::table_exists(conn, "gpkg_tile_matrix_set")? || !db::table_exists(conn, "gpkg_tile_matrix")? {
        return Ok(Vec::new());
    }

    let mut matrices = Vec::new();
    for table in tables {
        let Some(set) = TileMatrixSet::find_by_table(conn, table)? else {
            continue;
        };
        let same_grid = set.srs_id == grid.srs_id
            && set.min_x == grid.min_x
            && set.min_y == grid.min_y
            && set.max_x == grid.max_x
            && set.max_y == grid.max_y;
        if same_grid {
            matrices.extend(TileMatrix::find_by_table(conn, table)?);
        }
    }

    Ok(matrices)
}

/// Make the tile matrices of `table` match the zoom levels it holds
///
/// Zoom levels with tiles but no matrix are filled from `fallback`; those
/// with no geometry anywhere are logged. Matrices for zoom levels without
/// tiles are removed unless the table is empty.
pub fn reconcile_tile_matrix(target: &Connection, table: &str, fallback: &[TileMatrix]) -> Result<()> {
    let zooms = inspect::zoom_levels(target, table)?;
    let existing: Vec<i64> = TileMatrix::find_by_table(target, table)?
        .iter()
        .map(|m| m.zoom_level)
        .collect();

    for &zoom in zooms.iter().filter(|z| !existing.contains(*z)) {
        match fallback.iter().find(|m| m.zoom_level == zoom) {
            Some(matrix) => {
                TileMatrix {
                    table_name: table.to_string(),
                    ..matrix.clone()
                }
                .upsert(target)?;
                info!("Added tile matrix for zoom level {} from {}", zoom, matrix.table_name);
            }
            None => warn!("Zoom level {} of {} has tiles but no tile matrix", zoom, table),
        }
    }

    if zooms.is_empty() {
        return Ok(());
    }

    for zoom in existing.into_iter().filter(|z| !zooms.contains(z)) {
        debug!("Removing tile matrix for empty zoom level {}", zoom);
        TileMatrix::delete_zoom(target, table, zoom)?;
    }

    Ok(())
}

/// Choose the tile table whose catalog rows describe the merged table
///
/// Tile tables of the first input are tried before those of the second; the
/// first one with complete metadata wins. With no tile tables at all this is
/// `Error::NoTileTablesFound`; if every candidate lacks metadata, the error
/// for the first candidate is returned.
pub fn select_template(
    first: (&Connection, &[String]),
    second: (&Connection, &[String]),
) -> Result<(TemplateOrigin, TileTemplate)> {
    let candidates = first
        .1
        .iter()
        .map(|table| (TemplateOrigin::First, first.0, table))
        .chain(second.1.iter().map(|table| (TemplateOrigin::Second, second.0, table)));

    let mut first_error = None;
    for (origin, conn, table) in candidates {
        match TileTemplate::load(conn, table) {
            Ok(template) => return Ok((origin, template)),
            Err(e @ Error::MissingMetadata { .. }) => {
                warn!("Skipping {} as template: {}", table, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(first_error.unwrap_or(Error::NoTileTablesFound))
}

// src/db/schema.rs

//! GeoPackage schema definitions
//!
//! Constants identifying the GeoPackage format, the DDL for the destination
//! tile table, and the minimal system catalog a tiled GeoPackage requires.

use crate::db::quote_ident;
use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// `PRAGMA application_id` value for GeoPackage files ("GPKG" in ASCII)
pub const APPLICATION_ID: i32 = 0x4750_4B47;

/// `PRAGMA user_version` value written to merged files (GeoPackage 1.2)
pub const USER_VERSION: i32 = 10200;

/// Column that marks a table as a tile table
pub const TILE_DATA_COLUMN: &str = "tile_data";

/// Name given to the destination tile table when none is configured
pub const DEFAULT_TABLE_NAME: &str = "merged_tiles";

/// `gpkg_contents.data_type` for raster tile tables
pub const TILES_DATA_TYPE: &str = "tiles";

/// Table name prefixes owned by SQLite or the GeoPackage system catalog
pub const RESERVED_PREFIXES: &[&str] = &["gpkg_", "gpkgext_", "sqlite_", "rtree_"];

/// Catalog tables that may hold rows keyed by a user table name, with the
/// column holding that name, child tables first
pub const TABLE_SCOPED_CATALOG: &[(&str, &str)] = &[
    ("gpkg_2d_gridded_tile_ancillary", "tpudt_name"),
    ("gpkg_2d_gridded_coverage_ancillary", "tile_matrix_set_name"),
    ("gpkg_tile_matrix", "table_name"),
    ("gpkg_tile_matrix_set", "table_name"),
    ("gpkg_geometry_columns", "table_name"),
    ("gpkg_data_columns", "table_name"),
    ("gpkg_metadata_reference", "table_name"),
    ("gpkg_extensions", "table_name"),
    ("gpkg_contents", "table_name"),
];

/// Whether a table name belongs to SQLite or the GeoPackage catalog
///
/// SQLite table names are case-insensitive, so the prefixes are too.
pub fn is_reserved_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    RESERVED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Create an empty GeoPackage tile table
///
/// The uniqueness constraint on (zoom_level, tile_column, tile_row) is what
/// lets the merger resolve conflicting tiles with `OR REPLACE` / `OR IGNORE`.
pub fn create_tile_table(conn: &Connection, table: &str) -> Result<()> {
    debug!("Creating tile table {}", table);

    conn.execute_batch(&format!(
        "
        CREATE TABLE {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            zoom_level INTEGER NOT NULL,
            tile_column INTEGER NOT NULL,
            tile_row INTEGER NOT NULL,
            tile_data BLOB NOT NULL,
            UNIQUE (zoom_level, tile_column, tile_row)
        );
        ",
        quote_ident(table)
    ))?;

    Ok(())
}

/// Create the GeoPackage system catalog tables needed for tiled content
///
/// Existing tables are left untouched, so this is safe on a file that is
/// already a GeoPackage. The three spatial reference systems every
/// GeoPackage must define are inserted if missing.
pub fn ensure_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            description TEXT DEFAULT '',
            last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            min_x DOUBLE,
            min_y DOUBLE,
            max_x DOUBLE,
            max_y DOUBLE,
            srs_id INTEGER,
            CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        );

        CREATE TABLE IF NOT EXISTS gpkg_tile_matrix_set (
            table_name TEXT NOT NULL PRIMARY KEY,
            srs_id INTEGER NOT NULL,
            min_x DOUBLE NOT NULL,
            min_y DOUBLE NOT NULL,
            max_x DOUBLE NOT NULL,
            max_y DOUBLE NOT NULL,
            CONSTRAINT fk_gtms_table_name FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
            CONSTRAINT fk_gtms_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        );

        CREATE TABLE IF NOT EXISTS gpkg_tile_matrix (
            table_name TEXT NOT NULL,
            zoom_level INTEGER NOT NULL,
            matrix_width INTEGER NOT NULL,
            matrix_height INTEGER NOT NULL,
            tile_width INTEGER NOT NULL,
            tile_height INTEGER NOT NULL,
            pixel_x_size DOUBLE NOT NULL,
            pixel_y_size DOUBLE NOT NULL,
            CONSTRAINT pk_ttm PRIMARY KEY (table_name, zoom_level),
            CONSTRAINT fk_tmm_table_name FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name)
        );

        INSERT OR IGNORE INTO gpkg_spatial_ref_sys
            (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
        VALUES
            ('WGS 84 geodetic', 4326, 'EPSG', 4326,
             'GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],AUTHORITY[\"EPSG\",\"4326\"]]',
             'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid'),
            ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
            ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system');
        ",
    )?;

    Ok(())
}

/// Delete every catalog row that refers to `table`
///
/// Only catalog tables present in the file are touched. Returns the number
/// of rows removed.
pub fn purge_catalog_entries(conn: &Connection, table: &str) -> Result<usize> {
    let mut removed = 0;

    for (catalog, key) in TABLE_SCOPED_CATALOG {
        if !crate::db::table_exists(conn, catalog)? {
            continue;
        }
        if !crate::db::table_columns(conn, catalog)?.iter().any(|c| c == key) {
            continue;
        }

        removed += conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", quote_ident(catalog), quote_ident(key)),
            [table],
        )?;
    }

    Ok(removed)
}

/// Stamp the GeoPackage application id and version into the file header
///
/// Overwrites whatever values the file carried before.
pub fn set_format_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "application_id", APPLICATION_ID)?;
    conn.pragma_update(None, "user_version", USER_VERSION)?;
    info!(
        "Set application_id = {:#x}, user_version = {}",
        APPLICATION_ID, USER_VERSION
    );
    Ok(())
}

// src/db/models.rs

//! Data models for the GeoPackage system catalog
//!
//! This module defines Rust structs that correspond to the catalog tables
//! describing tiled content and provides methods for reading and writing
//! their rows.

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A row of `gpkg_spatial_ref_sys`
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialRefSys {
    pub srs_name: String,
    pub srs_id: i64,
    pub organization: String,
    pub organization_coordsys_id: i64,
    pub definition: String,
    pub description: Option<String>,
}

impl SpatialRefSys {
    /// Find a spatial reference system by ID
    pub fn find_by_id(conn: &Connection, srs_id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT srs_name, srs_id, organization, organization_coordsys_id, definition, description
             FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
        )?;

        let srs = stmt.query_row([srs_id], Self::from_row).optional()?;

        Ok(srs)
    }

    /// Insert this row unless the SRS ID is already defined
    ///
    /// Returns true if a row was written.
    pub fn insert_if_missing(&self, conn: &Connection) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO gpkg_spatial_ref_sys
                 (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &self.srs_name,
                self.srs_id,
                &self.organization,
                self.organization_coordsys_id,
                &self.definition,
                &self.description,
            ],
        )?;

        Ok(inserted > 0)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            srs_name: row.get(0)?,
            srs_id: row.get(1)?,
            organization: row.get(2)?,
            organization_coordsys_id: row.get(3)?,
            definition: row.get(4)?,
            description: row.get(5)?,
        })
    }
}

/// A row of `gpkg_contents`: registers a user table as GeoPackage content
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub table_name: String,
    pub data_type: String,
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub last_change: String,
    pub min_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_x: Option<f64>,
    pub max_y: Option<f64>,
    pub srs_id: Option<i64>,
}

impl Content {
    /// Find the content entry for a table
    pub fn find_by_table(conn: &Connection, table: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT table_name, data_type, identifier, description, last_change,
                    min_x, min_y, max_x, max_y, srs_id
             FROM gpkg_contents WHERE table_name = ?1",
        )?;

        let content = stmt.query_row([table], Self::from_row).optional()?;

        Ok(content)
    }

    /// Insert this entry, or update the existing entry for the same table
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO gpkg_contents
                 (table_name, data_type, identifier, description, last_change,
                  min_x, min_y, max_x, max_y, srs_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(table_name) DO UPDATE SET
                 data_type = excluded.data_type,
                 identifier = excluded.identifier,
                 description = excluded.description,
                 last_change = excluded.last_change,
                 min_x = excluded.min_x,
                 min_y = excluded.min_y,
                 max_x = excluded.max_x,
                 max_y = excluded.max_y,
                 srs_id = excluded.srs_id",
            params![
                &self.table_name,
                &self.data_type,
                &self.identifier,
                &self.description,
                &self.last_change,
                self.min_x,
                self.min_y,
                self.max_x,
                self.max_y,
                self.srs_id,
            ],
        )?;

        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            table_name: row.get(0)?,
            data_type: row.get(1)?,
            identifier: row.get(2)?,
            description: row.get(3)?,
            last_change: row.get(4)?,
            min_x: row.get(5)?,
            min_y: row.get(6)?,
            max_x: row.get(7)?,
            max_y: row.get(8)?,
            srs_id: row.get(9)?,
        })
    }
}

/// A row of `gpkg_tile_matrix_set`: the extent and SRS of a tile pyramid
#[derive(Debug, Clone, PartialEq)]
pub struct TileMatrixSet {
    pub table_name: String,
    pub srs_id: i64,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl TileMatrixSet {
    /// Find the tile matrix set for a table
    pub fn find_by_table(conn: &Connection, table: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT table_name, srs_id, min_x, min_y, max_x, max_y
             FROM gpkg_tile_matrix_set WHERE table_name = ?1",
        )?;

        let set = stmt.query_row([table], Self::from_row).optional()?;

        Ok(set)
    }

    /// Insert this entry, or update the existing entry for the same table
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO gpkg_tile_matrix_set (table_name, srs_id, min_x, min_y, max_x, max_y)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(table_name) DO UPDATE SET
                 srs_id = excluded.srs_id,
                 min_x = excluded.min_x,
                 min_y = excluded.min_y,
                 max_x = excluded.max_x,
                 max_y = excluded.max_y",
            params![
                &self.table_name,
                self.srs_id,
                self.min_x,
                self.min_y,
                self.max_x,
                self.max_y,
            ],
        )?;

        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            table_name: row.get(0)?,
            srs_id: row.get(1)?,
            min_x: row.get(2)?,
            min_y: row.get(3)?,
            max_x: row.get(4)?,
            max_y: row.get(5)?,
        })
    }
}

/// A row of `gpkg_tile_matrix`: pyramid geometry for one zoom level
#[derive(Debug, Clone, PartialEq)]
pub struct TileMatrix {
    pub table_name: String,
    pub zoom_level: i64,
    pub matrix_width: i64,
    pub matrix_height: i64,
    pub tile_width: i64,
    pub tile_height: i64,
    pub pixel_x_size: f64,
    pub pixel_y_size: f64,
}

impl TileMatrix {
    /// List the tile matrices of a table, lowest zoom level first
    pub fn find_by_table(conn: &Connection, table: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT table_name, zoom_level, matrix_width, matrix_height,
                    tile_width, tile_height, pixel_x_size, pixel_y_size
             FROM gpkg_tile_matrix WHERE table_name = ?1 ORDER BY zoom_level",
        )?;

        let matrices = stmt
            .query_map([table], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(matrices)
    }

    /// Insert this matrix, or update the existing one for the same zoom level
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO gpkg_tile_matrix
                 (table_name, zoom_level, matrix_width, matrix_height,
                  tile_width, tile_height, pixel_x_size, pixel_y_size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(table_name, zoom_level) DO UPDATE SET
                 matrix_width = excluded.matrix_width,
                 matrix_height = excluded.matrix_height,
                 tile_width = excluded.tile_width,
                 tile_height = excluded.tile_height,
                 pixel_x_size = excluded.pixel_x_size,
                 pixel_y_size = excluded.pixel_y_size",
            params![
                &self.table_name,
                self.zoom_level,
                self.matrix_width,
                self.matrix_height,
                self.tile_width,
                self.tile_height,
                self.pixel_x_size,
                self.pixel_y_size,
            ],
        )?;

        Ok(())
    }

    /// Delete every tile matrix of a table
    pub fn delete_by_table(conn: &Connection, table: &str) -> Result<usize> {
        let deleted = conn.execute("DELETE FROM gpkg_tile_matrix WHERE table_name = ?1", [table])?;
        Ok(deleted)
    }

    /// Delete the tile matrix of a single zoom level
    pub fn delete_zoom(conn: &Connection, table: &str, zoom_level: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM gpkg_tile_matrix WHERE table_name = ?1 AND zoom_level = ?2",
            params![table, zoom_level],
        )?;
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            table_name: row.get(0)?,
            zoom_level: row.get(1)?,
            matrix_width: row.get(2)?,
            matrix_height: row.get(3)?,
            tile_width: row.get(4)?,
            tile_height: row.get(5)?,
            pixel_x_size: row.get(6)?,
            pixel_y_size: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        schema::ensure_catalog(&conn).unwrap();
        (temp_file, conn)
    }

    fn sample_content(table: &str) -> Content {
        Content {
            table_name: table.to_string(),
            data_type: "tiles".to_string(),
            identifier: Some(table.to_string()),
            description: Some("test tiles".to_string()),
            last_change: "2024-01-01T00:00:00.000Z".to_string(),
            min_x: Some(-180.0),
            min_y: Some(-90.0),
            max_x: Some(180.0),
            max_y: Some(90.0),
            srs_id: Some(4326),
        }
    }

    #[test]
    fn test_content_upsert_replaces_existing() {
        let (_temp, conn) = create_test_db();

        let mut content = sample_content("tiles");
        content.upsert(&conn).unwrap();

        content.description = Some("updated".to_string());
        content.upsert(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT count(*) FROM gpkg_contents WHERE table_name = 'tiles'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let found = Content::find_by_table(&conn, "tiles").unwrap().unwrap();
        assert_eq!(found.description.as_deref(), Some("updated"));
        assert_eq!(found.srs_id, Some(4326));
    }

    #[test]
    fn test_content_not_found() {
        let (_temp, conn) = create_test_db();
        assert!(Content::find_by_table(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_tile_matrix_set_round_trip() {
        let (_temp, conn) = create_test_db();
        sample_content("tiles").upsert(&conn).unwrap();

        let set = TileMatrixSet {
            table_name: "tiles".to_string(),
            srs_id: 4326,
            min_x: -180.0,
            min_y: -90.0,
            max_x: 180.0,
            max_y: 90.0,
        };
        set.upsert(&conn).unwrap();
        set.upsert(&conn).unwrap();

        assert_eq!(TileMatrixSet::find_by_table(&conn, "tiles").unwrap(), Some(set));
    }

    #[test]
    fn test_tile_matrix_requires_content_entry() {
        let (_temp, conn) = create_test_db();

        let matrix = TileMatrix {
            table_name: "orphan".to_string(),
            zoom_level: 0,
            matrix_width: 1,
            matrix_height: 1,
            tile_width: 256,
            tile_height: 256,
            pixel_x_size: 1.0,
            pixel_y_size: 1.0,
        };
        assert!(matrix.upsert(&conn).is_err());
    }

    #[test]
    fn test_tile_matrix_ordering_and_delete() {
        let (_temp, conn) = create_test_db();
        sample_content("tiles").upsert(&conn).unwrap();

        for zoom in [3, 1, 2] {
            TileMatrix {
                table_name: "tiles".to_string(),
                zoom_level: zoom,
                matrix_width: 1 << zoom,
                matrix_height: 1 << zoom,
                tile_width: 256,
                tile_height: 256,
                pixel_x_size: 1.0 / (1 << zoom) as f64,
                pixel_y_size: 1.0 / (1 << zoom) as f64,
            }
            .upsert(&conn)
            .unwrap();
        }

        let zooms: Vec<i64> = TileMatrix::find_by_table(&conn, "tiles")
            .unwrap()
            .iter()
            .map(|m| m.zoom_level)
            .collect();
        assert_eq!(zooms, vec![1, 2, 3]);

        TileMatrix::delete_zoom(&conn, "tiles", 2).unwrap();
        assert_eq!(TileMatrix::find_by_table(&conn, "tiles").unwrap().len(), 2);

        assert_eq!(TileMatrix::delete_by_table(&conn, "tiles").unwrap(), 2);
        assert!(TileMatrix::find_by_table(&conn, "tiles").unwrap().is_empty());
    }

    #[test]
    fn test_spatial_ref_sys_insert_if_missing() {
        let (_temp, conn) = create_test_db();

        let wgs84 = SpatialRefSys::find_by_id(&conn, 4326).unwrap().unwrap();
        assert!(!wgs84.insert_if_missing(&conn).unwrap());

        let mercator = SpatialRefSys {
            srs_name: "WGS 84 / Pseudo-Mercator".to_string(),
            srs_id: 3857,
            organization: "EPSG".to_string(),
            organization_coordsys_id: 3857,
            definition: "PROJCS[\"WGS 84 / Pseudo-Mercator\"]".to_string(),
            description: None,
        };
        assert!(mercator.insert_if_missing(&conn).unwrap());
        assert_eq!(SpatialRefSys::find_by_id(&conn, 3857).unwrap(), Some(mercator));
    }
}

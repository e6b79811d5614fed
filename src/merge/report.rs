// src/merge/report.rs

//! Output naming and merge summaries

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension given to derived output names
const OUTPUT_EXTENSION: &str = "gpkg";

/// Summary of a completed merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// File that was written
    pub output_path: PathBuf,
    /// Destination tile table
    pub table_name: String,
    /// Source tile table whose catalog rows describe the destination table
    pub template_table: String,
    /// Tiles written from the second (high priority) input
    pub tiles_from_b: usize,
    /// Tiles from the first input that filled gaps left by the second
    pub tiles_from_a: usize,
    /// Rows in the destination table
    pub total_tiles: i64,
    /// Distinct zoom levels present, ascending
    pub zoom_levels: Vec<i64>,
    /// Size of the output file in bytes
    pub file_size: u64,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Merged GeoPackage: {}", self.output_path.display())?;
        writeln!(f, "  Table: {} (metadata from {})", self.table_name, self.template_table)?;
        writeln!(f, "  Tiles from second input: {}", self.tiles_from_b)?;
        writeln!(f, "  Tiles added from first input: {}", self.tiles_from_a)?;
        writeln!(f, "  Total tiles: {}", self.total_tiles)?;

        let zooms = self
            .zoom_levels
            .iter()
            .map(|z| z.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "  Zoom levels: {}", if zooms.is_empty() { "none" } else { &zooms })?;
        write!(f, "  File size: {}", format_size(self.file_size))
    }
}

/// Derive an output file name from the two input names
///
/// `a.gpkg` and `b.gpkg` produce `merged_a_b.gpkg` in the current directory.
pub fn default_output_name(first: &Path, second: &Path) -> PathBuf {
    let stem = |path: &Path| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string())
    };

    PathBuf::from(format!("merged_{}_{}.{}", stem(first), stem(second), OUTPUT_EXTENSION))
}

/// Pick the path the merge will write to
///
/// Uses the requested path, or a name derived from the inputs. An existing
/// file is never overwritten: a millisecond timestamp is appended instead.
pub fn resolve_output_path(requested: Option<&Path>, first: &Path, second: &Path) -> PathBuf {
    let path = match requested {
        Some(path) => path.to_path_buf(),
        None => default_output_name(first, second),
    };

    if path.exists() { disambiguate(&path) } else { path }
}

/// Append a millisecond timestamp to a file name, keeping its extension
pub fn disambiguate(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut millis = Utc::now().timestamp_millis();
    loop {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, millis, ext),
            None => format!("{}_{}", stem, millis),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        millis += 1;
    }
}

/// Format a byte count for humans (e.g. "1.5 MiB")
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", size, UNITS[unit])
}

// src/lib.rs

//! gpkg-merge
//!
//! Merges the raster tile sets of two GeoPackage files into one new,
//! standards-conformant GeoPackage.
//!
//! # Architecture
//!
//! - Clone-based: the output starts as a copy of the first input, inheriting
//!   its system catalog, spatial reference systems and extensions
//! - Capability-based discovery: any table with a `tile_data` column is a tile table
//! - Priority merge: the second input's tiles win every key conflict; the
//!   first input only fills gaps
//! - Transactional: the rewrite either completes or leaves no output behind
//! - Verified: every output passes `PRAGMA integrity_check` and foreign-key checks

pub mod db;
mod error;
pub mod merge;

pub use error::{Error, Result};
pub use merge::{MergeOptions, MergeReport, merge};

//! ecalstitch-core: Core types for stitching ECAL rec hits into one image.
//!
//! This crate provides cell identifiers, rec hits, the geometry service
//! seam, the endcap eta binning tables and the stitched image layout.
//!

pub mod binning;
pub mod cell;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hit;

pub use binning::{BinningTable, EE_ETA_BINS, EE_MINUS_ETA_EDGES, EE_PLUS_ETA_EDGES};
pub use cell::{BarrelCellId, CellId, EndcapCellId, EndcapSide};
pub use config::{BandOffsets, StitchConfig, StitchLayout};
pub use error::{Error, Result};
pub use geometry::{CellGeometry, GeometryTable, Position};
pub use hit::{BarrelHit, EndcapHit, EventHits, Hit, RecHit};

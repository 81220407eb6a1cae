//! Error types for ecalstitch-core.

use thiserror::Error;

/// Result type alias for ecalstitch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stitching operations.
///
/// Every variant is fatal for the event being processed; nothing in the
/// stitching path retries or substitutes a default bin.
#[derive(Error, Debug)]
pub enum Error {
    /// Raw detector id that does not decode to an ECAL barrel or endcap cell.
    #[error("invalid cell id {raw:#010x}: {reason}")]
    InvalidCellId { raw: u32, reason: String },

    /// Barrel indices outside the native (ieta, iphi) range.
    #[error("invalid barrel cell: ieta={ieta}, iphi={iphi}")]
    InvalidBarrelCell { ieta: i32, iphi: u16 },

    /// Endcap indices outside the native (ix, iy) range.
    #[error("invalid endcap cell: ix={ix}, iy={iy}")]
    InvalidEndcapCell { ix: u16, iy: u16 },

    /// The geometry service has no position for this cell.
    #[error("no position known for cell {0}")]
    UnknownCell(String),

    /// A resolved position falls outside the projection tables.
    #[error("position outside endcap acceptance: phi={phi}, eta={eta}")]
    OutOfAcceptance { phi: f64, eta: f64 },

    /// A monitor fill addressed a bin outside its footprint.
    #[error("monitor bin out of range: iphi={iphi}, ieta={ieta}")]
    MonitorOutOfRange { iphi: usize, ieta: i32 },

    /// The output image was filled twice without an intervening reset.
    #[error("stitched image already filled for this event; reset it first")]
    ImageNotReset,

    /// Invalid binning table.
    #[error("invalid binning table: {0}")]
    InvalidBinning(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

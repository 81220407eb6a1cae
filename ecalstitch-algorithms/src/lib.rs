//! ecalstitch-algorithms: Stitching of ECAL hits into an extended image.
//!
//! This crate provides:
//! - **Endcap projection** - per-event `(phi, eta)` histograms of endcap hits
//! - **Stitched image** - the flat per-event `(ieta, iphi)` output
//! - **Monitor** - run-long running mean per image bin
//! - **Stitcher** - writes barrel hits and projected endcaps into the image
//!
#![warn(missing_docs)]

mod image;
pub mod monitor;
mod projection;
mod stitcher;

pub use image::StitchedImage;
pub use monitor::{MonitorAccumulator, MonitorBin, MonitorSnapshot, RunningMean};
pub use projection::{EndcapProjection, ProjectionBin};
pub use stitcher::{EcalStitcher, RunStatistics, StitchStatistics};

// Re-export core types used in the public API
pub use ecalstitch_core::{StitchConfig, StitchLayout};

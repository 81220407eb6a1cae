//! ecalstitch-io: file I/O for ECAL image stitching.
//!
//! Reads events as JSON lines and endcap geometry as a JSON cell dump,
//! and writes stitched images (binary or CSV) and the final monitor
//! profile (JSON or CSV).

mod error;
mod geometry;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use geometry::{geometry_from_json, load_geometry};
pub use reader::EventReader;
pub use writer::{
    read_binary_images, ImageFileWriter, ImageFormat, ImageSink, MonitorFormat, MonitorWriter,
};

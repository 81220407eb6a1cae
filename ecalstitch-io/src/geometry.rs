//! Endcap geometry dump loader.

use crate::{Error, Result};
use ecalstitch_core::{CellId, GeometryTable, Position};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct GeometryFile {
    cells: Vec<CellRecord>,
}

#[derive(Deserialize)]
struct CellRecord {
    id: u32,
    x: f64,
    y: f64,
    z: f64,
}

/// Loads an endcap geometry dump from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid dump.
pub fn load_geometry<P: AsRef<Path>>(path: P) -> Result<GeometryTable> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let table = geometry_from_json(&json)?;
    log::info!("loaded {} endcap cells from {}", table.len(), path.display());
    Ok(table)
}

/// Parses an endcap geometry dump.
///
/// Format:
/// ```json
/// { "cells": [ { "id": 872432916, "x": 12.5, "y": -30.0, "z": 320.0 } ] }
/// ```
///
/// Only endcap ids are accepted. A repeated id keeps its last position.
///
/// # Errors
/// Returns an error for malformed JSON, undecodable ids, barrel ids or
/// non-finite coordinates.
pub fn geometry_from_json(json: &str) -> Result<GeometryTable> {
    let file: GeometryFile = serde_json::from_str(json)?;
    let mut table = GeometryTable::new();

    for record in file.cells {
        let cell = match CellId::from_raw(record.id)? {
            CellId::Endcap(cell) => cell,
            CellId::Barrel(cell) => {
                return Err(Error::InvalidFormat(format!(
                    "geometry lists barrel cell {cell}; only endcap cells are projected"
                )));
            }
        };
        if ![record.x, record.y, record.z].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidFormat(format!(
                "non-finite position for {cell}"
            )));
        }

        let before = table.len();
        table.insert(cell, Position::new(record.x, record.y, record.z));
        if table.len() == before {
            log::warn!("geometry repeats {cell}, keeping the last position");
        }
    }

    if table.is_empty() {
        log::warn!("geometry dump contains no cells");
    }
    Ok(table)
}

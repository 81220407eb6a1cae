//! Cell geometry: positions and the angular coordinates derived from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cell::EndcapCellId;
use crate::error::{Error, Result};

/// Cartesian position of a cell centre (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Transverse distance from the beam line.
    #[inline]
    #[must_use]
    pub fn rho(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Azimuth in `(-pi, pi]`.
    #[inline]
    #[must_use]
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Pseudorapidity.
    ///
    /// Points on the beam line give `+/-inf`, which no projection table accepts.
    #[inline]
    #[must_use]
    pub fn eta(&self) -> f64 {
        let rho = self.rho();
        if rho == 0.0 {
            return if self.z >= 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        (self.z / rho).asinh()
    }

    /// Builds a position from `(rho, eta, phi)`.
    #[must_use]
    pub fn from_rho_eta_phi(rho: f64, eta: f64, phi: f64) -> Self {
        Self {
            x: rho * phi.cos(),
            y: rho * phi.sin(),
            z: rho * eta.sinh(),
        }
    }
}

/// Geometry service: resolves endcap cells to positions.
///
/// Barrel cells carry their own `(ieta, iphi)` and never go through this trait.
pub trait CellGeometry {
    /// Returns the centre position of an endcap cell.
    ///
    /// # Errors
    /// Returns [`Error::UnknownCell`] when the cell cannot be resolved.
    fn position(&self, cell: &EndcapCellId) -> Result<Position>;
}

impl<G: CellGeometry + ?Sized> CellGeometry for &G {
    fn position(&self, cell: &EndcapCellId) -> Result<Position> {
        (**self).position(cell)
    }
}

/// Lookup-table geometry, filled once from a geometry dump.
#[derive(Debug, Clone, Default)]
pub struct GeometryTable {
    cells: HashMap<EndcapCellId, Position>,
}

impl GeometryTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a cell position.
    pub fn insert(&mut self, cell: EndcapCellId, position: Position) {
        self.cells.insert(cell, position);
    }

    /// Number of known cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if no cells are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(EndcapCellId, Position)> for GeometryTable {
    fn from_iter<I: IntoIterator<Item = (EndcapCellId, Position)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl CellGeometry for GeometryTable {
    fn position(&self, cell: &EndcapCellId) -> Result<Position> {
        self.cells
            .get(cell)
            .copied()
            .ok_or_else(|| Error::UnknownCell(cell.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::EndcapSide;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_eta_phi_from_cartesian() {
        let p = Position::new(0.0, 100.0, 0.0);
        assert_relative_eq!(p.phi(), PI / 2.0);
        assert_relative_eq!(p.eta(), 0.0);

        let p = Position::from_rho_eta_phi(50.0, -2.1, 1.2);
        assert_relative_eq!(p.eta(), -2.1, epsilon = 1e-12);
        assert_relative_eq!(p.phi(), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_eta_on_beam_line_is_infinite() {
        assert!(Position::new(0.0, 0.0, 320.0).eta().is_infinite());
        assert!(Position::new(0.0, 0.0, -320.0).eta() < 0.0);
    }

    #[test]
    fn test_table_lookup() {
        let known = EndcapCellId::new(30, 40, EndcapSide::Plus).unwrap();
        let unknown = EndcapCellId::new(30, 40, EndcapSide::Minus).unwrap();
        let table: GeometryTable = [(known, Position::new(1.0, 2.0, 3.0))]
            .into_iter()
            .collect();

        assert_eq!(table.len(), 1);
        assert_eq!(table.position(&known).unwrap(), Position::new(1.0, 2.0, 3.0));
        let err = table.position(&unknown).unwrap_err();
        assert!(matches!(err, Error::UnknownCell(_)));
    }
}

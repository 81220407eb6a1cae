//! Per-event endcap projection onto a `(phi, eta)` grid.
//!
//! Several endcap crystals can land in the same projection bin, so endcap
//! hits are first summed here and only then transferred to the image.

use std::f64::consts::{PI, TAU};

use ecalstitch_core::{
    BinningTable, CellGeometry, EndcapHit, EndcapSide, Error, Hit, Position, Result, StitchConfig,
};

/// A non-empty projection bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionBin {
    /// Zero-based phi column.
    pub col: usize,
    /// Zero-based eta row.
    pub row: usize,
    /// Summed energy.
    pub energy: f32,
}

/// 2D histogram with uniform phi columns over `[-pi, pi)` and
/// non-uniform eta rows.
///
/// Data is stored row-major: `contents[row * n_phi + col]`.
#[derive(Debug, Clone)]
pub struct EndcapProjection {
    side: EndcapSide,
    eta_edges: BinningTable,
    n_phi: usize,
    contents: Vec<f32>,
    entries: usize,
}

impl EndcapProjection {
    /// Creates an empty projection.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if `n_phi` is zero.
    pub fn new(side: EndcapSide, eta_edges: BinningTable, n_phi: usize) -> Result<Self> {
        if n_phi == 0 {
            return Err(Error::ConfigError(
                "projection needs at least one phi column".to_string(),
            ));
        }
        let len = eta_edges.n_bins() * n_phi;
        Ok(Self {
            side,
            eta_edges,
            n_phi,
            contents: vec![0.0; len],
            entries: 0,
        })
    }

    /// Creates the projection for one side from a stitch configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration fails validation.
    pub fn from_config(config: &StitchConfig, side: EndcapSide) -> Result<Self> {
        config.validate()?;
        Self::new(side, config.eta_edges(side).clone(), config.layout().cols())
    }

    /// Zeroes every bin, keeping the allocation.
    pub fn reset(&mut self) {
        self.contents.fill(0.0);
        self.entries = 0;
    }

    /// Phi column of an azimuth.
    ///
    /// `phi = pi` (the upper edge of `atan2`) wraps onto column 0.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn phi_bin(&self, phi: f64) -> Option<usize> {
        if !phi.is_finite() {
            return None;
        }
        let n = self.n_phi as i64;
        let bin = ((phi + PI) / TAU * self.n_phi as f64).floor() as i64;
        Some(bin.rem_euclid(n) as usize)
    }

    /// Eta row of a pseudorapidity, if inside the table.
    #[inline]
    #[must_use]
    pub fn eta_bin(&self, eta: f64) -> Option<usize> {
        self.eta_edges.find_bin(eta)
    }

    /// Adds `energy` into the bin holding `(phi, eta)`.
    ///
    /// Zero energy is a no-op.
    ///
    /// # Errors
    /// Returns [`Error::OutOfAcceptance`] if `eta` is outside the table or
    /// `phi` is not finite.
    #[allow(clippy::float_cmp)]
    pub fn fill(&mut self, phi: f64, eta: f64, energy: f32) -> Result<()> {
        if energy == 0.0 {
            return Ok(());
        }
        let (Some(col), Some(row)) = (self.phi_bin(phi), self.eta_bin(eta)) else {
            return Err(Error::OutOfAcceptance { phi, eta });
        };
        self.contents[row * self.n_phi + col] += energy;
        self.entries += 1;
        Ok(())
    }

    /// Adds `energy` at a cell position.
    ///
    /// # Errors
    /// See [`EndcapProjection::fill`].
    pub fn fill_position(&mut self, position: &Position, energy: f32) -> Result<()> {
        self.fill(position.phi(), position.eta(), energy)
    }

    /// Resolves a hit through the geometry service and adds its energy.
    ///
    /// Returns `false` for a zero-energy hit, which is skipped before any
    /// geometry lookup.
    ///
    /// # Errors
    /// Propagates geometry failures and out-of-acceptance positions.
    pub fn fill_hit<G: CellGeometry + ?Sized>(
        &mut self,
        hit: &EndcapHit,
        geometry: &G,
    ) -> Result<bool> {
        debug_assert_eq!(hit.id.side(), self.side, "hit routed to wrong endcap");
        if hit.is_empty() {
            return Ok(false);
        }
        let position = geometry.position(&hit.id)?;
        self.fill_position(&position, hit.energy)?;
        Ok(true)
    }

    /// Summed energy in a bin.
    #[must_use]
    pub fn content(&self, col: usize, row: usize) -> Option<f32> {
        if col < self.n_phi && row < self.n_eta() {
            Some(self.contents[row * self.n_phi + col])
        } else {
            None
        }
    }

    /// Iterates over bins with non-zero content, row by row.
    pub fn nonzero_bins(&self) -> impl Iterator<Item = ProjectionBin> + '_ {
        let n_phi = self.n_phi;
        self.contents
            .iter()
            .enumerate()
            .filter(|&(_, &energy)| energy != 0.0)
            .map(move |(idx, &energy)| ProjectionBin {
                col: idx % n_phi,
                row: idx / n_phi,
                energy,
            })
    }

    /// Endcap this projection belongs to.
    #[inline]
    #[must_use]
    pub fn side(&self) -> EndcapSide {
        self.side
    }

    /// Number of phi columns.
    #[inline]
    #[must_use]
    pub fn n_phi(&self) -> usize {
        self.n_phi
    }

    /// Number of eta rows.
    #[inline]
    #[must_use]
    pub fn n_eta(&self) -> usize {
        self.eta_edges.n_bins()
    }

    /// Number of hits filled since the last reset.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Sum over all bins.
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.contents.iter().map(|&e| f64::from(e)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecalstitch_core::{EndcapCellId, GeometryTable, RecHit};

    fn plus() -> EndcapProjection {
        EndcapProjection::from_config(&StitchConfig::default(), EndcapSide::Plus).unwrap()
    }

    fn col_centre(col: usize) -> f64 {
        -PI + (col as f64 + 0.5) * TAU / 360.0
    }

    #[test]
    fn test_shape() {
        let proj = plus();
        assert_eq!(proj.n_phi(), 360);
        assert_eq!(proj.n_eta(), 55);
        assert_eq!(proj.nonzero_bins().count(), 0);
    }

    #[test]
    fn test_zero_phi_columns_is_config_error() {
        let err = EndcapProjection::new(EndcapSide::Minus, BinningTable::ee_minus(), 0).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_phi_bin_edges() {
        let proj = plus();
        assert_eq!(proj.phi_bin(-PI), Some(0));
        assert_eq!(proj.phi_bin(col_centre(0)), Some(0));
        assert_eq!(proj.phi_bin(col_centre(359)), Some(359));
        assert_eq!(proj.phi_bin(0.0), Some(180));
        assert_eq!(proj.phi_bin(PI), Some(0));
        assert_eq!(proj.phi_bin(f64::NAN), None);
    }

    #[test]
    fn test_same_bin_accumulates() {
        let mut proj = plus();
        proj.fill(col_centre(10), 2.01, 1.25).unwrap();
        proj.fill(col_centre(10), 2.015, 0.5).unwrap();
        let row = proj.eta_bin(2.01).unwrap();
        assert_eq!(proj.content(10, row), Some(1.25 + 0.5));
        assert_eq!(proj.entries(), 2);
        assert_eq!(proj.nonzero_bins().count(), 1);
    }

    #[test]
    fn test_zero_energy_is_noop() {
        let mut proj = plus();
        proj.fill(0.0, 2.0, 0.0).unwrap();
        // Even out of acceptance: zero energy never reaches the lookup.
        proj.fill(0.0, 0.3, 0.0).unwrap();
        assert_eq!(proj.entries(), 0);
        assert_eq!(proj.total_energy(), 0.0);
    }

    #[test]
    fn test_table_limits_are_accepted() {
        let mut proj = plus();
        proj.fill(0.0, 1.479, 1.0).unwrap();
        proj.fill(0.0, 3.0, 2.0).unwrap();
        assert_eq!(proj.content(180, 0), Some(1.0));
        assert_eq!(proj.content(180, 54), Some(2.0));
    }

    #[test]
    fn test_out_of_acceptance() {
        let mut proj = plus();
        let err = proj.fill(0.0, 1.2, 1.0).unwrap_err();
        assert!(matches!(err, Error::OutOfAcceptance { .. }));
        assert!(proj.fill(0.0, -2.0, 1.0).is_err());
        assert_eq!(proj.entries(), 0);
    }

    #[test]
    fn test_reset_zeroes_bins() {
        let mut proj = plus();
        proj.fill(1.0, 2.2, 3.0).unwrap();
        proj.reset();
        assert_eq!(proj.nonzero_bins().count(), 0);
        assert_eq!(proj.entries(), 0);
        assert_eq!(proj.n_eta(), 55);
    }

    #[test]
    fn test_fill_hit_uses_geometry() {
        let cell = EndcapCellId::new(20, 30, EndcapSide::Plus).unwrap();
        let missing = EndcapCellId::new(21, 30, EndcapSide::Plus).unwrap();
        let geometry: GeometryTable = [(cell, Position::from_rho_eta_phi(60.0, 2.2, col_centre(7)))]
            .into_iter()
            .collect();

        let mut proj = plus();
        assert!(proj.fill_hit(&RecHit::new(cell, 4.0), &geometry).unwrap());
        assert!(!proj.fill_hit(&RecHit::new(missing, 0.0), &geometry).unwrap());
        assert!(proj.fill_hit(&RecHit::new(missing, 1.0), &geometry).is_err());

        let bins: Vec<_> = proj.nonzero_bins().collect();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].col, 7);
        assert_eq!(bins[0].row, proj.eta_bin(2.2).unwrap());
        assert_eq!(bins[0].energy, 4.0);
    }
}

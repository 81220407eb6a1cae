//! Non-uniform eta binning for the endcap projections.
//!
//! Each endcap is projected onto a `(phi, eta)` grid whose eta edges are
//! chosen so that five pseudo-crystals span every HCAL endcap tower, which
//! is the granularity the barrel already has. The edges are data: a run
//! can swap them through [`StitchConfig`](crate::config::StitchConfig).

use crate::error::{Error, Result};

/// Pseudo-crystals per HCAL tower along eta.
pub const CRYSTALS_PER_TOWER: usize = 5;
/// Last HCAL barrel tower (ieta).
pub const HCAL_IETA_MAX_HB: usize = 16;
/// Last HCAL endcap tower (ieta).
pub const HCAL_IETA_MAX_HE: usize = 29;

/// Eta rows per endcap projection: 5 x (29 - 1 - 17) = 55.
pub const EE_ETA_BINS: usize = CRYSTALS_PER_TOWER * (HCAL_IETA_MAX_HE - 1 - (HCAL_IETA_MAX_HB + 1));

/// EE- eta edges, from eta = -3 up to the barrel boundary.
pub const EE_MINUS_ETA_EDGES: [f64; EE_ETA_BINS + 1] = [
    -3.0, -2.93, -2.86, -2.79, -2.72, -2.65, -2.62, //
    -2.59, -2.56, -2.53, -2.5, -2.4644, -2.4288, -2.3932, //
    -2.3576, -2.322, -2.292, -2.262, -2.232, -2.202, -2.172, //
    -2.1462, -2.1204, -2.0946, -2.0688, -2.043, -2.0204, -1.9978, //
    -1.9752, -1.9526, -1.93, -1.91, -1.89, -1.87, -1.85, //
    -1.83, -1.812, -1.794, -1.776, -1.758, -1.74, -1.7226, //
    -1.7052, -1.6878, -1.6704, -1.653, -1.6356, -1.6182, -1.6008, //
    -1.5834, -1.566, -1.5486, -1.5312, -1.5138, -1.4964, -1.479,
];

/// EE+ eta edges, from the barrel boundary up to eta = 3.
pub const EE_PLUS_ETA_EDGES: [f64; EE_ETA_BINS + 1] = [
    1.479, 1.4964, 1.5138, 1.5312, 1.5486, 1.566, 1.5834, //
    1.6008, 1.6182, 1.6356, 1.653, 1.6704, 1.6878, 1.7052, //
    1.7226, 1.74, 1.758, 1.776, 1.794, 1.812, 1.83, //
    1.85, 1.87, 1.89, 1.91, 1.93, 1.9526, 1.9752, //
    1.9978, 2.0204, 2.043, 2.0688, 2.0946, 2.1204, 2.1462, //
    2.172, 2.202, 2.232, 2.262, 2.292, 2.322, 2.3576, //
    2.3932, 2.4288, 2.4644, 2.5, 2.53, 2.56, 2.59, //
    2.62, 2.65, 2.72, 2.79, 2.86, 2.93, 3.0,
];

const MIRROR_TOLERANCE: f64 = 1e-9;

/// A validated, strictly increasing list of bin edges.
#[derive(Debug, Clone, PartialEq)]
pub struct BinningTable {
    edges: Vec<f64>,
}

impl BinningTable {
    /// Creates a table from bin edges.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBinning`] for fewer than two edges, non-finite
    /// edges, or edges that are not strictly increasing.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::InvalidBinning(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
            return Err(Error::InvalidBinning(format!("non-finite edge {bad}")));
        }
        if let Some(i) = edges.windows(2).position(|w| w[0] >= w[1]) {
            return Err(Error::InvalidBinning(format!(
                "edges not strictly increasing at index {}: {} >= {}",
                i,
                edges[i],
                edges[i + 1]
            )));
        }
        Ok(Self { edges })
    }

    /// The EE- table.
    #[must_use]
    pub fn ee_minus() -> Self {
        Self {
            edges: EE_MINUS_ETA_EDGES.to_vec(),
        }
    }

    /// The EE+ table.
    #[must_use]
    pub fn ee_plus() -> Self {
        Self {
            edges: EE_PLUS_ETA_EDGES.to_vec(),
        }
    }

    /// Number of bins (edges - 1).
    #[inline]
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of the first bin.
    #[inline]
    #[must_use]
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    #[inline]
    #[must_use]
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Zero-based bin holding `value`.
    ///
    /// Bins are half-open `[lo, hi)` except the last, which also takes its
    /// upper edge. Values outside `[min, max]` and NaN give `None`.
    #[must_use]
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if !(value >= self.min() && value <= self.max()) {
            return None;
        }
        let above = self.edges.partition_point(|&edge| edge <= value);
        Some((above - 1).min(self.n_bins() - 1))
    }

    /// Returns true if `other` is this table reflected through zero.
    #[must_use]
    pub fn is_mirror_of(&self, other: &Self) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(other.edges.iter().rev())
                .all(|(a, b)| (a + b).abs() <= MIRROR_TOLERANCE)
    }
}

//! Stitching configuration and the derived image layout.
//!
//! The stitched image is `2R` rows by `C` columns. From bottom to top:
//!
//! ```text
//! global rows [0, R - 85)        EE- projection   signed rows [-R, -85)
//! global rows [R - 85, R + 85)   barrel (1:1)     signed rows [-85, 85)
//! global rows [R + 85, 2R)       EE+ projection   signed rows [85, R)
//! ```
//!
//! By default `R = 140` and `C = 360`. In every band
//! `global = signed + R`.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::binning::{BinningTable, EE_MINUS_ETA_EDGES, EE_PLUS_ETA_EDGES};
use crate::cell::{EndcapSide, EB_MAX_IETA, EB_MAX_IPHI};
use crate::error::{Error, Result};

/// Column shift aligning projection column 0 (phi = -pi) with barrel iphi.
pub const DEFAULT_ENDCAP_PHI_SHIFT: usize = 5 * 38;

/// Extended half-range R: barrel rows plus one endcap band.
pub const DEFAULT_IETA_MAX_EXT: usize = 140;

/// Configuration for a stitching run.
#[derive(Clone, Debug)]
pub struct StitchConfig {
    /// Extended half-range R; the image has `2R` rows.
    pub ieta_max_ext: usize,
    /// Image columns C.
    pub n_iphi: usize,
    /// Barrel half-range in rows.
    pub barrel_ieta_max: usize,
    /// Columns added to a projection column before wrapping around phi.
    pub endcap_phi_shift: usize,
    /// EE- eta edges.
    pub eta_edges_minus: BinningTable,
    /// EE+ eta edges.
    pub eta_edges_plus: BinningTable,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            ieta_max_ext: DEFAULT_IETA_MAX_EXT,
            n_iphi: usize::from(EB_MAX_IPHI),
            barrel_ieta_max: EB_MAX_IETA as usize,
            endcap_phi_shift: DEFAULT_ENDCAP_PHI_SHIFT,
            eta_edges_minus: BinningTable::ee_minus(),
            eta_edges_plus: BinningTable::ee_plus(),
        }
    }
}

// On-disk schema; every section is optional.
#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    image: JsonImage,
    endcap: JsonEndcap,
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonImage {
    ieta_max_ext: usize,
    n_iphi: usize,
    barrel_ieta_max: usize,
}

impl Default for JsonImage {
    fn default() -> Self {
        Self {
            ieta_max_ext: DEFAULT_IETA_MAX_EXT,
            n_iphi: usize::from(EB_MAX_IPHI),
            barrel_ieta_max: EB_MAX_IETA as usize,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonEndcap {
    phi_shift: usize,
    eta_edges_minus: Vec<f64>,
    eta_edges_plus: Vec<f64>,
}

impl Default for JsonEndcap {
    fn default() -> Self {
        Self {
            phi_shift: DEFAULT_ENDCAP_PHI_SHIFT,
            eta_edges_minus: EE_MINUS_ETA_EDGES.to_vec(),
            eta_edges_plus: EE_PLUS_ETA_EDGES.to_vec(),
        }
    }
}

impl StitchConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails [`StitchConfig::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let json: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
        Self::from_json_config(json)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed or the configuration is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let json: JsonConfig = serde_json::from_str(json)?;
        Self::from_json_config(json)
    }

    fn from_json_config(json: JsonConfig) -> Result<Self> {
        let config = Self {
            ieta_max_ext: json.image.ieta_max_ext,
            n_iphi: json.image.n_iphi,
            barrel_ieta_max: json.image.barrel_ieta_max,
            endcap_phi_shift: json.endcap.phi_shift,
            eta_edges_minus: BinningTable::new(json.endcap.eta_edges_minus)?,
            eta_edges_plus: BinningTable::new(json.endcap.eta_edges_plus)?,
        };
        // Validate once at load time, not per event.
        config.validate()?;
        log::debug!(
            "loaded stitch config: {} x {} image, {} eta rows per endcap, phi shift {}",
            2 * config.ieta_max_ext,
            config.n_iphi,
            config.eta_edges_plus.n_bins(),
            config.endcap_phi_shift
        );
        Ok(config)
    }

    /// Checks that the configuration describes a gap-free image of the
    /// declared size.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the column count or barrel half-range
    /// disagree with the barrel cell ranges, the phi shift is not smaller than
    /// the column count, the barrel does not fit inside R, an
    /// endcap table does not have exactly `R - barrel_ieta_max` bins, or the
    /// tables are not mirror images on the correct sides of zero.
    pub fn validate(&self) -> Result<()> {
        // Barrel cells are written 1:1, so the barrel extent is fixed.
        if self.n_iphi != usize::from(EB_MAX_IPHI) {
            return Err(Error::ConfigError(format!(
                "n_iphi {} must match the {} barrel iphi columns",
                self.n_iphi, EB_MAX_IPHI
            )));
        }
        if self.barrel_ieta_max != EB_MAX_IETA as usize {
            return Err(Error::ConfigError(format!(
                "barrel_ieta_max {} must match the barrel half-range {}",
                self.barrel_ieta_max, EB_MAX_IETA
            )));
        }
        if self.endcap_phi_shift >= self.n_iphi {
            return Err(Error::ConfigError(format!(
                "endcap phi shift {} must be smaller than {}",
                self.endcap_phi_shift, self.n_iphi
            )));
        }
        if self.barrel_ieta_max >= self.ieta_max_ext {
            return Err(Error::ConfigError(format!(
                "barrel half-range {} must be smaller than ieta_max_ext {}",
                self.barrel_ieta_max, self.ieta_max_ext
            )));
        }
        let endcap_rows = self.ieta_max_ext - self.barrel_ieta_max;
        for side in EndcapSide::ALL {
            let n_bins = self.eta_edges(side).n_bins();
            if n_bins != endcap_rows {
                return Err(Error::ConfigError(format!(
                    "{} table has {} bins, expected {} (ieta_max_ext {} - barrel {})",
                    side.label(),
                    n_bins,
                    endcap_rows,
                    self.ieta_max_ext,
                    self.barrel_ieta_max
                )));
            }
        }
        if self.eta_edges_minus.max() > 0.0 || self.eta_edges_plus.min() < 0.0 {
            return Err(Error::ConfigError(
                "EE- edges must be negative and EE+ edges positive".to_string(),
            ));
        }
        if !self.eta_edges_minus.is_mirror_of(&self.eta_edges_plus) {
            return Err(Error::ConfigError(
                "EE- and EE+ tables are not mirror images".to_string(),
            ));
        }
        Ok(())
    }

    /// Binning table for one endcap.
    #[must_use]
    pub fn eta_edges(&self, side: EndcapSide) -> &BinningTable {
        match side {
            EndcapSide::Minus => &self.eta_edges_minus,
            EndcapSide::Plus => &self.eta_edges_plus,
        }
    }

    /// Derived image layout. Only meaningful for a validated configuration.
    #[must_use]
    pub fn layout(&self) -> StitchLayout {
        StitchLayout {
            ieta_max_ext: self.ieta_max_ext,
            barrel_ieta_max: self.barrel_ieta_max,
            n_iphi: self.n_iphi,
            phi_shift: self.endcap_phi_shift,
        }
    }
}

/// Row offsets of one band in both row conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandOffsets {
    /// Added to a band-local row to get the zero-based image row.
    pub global: usize,
    /// Added to a band-local row to get the signed monitor row.
    pub signed: i32,
}

/// Index arithmetic of the stitched image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchLayout {
    ieta_max_ext: usize,
    barrel_ieta_max: usize,
    n_iphi: usize,
    phi_shift: usize,
}

impl Default for StitchLayout {
    fn default() -> Self {
        StitchConfig::default().layout()
    }
}

impl StitchLayout {
    /// Extended half-range R (140 by default).
    #[inline]
    #[must_use]
    pub fn ieta_max_ext(&self) -> usize {
        self.ieta_max_ext
    }

    /// Barrel half-range (85).
    #[inline]
    #[must_use]
    pub fn barrel_ieta_max(&self) -> usize {
        self.barrel_ieta_max
    }

    /// Eta rows per endcap band.
    #[inline]
    #[must_use]
    pub fn endcap_rows(&self) -> usize {
        self.ieta_max_ext - self.barrel_ieta_max
    }

    /// Image rows (2R).
    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        2 * self.ieta_max_ext()
    }

    /// Image columns (C).
    #[inline]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.n_iphi
    }

    /// Image length (2RC).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lowest signed row (-R).
    #[inline]
    #[must_use]
    pub fn signed_row_min(&self) -> i32 {
        -(self.ieta_max_ext() as i32)
    }

    /// One past the highest signed row (R).
    #[inline]
    #[must_use]
    pub fn signed_row_end(&self) -> i32 {
        self.ieta_max_ext() as i32
    }

    /// Row offset placing the signed barrel rows `[-85, 85)` in the image.
    #[inline]
    #[must_use]
    pub fn barrel_offset(&self) -> usize {
        self.ieta_max_ext()
    }

    /// Zero-based image row of a signed barrel row.
    #[inline]
    #[must_use]
    pub fn barrel_global_row(&self, local_row: i32) -> usize {
        (local_row + self.barrel_offset() as i32) as usize
    }

    /// Offsets of an endcap band.
    ///
    /// EE- sits directly below the barrel, EE+ directly above it.
    #[must_use]
    pub fn endcap_offsets(&self, side: EndcapSide) -> BandOffsets {
        match side {
            EndcapSide::Minus => BandOffsets {
                global: 0,
                signed: -(self.ieta_max_ext() as i32),
            },
            EndcapSide::Plus => BandOffsets {
                global: self.ieta_max_ext() + self.barrel_ieta_max,
                signed: self.barrel_ieta_max as i32,
            },
        }
    }

    /// Image column of a zero-based projection column, wrapped around phi.
    #[inline]
    #[must_use]
    pub fn endcap_column(&self, bin_col: usize) -> usize {
        (bin_col + self.phi_shift) % self.n_iphi
    }

    /// Flat image index of `(row, col)`, row-major.
    #[inline]
    #[must_use]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.n_iphi + col
    }

    /// Zero-based image row of a signed row.
    #[inline]
    #[must_use]
    pub fn signed_to_global(&self, signed_row: i32) -> usize {
        (signed_row + self.ieta_max_ext() as i32) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = StitchLayout::default();
        assert_eq!(layout.ieta_max_ext(), 140);
        assert_eq!(layout.rows(), 280);
        assert_eq!(layout.cols(), 360);
        assert_eq!(layout.len(), 100_800);
        assert_eq!(layout.signed_row_min(), -140);
        assert_eq!(layout.signed_row_end(), 140);
    }

    #[test]
    fn test_bands_abut_without_gaps() {
        let layout = StitchLayout::default();
        let minus = layout.endcap_offsets(EndcapSide::Minus);
        let plus = layout.endcap_offsets(EndcapSide::Plus);

        // EE- occupies [0, 55)
        assert_eq!(minus.global, 0);
        assert_eq!(minus.global + layout.endcap_rows(), 55);
        // barrel occupies [55, 225)
        assert_eq!(layout.barrel_global_row(-85), 55);
        assert_eq!(layout.barrel_global_row(84), 224);
        // EE+ occupies [225, 280)
        assert_eq!(plus.global, 225);
        assert_eq!(plus.global + layout.endcap_rows(), layout.rows());

        assert_eq!(minus.signed, -140);
        assert_eq!(plus.signed, 85);
    }

    #[test]
    fn test_global_is_signed_plus_r_in_every_band() {
        let layout = StitchLayout::default();
        for side in EndcapSide::ALL {
            let off = layout.endcap_offsets(side);
            for row in 0..layout.endcap_rows() {
                let signed = row as i32 + off.signed;
                assert_eq!(layout.signed_to_global(signed), row + off.global);
            }
        }
        for local in -85..85 {
            assert_eq!(layout.signed_to_global(local), layout.barrel_global_row(local));
        }
    }

    #[test]
    fn test_endcap_column_wraps() {
        let layout = StitchLayout::default();
        assert_eq!(layout.endcap_column(0), 190);
        assert_eq!(layout.endcap_column(169), 359);
        assert_eq!(layout.endcap_column(170), 0);
        assert_eq!(layout.endcap_column(359), 189);
    }

    #[test]
    fn test_json_partial_config() {
        let config = StitchConfig::from_json(r#"{ "endcap": { "phi_shift": 10 } }"#).unwrap();
        assert_eq!(config.endcap_phi_shift, 10);
        assert_eq!(config.eta_edges_plus.n_bins(), 55);
        assert_eq!(config.layout().endcap_column(355), 5);
    }

    #[test]
    fn test_json_empty_config() {
        let config = StitchConfig::from_json("{}").unwrap();
        assert_eq!(config.endcap_phi_shift, DEFAULT_ENDCAP_PHI_SHIFT);
        assert_eq!(config.layout(), StitchLayout::default());
    }

    #[test]
    fn test_json_rejects_tables_that_resize_the_image() {
        let json = r#"{
            "endcap": {
                "eta_edges_minus": [-3.0, -2.0, -1.479],
                "eta_edges_plus": [1.479, 2.0, 3.0]
            }
        }"#;
        let err = StitchConfig::from_json(json).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("expected 55"), "{err}");
    }

    #[test]
    fn test_json_custom_extent_with_matching_tables() {
        let json = r#"{
            "image": { "ieta_max_ext": 88 },
            "endcap": {
                "eta_edges_minus": [-3.0, -2.5, -2.0, -1.479],
                "eta_edges_plus": [1.479, 2.0, 2.5, 3.0]
            }
        }"#;
        let layout = StitchConfig::from_json(json).unwrap().layout();
        assert_eq!(layout.endcap_rows(), 3);
        assert_eq!(layout.ieta_max_ext(), 88);
        assert_eq!(layout.rows(), 176);
    }

    #[test]
    fn test_rejects_inconsistent_extent() {
        let zero_cols = StitchConfig {
            n_iphi: 0,
            endcap_phi_shift: 0,
            ..StitchConfig::default()
        };
        assert!(zero_cols.validate().is_err());

        let barrel_changed = StitchConfig {
            barrel_ieta_max: 80,
            ..StitchConfig::default()
        };
        assert!(barrel_changed.validate().is_err());

        let wrong_r = StitchConfig {
            ieta_max_ext: 141,
            ..StitchConfig::default()
        };
        assert!(wrong_r.validate().is_err());
        assert!(StitchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_rejects_asymmetric_tables() {
        let json = r#"{
            "image": { "ieta_max_ext": 87 },
            "endcap": {
                "eta_edges_minus": [-3.0, -2.0, -1.479],
                "eta_edges_plus": [1.479, 2.5, 3.0]
            }
        }"#;
        let err = StitchConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("mirror"), "{err}");
    }

    #[test]
    fn test_rejects_large_shift() {
        let config = StitchConfig {
            endcap_phi_shift: 360,
            ..StitchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

//! ECAL cell identifiers.
//!
//! A cell is either a barrel crystal, addressed natively by `(ieta, iphi)`,
//! or an endcap crystal, addressed by `(ix, iy)` on one of the two sides.
//! Raw ids use the packed 32-bit detector-id layout:
//!
//! ```text
//! bits 28..31  detector     (ECAL = 3)
//! bits 25..27  subdetector  (barrel = 1, endcap = 2)
//! barrel:  bit 16 = +eta, bits 9..15 = |ieta|, bits 0..8 = iphi
//! endcap:  bit 14 = +z,   bits 7..13 = ix,     bits 0..6 = iy
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest |ieta| of a barrel crystal.
pub const EB_MAX_IETA: i32 = 85;
/// Number of barrel crystals around phi.
pub const EB_MAX_IPHI: u16 = 360;
/// Highest endcap crystal x index.
pub const EE_MAX_IX: u16 = 100;
/// Highest endcap crystal y index.
pub const EE_MAX_IY: u16 = 100;

const DET_ECAL: u32 = 3;
const SUBDET_BARREL: u32 = 1;
const SUBDET_ENDCAP: u32 = 2;

/// One of the two endcaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndcapSide {
    /// Negative z, stitched below the barrel.
    Minus,
    /// Positive z, stitched above the barrel.
    Plus,
}

impl EndcapSide {
    /// Both sides in stitching order.
    pub const ALL: [EndcapSide; 2] = [EndcapSide::Minus, EndcapSide::Plus];

    /// Index into per-side arrays (`Minus` = 0, `Plus` = 1).
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            EndcapSide::Minus => 0,
            EndcapSide::Plus => 1,
        }
    }

    /// Short label used in logs and file names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            EndcapSide::Minus => "EE-",
            EndcapSide::Plus => "EE+",
        }
    }
}

/// Barrel crystal in native `(ieta, iphi)` indices.
///
/// `ieta` skips zero: it runs over `[-85, -1]` and `[1, 85]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarrelCellId {
    ieta: i32,
    iphi: u16,
}

impl BarrelCellId {
    /// Creates a barrel id, validating the native index ranges.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBarrelCell`] for `ieta == 0`, `|ieta| > 85`
    /// or `iphi` outside `[1, 360]`.
    pub fn new(ieta: i32, iphi: u16) -> Result<Self> {
        let ieta_ok = ieta != 0 && ieta.abs() <= EB_MAX_IETA;
        let iphi_ok = (1..=EB_MAX_IPHI).contains(&iphi);
        if ieta_ok && iphi_ok {
            Ok(Self { ieta, iphi })
        } else {
            Err(Error::InvalidBarrelCell { ieta, iphi })
        }
    }

    #[inline]
    #[must_use]
    pub fn ieta(&self) -> i32 {
        self.ieta
    }

    #[inline]
    #[must_use]
    pub fn iphi(&self) -> u16 {
        self.iphi
    }

    /// Signed, gap-free row: `ieta - 1` above zero, `ieta` below.
    ///
    /// The result spans `[-85, 85)`.
    #[inline]
    #[must_use]
    pub fn local_row(&self) -> i32 {
        if self.ieta > 0 {
            self.ieta - 1
        } else {
            self.ieta
        }
    }

    /// Zero-based column in `[0, 360)`.
    #[inline]
    #[must_use]
    pub fn local_column(&self) -> usize {
        usize::from(self.iphi - 1)
    }
}

/// Endcap crystal in native `(ix, iy)` indices on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndcapCellId {
    ix: u16,
    iy: u16,
    side: EndcapSide,
}

impl EndcapCellId {
    /// Creates an endcap id.
    ///
    /// Only the index ranges are checked; whether a crystal physically
    /// exists at `(ix, iy)` is the geometry service's concern.
    ///
    /// # Errors
    /// Returns [`Error::InvalidEndcapCell`] when `ix` or `iy` is outside `[1, 100]`.
    pub fn new(ix: u16, iy: u16, side: EndcapSide) -> Result<Self> {
        if (1..=EE_MAX_IX).contains(&ix) && (1..=EE_MAX_IY).contains(&iy) {
            Ok(Self { ix, iy, side })
        } else {
            Err(Error::InvalidEndcapCell { ix, iy })
        }
    }

    #[inline]
    #[must_use]
    pub fn ix(&self) -> u16 {
        self.ix
    }

    #[inline]
    #[must_use]
    pub fn iy(&self) -> u16 {
        self.iy
    }

    #[inline]
    #[must_use]
    pub fn side(&self) -> EndcapSide {
        self.side
    }
}

/// Region-tagged ECAL cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellId {
    Barrel(BarrelCellId),
    Endcap(EndcapCellId),
}

impl CellId {
    /// Decodes a packed 32-bit detector id.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCellId`] if the id is not an ECAL barrel or
    /// endcap id, or if its index fields are out of range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn from_raw(raw: u32) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidCellId {
            raw,
            reason: reason.to_string(),
        };

        if raw >> 28 != DET_ECAL {
            return Err(invalid("not an ECAL detector id"));
        }

        match (raw >> 25) & 0x7 {
            SUBDET_BARREL => {
                let abs_ieta = ((raw >> 9) & 0x7F) as i32;
                let ieta = if raw & 0x1_0000 != 0 {
                    abs_ieta
                } else {
                    -abs_ieta
                };
                let iphi = (raw & 0x1FF) as u16;
                BarrelCellId::new(ieta, iphi)
                    .map(CellId::Barrel)
                    .map_err(|e| invalid(&e.to_string()))
            }
            SUBDET_ENDCAP => {
                let ix = ((raw >> 7) & 0x7F) as u16;
                let iy = (raw & 0x7F) as u16;
                let side = if raw & 0x4000 != 0 {
                    EndcapSide::Plus
                } else {
                    EndcapSide::Minus
                };
                EndcapCellId::new(ix, iy, side)
                    .map(CellId::Endcap)
                    .map_err(|e| invalid(&e.to_string()))
            }
            _ => Err(invalid("unknown ECAL subdetector")),
        }
    }

    /// Encodes this cell as a packed 32-bit detector id.
    #[allow(clippy::cast_sign_loss)]
    #[must_use]
    pub fn raw(&self) -> u32 {
        let base = DET_ECAL << 28;
        match self {
            CellId::Barrel(eb) => {
                let eta_bits = if eb.ieta > 0 {
                    0x1_0000 | ((eb.ieta as u32) << 9)
                } else {
                    (eb.ieta.unsigned_abs()) << 9
                };
                base | (SUBDET_BARREL << 25) | eta_bits | u32::from(eb.iphi & 0x1FF)
            }
            CellId::Endcap(ee) => {
                let z_bit = match ee.side {
                    EndcapSide::Plus => 0x4000,
                    EndcapSide::Minus => 0,
                };
                base | (SUBDET_ENDCAP << 25)
                    | z_bit
                    | (u32::from(ee.ix & 0x7F) << 7)
                    | u32::from(ee.iy & 0x7F)
            }
        }
    }

    /// Returns true for barrel cells.
    #[must_use]
    pub fn is_barrel(&self) -> bool {
        matches!(self, CellId::Barrel(_))
    }
}

impl From<BarrelCellId> for CellId {
    fn from(id: BarrelCellId) -> Self {
        CellId::Barrel(id)
    }
}

impl From<EndcapCellId> for CellId {
    fn from(id: EndcapCellId) -> Self {
        CellId::Endcap(id)
    }
}

impl fmt::Display for BarrelCellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EB(ieta={}, iphi={})", self.ieta, self.iphi)
    }
}

impl fmt::Display for EndcapCellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(ix={}, iy={})", self.side.label(), self.ix, self.iy)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellId::Barrel(id) => id.fmt(f),
            CellId::Endcap(id) => id.fmt(f),
        }
    }
}

//! Reconstructed hit types.

use serde::{Deserialize, Serialize};

use crate::cell::{BarrelCellId, CellId, EndcapCellId};
use crate::error::Result;

/// A reconstructed energy deposit in one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecHit<Id> {
    /// Cell the energy was measured in.
    pub id: Id,
    /// Reconstructed energy (GeV).
    pub energy: f32,
}

/// Barrel rec hit.
pub type BarrelHit = RecHit<BarrelCellId>;
/// Endcap rec hit.
pub type EndcapHit = RecHit<EndcapCellId>;

impl<Id> RecHit<Id> {
    /// Creates a new hit.
    #[inline]
    pub fn new(id: Id, energy: f32) -> Self {
        Self { id, energy }
    }
}

/// Trait for anything carrying a reconstructed energy.
pub trait Hit {
    /// Returns the reconstructed energy.
    fn energy(&self) -> f32;

    /// A hit with energy exactly zero means "no hit" and is skipped everywhere.
    #[inline]
    #[allow(clippy::float_cmp)]
    fn is_empty(&self) -> bool {
        self.energy() == 0.0
    }
}

impl<Id> Hit for RecHit<Id> {
    #[inline]
    fn energy(&self) -> f32 {
        self.energy
    }
}

/// All ECAL hits of one event, split by region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventHits {
    /// Barrel hits.
    pub barrel: Vec<BarrelHit>,
    /// Hits from both endcaps.
    pub endcap: Vec<EndcapHit>,
}

impl EventHits {
    /// Creates an empty event with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(barrel: usize, endcap: usize) -> Self {
        Self {
            barrel: Vec::with_capacity(barrel),
            endcap: Vec::with_capacity(endcap),
        }
    }

    /// Routes a hit to the barrel or endcap collection.
    pub fn push(&mut self, id: CellId, energy: f32) {
        match id {
            CellId::Barrel(eb) => self.barrel.push(RecHit::new(eb, energy)),
            CellId::Endcap(ee) => self.endcap.push(RecHit::new(ee, energy)),
        }
    }

    /// Builds an event from raw `(detector id, energy)` pairs.
    ///
    /// # Errors
    /// Returns an error if any raw id fails to decode.
    pub fn from_raw<I>(hits: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, f32)>,
    {
        let mut event = Self::default();
        for (raw, energy) in hits {
            event.push(CellId::from_raw(raw)?, energy);
        }
        Ok(event)
    }

    /// Total number of hits in both regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.barrel.len() + self.endcap.len()
    }

    /// Returns true if the event has no hits at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.barrel.is_empty() && self.endcap.is_empty()
    }

    /// Clears both collections, keeping their allocations.
    pub fn clear(&mut self) {
        self.barrel.clear();
        self.endcap.clear();
    }
}

//! Barrel + endcap stitching into one extended image.
//!
//! Per event:
//! 1. Endcap hits are resolved through the geometry service and summed into
//!    the two `(phi, eta)` projections. This is the only phase that can fail.
//! 2. EE- bins, barrel hits and EE+ bins are written into disjoint row bands
//!    of the image, and every write also fills the monitor.
//!
//! Because all fallible work finishes before the first write, a failed event
//! leaves both the image and the monitor untouched.
#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]

use std::ops::AddAssign;

use ecalstitch_core::{
    BarrelHit, CellGeometry, EndcapHit, EndcapSide, Error, EventHits, Hit, Result, StitchConfig,
    StitchLayout,
};

use crate::image::StitchedImage;
use crate::monitor::MonitorAccumulator;
use crate::projection::EndcapProjection;

/// Counters for one stitched event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StitchStatistics {
    /// Barrel hits written to the image.
    pub barrel_hits: usize,
    /// Endcap hits summed into a projection.
    pub endcap_hits: usize,
    /// Hits skipped because their energy was zero.
    pub zero_energy_skipped: usize,
    /// Non-empty projection bins written to the image.
    pub endcap_bins: usize,
}

impl AddAssign for StitchStatistics {
    fn add_assign(&mut self, other: Self) {
        self.barrel_hits += other.barrel_hits;
        self.endcap_hits += other.endcap_hits;
        self.zero_energy_skipped += other.zero_energy_skipped;
        self.endcap_bins += other.endcap_bins;
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Events stitched.
    pub events: usize,
    /// Sum of the per-event counters.
    pub totals: StitchStatistics,
}

impl RunStatistics {
    /// Adds one event's counters.
    pub fn record(&mut self, event: StitchStatistics) {
        self.events += 1;
        self.totals += event;
    }
}

/// Stitches EE-, EB and EE+ hits into a [`StitchedImage`].
///
/// Owns the geometry service and the two scratch projections, which are
/// re-zeroed (not reallocated) for every event. The monitor is passed in by
/// the caller, who owns its run-long lifecycle.
pub struct EcalStitcher<G> {
    geometry: G,
    layout: StitchLayout,
    projections: [EndcapProjection; 2],
}

impl<G: CellGeometry> EcalStitcher<G> {
    /// Creates a stitcher.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if `config` fails validation.
    pub fn new(config: &StitchConfig, geometry: G) -> Result<Self> {
        Ok(Self {
            geometry,
            layout: config.layout(),
            projections: [
                EndcapProjection::from_config(config, EndcapSide::Minus)?,
                EndcapProjection::from_config(config, EndcapSide::Plus)?,
            ],
        })
    }

    /// Image layout produced by this stitcher.
    #[must_use]
    pub fn layout(&self) -> &StitchLayout {
        &self.layout
    }

    /// A zeroed image matching this stitcher's layout.
    #[must_use]
    pub fn new_image(&self) -> StitchedImage {
        StitchedImage::new(self.layout)
    }

    /// An empty monitor matching this stitcher's layout.
    #[must_use]
    pub fn new_monitor(&self) -> MonitorAccumulator {
        MonitorAccumulator::new(self.layout)
    }

    /// The projection of one endcap, as left by the last event.
    ///
    /// Empty after an event whose projection failed.
    #[must_use]
    pub fn projection(&self, side: EndcapSide) -> &EndcapProjection {
        &self.projections[side.index()]
    }

    /// Resets both projections and sums the endcap hits into them.
    ///
    /// Returns `(projected, skipped)`: hits summed and zero-energy hits skipped.
    ///
    /// # Errors
    /// Fails on the first hit whose position cannot be resolved or falls
    /// outside its side's eta table. Both projections are left empty.
    pub fn project_endcaps(&mut self, hits: &[EndcapHit]) -> Result<(usize, usize)> {
        self.reset_projections();
        let result = self.sum_endcap_hits(hits);
        if result.is_err() {
            self.reset_projections();
        }
        result
    }

    fn reset_projections(&mut self) {
        for projection in &mut self.projections {
            projection.reset();
        }
    }

    fn sum_endcap_hits(&mut self, hits: &[EndcapHit]) -> Result<(usize, usize)> {
        let mut projected = 0;
        let mut skipped = 0;
        for hit in hits {
            let projection = &mut self.projections[hit.id.side().index()];
            if projection.fill_hit(hit, &self.geometry)? {
                projected += 1;
            } else {
                skipped += 1;
            }
        }
        Ok((projected, skipped))
    }

    /// Writes one event into a freshly reset image and updates the monitor.
    ///
    /// # Errors
    /// - [`Error::ImageNotReset`] if `image` already holds an event.
    /// - [`Error::ConfigError`] if `image` or `monitor` has a different layout.
    /// - Any geometry or acceptance error from the endcap projection.
    pub fn fill(
        &mut self,
        event: &EventHits,
        image: &mut StitchedImage,
        monitor: &mut MonitorAccumulator,
    ) -> Result<StitchStatistics> {
        if image.is_filled() {
            return Err(Error::ImageNotReset);
        }
        if *image.layout() != self.layout || *monitor.layout() != self.layout {
            return Err(Error::ConfigError(
                "image and monitor must share the stitcher layout".to_string(),
            ));
        }

        let (endcap_hits, ee_skipped) = self.project_endcaps(&event.endcap)?;
        image.begin_fill()?;

        let mut stats = StitchStatistics {
            endcap_hits,
            zero_energy_skipped: ee_skipped,
            ..StitchStatistics::default()
        };

        stats.endcap_bins += self.transfer_projection(EndcapSide::Minus, image, monitor)?;
        let (barrel_hits, eb_skipped) = self.fill_barrel(&event.barrel, image, monitor)?;
        stats.endcap_bins += self.transfer_projection(EndcapSide::Plus, image, monitor)?;

        stats.barrel_hits = barrel_hits;
        stats.zero_energy_skipped += eb_skipped;

        log::debug!(
            "stitched event: {} EB hits, {} EE hits into {} bins, {} zero-energy hits skipped",
            stats.barrel_hits,
            stats.endcap_hits,
            stats.endcap_bins,
            stats.zero_energy_skipped
        );
        Ok(stats)
    }

    /// Resets `image`, then [`fill`](Self::fill)s it.
    ///
    /// # Errors
    /// See [`EcalStitcher::fill`].
    pub fn process_event(
        &mut self,
        event: &EventHits,
        image: &mut StitchedImage,
        monitor: &mut MonitorAccumulator,
    ) -> Result<StitchStatistics> {
        image.reset();
        self.fill(event, image, monitor)
    }

    /// Barrel hits map 1:1 onto image pixels.
    fn fill_barrel(
        &self,
        hits: &[BarrelHit],
        image: &mut StitchedImage,
        monitor: &mut MonitorAccumulator,
    ) -> Result<(usize, usize)> {
        let mut written = 0;
        let mut skipped = 0;
        for hit in hits {
            if hit.is_empty() {
                skipped += 1;
                continue;
            }
            let iphi = hit.id.local_column();
            let ieta_signed = hit.id.local_row();
            let ieta_global = self.layout.barrel_global_row(ieta_signed);

            image.set(ieta_global, iphi, hit.energy);
            monitor.fill(iphi, ieta_signed, hit.energy)?;
            written += 1;
        }
        Ok((written, skipped))
    }

    /// Copies the non-empty bins of one projection into its image band.
    fn transfer_projection(
        &self,
        side: EndcapSide,
        image: &mut StitchedImage,
        monitor: &mut MonitorAccumulator,
    ) -> Result<usize> {
        let offsets = self.layout.endcap_offsets(side);
        let mut transferred = 0;
        for bin in self.projections[side.index()].nonzero_bins() {
            let ieta_global = bin.row + offsets.global;
            let ieta_signed = bin.row as i32 + offsets.signed;
            // Projection column 0 starts at phi = -pi, barrel iphi = 1 does not.
            let iphi = self.layout.endcap_column(bin.col);

            image.set(ieta_global, iphi, bin.energy);
            monitor.fill(iphi, ieta_signed, bin.energy)?;
            transferred += 1;
        }
        Ok(transferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecalstitch_core::{BarrelCellId, EndcapCellId, GeometryTable, Position, RecHit};

    fn stitcher() -> EcalStitcher<GeometryTable> {
        EcalStitcher::new(&StitchConfig::default(), GeometryTable::new()).unwrap()
    }

    #[test]
    fn test_barrel_only_event() {
        let mut stitcher = stitcher();
        let mut image = stitcher.new_image();
        let mut monitor = stitcher.new_monitor();

        let event = EventHits {
            barrel: vec![
                RecHit::new(BarrelCellId::new(1, 1).unwrap(), 2.5),
                RecHit::new(BarrelCellId::new(-1, 360).unwrap(), 1.0),
                RecHit::new(BarrelCellId::new(85, 180).unwrap(), 0.0),
            ],
            endcap: vec![],
        };
        let stats = stitcher.process_event(&event, &mut image, &mut monitor).unwrap();

        assert_eq!(stats.barrel_hits, 2);
        assert_eq!(stats.zero_energy_skipped, 1);
        assert_eq!(image.get(140, 0), Some(2.5));
        assert_eq!(image.get(139, 359), Some(1.0));
        assert_eq!(image.nonzero_count(), 2);
        assert_eq!(monitor.mean(0, 0), Some(2.5));
        assert_eq!(monitor.mean(359, -1), Some(1.0));
        assert_eq!(monitor.count(179, 84), Some(0));
    }

    #[test]
    fn test_layout_mismatch_is_rejected() {
        let mut stitcher = stitcher();
        let shifted = StitchConfig::from_json(r#"{ "endcap": { "phi_shift": 10 } }"#).unwrap();
        let mut image = StitchedImage::new(shifted.layout());
        let mut monitor = stitcher.new_monitor();
        let err = stitcher
            .process_event(&EventHits::default(), &mut image, &mut monitor)
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = StitchConfig {
            ieta_max_ext: 100,
            ..StitchConfig::default()
        };
        let err = EcalStitcher::new(&config, GeometryTable::new()).err().unwrap();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_failed_projection_leaves_projections_empty() {
        let known = EndcapCellId::new(20, 20, EndcapSide::Plus).unwrap();
        let unknown = EndcapCellId::new(21, 20, EndcapSide::Minus).unwrap();
        let geometry: GeometryTable = [(known, Position::from_rho_eta_phi(50.0, 2.2, 0.4))]
            .into_iter()
            .collect();
        let mut stitcher = EcalStitcher::new(&StitchConfig::default(), geometry).unwrap();

        let hits = [RecHit::new(known, 3.0)];
        assert_eq!(stitcher.project_endcaps(&hits).unwrap(), (1, 0));
        assert_eq!(stitcher.projection(EndcapSide::Plus).entries(), 1);

        let hits = [RecHit::new(known, 3.0), RecHit::new(unknown, 1.0)];
        assert!(stitcher.project_endcaps(&hits).is_err());
        for side in EndcapSide::ALL {
            let projection = stitcher.projection(side);
            assert_eq!(projection.entries(), 0);
            assert_eq!(projection.nonzero_bins().count(), 0);
        }
    }

    #[test]
    fn test_run_statistics() {
        let mut run = RunStatistics::default();
        run.record(StitchStatistics {
            barrel_hits: 3,
            endcap_hits: 2,
            zero_energy_skipped: 1,
            endcap_bins: 2,
        });
        run.record(StitchStatistics {
            barrel_hits: 1,
            ..StitchStatistics::default()
        });
        assert_eq!(run.events, 2);
        assert_eq!(run.totals.barrel_hits, 4);
        assert_eq!(run.totals.endcap_bins, 2);
    }
}

//! Run-long monitoring profile of the stitched image.
//!
//! Same footprint as [`StitchedImage`](crate::StitchedImage) but addressed
//! by `(iphi, signed ieta)` with `ieta` in `[-R, R)`. Each bin keeps a running
//! mean of the energies written to it. A bin is only updated by events that
//! write to it: an event with nothing in a bin leaves the mean and the
//! count untouched.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]

use ecalstitch_core::{Error, Result, StitchLayout};
use serde::{Deserialize, Serialize};

/// Online mean and variance (Welford).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningMean {
    /// Adds one sample.
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Number of samples.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the samples, 0 when empty.
    #[inline]
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance, 0 with fewer than two samples.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Population standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Returns true if no sample was pushed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Running-mean profile over `(iphi, signed ieta)`.
///
/// Created once before the first event and finalized once after the last.
/// It is the only state shared across events; callers that process events
/// concurrently must serialise access to it.
#[derive(Debug, Clone)]
pub struct MonitorAccumulator {
    layout: StitchLayout,
    bins: Vec<RunningMean>,
    entries: u64,
}

impl MonitorAccumulator {
    /// Creates an empty profile for a layout.
    #[must_use]
    pub fn new(layout: StitchLayout) -> Self {
        Self {
            bins: vec![RunningMean::default(); layout.len()],
            layout,
            entries: 0,
        }
    }

    fn bin_index(&self, iphi: usize, ieta: i32) -> Option<usize> {
        let rows = self.layout.signed_row_min()..self.layout.signed_row_end();
        if iphi < self.layout.cols() && rows.contains(&ieta) {
            Some(self.layout.index(self.layout.signed_to_global(ieta), iphi))
        } else {
            None
        }
    }

    /// Adds an energy sample to bin `(iphi, ieta)`.
    ///
    /// # Errors
    /// Returns [`Error::MonitorOutOfRange`] for coordinates outside the footprint.
    pub fn fill(&mut self, iphi: usize, ieta: i32, energy: f32) -> Result<()> {
        let idx = self
            .bin_index(iphi, ieta)
            .ok_or(Error::MonitorOutOfRange { iphi, ieta })?;
        self.bins[idx].push(f64::from(energy));
        self.entries += 1;
        Ok(())
    }

    /// Running mean of one bin.
    #[must_use]
    pub fn bin(&self, iphi: usize, ieta: i32) -> Option<&RunningMean> {
        self.bin_index(iphi, ieta).map(|idx| &self.bins[idx])
    }

    /// Mean energy of one bin (0 for an empty bin).
    #[must_use]
    pub fn mean(&self, iphi: usize, ieta: i32) -> Option<f64> {
        self.bin(iphi, ieta).map(RunningMean::mean)
    }

    /// Sample count of one bin.
    #[must_use]
    pub fn count(&self, iphi: usize, ieta: i32) -> Option<u64> {
        self.bin(iphi, ieta).map(RunningMean::count)
    }

    /// Total number of fills.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Layout this monitor was created for.
    #[must_use]
    pub fn layout(&self) -> &StitchLayout {
        &self.layout
    }

    /// Copies the current contents into a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        let cols = self.layout.cols();
        let ieta_min = self.layout.signed_row_min();
        let bins = self
            .bins
            .iter()
            .enumerate()
            .filter(|(_, bin)| !bin.is_empty())
            .map(|(idx, bin)| MonitorBin {
                iphi: idx % cols,
                ieta: (idx / cols) as i32 + ieta_min,
                count: bin.count(),
                mean: bin.mean(),
                std_dev: bin.std_dev(),
            })
            .collect();

        MonitorSnapshot {
            n_iphi: cols,
            ieta_min,
            ieta_max: self.layout.signed_row_end(),
            entries: self.entries,
            bins,
        }
    }

    /// Ends the run, returning the final contents.
    #[must_use]
    pub fn finalize(self) -> MonitorSnapshot {
        let snapshot = self.snapshot();
        log::info!(
            "monitor finalized: {} entries in {} bins",
            snapshot.entries,
            snapshot.bins.len()
        );
        snapshot
    }
}

/// One non-empty monitor bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorBin {
    /// Zero-based iphi column.
    pub iphi: usize,
    /// Signed ieta row.
    pub ieta: i32,
    /// Number of events that wrote to this bin.
    pub count: u64,
    /// Mean energy over those events.
    pub mean: f64,
    /// Population standard deviation of the energy.
    pub std_dev: f64,
}

/// Exported monitor contents; only non-empty bins are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// Number of iphi columns.
    pub n_iphi: usize,
    /// Lowest signed ieta row.
    pub ieta_min: i32,
    /// One past the highest signed ieta row.
    pub ieta_max: i32,
    /// Total number of fills.
    pub entries: u64,
    /// Non-empty bins in row-major order.
    pub bins: Vec<MonitorBin>,
}

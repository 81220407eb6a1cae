//! The stitched per-event energy image.

use ecalstitch_core::{Error, Result, StitchLayout};

/// Flat, row-major `(ieta, iphi)` energy image covering barrel and both endcaps.
///
/// The image must be reset before every event. Filling an image that is
/// already filled is reported as [`Error::ImageNotReset`] instead of
/// silently summing two events.
#[derive(Debug, Clone)]
pub struct StitchedImage {
    layout: StitchLayout,
    data: Vec<f32>,
    filled: bool,
}

impl StitchedImage {
    /// Creates an all-zero image for a layout.
    #[must_use]
    pub fn new(layout: StitchLayout) -> Self {
        Self {
            data: vec![0.0; layout.len()],
            layout,
            filled: false,
        }
    }

    /// Zeroes every pixel and re-arms the image for the next event.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
        self.filled = false;
    }

    /// Claims the image for one event.
    pub(crate) fn begin_fill(&mut self) -> Result<()> {
        if self.filled {
            return Err(Error::ImageNotReset);
        }
        self.filled = true;
        Ok(())
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, energy: f32) {
        let idx = self.layout.index(row, col);
        self.data[idx] = energy;
    }

    /// Energy at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.layout.rows() && col < self.layout.cols() {
            Some(self.data[self.layout.index(row, col)])
        } else {
            None
        }
    }

    /// One image row.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.layout.rows() {
            return None;
        }
        let start = self.layout.index(row, 0);
        Some(&self.data[start..start + self.layout.cols()])
    }

    /// The flat pixel buffer, as handed to an output sink.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Layout this image was created for.
    #[must_use]
    pub fn layout(&self) -> &StitchLayout {
        &self.layout
    }

    /// Returns true once an event has been written since the last reset.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Number of non-zero pixels.
    #[must_use]
    pub fn nonzero_count(&self) -> usize {
        self.data.iter().filter(|&&e| e != 0.0).count()
    }

    /// Sum of all pixels.
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.data.iter().map(|&e| f64::from(e)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_is_zero() {
        let image = StitchedImage::new(StitchLayout::default());
        assert_eq!(image.as_slice().len(), 280 * 360);
        assert_eq!(image.nonzero_count(), 0);
        assert!(!image.is_filled());
    }

    #[test]
    fn test_set_and_get_row_major() {
        let mut image = StitchedImage::new(StitchLayout::default());
        image.set(2, 5, 1.5);
        assert_eq!(image.get(2, 5), Some(1.5));
        assert_eq!(image.as_slice()[2 * 360 + 5], 1.5);
        assert_eq!(image.row(2).unwrap()[5], 1.5);
        assert_eq!(image.get(280, 0), None);
        assert_eq!(image.get(0, 360), None);
        assert!(image.row(280).is_none());
    }

    #[test]
    fn test_second_fill_without_reset_is_rejected() {
        let mut image = StitchedImage::new(StitchLayout::default());
        image.begin_fill().unwrap();
        assert!(matches!(image.begin_fill(), Err(Error::ImageNotReset)));

        image.set(0, 0, 2.0);
        image.reset();
        assert_eq!(image.nonzero_count(), 0);
        assert!(image.begin_fill().is_ok());
    }
}

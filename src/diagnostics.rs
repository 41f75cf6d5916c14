//! Diagnostic distributions of the corrected hit time before and after the time selection.
//!
//! The histograms are booked only when enabled and written once at the end of processing as an
//! `.npz` archive, with bin contents, bin edges and the under/overflow counts of each histogram.

use ndarray::Array1;
use ndarray_npy::{NpzWriter, WriteNpzError};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Number of bins of the corrected time histograms.
pub const CORRECTED_TIME_BINS: usize = 1000;
/// Lower edge of the corrected time histograms, in ns.
pub const CORRECTED_TIME_LOW: f64 = -250.0;
/// Upper edge of the corrected time histograms, in ns.
pub const CORRECTED_TIME_HIGH: f64 = 250.0;

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("could not create histogram file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not write histogram archive: {0}")]
    Npz(#[from] WriteNpzError),
}

/// A fixed-binning one-dimensional histogram with under- and overflow counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    pub name: String,
    pub title: String,
    low: f64,
    high: f64,
    counts: Array1<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
}

impl Histogram1D {
    pub fn new(name: &str, title: &str, bins: usize, low: f64, high: f64) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            low,
            high,
            counts: Array1::zeros(bins),
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// Adds one entry. NaN values are ignored.
    pub fn fill(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.entries += 1;
        match self.bin_index(value) {
            Some(index) => self.counts[index] += 1.0,
            None if value < self.low => self.underflow += 1.0,
            None => self.overflow += 1.0,
        }
    }

    /// Index of the bin holding `value`, `None` outside of `[low, high)`.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !(value >= self.low && value < self.high) {
            return None;
        }
        let width = (self.high - self.low) / self.counts.len() as f64;
        let index = ((value - self.low) / width) as usize;
        Some(index.min(self.counts.len() - 1))
    }

    pub fn counts(&self) -> &Array1<f64> {
        &self.counts
    }

    /// Bin edges, one more than the number of bins.
    pub fn edges(&self) -> Array1<f64> {
        Array1::linspace(self.low, self.high, self.counts.len() + 1)
    }

    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Mean of the in-range entries, using bin centres.
    pub fn mean(&self) -> Option<f64> {
        let total = self.counts.sum();
        if total == 0.0 {
            return None;
        }
        let edges = self.edges();
        let weighted: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, c)| c * 0.5 * (edges[i] + edges[i + 1]))
            .sum();
        Some(weighted / total)
    }

    fn add_to_npz(&self, npz: &mut NpzWriter<File>) -> Result<(), WriteNpzError> {
        npz.add_array(format!("{}_counts", self.name), &self.counts)?;
        npz.add_array(format!("{}_edges", self.name), &self.edges())?;
        npz.add_array(
            format!("{}_outliers", self.name),
            &Array1::from(vec![self.underflow, self.overflow]),
        )?;
        Ok(())
    }
}

/// The corrected time distributions before and after the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsRecorder {
    pub before: Histogram1D,
    pub after: Histogram1D,
}

impl Default for DiagnosticsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsRecorder {
    pub fn new() -> Self {
        DiagnosticsRecorder {
            before: Histogram1D::new(
                "corrected_time_before",
                "Corrected time of the hit before selection [ns]",
                CORRECTED_TIME_BINS,
                CORRECTED_TIME_LOW,
                CORRECTED_TIME_HIGH,
            ),
            after: Histogram1D::new(
                "corrected_time_after",
                "Corrected time of the hit after selection [ns]",
                CORRECTED_TIME_BINS,
                CORRECTED_TIME_LOW,
                CORRECTED_TIME_HIGH,
            ),
        }
    }

    pub fn record_before(&mut self, corrected_time: f64) {
        self.before.fill(corrected_time);
    }

    pub fn record_after(&mut self, corrected_time: f64) {
        self.after.fill(corrected_time);
    }

    /// Writes both histograms to an `.npz` archive at `path`.
    pub fn save(&self, path: &Path) -> Result<(), DiagnosticsError> {
        let mut npz = NpzWriter::new(File::create(path)?);
        self.before.add_to_npz(&mut npz)?;
        self.after.add_to_npz(&mut npz)?;
        npz.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fill_bins_and_outliers() {
        let mut h = Histogram1D::new("t", "t", 10, 0.0, 10.0);
        h.fill(0.0);
        h.fill(9.999);
        h.fill(10.0);
        h.fill(-0.1);
        h.fill(f64::NAN);
        h.fill(f64::INFINITY);

        assert_eq!(h.entries(), 5);
        assert_eq!(h.counts()[0], 1.0);
        assert_eq!(h.counts()[9], 1.0);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 2.0);
        assert_eq!(h.edges().len(), 11);
    }

    #[test]
    fn test_mean_uses_bin_centres() {
        let mut h = Histogram1D::new("t", "t", 4, 0.0, 4.0);
        assert!(h.mean().is_none());
        h.fill(0.2);
        h.fill(2.7);
        assert_abs_diff_eq!(h.mean().unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_save_writes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrected_time.npz");

        let mut recorder = DiagnosticsRecorder::new();
        recorder.record_before(3.9994);
        recorder.record_before(12.0);
        recorder.record_after(3.9994);
        recorder.save(&path).unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}

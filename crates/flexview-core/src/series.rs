// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FlexView.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default live frame: 60 samples of a 1 Hz feed
pub const DEFAULT_LIVE_FRAME: usize = 60;

/// One point of a chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSample {
    /// UNIX seconds
    pub timestamp: i64,
    /// Power in deciwatts
    pub value: i64,
}

impl SeriesSample {
    pub fn new(timestamp: i64, value: i64) -> Self {
        Self { timestamp, value }
    }

    pub fn watts(&self) -> f64 {
        self.value as f64 / 10.0
    }
}

/// Sliding window of the most recent samples (oldest first)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    samples: VecDeque<SeriesSample>,
    window: usize,
}

impl TimeSeries {
    /// Create an empty series holding at most `window` samples (at least one)
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Append a sample, evicting the oldest ones beyond the window
    pub fn push(&mut self, sample: SeriesSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    pub fn samples(&self) -> &VecDeque<SeriesSample> {
        &self.samples
    }

    pub fn to_vec(&self) -> Vec<SeriesSample> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&SeriesSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Smallest and largest value in the window, for axis scaling
    pub fn value_range(&self) -> Option<(i64, i64)> {
        let min = self.samples.iter().map(|s| s.value).min()?;
        let max = self.samples.iter().map(|s| s.value).max()?;
        Some((min, max))
    }
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_FRAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut series = TimeSeries::new(3);
        for t in 1..=4 {
            series.push(SeriesSample::new(t, t * 10));
        }

        assert_eq!(series.len(), 3);
        assert_eq!(
            series.to_vec(),
            vec![
                SeriesSample::new(2, 20),
                SeriesSample::new(3, 30),
                SeriesSample::new(4, 40),
            ]
        );
        assert_eq!(series.latest(), Some(&SeriesSample::new(4, 40)));
    }

    #[test]
    fn test_zero_window_is_clamped() {
        let mut series = TimeSeries::new(0);
        series.push(SeriesSample::new(1, 1));
        series.push(SeriesSample::new(2, 2));
        assert_eq!(series.window(), 1);
        assert_eq!(series.to_vec(), vec![SeriesSample::new(2, 2)]);
    }

    #[test]
    fn test_value_range() {
        let mut series = TimeSeries::default();
        assert_eq!(series.value_range(), None);
        series.push(SeriesSample::new(1, -300));
        series.push(SeriesSample::new(2, 1200));
        assert_eq!(series.value_range(), Some((-300, 1200)));
        assert_eq!(series.latest().map(SeriesSample::watts), Some(120.0));
    }
}

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

/// Last observed value of one entity or aggregate.
///
/// A timestamp of 0 means "never observed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestValue<T> {
    pub timestamp: i64,
    pub value: T,
}

impl<T: Copy> LatestValue<T> {
    pub fn new(timestamp: i64, value: T) -> Self {
        Self { timestamp, value }
    }

    pub fn is_set(&self) -> bool {
        self.timestamp != 0
    }

    /// True if a reading at `timestamp` would move this value forward
    pub fn accepts(&self, timestamp: i64) -> bool {
        timestamp > self.timestamp
    }

    /// Store the reading if it is newer than the current value.
    ///
    /// Returns false (and leaves the value untouched) for stale or duplicate readings.
    pub fn update(&mut self, timestamp: i64, value: T) -> bool {
        if !self.accepts(timestamp) {
            return false;
        }
        self.timestamp = timestamp;
        self.value = value;
        true
    }

    /// Overwrite unconditionally (aggregates are restamped on every recompute)
    pub fn set(&mut self, timestamp: i64, value: T) {
        self.timestamp = timestamp;
        self.value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_moves_forward() {
        let mut latest = LatestValue::<i64>::default();
        assert!(!latest.is_set());

        assert!(latest.update(100, 5000));
        assert!(!latest.update(100, 9999));
        assert!(!latest.update(99, 1));
        assert_eq!(latest, LatestValue::new(100, 5000));

        assert!(latest.update(101, 7));
        assert_eq!(latest.value, 7);
    }

    #[test]
    fn test_non_positive_timestamp_never_accepted_when_unset() {
        let mut latest = LatestValue::<f64>::default();
        assert!(!latest.update(0, 50.0));
        assert!(!latest.update(-5, 50.0));
        assert!(!latest.is_set());
    }
}

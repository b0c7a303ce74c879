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

//! Average power history derived from cumulative energy counters

use chrono::{DateTime, SecondsFormat, Utc};
use flexview_types::{EnergyCounters, MeterStatePayload};
use serde::{Deserialize, Serialize};

/// Header line of the TSV export
pub const TSV_HEADER: &str = "date\ttotalActivePower";

const MS_PER_HOUR: f64 = 3_600_000.0;

/// One cumulative counter sample of a meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyCounterSample {
    /// UNIX seconds
    pub timestamp: i64,
    pub counters: EnergyCounters,
}

/// Average power over the interval ending at `timestamp`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: i64,
    /// Watts
    pub total_active_power: f64,
}

/// Counter samples of one meter, in feed order.
///
/// Publications of other meters and publications without both counters are skipped.
pub fn samples_from_meter_states<'a>(
    meter_id: &str,
    states: impl IntoIterator<Item = &'a MeterStatePayload>,
) -> Vec<EnergyCounterSample> {
    states
        .into_iter()
        .filter(|state| state.uuid.as_deref() == Some(meter_id))
        .filter_map(|state| {
            Some(EnergyCounterSample {
                timestamp: state.time?,
                counters: state.energy_counters()?,
            })
        })
        .collect()
}

/// Keep the last sample of every `bucket_secs` wide bucket
pub fn downsample(samples: &[EnergyCounterSample], bucket_secs: i64) -> Vec<EnergyCounterSample> {
    if bucket_secs <= 1 {
        return samples.to_vec();
    }

    let mut out: Vec<EnergyCounterSample> = Vec::new();
    for sample in samples {
        let bucket = sample.timestamp.div_euclid(bucket_secs);
        if let Some(last) = out
            .last_mut()
            .filter(|last| last.timestamp.div_euclid(bucket_secs) == bucket)
        {
            *last = *sample;
        } else {
            out.push(*sample);
        }
    }
    out
}

/// Convert chronological counter samples into average power points.
///
/// The first sample only anchors the next interval. Samples whose timestamp
/// does not advance past the previous anchor are dropped.
pub fn power_from_energy_counters(samples: &[EnergyCounterSample]) -> Vec<HistoryPoint> {
    let mut points = Vec::with_capacity(samples.len().saturating_sub(1));
    let mut previous: Option<&EnergyCounterSample> = None;

    for sample in samples {
        if let Some(prev) = previous {
            let dt_ms = sample.timestamp.saturating_sub(prev.timestamp) as f64 * 1000.0;
            if dt_ms <= 0.0 {
                continue;
            }
            let energy = sample.counters.net() as f64 - prev.counters.net() as f64;
            points.push(HistoryPoint {
                timestamp: sample.timestamp,
                total_active_power: energy * MS_PER_HOUR / dt_ms / 100.0,
            });
        }
        previous = Some(sample);
    }

    points
}

/// Render points as tab separated values with RFC 3339 dates
pub fn to_tsv(points: &[HistoryPoint]) -> String {
    let mut out = String::from(TSV_HEADER);
    out.push('\n');
    for point in points {
        let date = DateTime::<Utc>::from_timestamp(point.timestamp, 0)
            .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| point.timestamp.to_string());
        out.push_str(&format!("{date}\t{}\n", point.total_active_power));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: i64, p: i64, n: i64) -> EnergyCounterSample {
        EnergyCounterSample {
            timestamp,
            counters: EnergyCounters {
                total_active_energy_p: p,
                total_active_energy_n: n,
            },
        }
    }

    #[test]
    fn test_power_from_counters() {
        // 1 Wh (100 units) in 60 s -> 60 W
        let points =
            power_from_energy_counters(&[sample(0, 1_000, 0), sample(60, 1_100, 0)]);
        assert_eq!(
            points,
            vec![HistoryPoint {
                timestamp: 60,
                total_active_power: 60.0
            }]
        );
    }

    #[test]
    fn test_export_is_negative() {
        let points = power_from_energy_counters(&[sample(0, 0, 0), sample(3600, 0, 50_000)]);
        assert_eq!(points[0].total_active_power, -500.0);
    }

    #[test]
    fn test_non_advancing_samples_are_skipped() {
        let points = power_from_energy_counters(&[
            sample(100, 0, 0),
            sample(100, 500, 0),
            sample(90, 500, 0),
            sample(136, 100, 0),
        ]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].timestamp, 136);
        assert_eq!(points[0].total_active_power, 100.0);
    }

    #[test]
    fn test_single_sample_yields_nothing() {
        assert!(power_from_energy_counters(&[sample(1, 1, 1)]).is_empty());
        assert_eq!(to_tsv(&[]), "date\ttotalActivePower\n");
    }

    #[test]
    fn test_tsv_layout() {
        let tsv = to_tsv(&[HistoryPoint {
            timestamp: 1_500_000_000,
            total_active_power: 60.5,
        }]);
        assert_eq!(tsv, "date\ttotalActivePower\n2017-07-14T02:40:00Z\t60.5\n");
    }

    #[test]
    fn test_tsv_one_line_per_point() {
        let tsv = to_tsv(&[
            HistoryPoint {
                timestamp: 0,
                total_active_power: -3.0,
            },
            HistoryPoint {
                timestamp: 60,
                total_active_power: 12.25,
            },
        ]);
        assert_eq!(
            tsv,
            "date\ttotalActivePower\n1970-01-01T00:00:00Z\t-3\n1970-01-01T00:01:00Z\t12.25\n"
        );
    }

    #[test]
    fn test_extreme_counters_do_not_overflow() {
        let points = power_from_energy_counters(&[
            sample(i64::MIN, i64::MIN, i64::MAX),
            sample(i64::MAX, i64::MAX, i64::MIN),
        ]);
        assert_eq!(points.len(), 1);
        assert!(points[0].total_active_power.is_finite());
    }

    #[test]
    fn test_samples_are_taken_from_one_meter() {
        let states = vec![
            MeterStatePayload {
                uuid: Some("M".to_owned()),
                time: Some(1),
                total_active_power: Some(0),
                total_active_energy_p: Some(10),
                total_active_energy_n: Some(0),
            },
            MeterStatePayload {
                uuid: Some("other".to_owned()),
                time: Some(2),
                total_active_power: Some(0),
                total_active_energy_p: Some(10),
                total_active_energy_n: Some(0),
            },
            MeterStatePayload {
                uuid: Some("M".to_owned()),
                time: Some(3),
                total_active_power: Some(0),
                ..Default::default()
            },
        ];

        assert_eq!(samples_from_meter_states("M", &states), vec![sample(1, 10, 0)]);
    }

    #[test]
    fn test_downsample_keeps_last_per_bucket() {
        let samples = [sample(0, 0, 0), sample(30, 1, 0), sample(61, 2, 0), sample(119, 3, 0)];
        assert_eq!(
            downsample(&samples, 60),
            vec![sample(30, 1, 0), sample(119, 3, 0)]
        );
        assert_eq!(downsample(&samples, 1).len(), 4);
    }
}

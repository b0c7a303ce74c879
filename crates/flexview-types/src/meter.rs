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

use crate::error::ReadingError;

const METER_STATE: &str = "meter state";

/// Meter state publication as delivered on the meter topic.
///
/// Every field is optional on the wire so that a malformed publication can be
/// rejected with the name of the missing field instead of a generic parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterStatePayload {
    /// Meter identifier
    pub uuid: Option<String>,

    /// Instant of publication (UNIX seconds)
    pub time: Option<i64>,

    /// Total active power in W x 10
    pub total_active_power: Option<i64>,

    /// Total active energy (+) in Wh x 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_active_energy_p: Option<i64>,

    /// Total active energy (-) in Wh x 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_active_energy_n: Option<i64>,
}

impl MeterStatePayload {
    /// Cumulative energy counters, if the publication carried both of them
    pub fn energy_counters(&self) -> Option<EnergyCounters> {
        Some(EnergyCounters {
            total_active_energy_p: self.total_active_energy_p?,
            total_active_energy_n: self.total_active_energy_n?,
        })
    }
}

/// Cumulative import/export energy counters of a meter (Wh x 100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyCounters {
    pub total_active_energy_p: i64,
    pub total_active_energy_n: i64,
}

impl EnergyCounters {
    /// Net energy (import minus export) in Wh x 100
    pub fn net(&self) -> i64 {
        self.total_active_energy_p
            .saturating_sub(self.total_active_energy_n)
    }
}

/// A validated power reading of a single meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReading {
    pub meter_id: String,
    /// UNIX seconds
    pub timestamp: i64,
    /// Power in deciwatts (W x 10). Sources are negative, sinks positive.
    pub total_active_power_dw: i64,
}

impl MeterReading {
    pub fn new(meter_id: impl Into<String>, timestamp: i64, total_active_power_dw: i64) -> Self {
        Self {
            meter_id: meter_id.into(),
            timestamp,
            total_active_power_dw,
        }
    }

    /// Power in watts
    pub fn watts(&self) -> f64 {
        self.total_active_power_dw as f64 / 10.0
    }
}

impl TryFrom<&MeterStatePayload> for MeterReading {
    type Error = ReadingError;

    fn try_from(payload: &MeterStatePayload) -> Result<Self, Self::Error> {
        let meter_id = payload.uuid.clone().ok_or(ReadingError::MissingField {
            message: METER_STATE,
            field: "uuid",
        })?;
        let timestamp = payload.time.ok_or(ReadingError::MissingField {
            message: METER_STATE,
            field: "time",
        })?;
        let total_active_power_dw =
            payload
                .total_active_power
                .ok_or(ReadingError::MissingField {
                    message: METER_STATE,
                    field: "totalActivePower",
                })?;

        Ok(Self {
            meter_id,
            timestamp,
            total_active_power_dw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_payload() {
        let payload: MeterStatePayload = serde_json::from_str(
            r#"{"uuid":"C","time":100,"totalActivePower":5000,"totalActiveEnergyP":1200,"totalActiveEnergyN":200,"alarmFlag":0}"#,
        )
        .unwrap();

        let reading = MeterReading::try_from(&payload).unwrap();
        assert_eq!(reading, MeterReading::new("C", 100, 5000));
        assert_eq!(reading.watts(), 500.0);
        assert_eq!(payload.energy_counters().map(|c| c.net()), Some(1000));
    }

    #[test]
    fn test_missing_fields_are_reported_by_name() {
        let payload: MeterStatePayload =
            serde_json::from_str(r#"{"uuid":"C","totalActivePower":5000}"#).unwrap();
        let err = MeterReading::try_from(&payload).unwrap_err();
        assert_eq!(
            err,
            ReadingError::MissingField {
                message: "meter state",
                field: "time"
            }
        );
        assert!(err.to_string().contains("'time'"));

        let payload: MeterStatePayload =
            serde_json::from_str(r#"{"time":1,"totalActivePower":5000}"#).unwrap();
        assert!(matches!(
            MeterReading::try_from(&payload),
            Err(ReadingError::MissingField { field: "uuid", .. })
        ));

        let payload: MeterStatePayload = serde_json::from_str(r#"{"uuid":"C","time":1}"#).unwrap();
        assert!(matches!(
            MeterReading::try_from(&payload),
            Err(ReadingError::MissingField {
                field: "totalActivePower",
                ..
            })
        ));
    }

    #[test]
    fn test_energy_counters_need_both_directions() {
        let payload = MeterStatePayload {
            total_active_energy_p: Some(10),
            ..Default::default()
        };
        assert!(payload.energy_counters().is_none());
    }
}

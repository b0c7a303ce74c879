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

const SOC: &str = "battery soc";
const BATTERY_STATE: &str = "battery state";

/// State of charge publication as delivered on the SOC topic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocPayload {
    pub uuid: Option<String>,
    /// UNIX seconds
    pub time: Option<i64>,
    /// SOC in % of effective capacity
    pub effective_soc: Option<f64>,
}

/// A validated state of charge reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocReading {
    pub battery_id: String,
    pub timestamp: i64,
    pub effective_soc_percent: f64,
}

impl SocReading {
    pub fn new(battery_id: impl Into<String>, timestamp: i64, effective_soc_percent: f64) -> Self {
        Self {
            battery_id: battery_id.into(),
            timestamp,
            effective_soc_percent,
        }
    }
}

impl TryFrom<&SocPayload> for SocReading {
    type Error = ReadingError;

    fn try_from(payload: &SocPayload) -> Result<Self, Self::Error> {
        let battery_id = payload.uuid.clone().ok_or(ReadingError::MissingField {
            message: SOC,
            field: "uuid",
        })?;
        let timestamp = payload.time.ok_or(ReadingError::MissingField {
            message: SOC,
            field: "time",
        })?;
        let effective_soc_percent = finite(
            SOC,
            "effectiveSoc",
            payload.effective_soc.ok_or(ReadingError::MissingField {
                message: SOC,
                field: "effectiveSoc",
            })?,
        )?;

        Ok(Self {
            battery_id,
            timestamp,
            effective_soc_percent,
        })
    }
}

/// Response of the one-shot battery state request.
///
/// The device publishes a much larger state object; only the fields the
/// dashboard needs are kept, unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryStatePayload {
    /// Effective capacity in Wh
    pub effective_capacity: Option<f64>,
    /// SOC in % of effective capacity
    pub effective_state_of_charge: Option<f64>,
}

/// Capacity and initial SOC of one battery, resolved once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryCapacity {
    pub battery_id: String,
    pub effective_capacity_wh: f64,
    pub effective_soc_percent: f64,
}

impl BatteryCapacity {
    pub fn new(
        battery_id: impl Into<String>,
        effective_capacity_wh: f64,
        effective_soc_percent: f64,
    ) -> Self {
        Self {
            battery_id: battery_id.into(),
            effective_capacity_wh,
            effective_soc_percent,
        }
    }

    /// Validate a battery state response for the given battery
    pub fn from_payload(
        battery_id: impl Into<String>,
        payload: &BatteryStatePayload,
    ) -> Result<Self, ReadingError> {
        let effective_capacity_wh = finite(
            BATTERY_STATE,
            "effectiveCapacity",
            payload
                .effective_capacity
                .ok_or(ReadingError::MissingField {
                    message: BATTERY_STATE,
                    field: "effectiveCapacity",
                })?,
        )?;
        let effective_soc_percent = finite(
            BATTERY_STATE,
            "effectiveStateOfCharge",
            payload
                .effective_state_of_charge
                .ok_or(ReadingError::MissingField {
                    message: BATTERY_STATE,
                    field: "effectiveStateOfCharge",
                })?,
        )?;

        Ok(Self {
            battery_id: battery_id.into(),
            effective_capacity_wh,
            effective_soc_percent,
        })
    }
}

fn finite(message: &'static str, field: &'static str, value: f64) -> Result<f64, ReadingError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ReadingError::NonFinite {
            message,
            field,
            value,
        })
    }
}

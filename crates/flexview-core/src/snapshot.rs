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

use chrono::{DateTime, Utc};
use flexview_types::FlexibilityStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::latest::LatestValue;
use crate::series::SeriesSample;

/// Point-in-time copy of everything a dashboard renderer reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub collected_at: DateTime<Utc>,

    pub consumption: LatestValue<i64>,
    pub total_production: LatestValue<i64>,
    pub total_battery_power: LatestValue<i64>,
    /// Absent until every configured meter category has reported
    pub net: Option<LatestValue<i64>>,

    pub average_soc: LatestValue<f64>,
    pub total_capacity_wh: f64,
    pub stored_energy_wh: f64,

    pub flexibility: FlexibilityStatus,

    /// Configured production meters, in configuration order
    #[serde(default)]
    pub production_meters: Vec<String>,
    /// Latest reading per configured meter
    pub meters: BTreeMap<String, LatestValue<i64>>,
    /// Chart series per configured meter, oldest sample first
    pub series: BTreeMap<String, Vec<SeriesSample>>,
    pub total_series: Vec<SeriesSample>,
}

impl DashboardSnapshot {
    pub fn flexibility_message(&self) -> &'static str {
        self.flexibility.message()
    }

    /// Number of meters that have reported at least once
    pub fn reporting_meters(&self) -> usize {
        self.meters.values().filter(|m| m.is_set()).count()
    }
}

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

//! Household energy aggregator
//!
//! Folds meter readings, SOC readings and one-shot capacity responses into
//! the figures the dashboard shows. The aggregator is an ECS resource and is
//! only ever mutated from one system at a time, so every handler runs to
//! completion before the next message is looked at.

use bevy_ecs::prelude::*;
use chrono::{DateTime, Utc};
use flexview_types::{
    BatteryCapacity, FlexibilityStatus, MeterReading, MeterRole, MeterRoles, MeterStatePayload,
    ReadingError, SocPayload, SocReading,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use crate::latest::LatestValue;
use crate::series::{DEFAULT_LIVE_FRAME, SeriesSample, TimeSeries};
use crate::snapshot::DashboardSnapshot;

/// Default flexibility message buffer in watts
pub const DEFAULT_FLEXIBILITY_MESSAGE_BUFFER_W: f64 = 150.0;

/// Tunables of the aggregator, already validated by the configuration layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of samples kept per chart series
    pub live_frame: usize,

    /// Battery power (W) above which the household counts as grid-supportive
    pub flexibility_message_buffer_w: f64,

    /// Battery ids whose SOC and capacity are tracked
    pub battery_ids: Vec<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            live_frame: DEFAULT_LIVE_FRAME,
            flexibility_message_buffer_w: DEFAULT_FLEXIBILITY_MESSAGE_BUFFER_W,
            battery_ids: Vec::new(),
        }
    }
}

/// What happened to an inbound reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Reading moved the state forward
    Accepted,
    /// Timestamp not newer than the stored one, state untouched
    Stale,
    /// Id has no configured role, state untouched
    Unknown,
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Resource, Debug, Clone)]
pub struct Aggregator {
    roles: MeterRoles,
    config: AggregatorConfig,

    meters: HashMap<String, LatestValue<i64>>,
    series: HashMap<String, TimeSeries>,
    total_series: TimeSeries,

    consumption: LatestValue<i64>,
    total_production: LatestValue<i64>,
    total_battery_power: LatestValue<i64>,
    net: Option<LatestValue<i64>>,
    /// Raw value of the most recent accepted battery meter reading
    last_battery_reading_dw: i64,

    soc: BTreeMap<String, LatestValue<f64>>,
    capacities: BTreeMap<String, f64>,
    average_soc: LatestValue<f64>,

    flexibility: FlexibilityStatus,
}

impl Aggregator {
    pub fn new(roles: MeterRoles, config: AggregatorConfig) -> Self {
        let window = config.live_frame;
        let meters = roles
            .meter_ids()
            .map(|id| (id.to_owned(), LatestValue::default()))
            .collect();
        let series = roles
            .meter_ids()
            .map(|id| (id.to_owned(), TimeSeries::new(window)))
            .collect();

        Self {
            roles,
            config,
            meters,
            series,
            total_series: TimeSeries::new(window),
            consumption: LatestValue::default(),
            total_production: LatestValue::default(),
            total_battery_power: LatestValue::default(),
            net: None,
            last_battery_reading_dw: 0,
            soc: BTreeMap::new(),
            capacities: BTreeMap::new(),
            average_soc: LatestValue::default(),
            flexibility: FlexibilityStatus::None,
        }
    }

    pub fn roles(&self) -> &MeterRoles {
        &self.roles
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Validate a raw meter state publication and apply it
    pub fn on_meter_state(
        &mut self,
        payload: &MeterStatePayload,
    ) -> Result<IngestOutcome, ReadingError> {
        let reading = MeterReading::try_from(payload)?;
        Ok(self.on_meter_reading(&reading))
    }

    /// Validate a raw SOC publication and apply it
    pub fn on_soc_state(&mut self, payload: &SocPayload) -> Result<IngestOutcome, ReadingError> {
        let reading = SocReading::try_from(payload)?;
        Ok(self.on_soc_reading(&reading))
    }

    pub fn on_meter_reading(&mut self, reading: &MeterReading) -> IngestOutcome {
        let Some(role) = self.roles.role_of(&reading.meter_id) else {
            trace!("Ignoring reading of unknown meter {}", reading.meter_id);
            return IngestOutcome::Unknown;
        };

        let latest = self.meters.entry(reading.meter_id.clone()).or_default();
        if !latest.update(reading.timestamp, reading.total_active_power_dw) {
            debug!(
                "Discarding stale reading of {} meter {} at {} (stored {})",
                role, reading.meter_id, reading.timestamp, latest.timestamp
            );
            return IngestOutcome::Stale;
        }

        match role {
            MeterRole::Consumption => {
                self.consumption
                    .set(reading.timestamp, reading.total_active_power_dw);
            }
            MeterRole::Production => {
                let total = self.sum_latest(self.roles.production());
                self.total_production.set(reading.timestamp, total);
            }
            MeterRole::Battery => {
                let total = self.sum_latest(self.roles.battery());
                self.total_battery_power.set(reading.timestamp, total);
                self.last_battery_reading_dw = reading.total_active_power_dw;
            }
        }

        let window = self.config.live_frame;
        self.series
            .entry(reading.meter_id.clone())
            .or_insert_with(|| TimeSeries::new(window))
            .push(SeriesSample::new(
                reading.timestamp,
                reading.total_active_power_dw,
            ));

        if let Some(net) = self.derive_net() {
            let net = LatestValue::new(reading.timestamp, net);
            self.net = Some(net);
            self.total_series
                .push(SeriesSample::new(net.timestamp, net.value));
        }

        if self.roles.has_battery_meters() {
            let status = self.classify();
            if status != self.flexibility {
                debug!("Flexibility status changed: {} -> {}", self.flexibility, status);
            }
            self.flexibility = status;
        }

        IngestOutcome::Accepted
    }

    pub fn on_soc_reading(&mut self, reading: &SocReading) -> IngestOutcome {
        if !self.is_tracked_battery(&reading.battery_id) {
            trace!("Ignoring SOC of unknown battery {}", reading.battery_id);
            return IngestOutcome::Unknown;
        }

        let stored = self.soc.get(&reading.battery_id).copied().unwrap_or_default();
        if !stored.accepts(reading.timestamp) {
            debug!(
                "Discarding stale SOC of battery {} at {} (stored {})",
                reading.battery_id, reading.timestamp, stored.timestamp
            );
            return IngestOutcome::Stale;
        }
        self.soc.insert(
            reading.battery_id.clone(),
            LatestValue::new(reading.timestamp, reading.effective_soc_percent),
        );

        self.recompute_average_soc(reading.timestamp);
        IngestOutcome::Accepted
    }

    /// Apply the one-shot capacity response of a battery.
    ///
    /// Responses may arrive in any order; a repeated response for the same
    /// battery replaces the earlier one instead of being counted twice. The
    /// response SOC always overwrites the battery's entry, stamped 0.
    pub fn on_capacity_resolved(&mut self, capacity: &BatteryCapacity) -> IngestOutcome {
        if !self.is_tracked_battery(&capacity.battery_id) {
            trace!("Ignoring capacity of unknown battery {}", capacity.battery_id);
            return IngestOutcome::Unknown;
        }

        self.capacities
            .insert(capacity.battery_id.clone(), capacity.effective_capacity_wh);

        // The response SOC replaces the entry and resets its timestamp
        self.soc.insert(
            capacity.battery_id.clone(),
            LatestValue::new(0, capacity.effective_soc_percent),
        );

        self.recompute_average_soc(0);
        IngestOutcome::Accepted
    }

    pub fn consumption(&self) -> LatestValue<i64> {
        self.consumption
    }

    pub fn total_production(&self) -> LatestValue<i64> {
        self.total_production
    }

    pub fn total_battery_power(&self) -> LatestValue<i64> {
        self.total_battery_power
    }

    /// Net grid power, once every configured meter category has reported
    pub fn net(&self) -> Option<LatestValue<i64>> {
        self.net
    }

    pub fn average_soc(&self) -> LatestValue<f64> {
        self.average_soc
    }

    /// Sum of the effective capacities of every battery that answered
    pub fn total_capacity_wh(&self) -> f64 {
        self.capacities.values().sum()
    }

    /// Energy currently held by the batteries that answered
    pub fn stored_energy_wh(&self) -> f64 {
        self.average_soc.value * self.total_capacity_wh() / 100.0
    }

    /// Batteries whose capacity request has been answered
    pub fn resolved_batteries(&self) -> impl Iterator<Item = &str> {
        self.capacities.keys().map(String::as_str)
    }

    pub fn meter(&self, meter_id: &str) -> Option<LatestValue<i64>> {
        self.meters.get(meter_id).copied()
    }

    pub fn soc(&self, battery_id: &str) -> Option<LatestValue<f64>> {
        self.soc.get(battery_id).copied()
    }

    pub fn series(&self, meter_id: &str) -> Option<&TimeSeries> {
        self.series.get(meter_id)
    }

    pub fn total_series(&self) -> &TimeSeries {
        &self.total_series
    }

    pub fn flexibility_status(&self) -> FlexibilityStatus {
        self.flexibility
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, collected_at: DateTime<Utc>) -> DashboardSnapshot {
        DashboardSnapshot {
            collected_at,
            consumption: self.consumption,
            total_production: self.total_production,
            total_battery_power: self.total_battery_power,
            net: self.net,
            average_soc: self.average_soc,
            total_capacity_wh: self.total_capacity_wh(),
            stored_energy_wh: self.stored_energy_wh(),
            flexibility: self.flexibility,
            production_meters: self.roles.production().to_vec(),
            meters: self
                .meters
                .iter()
                .map(|(id, latest)| (id.clone(), *latest))
                .collect(),
            series: self
                .series
                .iter()
                .map(|(id, series)| (id.clone(), series.to_vec()))
                .collect(),
            total_series: self.total_series.to_vec(),
        }
    }

    fn is_tracked_battery(&self, battery_id: &str) -> bool {
        self.config.battery_ids.iter().any(|id| id == battery_id)
    }

    fn sum_latest(&self, ids: &[String]) -> i64 {
        ids.iter()
            .filter_map(|id| self.meters.get(id))
            .map(|latest| latest.value)
            .fold(0, i64::saturating_add)
    }

    /// Net is known once each configured category has at least one reading.
    /// A category without configured meters never blocks it.
    fn derive_net(&self) -> Option<i64> {
        let consumption_ready = self.roles.consumption().is_none() || self.consumption.is_set();
        let production_ready =
            self.roles.production().is_empty() || self.total_production.is_set();
        let battery_ready = self.roles.battery().is_empty() || self.total_battery_power.is_set();

        (consumption_ready && production_ready && battery_ready).then(|| {
            self.total_production
                .value
                .saturating_add(self.total_battery_power.value)
                .saturating_add(self.consumption.value)
        })
    }

    fn classify(&self) -> FlexibilityStatus {
        let battery = self.total_battery_power.value;
        let production = self.total_production.value;
        let consumption = self.consumption.value;

        // Storing uses the raw value of the last battery reading, not the total
        let household = production.saturating_add(consumption);
        let storing = household.saturating_add(self.last_battery_reading_dw) < 0;
        if battery > 0 && production < 0 && storing {
            FlexibilityStatus::StoringRenewables
        } else if battery < 0 && household > 0 {
            FlexibilityStatus::BatterySupplyingHousehold
        } else if (battery as f64 / 10.0).abs() > self.config.flexibility_message_buffer_w {
            FlexibilityStatus::ContributingToGridStability
        } else {
            FlexibilityStatus::None
        }
    }

    fn recompute_average_soc(&mut self, timestamp: i64) {
        if self.soc.is_empty() {
            return;
        }
        let sum: f64 = self.soc.values().map(|soc| soc.value).sum();
        let average = sum / self.soc.len() as f64;
        self.average_soc.set(timestamp, average);
    }
}

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

//! Text shown on the dashboard panels.
//!
//! Values arrive in deciwatts and are shown in kW with two decimals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::snapshot::DashboardSnapshot;

/// Round half up to two decimals, the way the panels always did
fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0 + 0.5).floor() / 100.0;
    // -0.0 would print as "-0"
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Deciwatts to kW, rounded to two decimals
pub fn format_kw(deciwatts: i64) -> f64 {
    round2(deciwatts as f64 / 10.0 / 1000.0)
}

/// Watt hours to kWh, rounded to two decimals
pub fn format_kwh(watt_hours: f64) -> f64 {
    round2(watt_hours / 1000.0)
}

/// Direction of the grid exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetDirection {
    Import,
    Export,
}

impl NetDirection {
    pub fn of(net_dw: i64) -> Self {
        if net_dw > 0 { Self::Import } else { Self::Export }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Import => "Netzbezug",
            Self::Export => "Einspeisung",
        }
    }
}

/// What the battery is doing, as shown on the battery panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BatteryActivity {
    Inactive,
    Charging { kw: f64 },
    Discharging { kw: f64 },
}

impl BatteryActivity {
    pub fn of(total_battery_dw: i64) -> Self {
        let kw = format_kw(total_battery_dw);
        if kw > 0.0 {
            Self::Charging { kw }
        } else if kw < 0.0 {
            Self::Discharging { kw: -kw }
        } else {
            Self::Inactive
        }
    }
}

impl fmt::Display for BatteryActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => f.write_str("inaktiv"),
            Self::Charging { kw } => write!(f, "lädt {kw} kW"),
            Self::Discharging { kw } => write!(f, "entlädt {kw} kW"),
        }
    }
}

/// One line of the production panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterLine {
    pub meter_id: String,
    pub kw: f64,
}

/// Rendered panel text for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelText {
    pub consumption_kw: f64,
    /// Generation shown as a positive number
    pub production_kw: f64,
    /// Per-meter generation, only with more than one production meter
    pub production_meters: Vec<MeterLine>,
    pub battery: String,
    /// "<kWh> kWh, <soc> %" once a capacity is known
    pub battery_storage: Option<String>,
    pub net_label: Option<&'static str>,
    /// Always non-negative
    pub net_kw: Option<f64>,
    pub flexibility_message: &'static str,
}

impl PanelText {
    pub fn render(snapshot: &DashboardSnapshot) -> Self {
        let net_direction = snapshot.net.map(|net| NetDirection::of(net.value));
        let net_kw = snapshot.net.map(|net| format_kw(net.value.abs()));

        let battery_storage = (snapshot.total_capacity_wh > 0.0).then(|| {
            format!(
                "{} kWh, {} %",
                format_kwh(snapshot.stored_energy_wh),
                snapshot.average_soc.value
            )
        });

        let production_meters = if snapshot.production_meters.len() > 1 {
            snapshot
                .production_meters
                .iter()
                .map(|id| MeterLine {
                    meter_id: id.clone(),
                    kw: snapshot
                        .meters
                        .get(id)
                        .map_or(0.0, |latest| round2(-format_kw(latest.value))),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            consumption_kw: format_kw(snapshot.consumption.value),
            production_kw: round2(-format_kw(snapshot.total_production.value)),
            production_meters,
            battery: BatteryActivity::of(snapshot.total_battery_power.value).to_string(),
            battery_storage,
            net_label: net_direction.map(|d| d.label()),
            net_kw,
            flexibility_message: snapshot.flexibility.message(),
        }
    }

    pub fn has_flexibility_message(&self) -> bool {
        !self.flexibility_message.is_empty()
    }
}

impl fmt::Display for PanelText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Verbrauch {} kW | Erzeugung {} kW",
            self.consumption_kw, self.production_kw
        )?;
        if !self.production_meters.is_empty() {
            let lines: Vec<String> = self
                .production_meters
                .iter()
                .map(|line| format!("{} {} kW", line.meter_id, line.kw))
                .collect();
            write!(f, " [{}]", lines.join(", "))?;
        }
        write!(f, " | Batterie {}", self.battery)?;
        if let Some(storage) = &self.battery_storage {
            write!(f, " ({storage})")?;
        }
        if let (Some(label), Some(kw)) = (self.net_label, self.net_kw) {
            write!(f, " | {label} {kw} kW")?;
        }
        if self.has_flexibility_message() {
            write!(f, " | {}", self.flexibility_message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Aggregator, AggregatorConfig};
    use chrono::{DateTime, Utc};
    use flexview_types::{BatteryCapacity, MeterReading, MeterRoles};

    #[test]
    fn test_format_kw_rounds_half_up() {
        assert_eq!(format_kw(12_345), 1.23);
        assert_eq!(format_kw(12_350), 1.24);
        assert_eq!(format_kw(-12_340), -1.23);
        assert_eq!(format_kw(-20), 0.0);
        assert_eq!(format_kw(0).to_string(), "0");
    }

    #[test]
    fn test_net_direction() {
        assert_eq!(NetDirection::of(1), NetDirection::Import);
        assert_eq!(NetDirection::of(0).label(), "Einspeisung");
        assert_eq!(NetDirection::of(-10).label(), "Einspeisung");
    }

    #[test]
    fn test_battery_activity_text() {
        assert_eq!(BatteryActivity::of(0).to_string(), "inaktiv");
        assert_eq!(BatteryActivity::of(40).to_string(), "inaktiv");
        assert_eq!(BatteryActivity::of(15_000).to_string(), "lädt 1.5 kW");
        assert_eq!(BatteryActivity::of(-25_000).to_string(), "entlädt 2.5 kW");
    }

    #[test]
    fn test_render_household() {
        let roles = MeterRoles::new(
            Some("C".to_owned()),
            vec!["P".to_owned()],
            vec!["BM".to_owned()],
        )
        .unwrap();
        let mut agg = Aggregator::new(
            roles,
            AggregatorConfig {
                battery_ids: vec!["B1".to_owned()],
                ..Default::default()
            },
        );
        agg.on_meter_reading(&MeterReading::new("C", 1, 20_000));
        agg.on_meter_reading(&MeterReading::new("P", 2, -60_000));
        agg.on_meter_reading(&MeterReading::new("BM", 3, 30_000));
        agg.on_capacity_resolved(&BatteryCapacity::new("B1", 10_000.0, 50.0));

        let panels = PanelText::render(&agg.snapshot_at(DateTime::<Utc>::UNIX_EPOCH));
        assert_eq!(panels.consumption_kw, 2.0);
        assert_eq!(panels.production_kw, 6.0);
        assert_eq!(panels.battery, "lädt 3 kW");
        assert_eq!(panels.battery_storage.as_deref(), Some("5 kWh, 50 %"));
        assert_eq!(panels.net_label, Some("Einspeisung"));
        assert_eq!(panels.net_kw, Some(1.0));
        assert!(panels.has_flexibility_message());
        assert_eq!(
            panels.flexibility_message,
            "Strom aus erneuerbaren Energien wird gespeichert."
        );
        assert!(panels.to_string().contains("Einspeisung 1 kW"));
        assert!(panels.production_meters.is_empty());
    }

    #[test]
    fn test_render_one_line_per_production_meter() {
        let roles = MeterRoles::new(
            Some("C".to_owned()),
            vec!["roof".to_owned(), "garage".to_owned()],
            vec![],
        )
        .unwrap();
        let mut agg = Aggregator::new(roles, AggregatorConfig::default());
        agg.on_meter_reading(&MeterReading::new("roof", 1, -42_000));

        let panels = PanelText::render(&agg.snapshot_at(DateTime::<Utc>::UNIX_EPOCH));
        assert_eq!(panels.production_kw, 4.2);
        assert_eq!(
            panels.production_meters,
            vec![
                MeterLine {
                    meter_id: "roof".to_owned(),
                    kw: 4.2
                },
                MeterLine {
                    meter_id: "garage".to_owned(),
                    kw: 0.0
                },
            ]
        );
        assert!(
            panels
                .to_string()
                .contains("Erzeugung 4.2 kW [roof 4.2 kW, garage 0 kW]")
        );
    }
}

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
use std::collections::HashMap;
use std::fmt;

use crate::error::RoleError;

/// Role of a meter in the household energy balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterRole {
    /// Household consumption (positive when drawing)
    Consumption,
    /// PV or other generation (negative when producing)
    Production,
    /// Battery inverter (positive when charging, negative when discharging)
    Battery,
}

impl MeterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumption => "consumption",
            Self::Production => "production",
            Self::Battery => "battery",
        }
    }
}

impl fmt::Display for MeterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static classification of meter ids.
///
/// Each id has at most one role; ids without a role are ignored by the
/// aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeterRoles {
    consumption: Option<String>,
    production: Vec<String>,
    battery: Vec<String>,
    index: HashMap<String, MeterRole>,
}

impl MeterRoles {
    pub fn new(
        consumption: Option<String>,
        production: Vec<String>,
        battery: Vec<String>,
    ) -> Result<Self, RoleError> {
        let mut index = HashMap::new();
        let tagged = consumption
            .iter()
            .map(|id| (id, MeterRole::Consumption))
            .chain(production.iter().map(|id| (id, MeterRole::Production)))
            .chain(battery.iter().map(|id| (id, MeterRole::Battery)));

        for (id, role) in tagged {
            if id.is_empty() {
                return Err(RoleError::EmptyId);
            }
            if let Some(existing) = index.insert(id.clone(), role) {
                return Err(RoleError::Conflict {
                    id: id.clone(),
                    first: existing.as_str(),
                    second: role.as_str(),
                });
            }
        }

        Ok(Self {
            consumption,
            production,
            battery,
            index,
        })
    }

    pub fn role_of(&self, meter_id: &str) -> Option<MeterRole> {
        self.index.get(meter_id).copied()
    }

    pub fn consumption(&self) -> Option<&str> {
        self.consumption.as_deref()
    }

    pub fn production(&self) -> &[String] {
        &self.production
    }

    pub fn battery(&self) -> &[String] {
        &self.battery
    }

    /// All configured meter ids: consumption first, then production, then battery
    pub fn meter_ids(&self) -> impl Iterator<Item = &str> {
        self.consumption
            .iter()
            .chain(&self.production)
            .chain(&self.battery)
            .map(String::as_str)
    }

    pub fn has_battery_meters(&self) -> bool {
        !self.battery.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_lookup() {
        let roles = MeterRoles::new(
            Some("C".to_owned()),
            vec!["P1".to_owned(), "P2".to_owned()],
            vec!["B1".to_owned()],
        )
        .unwrap();

        assert_eq!(roles.role_of("C"), Some(MeterRole::Consumption));
        assert_eq!(roles.role_of("P2"), Some(MeterRole::Production));
        assert_eq!(roles.role_of("B1"), Some(MeterRole::Battery));
        assert_eq!(roles.role_of("X"), None);
        assert_eq!(
            roles.meter_ids().collect::<Vec<_>>(),
            vec!["C", "P1", "P2", "B1"]
        );
        assert!(roles.has_battery_meters());
    }

    #[test]
    fn test_id_in_two_roles_is_rejected() {
        let err = MeterRoles::new(None, vec!["M".to_owned()], vec!["M".to_owned()]).unwrap_err();
        assert_eq!(
            err,
            RoleError::Conflict {
                id: "M".to_owned(),
                first: "production",
                second: "battery",
            }
        );
    }

    #[test]
    fn test_empty_id_is_rejected() {
        assert_eq!(
            MeterRoles::new(Some(String::new()), vec![], vec![]),
            Err(RoleError::EmptyId)
        );
    }
}

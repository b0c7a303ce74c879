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
use std::fmt;

/// Coarse classification of what the household's flexibility is doing right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlexibilityStatus {
    /// Nothing worth reporting
    #[default]
    None,
    /// Surplus production is being stored in the battery
    StoringRenewables,
    /// The battery covers household demand
    BatterySupplyingHousehold,
    /// Battery power exceeds the message buffer and supports the grid
    ContributingToGridStability,
}

impl FlexibilityStatus {
    /// Message shown on the dashboard (empty for `None`)
    pub fn message(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::StoringRenewables => "Strom aus erneuerbaren Energien wird gespeichert.",
            Self::BatterySupplyingHousehold => {
                "Ihre Batterie stellt Ihnen aktuell Strom zur Verfügung."
            }
            Self::ContributingToGridStability => {
                "Ihr Haushalt trägt aktuell aktiv zur Netzstabilität bei."
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for FlexibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::StoringRenewables => "storing renewable energy",
            Self::BatterySupplyingHousehold => "battery supplying household",
            Self::ContributingToGridStability => "contributing to grid stability",
        };
        f.write_str(name)
    }
}

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

pub mod battery;
pub mod error;
pub mod meter;
pub mod roles;
pub mod status;

// Re-export common types for convenience
pub use battery::{BatteryCapacity, BatteryStatePayload, SocPayload, SocReading};
pub use error::{ReadingError, RoleError};
pub use meter::{EnergyCounters, MeterReading, MeterStatePayload};
pub use roles::{MeterRole, MeterRoles};
pub use status::FlexibilityStatus;

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
pub mod errors;
pub mod feed;
pub mod topic;

pub use battery::{HttpBatteryStateSource, StaticBatteryStateSource};
pub use errors::{AdapterError, AdapterResult};
pub use feed::{
    DEFAULT_METER_TOPIC, DEFAULT_SOC_TOPIC, FeedEnvelope, FeedStats, TopicRouter,
    open_feed_input, pump_json_lines, read_meter_states,
};
pub use topic::TopicPattern;

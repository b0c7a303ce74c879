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

use anyhow::Result;
use async_trait::async_trait;
use bevy_ecs::prelude::*;
use flexview_types::BatteryStatePayload;
use std::sync::Arc;

/// Answers the one-shot battery state request
#[async_trait]
pub trait BatteryStateSource: Send + Sync {
    /// Request the current state of one battery
    async fn battery_state(&self, battery_id: &str) -> Result<BatteryStatePayload>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Battery state source shared with the capacity request tasks
#[derive(Resource, Clone)]
pub struct BatteryStateSourceResource(pub Arc<dyn BatteryStateSource>);

impl std::fmt::Debug for BatteryStateSourceResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BatteryStateSourceResource")
            .field(&self.0.name())
            .finish()
    }
}

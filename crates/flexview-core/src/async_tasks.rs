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

use bevy_ecs::prelude::*;
use crossbeam_channel::Sender;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::channels::{CapacityChannel, CapacityRequester, CapacityResponse};
use crate::traits::{BatteryStateSource, BatteryStateSourceResource};

/// Spawn one request task per battery.
///
/// Must be called inside a tokio runtime. Requests are never retried or
/// cancelled here; a battery that does not answer stays unresolved.
pub fn spawn_capacity_requests(
    source: Arc<dyn BatteryStateSource>,
    battery_ids: &[String],
) -> CapacityChannel {
    let (tx, rx) = crossbeam_channel::bounded(battery_ids.len().max(1));

    for battery_id in battery_ids {
        let source = Arc::clone(&source);
        let battery_id = battery_id.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            request_capacity(source.as_ref(), battery_id, &tx).await;
        });
    }

    CapacityChannel { receiver: rx }
}

async fn request_capacity(
    source: &dyn BatteryStateSource,
    battery_id: String,
    tx: &Sender<CapacityResponse>,
) {
    debug!("Requesting battery state of {} from {}", battery_id, source.name());
    let result = source
        .battery_state(&battery_id)
        .await
        .map_err(|e| format!("{e:#}"));

    if tx.send(CapacityResponse { battery_id, result }).is_err() {
        warn!("Capacity response dropped, ECS side has shut down");
    }
}

/// Startup system that fires the capacity requests for every tracked battery
pub fn setup_capacity_requests(
    mut commands: Commands,
    source: Option<Res<BatteryStateSourceResource>>,
    aggregator: Res<Aggregator>,
) {
    let Some(source) = source else {
        info!("No battery state source configured, capacity stays unknown");
        return;
    };

    let battery_ids = &aggregator.config().battery_ids;
    if battery_ids.is_empty() {
        return;
    }

    info!(
        "🔋 Requesting capacity of {} batteries from {}",
        battery_ids.len(),
        source.0.name()
    );
    let channel = spawn_capacity_requests(Arc::clone(&source.0), battery_ids);

    commands.spawn((
        CapacityRequester {
            source_name: source.0.name().to_owned(),
            requested: battery_ids.len(),
        },
        channel,
    ));
}

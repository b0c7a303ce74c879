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

pub mod aggregator;
pub mod async_tasks;
pub mod channels;
pub mod history;
pub mod latest;
pub mod panels;
pub mod series;
pub mod snapshot;
pub mod systems;
pub mod traits;

pub use aggregator::{
    Aggregator, AggregatorConfig, DEFAULT_FLEXIBILITY_MESSAGE_BUFFER_W, IngestOutcome,
};
pub use async_tasks::{setup_capacity_requests, spawn_capacity_requests};
pub use channels::{
    CapacityChannel, CapacityRequester, CapacityResponse, FeedChannel, FeedMessage, FeedSender,
    SnapshotPublisher,
};
pub use history::{
    EnergyCounterSample, HistoryPoint, TSV_HEADER, downsample, power_from_energy_counters,
    samples_from_meter_states, to_tsv,
};
pub use latest::LatestValue;
pub use panels::{BatteryActivity, MeterLine, NetDirection, PanelText, format_kw, format_kwh};
pub use series::{DEFAULT_LIVE_FRAME, SeriesSample, TimeSeries};
pub use snapshot::DashboardSnapshot;
pub use systems::{
    FeedStatus, SnapshotSettings, ingest_capacity_system, ingest_feed_system,
    publish_snapshot_system,
};
pub use traits::{BatteryStateSource, BatteryStateSourceResource};

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;

/// Registers the ingestion and publication systems.
///
/// The `Aggregator` resource must be inserted before the app runs; feed,
/// battery source and snapshot publisher are optional.
#[derive(Debug)]
pub struct FlexviewCorePlugin;

impl Plugin for FlexviewCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FeedStatus>()
            .init_resource::<SnapshotSettings>()
            .add_systems(Startup, setup_capacity_requests)
            .add_systems(
                Update,
                (
                    ingest_capacity_system,
                    ingest_feed_system,
                    publish_snapshot_system,
                )
                    .chain(),
            );
    }
}

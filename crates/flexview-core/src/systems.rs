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
use flexview_types::BatteryCapacity;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::aggregator::{Aggregator, IngestOutcome};
use crate::channels::{CapacityChannel, FeedChannel, FeedMessage, SnapshotPublisher};

/// Counters of what the feed delivered so far
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStatus {
    pub accepted: u64,
    pub stale: u64,
    pub unknown: u64,
    pub rejected: u64,
    /// Set once the feed signalled its end
    pub closed: bool,
}

impl FeedStatus {
    fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Accepted => self.accepted += 1,
            IngestOutcome::Stale => self.stale += 1,
            IngestOutcome::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.accepted + self.stale + self.unknown + self.rejected
    }
}

/// Snapshot publication cadence
#[derive(Resource, Debug, Clone)]
pub struct SnapshotSettings {
    pub interval: Duration,
    last_published: Option<Instant>,
    final_published: bool,
}

impl SnapshotSettings {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_published: None,
            final_published: false,
        }
    }

    /// True once the snapshot after feed end has gone out
    pub fn final_published(&self) -> bool {
        self.final_published
    }

    fn is_due(&self, now: Instant) -> bool {
        self.last_published
            .is_none_or(|last| now.duration_since(last) >= self.interval)
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Apply capacity responses as they come back
pub fn ingest_capacity_system(
    channels: Query<&CapacityChannel>,
    mut aggregator: ResMut<Aggregator>,
) {
    let Ok(channel) = channels.single() else {
        return;
    };

    while let Ok(response) = channel.receiver.try_recv() {
        let payload = match response.result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    "Battery state request for {} failed, battery excluded: {}",
                    response.battery_id, e
                );
                continue;
            }
        };

        match BatteryCapacity::from_payload(response.battery_id.as_str(), &payload) {
            Ok(capacity) => {
                if !aggregator.on_capacity_resolved(&capacity).is_accepted() {
                    continue;
                }
                info!(
                    "🔋 Battery {} resolved: {} Wh, total capacity {} Wh",
                    capacity.battery_id,
                    capacity.effective_capacity_wh,
                    aggregator.total_capacity_wh()
                );
            }
            Err(e) => warn!(
                "Invalid battery state for {}, battery excluded: {}",
                response.battery_id, e
            ),
        }
    }
}

/// Drain the feed in arrival order, one message at a time
pub fn ingest_feed_system(
    feed: Option<Res<FeedChannel>>,
    mut aggregator: ResMut<Aggregator>,
    mut status: ResMut<FeedStatus>,
) {
    let Some(feed) = feed else {
        return;
    };

    while let Ok(message) = feed.try_recv() {
        let result = match &message {
            FeedMessage::MeterState(payload) => aggregator.on_meter_state(payload),
            FeedMessage::Soc(payload) => aggregator.on_soc_state(payload),
            FeedMessage::Closed => {
                info!("Feed closed after {} messages", status.total());
                status.closed = true;
                continue;
            }
        };

        match result {
            Ok(outcome) => status.record(outcome),
            Err(e) => {
                warn!("Rejected feed message: {e}");
                status.rejected += 1;
            }
        }
    }
}

/// Publish a snapshot every interval, and once more after the feed closed
pub fn publish_snapshot_system(
    publisher: Option<Res<SnapshotPublisher>>,
    aggregator: Res<Aggregator>,
    status: Res<FeedStatus>,
    mut settings: ResMut<SnapshotSettings>,
) {
    let Some(publisher) = publisher else {
        return;
    };

    let now = Instant::now();
    let is_final = status.closed && !settings.final_published;
    if !is_final && !settings.is_due(now) {
        return;
    }

    if !publisher.publish(aggregator.snapshot()) {
        debug!("Snapshot receiver gone");
    }
    settings.last_published = Some(now);
    if is_final {
        settings.final_published = true;
    }
}

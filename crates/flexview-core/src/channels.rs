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

//! Channels between the async side (feed reader, capacity requests) and the
//! ECS world.

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use flexview_types::{BatteryStatePayload, MeterStatePayload, SocPayload};

use crate::snapshot::DashboardSnapshot;

/// A message delivered on one of the subscribed topics
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    MeterState(MeterStatePayload),
    Soc(SocPayload),
    /// The feed reached its end, nothing more will arrive
    Closed,
}

/// Ordered feed queue drained by `ingest_feed_system`
#[derive(Resource)]
pub struct FeedChannel {
    receiver: Receiver<FeedMessage>,
}

impl FeedChannel {
    pub fn try_recv(&self) -> Result<FeedMessage, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Clonable sender for feed messages
#[derive(Clone)]
pub struct FeedSender {
    sender: Sender<FeedMessage>,
}

impl std::fmt::Debug for FeedSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSender").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for FeedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedChannel")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl FeedSender {
    /// Create a new sender/receiver pair
    pub fn new() -> (Self, FeedChannel) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, FeedChannel { receiver })
    }

    /// Queue a message. Returns false once the ECS side is gone.
    pub fn send(&self, message: FeedMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn meter_state(&self, payload: MeterStatePayload) -> bool {
        self.send(FeedMessage::MeterState(payload))
    }

    pub fn soc(&self, payload: SocPayload) -> bool {
        self.send(FeedMessage::Soc(payload))
    }

    pub fn close(&self) -> bool {
        self.send(FeedMessage::Closed)
    }
}

/// Outcome of one battery state request
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityResponse {
    pub battery_id: String,
    pub result: Result<BatteryStatePayload, String>,
}

/// Component marking the entity that owns the capacity request channel
#[derive(Component, Debug)]
pub struct CapacityRequester {
    pub source_name: String,
    pub requested: usize,
}

/// Component that holds the receiver for capacity responses
#[derive(Component)]
pub struct CapacityChannel {
    pub receiver: Receiver<CapacityResponse>,
}

impl std::fmt::Debug for CapacityChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityChannel").finish_non_exhaustive()
    }
}

/// Where published snapshots go
#[derive(Resource)]
pub struct SnapshotPublisher {
    sender: Sender<DashboardSnapshot>,
}

impl std::fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPublisher").finish_non_exhaustive()
    }
}

impl SnapshotPublisher {
    pub fn new() -> (Self, Receiver<DashboardSnapshot>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    pub fn publish(&self, snapshot: DashboardSnapshot) -> bool {
        self.sender.send(snapshot).is_ok()
    }
}

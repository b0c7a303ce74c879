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

//! JSON-lines feed replay
//!
//! Each line holds one publication `{"topic": "...", "args": [payload]}`.
//! Lines are routed by topic and forwarded to the ECS feed channel in file order.

use flexview_core::{FeedMessage, FeedSender};
use flexview_types::{MeterStatePayload, SocPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, trace, warn};

use crate::errors::{AdapterError, AdapterResult};
use crate::topic::TopicPattern;

/// Default meter state topic pattern
pub const DEFAULT_METER_TOPIC: &str = "fzi.osh..meter.state";

/// Default battery SOC topic pattern
pub const DEFAULT_SOC_TOPIC: &str = "fzi.osh..battery.soc";

/// One publication as captured from the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEnvelope {
    pub topic: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl FeedEnvelope {
    fn payload(&self) -> AdapterResult<&Value> {
        self.args
            .first()
            .ok_or_else(|| AdapterError::InvalidEnvelope(format!("no payload on {}", self.topic)))
    }
}

/// Maps topics onto feed messages
#[derive(Debug, Clone)]
pub struct TopicRouter {
    meter: TopicPattern,
    soc: TopicPattern,
}

impl TopicRouter {
    pub fn new(meter: TopicPattern, soc: TopicPattern) -> Self {
        Self { meter, soc }
    }

    pub fn from_patterns(meter: &str, soc: &str) -> AdapterResult<Self> {
        Ok(Self::new(TopicPattern::new(meter)?, TopicPattern::new(soc)?))
    }

    /// Turn an envelope into a feed message.
    ///
    /// Returns `Ok(None)` for topics nobody subscribed to.
    pub fn route(&self, envelope: &FeedEnvelope) -> AdapterResult<Option<FeedMessage>> {
        if self.meter.matches(&envelope.topic) {
            let payload = MeterStatePayload::deserialize(envelope.payload()?)?;
            Ok(Some(FeedMessage::MeterState(payload)))
        } else if self.soc.matches(&envelope.topic) {
            let payload = SocPayload::deserialize(envelope.payload()?)?;
            Ok(Some(FeedMessage::Soc(payload)))
        } else {
            Ok(None)
        }
    }
}

impl Default for TopicRouter {
    fn default() -> Self {
        Self::new(
            TopicPattern::split(DEFAULT_METER_TOPIC),
            TopicPattern::split(DEFAULT_SOC_TOPIC),
        )
    }
}

/// What a feed replay delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub lines: u64,
    pub forwarded: u64,
    pub unrouted: u64,
    pub malformed: u64,
}

fn parse_line(router: &TopicRouter, line: &str) -> AdapterResult<Option<FeedMessage>> {
    let envelope: FeedEnvelope = serde_json::from_str(line)?;
    router.route(&envelope)
}

/// Forward every routed line to the feed channel, then signal the end of the feed.
///
/// Malformed lines are logged and skipped. Stops early if the ECS side is gone.
pub async fn pump_json_lines<R>(
    reader: R,
    router: &TopicRouter,
    sender: &FeedSender,
) -> AdapterResult<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        match parse_line(router, line) {
            Ok(Some(message)) => {
                if !sender.send(message) {
                    warn!("Feed consumer gone, stopping after {} lines", stats.lines);
                    return Ok(stats);
                }
                stats.forwarded += 1;
            }
            Ok(None) => {
                trace!("Unsubscribed topic on line {}", stats.lines);
                stats.unrouted += 1;
            }
            Err(e) => {
                warn!("Skipping malformed feed line {}: {}", stats.lines, e);
                stats.malformed += 1;
            }
        }
    }

    info!(
        "📡 Feed finished: {} lines, {} forwarded, {} unrouted, {} malformed",
        stats.lines, stats.forwarded, stats.unrouted, stats.malformed
    );
    sender.close();
    Ok(stats)
}

/// Open a feed file, or stdin for `-`
pub async fn open_feed_input(input: &str) -> AdapterResult<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        debug!("Reading feed from stdin");
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(Path::new(input)).await?;
    debug!("Reading feed from {}", input);
    Ok(Box::new(BufReader::new(file)))
}

/// Collect meter state payloads of the meter topic, skipping everything else
pub async fn read_meter_states<R>(
    reader: R,
    router: &TopicRouter,
) -> AdapterResult<Vec<MeterStatePayload>>
where
    R: AsyncBufRead + Unpin,
{
    let mut states = Vec::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        match parse_line(router, line.trim()) {
            Ok(Some(FeedMessage::MeterState(payload))) => states.push(payload),
            Ok(_) => {}
            Err(e) => debug!("Skipping line: {e}"),
        }
    }

    Ok(states)
}

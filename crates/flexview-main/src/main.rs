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

mod cli;
mod config;

use anyhow::{Context, Result};
use bevy_app::prelude::*;
use clap::Parser;
use crossbeam_channel::Receiver;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use flexview_adapters::{open_feed_input, pump_json_lines, read_meter_states};
use flexview_core::{
    Aggregator, BatteryStateSourceResource, DashboardSnapshot, FeedSender, FeedStatus,
    FlexviewCorePlugin, PanelText, SnapshotPublisher, SnapshotSettings, downsample,
    power_from_energy_counters, samples_from_meter_states, to_tsv,
};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

/// Pause between ECS frames
const FRAME: Duration = Duration::from_millis(20);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = AppConfig::load(cli.config.as_deref())?;
    let mut config = loaded.config;

    init_tracing(&config.system.log_level)?;
    info!("📋 Loaded configuration from {}", loaded.source);
    for ignored in &loaded.ignored_overrides {
        warn!("Ignoring {}", ignored);
    }
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match cli.command() {
        Commands::Run { input, json } => {
            if let Some(input) = input {
                config.feed.input = input;
            }
            config.dashboard.emit_json |= json;

            // Run the ECS loop in a blocking task so tokio keeps driving the feed
            // and the capacity requests
            runtime.block_on(async {
                tokio::task::spawn_blocking(move || run_dashboard(&config))
                    .await
                    .context("Dashboard task panicked")?
            })
        }
        Commands::History {
            meter,
            input,
            bucket_secs,
        } => {
            let input = input.unwrap_or_else(|| config.feed.input.clone());
            runtime.block_on(render_history(&config, &meter, &input, bucket_secs))
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    // RUST_LOG wins over the configured level. Logs go to stderr, stdout
    // carries snapshots and TSV.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting default tracing subscriber failed")
}

fn run_dashboard(config: &AppConfig) -> Result<()> {
    info!("🚀 Starting FlexView");
    info!(
        "   Meters: consumption={:?}, production={:?}, battery={:?}",
        config.meters.consumption, config.meters.production, config.meters.battery
    );
    info!(
        "   Batteries: {:?} via {} source",
        config.batteries.ids, config.batteries.source
    );
    info!(
        "   Live frame: {} samples, flexibility buffer: {} W",
        config.dashboard.live_frame, config.dashboard.flexibility_message_buffer_w
    );

    let aggregator = Aggregator::new(config.meter_roles()?, config.aggregator_config());
    let battery_source = config.battery_state_source()?;
    let router = config.topic_router()?;

    let (feed_sender, feed_channel) = FeedSender::new();
    let (publisher, snapshots) = SnapshotPublisher::new();

    let input = config.feed.input.clone();
    tokio::runtime::Handle::current().spawn(async move {
        let result = async {
            let reader = open_feed_input(&input).await?;
            pump_json_lines(reader, &router, &feed_sender).await
        }
        .await;

        if let Err(e) = result {
            error!("❌ Feed {} failed: {}", input, e);
            feed_sender.close();
        }
    });

    let mut app = App::new();
    app.insert_resource(aggregator)
        .insert_resource(feed_channel)
        .insert_resource(publisher)
        .insert_resource(SnapshotSettings::new(config.snapshot_interval()))
        .insert_resource(BatteryStateSourceResource(battery_source))
        .add_plugins(FlexviewCorePlugin);

    loop {
        app.update();
        report_snapshots(&snapshots, config.dashboard.emit_json)?;

        let world = app.world();
        let finished = world.resource::<FeedStatus>().closed
            && world.resource::<SnapshotSettings>().final_published();
        if finished {
            break;
        }
        std::thread::sleep(FRAME);
    }
    report_snapshots(&snapshots, config.dashboard.emit_json)?;

    let status = app.world().resource::<FeedStatus>();
    info!(
        "✅ Feed done: {} accepted, {} stale, {} unknown, {} rejected",
        status.accepted, status.stale, status.unknown, status.rejected
    );
    Ok(())
}

fn report_snapshots(snapshots: &Receiver<DashboardSnapshot>, emit_json: bool) -> Result<()> {
    for snapshot in snapshots.try_iter() {
        info!("📊 {}", PanelText::render(&snapshot));
        if snapshot.net.is_none() {
            warn!(
                "Net power unknown, {} meters reporting so far",
                snapshot.reporting_meters()
            );
        }
        if emit_json {
            println!(
                "{}",
                serde_json::to_string(&snapshot).context("Failed to serialize snapshot")?
            );
        }
    }
    Ok(())
}

async fn render_history(
    config: &AppConfig,
    meter: &str,
    input: &str,
    bucket_secs: i64,
) -> Result<()> {
    let router = config.topic_router()?;
    let reader = open_feed_input(input).await?;
    let states = read_meter_states(reader, &router).await?;

    let samples = samples_from_meter_states(meter, &states);
    if samples.is_empty() {
        warn!("No energy counters for meter {} in {}", meter, input);
    }
    let points = power_from_energy_counters(&downsample(&samples, bucket_secs));
    info!("📈 {} history points for meter {}", points.len(), meter);

    print!("{}", to_tsv(&points));
    Ok(())
}

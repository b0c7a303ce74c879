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

mod validation;

pub use validation::ValidationResult;

use anyhow::{Context, Result};
use flexview_adapters::{
    DEFAULT_METER_TOPIC, DEFAULT_SOC_TOPIC, HttpBatteryStateSource, StaticBatteryStateSource,
    TopicPattern, TopicRouter,
};
use flexview_core::{
    AggregatorConfig, BatteryStateSource, DEFAULT_FLEXIBILITY_MESSAGE_BUFFER_W, DEFAULT_LIVE_FRAME,
};
use flexview_types::{BatteryStatePayload, MeterRoles};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Meter role assignment
    #[serde(default)]
    pub meters: MetersConfig,

    /// Batteries whose capacity and SOC are tracked
    #[serde(default)]
    pub batteries: BatteriesConfig,

    /// Feed topics and input
    #[serde(default)]
    pub feed: FeedConfig,

    /// Dashboard behaviour
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// System configuration
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetersConfig {
    /// Household consumption meter
    #[serde(default)]
    pub consumption: Option<String>,

    /// Generation meters
    #[serde(default)]
    pub production: Vec<String>,

    /// Battery inverter meters
    #[serde(default)]
    pub battery: Vec<String>,
}

/// Where battery capacities come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatterySourceKind {
    #[default]
    Static,
    Http,
}

impl fmt::Display for BatterySourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::Http => f.write_str("http"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteriesConfig {
    #[serde(default)]
    pub ids: Vec<String>,

    #[serde(default)]
    pub source: BatterySourceKind,

    /// Base URL of the battery state endpoint (http source only)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Battery states answered by the static source
    #[serde(default)]
    pub static_states: Vec<StaticBatteryState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticBatteryState {
    pub id: String,
    pub effective_capacity_wh: f64,
    pub effective_state_of_charge: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_meter_topic")]
    pub meter_topic: String,

    #[serde(default = "default_soc_topic")]
    pub soc_topic: String,

    /// Prefix of the battery state procedure
    #[serde(default = "default_procedure_prefix")]
    pub procedure_prefix: String,

    /// Feed file, or "-" for stdin
    #[serde(default = "default_input")]
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Samples kept per chart series
    #[serde(default = "default_live_frame")]
    pub live_frame: usize,

    /// Battery power (W) above which grid support is reported
    #[serde(default = "default_flexibility_message_buffer_w")]
    pub flexibility_message_buffer_w: f64,

    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Write every snapshot as a JSON line to stdout
    #[serde(default)]
    pub emit_json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_meter_topic() -> String {
    DEFAULT_METER_TOPIC.to_owned()
}

fn default_soc_topic() -> String {
    DEFAULT_SOC_TOPIC.to_owned()
}

fn default_procedure_prefix() -> String {
    "osh".to_owned()
}

fn default_input() -> String {
    "-".to_owned()
}

fn default_live_frame() -> usize {
    DEFAULT_LIVE_FRAME
}

fn default_flexibility_message_buffer_w() -> f64 {
    DEFAULT_FLEXIBILITY_MESSAGE_BUFFER_W
}

fn default_snapshot_interval_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            meter_topic: default_meter_topic(),
            soc_topic: default_soc_topic(),
            procedure_prefix: default_procedure_prefix(),
            input: default_input(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            live_frame: default_live_frame(),
            flexibility_message_buffer_w: default_flexibility_message_buffer_w(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            emit_json: false,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where the configuration was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("defaults"),
        }
    }
}

const SEARCH_PATHS: [&str; 3] = ["/data/options.json", "config.toml", "config.json"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration as loaded, before logging is set up
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: ConfigSource,
    /// Environment overrides that could not be applied
    pub ignored_overrides: Vec<String>,
}

impl AppConfig {
    /// Load configuration from the first file found, or from defaults.
    ///
    /// Environment overrides are applied on top. Nothing is logged here:
    /// callers report ignored overrides and validate once logging is up.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
        let (mut config, source) = match explicit {
            Some(path) => (Self::from_file(path)?, ConfigSource::File(path.to_path_buf())),
            None => Self::search()?,
        };

        let ignored_overrides = config.apply_overrides(|key| std::env::var(key).ok());
        Ok(LoadedConfig {
            config,
            source,
            ignored_overrides,
        })
    }

    fn search() -> Result<(Self, ConfigSource)> {
        for candidate in SEARCH_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Ok((Self::from_file(path)?, ConfigSource::File(path.to_path_buf())));
            }
        }
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Parse a TOML or JSON file, chosen by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
        }
    }

    /// Apply `FLEXVIEW_*` overrides.
    ///
    /// Unparseable numbers leave the setting alone and are returned as messages.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut ignored = Vec::new();

        if let Some(input) = lookup("FLEXVIEW_INPUT") {
            self.feed.input = input;
        }

        if let Some(frame) = lookup("FLEXVIEW_LIVE_FRAME") {
            match frame.parse::<usize>() {
                Ok(frame) => self.dashboard.live_frame = frame,
                Err(e) => ignored.push(format!("FLEXVIEW_LIVE_FRAME={frame}: {e}")),
            }
        }

        if let Some(buffer) = lookup("FLEXVIEW_FLEX_BUFFER_W") {
            match buffer.parse::<f64>() {
                Ok(buffer) => self.dashboard.flexibility_message_buffer_w = buffer,
                Err(e) => ignored.push(format!("FLEXVIEW_FLEX_BUFFER_W={buffer}: {e}")),
            }
        }

        if let Some(level) = lookup("FLEXVIEW_LOG_LEVEL") {
            self.system.log_level = level;
        }

        ignored
    }

    /// Validate configuration with detailed error reporting
    pub fn validate_detailed(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        if let Err(e) = self.meter_roles() {
            result.add_error("meters", e.to_string());
        }
        for (field, ids) in [
            ("meters.production", &self.meters.production),
            ("meters.battery", &self.meters.battery),
            ("batteries.ids", &self.batteries.ids),
        ] {
            if let Some(id) = first_duplicate(ids) {
                result.add_error(field, format!("'{id}' is listed more than once"));
            }
        }
        if self.meters.consumption.is_none()
            && self.meters.production.is_empty()
            && self.meters.battery.is_empty()
        {
            result.add_warning("meters", "No meters configured, nothing will be shown");
        }

        if self.batteries.ids.iter().any(String::is_empty) {
            result.add_error("batteries.ids", "Battery ID cannot be empty");
        }
        match self.batteries.source {
            BatterySourceKind::Http => {
                if self.batteries.base_url.as_deref().is_none_or(str::is_empty) {
                    result.add_error("batteries.base_url", "HTTP battery source needs a base_url");
                }
            }
            BatterySourceKind::Static => {
                for id in &self.batteries.ids {
                    if !self.batteries.static_states.iter().any(|s| &s.id == id) {
                        result.add_warning(
                            "batteries.static_states",
                            format!("No static state for battery '{id}', its capacity stays unknown"),
                        );
                    }
                }
            }
        }

        for (field, pattern) in [
            ("feed.meter_topic", &self.feed.meter_topic),
            ("feed.soc_topic", &self.feed.soc_topic),
        ] {
            if TopicPattern::new(pattern).is_err() {
                result.add_error(field, "Topic pattern cannot be empty");
            }
        }
        if self.feed.procedure_prefix.is_empty() {
            result.add_error("feed.procedure_prefix", "Procedure prefix cannot be empty");
        }
        if self.feed.input.is_empty() {
            result.add_error("feed.input", "Input must be a path or '-'");
        }

        if self.dashboard.live_frame < 1 {
            result.add_error("dashboard.live_frame", "Live frame must hold at least one sample");
        }
        let buffer = self.dashboard.flexibility_message_buffer_w;
        if !buffer.is_finite() || buffer < 0.0 {
            result.add_error(
                "dashboard.flexibility_message_buffer_w",
                format!("Buffer must be a non-negative number of watts, got {buffer}"),
            );
        }
        if self.dashboard.snapshot_interval_secs < 1 {
            result.add_error(
                "dashboard.snapshot_interval_secs",
                "Snapshot interval must be at least one second",
            );
        }

        if !LOG_LEVELS.contains(&self.system.log_level.to_lowercase().as_str()) {
            result.add_warning(
                "system.log_level",
                format!("Unknown log level '{}'", self.system.log_level),
            );
        }

        result
    }

    /// Validate configuration, logging warnings and failing on the first batch of errors
    pub fn validate(&self) -> Result<()> {
        let result = self.validate_detailed();
        for warning in &result.warnings {
            warn!("⚠️ Config: {}", warning);
        }
        if !result.is_valid() {
            anyhow::bail!("Invalid configuration:\n{}", result.error_summary());
        }
        Ok(())
    }

    pub fn meter_roles(&self) -> Result<MeterRoles> {
        MeterRoles::new(
            self.meters.consumption.clone(),
            self.meters.production.clone(),
            self.meters.battery.clone(),
        )
        .context("Invalid meter roles")
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            live_frame: self.dashboard.live_frame,
            flexibility_message_buffer_w: self.dashboard.flexibility_message_buffer_w,
            battery_ids: self.batteries.ids.clone(),
        }
    }

    pub fn topic_router(&self) -> Result<TopicRouter> {
        TopicRouter::from_patterns(&self.feed.meter_topic, &self.feed.soc_topic)
            .context("Invalid topic pattern")
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.snapshot_interval_secs)
    }

    pub fn battery_state_source(&self) -> Result<Arc<dyn BatteryStateSource>> {
        match self.batteries.source {
            BatterySourceKind::Static => {
                let states = self.batteries.static_states.iter().map(|state| {
                    (
                        state.id.clone(),
                        BatteryStatePayload {
                            effective_capacity: Some(state.effective_capacity_wh),
                            effective_state_of_charge: Some(state.effective_state_of_charge),
                        },
                    )
                });
                Ok(Arc::new(StaticBatteryStateSource::new(states)))
            }
            BatterySourceKind::Http => {
                let base_url = self
                    .batteries
                    .base_url
                    .clone()
                    .context("HTTP battery source needs a base_url")?;
                let source =
                    HttpBatteryStateSource::new(base_url, self.feed.procedure_prefix.clone())?;
                Ok(Arc::new(source))
            }
        }
    }
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(String::as_str)
        .find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const EXAMPLE_TOML: &str = r#"
[meters]
consumption = "c-uuid"
production = ["p1-uuid", "p2-uuid"]
battery = ["bm1-uuid"]

[batteries]
ids = ["b1-uuid"]
source = "static"

[[batteries.static_states]]
id = "b1-uuid"
effective_capacity_wh = 10000
effective_state_of_charge = 50

[dashboard]
live_frame = 120
flexibility_message_buffer_w = 200
"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.feed.meter_topic, "fzi.osh..meter.state");
        assert_eq!(config.feed.soc_topic, "fzi.osh..battery.soc");
        assert_eq!(config.feed.procedure_prefix, "osh");
        assert_eq!(config.feed.input, "-");
        assert_eq!(config.dashboard.live_frame, 60);
        assert_eq!(config.dashboard.flexibility_message_buffer_w, 150.0);
        assert_eq!(config.dashboard.snapshot_interval_secs, 5);
        assert_eq!(config.system.log_level, "info");

        let result = config.validate_detailed();
        assert!(result.is_valid());
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(EXAMPLE_TOML.as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.meters.consumption.as_deref(), Some("c-uuid"));
        assert_eq!(config.meters.production.len(), 2);
        assert_eq!(config.batteries.static_states[0].effective_capacity_wh, 10000.0);
        assert_eq!(config.dashboard.live_frame, 120);
        // Unset fields fall back to defaults
        assert_eq!(config.dashboard.snapshot_interval_secs, 5);
        assert_eq!(config.feed.meter_topic, DEFAULT_METER_TOPIC);
        assert!(config.validate().is_ok());

        let aggregator = config.aggregator_config();
        assert_eq!(aggregator.flexibility_message_buffer_w, 200.0);
        assert_eq!(aggregator.battery_ids, vec!["b1-uuid".to_string()]);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(
            br#"{"meters": {"production": ["p"]}, "batteries": {"ids": ["b"], "source": "http", "base_url": "http://localhost:8080"}}"#,
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.batteries.source, BatterySourceKind::Http);
        assert!(config.validate().is_ok());
        assert_eq!(config.battery_state_source().unwrap().name(), "http");
    }

    #[test]
    fn test_explicit_path_is_loaded() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(EXAMPLE_TOML.as_bytes()).unwrap();

        let loaded = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(loaded.source, ConfigSource::File(file.path().to_path_buf()));
        let config = loaded.config;
        assert_eq!(config.battery_state_source().unwrap().name(), "static");
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[dashboard\nlive_frame = ").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FLEXVIEW_INPUT", "/tmp/feed.jsonl"),
            ("FLEXVIEW_LIVE_FRAME", "30"),
            ("FLEXVIEW_FLEX_BUFFER_W", "not-a-number"),
            ("FLEXVIEW_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        let ignored = config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(ignored.len(), 1);
        assert!(ignored[0].starts_with("FLEXVIEW_FLEX_BUFFER_W=not-a-number"));
        assert_eq!(config.feed.input, "/tmp/feed.jsonl");
        assert_eq!(config.dashboard.live_frame, 30);
        assert_eq!(config.dashboard.flexibility_message_buffer_w, 150.0);
        assert_eq!(config.system.log_level, "debug");
    }

    #[test]
    fn test_meter_in_two_roles() {
        let mut config = AppConfig::default();
        config.meters.production = vec!["m".to_string()];
        config.meters.battery = vec!["m".to_string()];

        let result = config.validate_detailed();
        assert!(result.has_error_for("meters"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_ids() {
        let mut config = AppConfig::default();
        config.meters.production = vec!["p".to_string(), "p".to_string()];
        config.batteries.ids = vec!["b".to_string(), "b".to_string()];

        let result = config.validate_detailed();
        assert!(result.has_error_for("meters.production"));
        assert!(result.has_error_for("batteries.ids"));
    }

    #[test]
    fn test_numeric_bounds() {
        let mut config = AppConfig::default();
        config.dashboard.live_frame = 0;
        config.dashboard.flexibility_message_buffer_w = -1.0;
        config.dashboard.snapshot_interval_secs = 0;

        let result = config.validate_detailed();
        assert!(result.has_error_for("dashboard.live_frame"));
        assert!(result.has_error_for("dashboard.flexibility_message_buffer_w"));
        assert!(result.has_error_for("dashboard.snapshot_interval_secs"));
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("dashboard.live_frame")
        );
    }

    #[test]
    fn test_http_source_needs_base_url() {
        let mut config = AppConfig::default();
        config.batteries.source = BatterySourceKind::Http;

        assert!(
            config
                .validate_detailed()
                .has_error_for("batteries.base_url")
        );
        assert!(config.battery_state_source().is_err());
    }

    #[test]
    fn test_empty_topic_is_rejected() {
        let mut config = AppConfig::default();
        config.feed.soc_topic = String::new();

        assert!(config.validate_detailed().has_error_for("feed.soc_topic"));
    }
}

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

//! Battery state sources answering the one-shot capacity request

use anyhow::Result;
use async_trait::async_trait;
use flexview_core::BatteryStateSource;
use flexview_types::BatteryStatePayload;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::{AdapterError, AdapterResult};

/// Battery states taken from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticBatteryStateSource {
    states: HashMap<String, BatteryStatePayload>,
}

impl StaticBatteryStateSource {
    pub fn new(states: impl IntoIterator<Item = (String, BatteryStatePayload)>) -> Self {
        Self {
            states: states.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl BatteryStateSource for StaticBatteryStateSource {
    async fn battery_state(&self, battery_id: &str) -> Result<BatteryStatePayload> {
        self.states
            .get(battery_id)
            .cloned()
            .ok_or_else(|| AdapterError::BatteryNotFound(battery_id.to_owned()).into())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Calls `<prefix>.<uuid>.battery.state.get` over HTTP
#[derive(Clone)]
pub struct HttpBatteryStateSource {
    base_url: String,
    procedure_prefix: String,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for HttpBatteryStateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBatteryStateSource")
            .field("base_url", &self.base_url)
            .field("procedure_prefix", &self.procedure_prefix)
            .finish_non_exhaustive()
    }
}

impl HttpBatteryStateSource {
    pub fn new(
        base_url: impl Into<String>,
        procedure_prefix: impl Into<String>,
    ) -> AdapterResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AdapterError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_owned();
        info!("Battery state requests go to {}", base_url);

        Ok(Self {
            base_url,
            procedure_prefix: procedure_prefix.into(),
            client,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Set custom retry configuration
    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Procedure name of the battery state request
    pub fn procedure(&self, battery_id: &str) -> String {
        format!("{}.{}.battery.state.get", self.procedure_prefix, battery_id)
    }

    pub async fn get_battery_state(&self, battery_id: &str) -> AdapterResult<BatteryStatePayload> {
        let url = format!("{}/{}", self.base_url, self.procedure(battery_id));
        debug!("🔍 Requesting battery state: {}", url);

        let response = self
            .retry_request(|| async { self.client.get(&url).send().await })
            .await?;

        match response.status() {
            StatusCode::OK => {
                let state = response.json::<BatteryStatePayload>().await?;
                debug!(
                    "✅ Battery {}: capacity {:?} Wh, SOC {:?} %",
                    battery_id, state.effective_capacity, state.effective_state_of_charge
                );
                Ok(state)
            }
            StatusCode::NOT_FOUND => Err(AdapterError::BatteryNotFound(battery_id.to_owned())),
            status => {
                let message = response.text().await.unwrap_or_default();
                error!("❌ Battery state request failed with {}: {}", status, message);
                Err(AdapterError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Retry transport failures with exponential backoff
    async fn retry_request<F, Fut>(&self, mut request_fn: F) -> AdapterResult<reqwest::Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay;

        loop {
            attempts += 1;
            match request_fn().await {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= self.max_retries => {
                    error!("Request failed after {} attempts: {}", attempts, e);
                    return Err(AdapterError::HttpError(e));
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, self.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl BatteryStateSource for HttpBatteryStateSource {
    async fn battery_state(&self, battery_id: &str) -> Result<BatteryStatePayload> {
        Ok(self.get_battery_state(battery_id).await?)
    }

    fn name(&self) -> &str {
        "http"
    }
}

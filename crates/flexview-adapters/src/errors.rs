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

use thiserror::Error;

/// Errors raised by feed and battery state adapters
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Battery state API returned status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Battery not found: {0}")]
    BatteryNotFound(String),

    #[error("Invalid topic pattern '{0}'")]
    InvalidTopic(String),

    #[error("Invalid feed envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read feed: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

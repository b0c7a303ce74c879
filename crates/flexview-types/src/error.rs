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

//! Error types for reading validation and role configuration

use thiserror::Error;

/// A wire payload that cannot be turned into a reading.
///
/// Returned before any aggregator state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadingError {
    #[error("{message} is missing required field '{field}'")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    #[error("{message} field '{field}' is not a finite number: {value}")]
    NonFinite {
        message: &'static str,
        field: &'static str,
        value: f64,
    },
}

/// Invalid static meter role configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    #[error("meter id must not be empty")]
    EmptyId,

    #[error("meter '{id}' is configured as both {first} and {second}")]
    Conflict {
        id: String,
        first: &'static str,
        second: &'static str,
    },
}

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

use std::fmt;
use std::str::FromStr;

use crate::errors::AdapterError;

/// Topic pattern with WAMP wildcard matching.
///
/// Pattern and topic are split on `.`; an empty pattern component matches
/// any single component, so `fzi.osh..meter.state` matches
/// `fzi.osh.<uuid>.meter.state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    raw: String,
    components: Vec<String>,
}

impl TopicPattern {
    pub fn new(pattern: &str) -> Result<Self, AdapterError> {
        if pattern.trim().is_empty() {
            return Err(AdapterError::InvalidTopic(pattern.to_owned()));
        }
        Ok(Self::split(pattern))
    }

    pub(crate) fn split(pattern: &str) -> Self {
        Self {
            raw: pattern.to_owned(),
            components: pattern.split('.').map(str::to_owned).collect(),
        }
    }

    pub fn matches(&self, topic: &str) -> bool {
        let mut parts = topic.split('.');
        for expected in &self.components {
            let Some(part) = parts.next() else {
                return false;
            };
            if !expected.is_empty() && expected != part {
                return false;
            }
        }
        parts.next().is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for TopicPattern {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

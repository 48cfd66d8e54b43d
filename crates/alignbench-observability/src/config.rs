// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Observability configuration types

use alignbench_config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservabilityError {
    #[error("unknown log level '{0}' (expected one of trace, debug, info, warn, error)")]
    UnknownLevel(String),
}

/// Where and how much to log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default level (trace, debug, info, warn, error)
    pub level: String,

    /// Base directory for run folders; `None` logs to the console only
    pub log_dir: Option<PathBuf>,

    /// Keep run folders for N days
    pub retention_days: u64,

    /// Keep the N most recent run folders
    pub retention_runs: usize,
}

impl ObservabilityConfig {
    /// Lower-cased level, rejected if it is not a `tracing` level
    pub fn normalized_level(&self) -> Result<String, ObservabilityError> {
        let level = self.level.trim().to_lowercase();
        if LEVELS.contains(&level.as_str()) {
            Ok(level)
        } else {
            Err(ObservabilityError::UnknownLevel(self.level.clone()))
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            level: "info".to_string(),
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

impl From<&LoggingConfig> for ObservabilityConfig {
    fn from(logging: &LoggingConfig) -> Self {
        ObservabilityConfig {
            level: logging.level.clone(),
            log_dir: if logging.log_dir.as_os_str().is_empty() {
                None
            } else {
                Some(logging.log_dir.clone())
            },
            retention_days: logging.retention_days,
            retention_runs: logging.retention_runs,
        }
    }
}

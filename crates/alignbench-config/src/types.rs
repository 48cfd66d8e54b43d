// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `alignbench.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub evaluation: EvaluationConfig,
    pub sweep: SweepConfig,
    pub pairwise: PairwiseConfig,
    pub srm: SrmConfig,
    pub decoder: DecoderConfig,
    pub logging: LoggingConfig,
}

/// Objective evaluation settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Worker threads for the cross-validation fold loop
    pub workers: usize,
    /// `nearest_centroid` or `logistic`
    pub decoder: String,
    /// Also score unaligned features for comparison
    pub compute_baseline: bool,
    pub compute_alignment_correlation: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            decoder: "nearest_centroid".to_string(),
            compute_baseline: true,
            compute_alignment_correlation: true,
        }
    }
}

/// Which configurations the sweep enumerates (target subject × method)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepConfig {
    pub target_subjects: Vec<String>,
    pub methods: Vec<String>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            target_subjects: vec!["sub-08".to_string()],
            methods: vec!["identity".to_string()],
        }
    }
}

/// Pairwise alignment parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PairwiseConfig {
    pub n_pieces: usize,
    pub ridge_alpha: f64,
    pub ot_epsilon: f64,
    pub ot_iterations: usize,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            n_pieces: 1,
            ridge_alpha: 1.0,
            ot_epsilon: 0.1,
            ot_iterations: 200,
        }
    }
}

/// Shared response model parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SrmConfig {
    pub n_components: usize,
    pub n_iterations: usize,
    pub seed: u64,
}

impl Default for SrmConfig {
    fn default() -> Self {
        Self {
            n_components: 10,
            n_iterations: 10,
            seed: 0,
        }
    }
}

/// Logistic decoder training parameters (unused by `nearest_centroid`)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 200,
            l2: 1e-3,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Empty disables file logging
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::new(),
            retention_days: 7,
            retention_runs: 20,
        }
    }
}

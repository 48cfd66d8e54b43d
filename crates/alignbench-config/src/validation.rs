// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every problem found is collected and reported together so a broken config
//! can be fixed in one pass.

use crate::{BenchmarkConfig, ConfigError, ConfigResult};

/// Decoder names accepted by `evaluation.decoder`
pub const KNOWN_DECODERS: [&str; 2] = ["nearest_centroid", "logistic"];

/// Method names accepted by `sweep.methods` (pairwise methods may also carry a `pairwise:` prefix)
pub const KNOWN_METHODS: [&str; 5] = [
    "identity",
    "srm",
    "scaled_orthogonal",
    "ridge",
    "optimal_transport",
];

const PAIRWISE_METHODS: [&str; 4] = ["identity", "scaled_orthogonal", "ridge", "optimal_transport"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    UnknownName { field: String, name: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::UnknownName { field, name } => {
                write!(f, "Unknown name '{}' in {}", name, field)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Required fields (at least one target subject and one method)
/// - Known decoder, method and log level names
/// - Valid value ranges
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &BenchmarkConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_names(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

/// True if `name` selects a known alignment method
pub fn is_known_method(name: &str) -> bool {
    match name.strip_prefix("pairwise:") {
        Some(pairwise) => PAIRWISE_METHODS.contains(&pairwise),
        None => KNOWN_METHODS.contains(&name) || name == "shared_response",
    }
}

fn validate_required_fields(config: &BenchmarkConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.sweep.target_subjects.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "sweep.target_subjects".to_string(),
        });
    }
    if config.sweep.methods.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "sweep.methods".to_string(),
        });
    }
    if config
        .sweep
        .target_subjects
        .iter()
        .any(|subject| subject.trim().is_empty())
    {
        errors.push(ConfigValidationError::InvalidValue {
            field: "sweep.target_subjects".to_string(),
            reason: "subject identifiers must not be empty".to_string(),
        });
    }
}

fn validate_names(config: &BenchmarkConfig, errors: &mut Vec<ConfigValidationError>) {
    if !KNOWN_DECODERS.contains(&config.evaluation.decoder.as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: "evaluation.decoder".to_string(),
            name: config.evaluation.decoder.clone(),
        });
    }

    for method in &config.sweep.methods {
        if !is_known_method(method) {
            errors.push(ConfigValidationError::UnknownName {
                field: "sweep.methods".to_string(),
                name: method.clone(),
            });
        }
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: "logging.level".to_string(),
            name: config.logging.level.clone(),
        });
    }
}

fn validate_value_ranges(config: &BenchmarkConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.evaluation.workers == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "evaluation.workers".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.pairwise.n_pieces == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "pairwise.n_pieces".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if !(config.pairwise.ridge_alpha.is_finite() && config.pairwise.ridge_alpha > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "pairwise.ridge_alpha".to_string(),
            reason: format!("must be positive, got {}", config.pairwise.ridge_alpha),
        });
    }
    if !(config.pairwise.ot_epsilon.is_finite() && config.pairwise.ot_epsilon > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "pairwise.ot_epsilon".to_string(),
            reason: format!("must be positive, got {}", config.pairwise.ot_epsilon),
        });
    }
    if config.pairwise.ot_iterations == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "pairwise.ot_iterations".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.srm.n_components == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "srm.n_components".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if !(config.decoder.learning_rate.is_finite() && config.decoder.learning_rate > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "decoder.learning_rate".to_string(),
            reason: format!("must be positive, got {}", config.decoder.learning_rate),
        });
    }
    if !(config.decoder.l2.is_finite() && config.decoder.l2 >= 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "decoder.l2".to_string(),
            reason: format!("must be non-negative, got {}", config.decoder.l2),
        });
    }
}

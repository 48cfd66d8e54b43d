// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base values, missing keys fall back to defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{BenchmarkConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "alignbench.toml";

/// Find the benchmark configuration file
///
/// Search order:
/// 1. `ALIGNBENCH_CONFIG_PATH` environment variable
/// 2. Current working directory: `./alignbench.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("ALIGNBENCH_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by ALIGNBENCH_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet ALIGNBENCH_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is not found, contains invalid TOML, or an override
/// value cannot be parsed
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BenchmarkConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: BenchmarkConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `ALIGNBENCH_WORKERS` -> `evaluation.workers`
/// - `ALIGNBENCH_DECODER` -> `evaluation.decoder`
/// - `ALIGNBENCH_TARGET_SUBJECTS` -> `sweep.target_subjects` (comma separated)
/// - `ALIGNBENCH_METHODS` -> `sweep.methods` (comma separated)
/// - `ALIGNBENCH_N_PIECES` -> `pairwise.n_pieces`
/// - `ALIGNBENCH_SRM_COMPONENTS` -> `srm.n_components`
/// - `ALIGNBENCH_LOG_LEVEL` -> `logging.level`
/// - `ALIGNBENCH_LOG_DIR` -> `logging.log_dir`
pub fn apply_environment_overrides(config: &mut BenchmarkConfig) -> ConfigResult<()> {
    let lookup: HashMap<String, String> = [
        ("ALIGNBENCH_WORKERS", "workers"),
        ("ALIGNBENCH_DECODER", "decoder"),
        ("ALIGNBENCH_TARGET_SUBJECTS", "target_subjects"),
        ("ALIGNBENCH_METHODS", "methods"),
        ("ALIGNBENCH_N_PIECES", "n_pieces"),
        ("ALIGNBENCH_SRM_COMPONENTS", "srm_components"),
        ("ALIGNBENCH_LOG_LEVEL", "log_level"),
        ("ALIGNBENCH_LOG_DIR", "log_dir"),
    ]
    .into_iter()
    .filter_map(|(var, key)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();

    apply_cli_overrides(config, &lookup)
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Key/value overrides (e.g., `{"workers": "4", "methods": "identity,srm"}`)
///
/// Recognized keys: `workers`, `decoder`, `compute_baseline`, `target_subjects`,
/// `methods`, `n_pieces`, `ridge_alpha`, `ot_epsilon`, `srm_components`,
/// `srm_iterations`, `seed`, `log_level`, `log_dir`. Unknown keys are ignored.
pub fn apply_cli_overrides(
    config: &mut BenchmarkConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("workers") {
        config.evaluation.workers = parse_value("workers", value)?;
    }
    if let Some(value) = cli_args.get("decoder") {
        config.evaluation.decoder = value.trim().to_string();
    }
    if let Some(value) = cli_args.get("compute_baseline") {
        config.evaluation.compute_baseline = parse_flag(value);
    }
    if let Some(value) = cli_args.get("target_subjects") {
        config.sweep.target_subjects = split_list(value);
    }
    if let Some(value) = cli_args.get("methods") {
        config.sweep.methods = split_list(value);
    }
    if let Some(value) = cli_args.get("n_pieces") {
        config.pairwise.n_pieces = parse_value("n_pieces", value)?;
    }
    if let Some(value) = cli_args.get("ridge_alpha") {
        config.pairwise.ridge_alpha = parse_value("ridge_alpha", value)?;
    }
    if let Some(value) = cli_args.get("ot_epsilon") {
        config.pairwise.ot_epsilon = parse_value("ot_epsilon", value)?;
    }
    if let Some(value) = cli_args.get("srm_components") {
        config.srm.n_components = parse_value("srm_components", value)?;
    }
    if let Some(value) = cli_args.get("srm_iterations") {
        config.srm.n_iterations = parse_value("srm_iterations", value)?;
    }
    if let Some(value) = cli_args.get("seed") {
        config.srm.seed = parse_value("seed", value)?;
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.trim().to_string();
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = PathBuf::from(value);
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, value)))
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-alignbench-evaluation`, `--debug-alignbench-solvers`, etc.
//! to raise logging to `debug` per crate.

use std::collections::BTreeMap;
use std::env;

use crate::KNOWN_CRATES;

/// Debug flags parsed from command-line arguments
///
/// # Example
/// ```rust
/// use alignbench_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-alignbench-solvers".to_string()]);
/// assert!(flags.is_enabled("alignbench-solvers"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeMap<String, bool>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}` pattern.
    /// Also supports `--debug-all` to enable all crates.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }
            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }

        flags
    }

    /// Enable debug logging for one crate
    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string(), true);
    }

    /// Enable debug logging for every known crate
    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains_key(crate_name)
    }

    pub fn enabled_crates(&self) -> Vec<&String> {
        self.enabled_crates.keys().collect()
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` if enabled for the crate, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Filter string for `EnvFilter` with `info` as the default level
    pub fn to_filter_string(&self) -> String {
        self.to_filter_string_with_default("info")
    }

    /// Filter string for `EnvFilter`
    ///
    /// Format: `alignbench-solvers=debug,alignbench_solvers=debug,<default>`. Both
    /// spellings are emitted because explicit targets use the package name while
    /// module paths use the library name.
    pub fn to_filter_string_with_default(&self, default_level: &str) -> String {
        let mut filters = Vec::new();
        for crate_name in self.enabled_crates.keys() {
            filters.push(format!("{}=debug", crate_name));
            let module_name = crate_name.replace('-', "_");
            if module_name != *crate_name {
                filters.push(format!("{}=debug", module_name));
            }
        }
        filters.push(default_level.to_string());
        filters.join(",")
    }

    /// Merge crate names from an `ALIGNBENCH_DEBUG`-style value
    ///
    /// `all` enables every known crate; otherwise the value is a comma-separated list.
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enable(crate_name);
            }
        }
    }
}

/// Parse debug flags from the process arguments and `ALIGNBENCH_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var("ALIGNBENCH_DEBUG") {
        flags.merge_env_value(&env_var);
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  ALIGNBENCH_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  ALIGNBENCH_DEBUG=all                               Enable debug for all crates

Examples:
  --debug-alignbench-evaluation
  --debug-alignbench-evaluation --debug-alignbench-solvers
  ALIGNBENCH_DEBUG=alignbench-evaluation,alignbench-solvers
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-alignbench-solvers".to_string()]);
        assert!(flags.is_enabled("alignbench-solvers"));
        assert!(!flags.is_enabled("alignbench-evaluation"));
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_filter_string_covers_both_spellings() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-alignbench-solvers".to_string()]);
        assert_eq!(
            flags.to_filter_string(),
            "alignbench-solvers=debug,alignbench_solvers=debug,info"
        );
        assert_eq!(CrateDebugFlags::default().to_filter_string_with_default("warn"), "warn");
    }

    #[test]
    fn test_env_value() {
        let mut flags = CrateDebugFlags::default();
        flags.merge_env_value("alignbench-config, alignbench-evaluation,");
        assert_eq!(flags.enabled_crates().len(), 2);

        let mut all = CrateDebugFlags::default();
        all.merge_env_value("all");
        assert_eq!(all.enabled_crates().len(), KNOWN_CRATES.len());
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-alignbench-evaluation".to_string()]);
        assert_eq!(flags.log_level("alignbench-evaluation"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("alignbench-solvers"), tracing::Level::INFO);
    }
}

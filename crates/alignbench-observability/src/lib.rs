// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # alignbench-observability
//!
//! Logging infrastructure shared by the alignbench crates, with per-crate
//! debug flag support.
//!
//! Every crate logs through `tracing` with its package name as the target
//! (e.g. `target: "alignbench-evaluation"`). This crate decides where those
//! events go: the console, one JSON file per crate, and a combined JSON file.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known alignbench crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "alignbench-config",
    "alignbench-structures",
    "alignbench-solvers",
    "alignbench-evaluation",
];

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # alignbench - Cross-Subject Functional Alignment Benchmark
//!
//! Measures how well a classifier trained on some subjects' brain volumes
//! transfers to held-out subjects once every subject has been aligned onto a
//! target subject (or onto a shared space).
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! alignbench = "0.1"
//! ```
//!
//! ```rust,no_run
//! use alignbench::prelude::*;
//! # fn provider() -> InMemoryDataProvider { unimplemented!() }
//!
//! let config = load_config(None, None)?;
//! let options = EvaluationOptions::from_config(&config)?;
//! let runs = sweep_from_config(&config)?;
//!
//! for outcome in run_sweep(&runs, &provider(), &options)? {
//!     println!("{}", outcome.to_json());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: alignbench-structures, alignbench-config   │
//! │  (Subjects, tables, volumes, masks, errors, TOML)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: alignbench-observability               │
//! │  (tracing subscribers, per-crate debug flags)           │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: alignbench-solvers                         │
//! │  (Identity, pairwise alignment, shared response model)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Evaluation: alignbench-evaluation                      │
//! │  (Objective evaluator, LOGO cross-validation, metrics)  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use alignbench_config as config;
pub use alignbench_structures as structures;

// Re-export infrastructure
pub use alignbench_observability as observability;

// Re-export algorithms
pub use alignbench_evaluation as evaluation;
pub use alignbench_solvers as solvers;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::structures::{
        AlignBenchError, AlignBenchResult, AlignmentTable, BinaryMask, DataProvider,
        InMemoryDataProvider, InMemoryVolumeStore, Label, Mask, ProjectedTable, Subject, Volume,
        VolumeLoader,
    };

    pub use crate::solvers::{
        AlignmentEstimator, AlignmentRequest, AlignmentSolver, EstimatorBundle, OutputSpace,
        PairwiseMethod, PairwiseParams, SolverSpec, SrmParams,
    };

    pub use crate::evaluation::{
        run_once, run_sweep, sweep_from_config, DecoderSpec, EvaluationOptions, EvaluationStage,
        Metrics, ObjectiveEvaluator, RunConfig, RunOutcome,
    };

    pub use crate::config::{load_config, validate_config, BenchmarkConfig};
}

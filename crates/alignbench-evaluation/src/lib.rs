// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # alignbench Evaluation
//!
//! The objective evaluator: partitions subjects into target and sources,
//! hands an alignment request to a solver, projects held-out volumes through
//! the fitted estimators and scores a decoder with leave-one-subject-out
//! cross-validation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use alignbench_evaluation::{run_once, EvaluationOptions, RunConfig};
//! use alignbench_solvers::SolverSpec;
//! # fn provider() -> alignbench_structures::InMemoryDataProvider { unimplemented!() }
//!
//! let config = RunConfig::new("sub-08", SolverSpec::Identity);
//! let outcome = run_once(&config, &provider(), &EvaluationOptions::default())
//!     .expect("evaluation failed");
//! println!("accuracy: {}", outcome.metrics.value);
//! ```
//!
//! Folds run on a bounded rayon pool (`EvaluationOptions::workers`). Scores are
//! merged by subject id, so one worker and N workers report identical numbers.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cross_validation;
pub mod decoder;
pub mod design;
pub mod metrics;
pub mod objective;
pub mod runner;

pub use cross_validation::{Fold, FoldRunner, LeaveOneGroupOut};
pub use decoder::{accuracy, Decoder, DecoderKind, DecoderSpec, LogisticRegression, NearestCentroid};
pub use design::DesignMatrix;
pub use metrics::{aggregate, voxelwise_correlation, DecodingScore, Metrics};
pub use objective::{EvaluationOptions, EvaluationStage, ObjectiveEvaluator};
pub use runner::{run_once, run_sweep, sweep_from_config, RunConfig, RunOutcome};

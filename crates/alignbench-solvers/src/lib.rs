// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # alignbench Solvers
//!
//! Alignment estimators and the solver façade that fits them.
//!
//! | Variant | Fit | Transform |
//! |---|---|---|
//! | [`IdentityAlignment`] | records source and target only | input unchanged |
//! | [`PairwiseAlignment`] | once per source subject, against the target | into target space |
//! | [`SharedResponseModel`] | once over all source subjects | into the shared latent space |
//!
//! Every variant reaches the evaluator as an [`EstimatorBundle`].
//! Factorizations go through `faer` in [`linalg`]; the Sinkhorn solver lives
//! in [`transport`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod estimator;
pub mod identity;
pub mod linalg;
pub mod pairwise;
pub mod parcellation;
pub mod solver;
pub mod srm;
pub mod transport;

pub use estimator::{AlignmentEstimator, EstimatorBundle, OutputSpace};
pub use identity::IdentityAlignment;
pub use pairwise::{PairwiseAlignment, PairwiseMethod, PairwiseParams};
pub use parcellation::Parcellation;
pub use solver::{AlignmentRequest, AlignmentSolver, SolverSpec};
pub use srm::{SharedResponseModel, SrmParams};

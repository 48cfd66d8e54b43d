// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # alignbench Data Model
//!
//! The most core library of the workspace. Defines the data handed between the
//! data provider, the alignment solvers and the objective evaluator:
//! - **Subjects**: opaque subject identifiers and condition labels
//! - **Tables**: the alignment table (subject → training volume) and the
//!   projected table (subject → test volume → condition)
//! - **Volumes**: 4-D arrays (x, y, z, frames)
//! - **Masks**: fixed transforms from a volume to a feature matrix
//! - **Providers**: capabilities that load volumes and expose the tables
//! - **Errors**: the error taxonomy shared by every crate
//!
//! No volume file format is parsed here. Loading is delegated to whatever
//! implements [`VolumeLoader`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod error;
pub mod mask;
pub mod provider;
pub mod subject;
pub mod tables;
pub mod volume;

pub use error::{AlignBenchError, AlignBenchResult};
pub use mask::{BinaryMask, Mask};
pub use provider::{DataProvider, InMemoryDataProvider, InMemoryVolumeStore, VolumeLoader};
pub use subject::{Label, Subject};
pub use tables::{AlignmentRecord, AlignmentTable, ProjectedRecord, ProjectedTable};
pub use volume::Volume;

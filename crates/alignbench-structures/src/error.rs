// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Error taxonomy shared by the data model, the solvers and the evaluator.

Every variant is terminal for an evaluation run. Nothing here is retried or
recovered locally: a failed run reports no metric at all.
*/

use crate::subject::Subject;
use std::fmt::Display;
use thiserror::Error;

/// Errors that can occur anywhere in an alignment benchmark run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignBenchError {
    /// Partitioning left no source subjects (fatal, raised before any fitting)
    #[error("Empty source set: no source subjects remain for target '{target}'")]
    EmptySourceSet { target: Subject },

    /// An alignment estimator could not be fit
    #[error("Estimator fit failure [{method}]{}: {reason}", describe_subject(.subject))]
    EstimatorFitFailure {
        subject: Option<Subject>,
        method: String,
        reason: String,
    },

    /// A cross-validation fold has no rows on its train or test side
    #[error("Fold imbalance for held-out subject '{subject}': {train_rows} train rows, {test_rows} test rows")]
    FoldImbalance {
        subject: Subject,
        train_rows: usize,
        test_rows: usize,
    },

    /// Array sizes disagree (feature rows vs labels, volume vs mask, ...)
    #[error("Data shape mismatch during {stage}: expected {expected}, got {actual}")]
    DataShapeMismatch {
        stage: String,
        expected: String,
        actual: String,
    },

    #[error("Empty table: {0}")]
    EmptyTable(String),

    #[error("Missing volume: {0}")]
    MissingVolume(String),

    #[error("Unknown subject: {0}")]
    UnknownSubject(Subject),

    /// Operation called out of order on a stateful component
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

fn describe_subject(subject: &Option<Subject>) -> String {
    match subject {
        Some(subject) => format!(" for subject '{}'", subject),
        None => String::new(),
    }
}

impl AlignBenchError {
    /// Build an [`AlignBenchError::EstimatorFitFailure`]
    pub fn fit_failure(
        subject: Option<&Subject>,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AlignBenchError::EstimatorFitFailure {
            subject: subject.cloned(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`AlignBenchError::DataShapeMismatch`]
    pub fn shape_mismatch(
        stage: impl Into<String>,
        expected: impl Display,
        actual: impl Display,
    ) -> Self {
        AlignBenchError::DataShapeMismatch {
            stage: stage.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Attach a subject to a fit failure that was raised without one.
    ///
    /// Other variants are returned unchanged.
    pub fn with_subject(self, subject: &Subject) -> Self {
        match self {
            AlignBenchError::EstimatorFitFailure {
                subject: None,
                method,
                reason,
            } => AlignBenchError::EstimatorFitFailure {
                subject: Some(subject.clone()),
                method,
                reason,
            },
            other => other,
        }
    }
}

/// Result type for alignbench operations
pub type AlignBenchResult<T> = Result<T, AlignBenchError>;

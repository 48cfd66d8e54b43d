// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stateless run functions over an upfront list of run configurations

use crate::metrics::Metrics;
use crate::objective::{EvaluationOptions, ObjectiveEvaluator};
use alignbench_config::BenchmarkConfig;
use alignbench_solvers::{AlignmentSolver, PairwiseParams, SolverSpec, SrmParams};
use alignbench_structures::{AlignBenchResult, DataProvider, Subject};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// One (target subject, method) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub target_subject: Subject,
    pub solver: SolverSpec,
}

impl RunConfig {
    pub fn new(target_subject: impl Into<Subject>, solver: SolverSpec) -> Self {
        RunConfig {
            target_subject: target_subject.into(),
            solver,
        }
    }
}

/// Metrics of one completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub config: RunConfig,
    pub metrics: Metrics,
    pub source_subjects: Vec<Subject>,
    /// Estimator fits the solver performed
    pub fit_calls: usize,
    pub elapsed_ms: u64,
}

impl RunOutcome {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "target_subject": self.config.target_subject,
            "method": self.config.solver.name(),
            "source_subjects": self.source_subjects,
            "fit_calls": self.fit_calls,
            "elapsed_ms": self.elapsed_ms,
            "metrics": self.metrics.to_json(),
        })
    }
}

/// Run one full evaluation pass for `config`
pub fn run_once(
    config: &RunConfig,
    provider: &dyn DataProvider,
    options: &EvaluationOptions,
) -> AlignBenchResult<RunOutcome> {
    let started = Instant::now();
    info!(
        target: "alignbench-evaluation",
        target_subject = %config.target_subject,
        method = %config.solver,
        "Starting run"
    );

    let mut evaluator = ObjectiveEvaluator::new(options.clone());
    evaluator.set_data_from(provider)?;
    let source_subjects = evaluator.partition(&config.target_subject)?.to_vec();

    let solver = AlignmentSolver::new(config.solver.clone());
    let bundle = evaluator.fit_estimators(&solver)?;
    let metrics = evaluator.compute(&bundle)?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        target: "alignbench-evaluation",
        target_subject = %config.target_subject,
        method = %config.solver,
        value = metrics.value,
        elapsed_ms,
        "Run complete"
    );

    Ok(RunOutcome {
        config: config.clone(),
        metrics,
        source_subjects,
        fit_calls: solver.fit_calls(),
        elapsed_ms,
    })
}

/// Run every configuration in order; the first failure aborts the sweep
pub fn run_sweep(
    configs: &[RunConfig],
    provider: &dyn DataProvider,
    options: &EvaluationOptions,
) -> AlignBenchResult<Vec<RunOutcome>> {
    configs
        .iter()
        .map(|config| run_once(config, provider, options))
        .collect()
}

/// Enumerate target subjects × methods from the `[sweep]` section, targets outermost
pub fn sweep_from_config(config: &BenchmarkConfig) -> AlignBenchResult<Vec<RunConfig>> {
    let pairwise = PairwiseParams {
        n_pieces: config.pairwise.n_pieces,
        ridge_alpha: config.pairwise.ridge_alpha,
        ot_epsilon: config.pairwise.ot_epsilon,
        ot_iterations: config.pairwise.ot_iterations,
    };
    let srm = SrmParams {
        n_components: config.srm.n_components,
        n_iterations: config.srm.n_iterations,
        seed: config.srm.seed,
    };

    let mut runs = Vec::with_capacity(config.sweep.target_subjects.len() * config.sweep.methods.len());
    for target in &config.sweep.target_subjects {
        for method in &config.sweep.methods {
            let solver = SolverSpec::from_method_name(method, &pairwise, &srm)?;
            runs.push(RunConfig::new(target.as_str(), solver));
        }
    }
    Ok(runs)
}

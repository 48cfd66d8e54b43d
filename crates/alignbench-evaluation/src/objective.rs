// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Objective Evaluator

Drives one evaluation pass for one target subject:

1. **set_data**: store the alignment table, projected table, mask and loader
2. **partition**: source subjects = alignment-table subjects minus the target
3. **build_request**: vectorize alignment volumes into an [`AlignmentRequest`]
4. **fit_estimators** (or an external `AlignmentSolver::fit`): get an [`EstimatorBundle`]
5. **compute**: project held-out volumes, run leave-one-subject-out decoding,
   aggregate into [`Metrics`]

Stages only move forward. Any error moves the evaluator to
[`EvaluationStage::Failed`], after which every operation is rejected and no
metric can be read.
*/

use crate::cross_validation::FoldRunner;
use crate::decoder::DecoderSpec;
use crate::design::DesignMatrix;
use crate::metrics::{voxelwise_correlation, DecodingScore, Metrics};
use alignbench_config::BenchmarkConfig;
use alignbench_solvers::{AlignmentRequest, AlignmentSolver, EstimatorBundle, OutputSpace};
use alignbench_structures::{
    AlignBenchError, AlignBenchResult, AlignmentTable, DataProvider, Label, Mask, ProjectedTable,
    Subject, VolumeLoader,
};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Evaluation stage tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationStage {
    /// Nothing loaded yet
    Created,
    /// Tables and mask stored
    DataLoaded,
    /// Source subjects chosen for the target
    Partitioned,
    /// Estimators fitted through this evaluator
    EstimatorsFit,
    /// Held-out volumes projected through the estimators
    FeaturesProjected,
    /// Every fold scored
    CrossValidated,
    /// Metrics available
    Aggregated,
    /// A transition failed; terminal
    Failed,
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Knobs of the compute step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    /// Worker threads for the fold loop
    pub workers: usize,
    pub decoder: DecoderSpec,
    /// Also decode unaligned features for comparison
    pub compute_baseline: bool,
    /// Correlate aligned source training data with the target (target-space estimators only)
    pub compute_alignment_correlation: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        EvaluationOptions {
            workers: 1,
            decoder: DecoderSpec::default(),
            compute_baseline: true,
            compute_alignment_correlation: true,
        }
    }
}

impl EvaluationOptions {
    /// Map the `[evaluation]` and `[decoder]` sections
    pub fn from_config(config: &BenchmarkConfig) -> AlignBenchResult<Self> {
        Ok(EvaluationOptions {
            workers: config.evaluation.workers,
            decoder: DecoderSpec::from_config(&config.evaluation.decoder, &config.decoder)?,
            compute_baseline: config.evaluation.compute_baseline,
            compute_alignment_correlation: config.evaluation.compute_alignment_correlation,
        })
    }
}

struct LoadedData {
    alignment: AlignmentTable,
    projected: ProjectedTable,
    mask: Arc<dyn Mask>,
    loader: Arc<dyn VolumeLoader>,
}

struct Partition {
    target: Subject,
    sources: Vec<Subject>,
}

/// Raw and aligned rows of the projected table, source subjects only
struct Projection {
    raw: DesignMatrix,
    aligned: DesignMatrix,
}

/// Orchestrates partitioning, fitting, projection and cross-validated decoding
pub struct ObjectiveEvaluator {
    stage: EvaluationStage,
    options: EvaluationOptions,
    data: Option<LoadedData>,
    partition: Option<Partition>,
    request: Option<AlignmentRequest>,
    scores: Vec<DecodingScore>,
    metrics: Option<Metrics>,
}

impl ObjectiveEvaluator {
    pub fn new(options: EvaluationOptions) -> Self {
        ObjectiveEvaluator {
            stage: EvaluationStage::Created,
            options,
            data: None,
            partition: None,
            request: None,
            scores: Vec::new(),
            metrics: None,
        }
    }

    pub fn stage(&self) -> EvaluationStage {
        self.stage
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn target_subject(&self) -> Option<&Subject> {
        self.partition.as_ref().map(|p| &p.target)
    }

    /// Source subjects in identifier order (empty before partitioning)
    pub fn source_subjects(&self) -> &[Subject] {
        self.partition.as_ref().map(|p| p.sources.as_slice()).unwrap_or(&[])
    }

    /// Per-subject scores in subject order, once cross-validated
    pub fn scores(&self) -> &[DecodingScore] {
        &self.scores
    }

    /// Metrics of a completed pass
    pub fn metrics(&self) -> Option<&Metrics> {
        match self.stage {
            EvaluationStage::Aggregated => self.metrics.as_ref(),
            _ => None,
        }
    }

    /// Store tables and mask. Both tables must be non-empty and the alignment
    /// table must list each subject once.
    pub fn set_data(
        &mut self,
        alignment: AlignmentTable,
        projected: ProjectedTable,
        mask: Arc<dyn Mask>,
        loader: Arc<dyn VolumeLoader>,
    ) -> AlignBenchResult<()> {
        self.expect_stage(&[EvaluationStage::Created])?;
        let result = if alignment.is_empty() {
            Err(AlignBenchError::EmptyTable("alignment table".to_string()))
        } else if projected.is_empty() {
            Err(AlignBenchError::EmptyTable("projected table".to_string()))
        } else {
            alignment.check_unique_subjects()
        };
        self.guard(result)?;

        info!(
            target: "alignbench-evaluation",
            "Data loaded: {} alignment record(s), {} projected record(s), {} features",
            alignment.len(),
            projected.len(),
            mask.n_features()
        );
        self.data = Some(LoadedData {
            alignment,
            projected,
            mask,
            loader,
        });
        self.stage = EvaluationStage::DataLoaded;
        Ok(())
    }

    /// [`ObjectiveEvaluator::set_data`] from a provider's tables, mask and loader
    pub fn set_data_from(&mut self, provider: &dyn DataProvider) -> AlignBenchResult<()> {
        self.set_data(
            provider.alignment_table().clone(),
            provider.projected_table().clone(),
            provider.mask(),
            provider.loader(),
        )
    }

    /// Choose the source subjects for `target`.
    ///
    /// Fails with `EmptySourceSet` if the target is not in the alignment table
    /// or no other subject is.
    pub fn partition(&mut self, target: &Subject) -> AlignBenchResult<&[Subject]> {
        self.expect_stage(&[EvaluationStage::DataLoaded])?;
        let data = self.loaded()?;

        let universe = data.alignment.subjects();
        let result = if !universe.contains(target) {
            warn!(
                target: "alignbench-evaluation",
                "Target subject {} is not in the alignment table",
                target
            );
            Err(AlignBenchError::EmptySourceSet {
                target: target.clone(),
            })
        } else {
            let sources: Vec<Subject> = universe.into_iter().filter(|s| s != target).collect();
            if sources.is_empty() {
                Err(AlignBenchError::EmptySourceSet {
                    target: target.clone(),
                })
            } else {
                Ok(sources)
            }
        };
        let sources = self.guard(result)?;

        info!(
            target: "alignbench-evaluation",
            target_subject = %target,
            n_sources = sources.len(),
            "Partitioned subjects"
        );
        self.partition = Some(Partition {
            target: target.clone(),
            sources,
        });
        self.stage = EvaluationStage::Partitioned;
        Ok(self.source_subjects())
    }

    /// Vectorized alignment data of every source subject and of the target
    pub fn build_request(&mut self) -> AlignBenchResult<AlignmentRequest> {
        self.expect_stage(&[EvaluationStage::Partitioned])?;
        let result = self.load_request();
        let request = self.guard(result)?;
        self.request = Some(request.clone());
        Ok(request)
    }

    /// Build the request, fit it with `solver`, and advance to `EstimatorsFit`
    pub fn fit_estimators(&mut self, solver: &AlignmentSolver) -> AlignBenchResult<EstimatorBundle> {
        let request = self.build_request()?;
        let started = Instant::now();
        let result = solver.fit(&request);
        let bundle = self.guard(result)?;

        info!(
            target: "alignbench-evaluation",
            method = %solver.spec(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Estimators fit"
        );
        self.stage = EvaluationStage::EstimatorsFit;
        Ok(bundle)
    }

    /// Project, cross-validate and aggregate
    pub fn compute(&mut self, estimators: &EstimatorBundle) -> AlignBenchResult<Metrics> {
        self.expect_stage(&[EvaluationStage::Partitioned, EvaluationStage::EstimatorsFit])?;
        let result = self.run_compute(estimators);
        self.guard(result)
    }

    fn run_compute(&mut self, estimators: &EstimatorBundle) -> AlignBenchResult<Metrics> {
        for subject in self.source_subjects() {
            if !estimators.contains(subject) {
                return Err(AlignBenchError::fit_failure(
                    Some(subject),
                    "bundle",
                    "no fitted estimator for source subject",
                ));
            }
        }

        let projection = self.project(estimators)?;
        self.stage = EvaluationStage::FeaturesProjected;
        info!(
            target: "alignbench-evaluation",
            n_rows = projection.aligned.n_rows(),
            n_features = projection.aligned.n_features(),
            "Features projected"
        );

        let runner = FoldRunner::new(self.options.workers)?;
        let scores = runner.run(&projection.aligned, &self.options.decoder)?;
        self.stage = EvaluationStage::CrossValidated;
        info!(
            target: "alignbench-evaluation",
            n_folds = scores.len(),
            workers = runner.workers(),
            "Cross-validation complete"
        );

        let mut metrics = Metrics::from_scores(&scores, projection.aligned.n_rows())?;

        if self.options.compute_baseline {
            let baseline = runner.run(&projection.raw, &self.options.decoder)?;
            let baseline_metrics = Metrics::from_scores(&baseline, projection.raw.n_rows())?;
            metrics.baseline_score = Some(baseline_metrics.value);
            metrics.baseline_subject_scores = Some(baseline_metrics.subject_scores);
        }

        if self.options.compute_alignment_correlation {
            metrics.alignment_correlation = self.alignment_correlation(estimators)?;
        }

        info!(
            target: "alignbench-evaluation",
            value = metrics.value,
            baseline = ?metrics.baseline_score,
            "Aggregated"
        );
        self.scores = scores;
        self.metrics = Some(metrics.clone());
        self.stage = EvaluationStage::Aggregated;
        Ok(metrics)
    }

    /// Vectorize and transform every projected row of every source subject
    fn project(&self, estimators: &EstimatorBundle) -> AlignBenchResult<Projection> {
        let data = self.loaded()?;

        let mut raw_blocks = Vec::new();
        let mut aligned_blocks = Vec::new();
        let mut labels: Vec<Label> = Vec::new();
        let mut groups: Vec<Subject> = Vec::new();

        for subject in self.source_subjects() {
            let mut subject_blocks = Vec::new();
            for record in data.projected.rows_for(subject) {
                let volume = data.loader.load(&record.volume_path)?;
                let rows = data.mask.vectorize(&volume)?;
                labels.extend(std::iter::repeat(record.condition.clone()).take(rows.nrows()));
                groups.extend(std::iter::repeat(subject.clone()).take(rows.nrows()));
                subject_blocks.push(rows);
            }
            if subject_blocks.is_empty() {
                debug!(
                    target: "alignbench-evaluation",
                    "No projected rows for source subject {}",
                    subject
                );
                continue;
            }

            let raw = stack_rows(&subject_blocks, &format!("projected rows of subject '{}'", subject))?;
            let aligned = estimators.get(subject)?.transform(subject, raw.view())?;
            if aligned.nrows() != raw.nrows() {
                return Err(AlignBenchError::shape_mismatch(
                    format!("transform of subject '{}'", subject),
                    format!("{} rows", raw.nrows()),
                    format!("{} rows", aligned.nrows()),
                ));
            }
            debug!(
                target: "alignbench-evaluation",
                subject = %subject,
                n_rows = raw.nrows(),
                "Projected held-out volumes"
            );
            raw_blocks.push(raw);
            aligned_blocks.push(aligned);
        }

        if raw_blocks.is_empty() {
            return Err(AlignBenchError::EmptyTable(
                "projected rows for source subjects".to_string(),
            ));
        }

        let raw = stack_rows(&raw_blocks, "raw projected features")?;
        let aligned = stack_rows(&aligned_blocks, "aligned projected features")?;
        Ok(Projection {
            raw: DesignMatrix::new(raw, labels.clone(), groups.clone())?,
            aligned: DesignMatrix::new(aligned, labels, groups)?,
        })
    }

    /// Mean voxelwise correlation of aligned source training data with the target's
    fn alignment_correlation(&self, estimators: &EstimatorBundle) -> AlignBenchResult<Option<f64>> {
        let in_target_space = estimators
            .iter()
            .all(|(_, estimator)| estimator.output_space() == OutputSpace::Target);
        if !in_target_space {
            return Ok(None);
        }

        let request = match &self.request {
            Some(request) => request.clone(),
            None => self.load_request()?,
        };

        let mut total = 0.0;
        for (subject, source) in request.sources() {
            let aligned = estimators.get(subject)?.transform(subject, source.view())?;
            total += voxelwise_correlation(aligned.view(), request.target_data().view())?;
        }
        Ok(Some(total / request.source_subjects().len() as f64))
    }

    fn load_request(&self) -> AlignBenchResult<AlignmentRequest> {
        let data = self.loaded()?;
        let partition = self.partition.as_ref().ok_or_else(|| AlignBenchError::InvalidState {
            expected: EvaluationStage::Partitioned.to_string(),
            actual: self.stage.to_string(),
        })?;

        let vectorize = |subject: &Subject| -> AlignBenchResult<Arc<Array2<f64>>> {
            let path = data.alignment.volume_path(subject)?;
            let volume = data.loader.load(path)?;
            Ok(Arc::new(data.mask.vectorize(&volume)?))
        };

        let target_data = vectorize(&partition.target)?;
        let source_data = partition
            .sources
            .iter()
            .map(|subject| vectorize(subject))
            .collect::<AlignBenchResult<Vec<_>>>()?;

        debug!(
            target: "alignbench-evaluation",
            "Built alignment request: {} source(s), {} sample(s) x {} feature(s) per subject",
            source_data.len(),
            target_data.nrows(),
            target_data.ncols()
        );

        AlignmentRequest::new(
            partition.target.clone(),
            partition.sources.clone(),
            source_data,
            target_data,
            Arc::clone(&data.mask),
        )
    }

    fn loaded(&self) -> AlignBenchResult<&LoadedData> {
        self.data.as_ref().ok_or_else(|| AlignBenchError::InvalidState {
            expected: EvaluationStage::DataLoaded.to_string(),
            actual: self.stage.to_string(),
        })
    }

    fn expect_stage(&self, allowed: &[EvaluationStage]) -> AlignBenchResult<()> {
        if allowed.contains(&self.stage) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(|stage| stage.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(AlignBenchError::InvalidState {
            expected,
            actual: self.stage.to_string(),
        })
    }

    /// Move to `Failed` on error
    fn guard<T>(&mut self, result: AlignBenchResult<T>) -> AlignBenchResult<T> {
        if let Err(e) = &result {
            warn!(
                target: "alignbench-evaluation",
                "Evaluation failed at stage {}: {}",
                self.stage,
                e
            );
            self.stage = EvaluationStage::Failed;
            self.metrics = None;
        }
        result
    }
}

impl fmt::Debug for ObjectiveEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectiveEvaluator")
            .field("stage", &self.stage)
            .field("target", &self.target_subject())
            .field("sources", &self.source_subjects())
            .field("options", &self.options)
            .finish()
    }
}

fn stack_rows(blocks: &[Array2<f64>], stage: &str) -> AlignBenchResult<Array2<f64>> {
    let width = blocks.first().map(|b| b.ncols()).unwrap_or(0);
    if let Some(bad) = blocks.iter().find(|b| b.ncols() != width) {
        return Err(AlignBenchError::shape_mismatch(
            stage,
            format!("{} features", width),
            format!("{} features", bad.ncols()),
        ));
    }
    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| AlignBenchError::shape_mismatch(stage, "stackable blocks", e))
}

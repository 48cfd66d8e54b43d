// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-fold scores, their aggregate, and the metrics report handed to reporting

use alignbench_structures::{AlignBenchError, AlignBenchResult, Subject};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accuracy on one held-out subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodingScore {
    pub subject: Subject,
    pub accuracy: f64,
    pub n_train: usize,
    pub n_test: usize,
}

/// Mean accuracy and per-subject accuracies.
///
/// Scores are merged in subject order before summing, so the mean does not
/// depend on the order folds finished in. Duplicate subjects are rejected.
pub fn aggregate(scores: &[DecodingScore]) -> AlignBenchResult<(f64, BTreeMap<Subject, f64>)> {
    if scores.is_empty() {
        return Err(AlignBenchError::EmptyTable("decoding scores".to_string()));
    }

    let mut by_subject = BTreeMap::new();
    for score in scores {
        if by_subject.insert(score.subject.clone(), score.accuracy).is_some() {
            return Err(AlignBenchError::InvalidParameter(format!(
                "subject '{}' was scored twice",
                score.subject
            )));
        }
    }

    let total: f64 = by_subject.values().sum();
    Ok((total / by_subject.len() as f64, by_subject))
}

/// Mean over features of the Pearson correlation between matching columns.
///
/// Columns where either side has zero variance contribute 0.
pub fn voxelwise_correlation(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> AlignBenchResult<f64> {
    if a.dim() != b.dim() {
        return Err(AlignBenchError::shape_mismatch(
            "voxelwise correlation",
            format!("{:?}", b.dim()),
            format!("{:?}", a.dim()),
        ));
    }
    let (n, p) = a.dim();
    if n == 0 || p == 0 {
        return Err(AlignBenchError::EmptyTable("correlation samples".to_string()));
    }

    let total: f64 = a
        .columns()
        .into_iter()
        .zip(b.columns())
        .map(|(x, y)| {
            let mx = x.sum() / n as f64;
            let my = y.sum() / n as f64;
            let mut sxy = 0.0;
            let mut sxx = 0.0;
            let mut syy = 0.0;
            for (xi, yi) in x.iter().zip(y.iter()) {
                let dx = xi - mx;
                let dy = yi - my;
                sxy += dx * dy;
                sxx += dx * dx;
                syy += dy * dy;
            }
            if sxx <= 0.0 || syy <= 0.0 {
                0.0
            } else {
                sxy / (sxx.sqrt() * syy.sqrt())
            }
        })
        .sum();
    Ok(total / p as f64)
}

/// Result of one evaluation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Primary metric: mean decoding accuracy over held-out subjects
    pub value: f64,
    pub subject_scores: BTreeMap<Subject, f64>,
    /// Same protocol on unaligned features
    pub baseline_score: Option<f64>,
    pub baseline_subject_scores: Option<BTreeMap<Subject, f64>>,
    /// Mean voxelwise correlation between aligned source and target training data
    pub alignment_correlation: Option<f64>,
    pub n_folds: usize,
    pub n_rows: usize,
}

impl Metrics {
    pub fn from_scores(scores: &[DecodingScore], n_rows: usize) -> AlignBenchResult<Self> {
        let (value, subject_scores) = aggregate(scores)?;
        Ok(Metrics {
            value,
            n_folds: subject_scores.len(),
            subject_scores,
            baseline_score: None,
            baseline_subject_scores: None,
            alignment_correlation: None,
            n_rows,
        })
    }

    /// Aligned minus baseline accuracy, when a baseline was computed
    pub fn improvement(&self) -> Option<f64> {
        self.baseline_score.map(|baseline| self.value - baseline)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "value": self.value,
            "subject_scores": self.subject_scores,
            "baseline_score": self.baseline_score,
            "baseline_subject_scores": self.baseline_subject_scores,
            "alignment_correlation": self.alignment_correlation,
            "n_folds": self.n_folds,
            "n_rows": self.n_rows,
        })
    }

    /// Flat name → value map: `value`, optional auxiliary metrics, then one entry per subject
    pub fn to_report(&self) -> BTreeMap<String, f64> {
        let mut report = BTreeMap::new();
        report.insert("value".to_string(), self.value);
        if let Some(baseline) = self.baseline_score {
            report.insert("baseline_score".to_string(), baseline);
        }
        if let Some(correlation) = self.alignment_correlation {
            report.insert("alignment_correlation".to_string(), correlation);
        }
        for (subject, score) in &self.subject_scores {
            report.insert(format!("score_{}", subject), *score);
        }
        report
    }
}

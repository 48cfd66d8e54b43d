// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Design matrix shared read-only by every cross-validation fold

use alignbench_structures::{AlignBenchError, AlignBenchResult, Label, Subject};
use ndarray::{Array2, Axis};
use std::collections::BTreeSet;

/// Features with one condition label and one originating subject per row
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    features: Array2<f64>,
    labels: Vec<Label>,
    groups: Vec<Subject>,
}

impl DesignMatrix {
    /// Fails with `DataShapeMismatch` unless rows, labels and groups have equal length
    pub fn new(features: Array2<f64>, labels: Vec<Label>, groups: Vec<Subject>) -> AlignBenchResult<Self> {
        if labels.len() != features.nrows() {
            return Err(AlignBenchError::shape_mismatch(
                "design matrix labels",
                format!("{} rows", features.nrows()),
                format!("{} labels", labels.len()),
            ));
        }
        if groups.len() != features.nrows() {
            return Err(AlignBenchError::shape_mismatch(
                "design matrix groups",
                format!("{} rows", features.nrows()),
                format!("{} group ids", groups.len()),
            ));
        }
        Ok(DesignMatrix {
            features,
            labels,
            groups,
        })
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn groups(&self) -> &[Subject] {
        &self.groups
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Distinct groups in identifier order
    pub fn subjects(&self) -> BTreeSet<Subject> {
        self.groups.iter().cloned().collect()
    }

    /// Features and labels of the given rows, in the given order
    pub fn select(&self, rows: &[usize]) -> (Array2<f64>, Vec<Label>) {
        let features = self.features.select(Axis(0), rows);
        let labels = rows.iter().map(|&row| self.labels[row].clone()).collect();
        (features, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_select_rows() {
        let design = DesignMatrix::new(
            array![[1.0], [2.0], [3.0]],
            vec!["0".into(), "1".into(), "0".into()],
            vec!["B".into(), "C".into(), "B".into()],
        )
        .unwrap();
        let (x, y) = design.select(&[2, 0]);
        assert_eq!(x, array![[3.0], [1.0]]);
        assert_eq!(y, vec!["0".to_string(), "0".to_string()]);
        assert_eq!(design.subjects().len(), 2);
    }

    #[test]
    fn test_length_mismatch() {
        let err = DesignMatrix::new(
            array![[1.0], [2.0]],
            vec!["0".into()],
            vec!["B".into(), "B".into()],
        )
        .unwrap_err();
        assert!(matches!(err, AlignBenchError::DataShapeMismatch { .. }));
    }
}

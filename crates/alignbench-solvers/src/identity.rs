// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity alignment: the no-alignment reference point

use crate::estimator::{AlignmentEstimator, OutputSpace};
use alignbench_structures::{AlignBenchError, AlignBenchResult, Subject};
use ndarray::{Array2, ArrayView2};

/// Returns its input unchanged. Source and target are kept for bookkeeping only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAlignment {
    source: Subject,
    target: Subject,
}

impl IdentityAlignment {
    /// Source and target alignment data must share one shape, as for every other method
    pub fn fit(
        source: &Subject,
        target: &Subject,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
    ) -> AlignBenchResult<Self> {
        if x.dim() != y.dim() {
            return Err(AlignBenchError::shape_mismatch(
                format!("identity fit ({} → {})", source, target),
                format!("{:?}", y.dim()),
                format!("{:?}", x.dim()),
            ));
        }
        Ok(IdentityAlignment {
            source: source.clone(),
            target: target.clone(),
        })
    }

    pub fn source(&self) -> &Subject {
        &self.source
    }

    pub fn target(&self) -> &Subject {
        &self.target
    }
}

impl AlignmentEstimator for IdentityAlignment {
    fn method(&self) -> &str {
        "identity"
    }

    fn output_space(&self) -> OutputSpace {
        OutputSpace::Target
    }

    fn transform(&self, subject: &Subject, data: ArrayView2<'_, f64>) -> AlignBenchResult<Array2<f64>> {
        if *subject != self.source {
            return Err(AlignBenchError::UnknownSubject(subject.clone()));
        }
        Ok(data.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_unequal_frame_counts_rejected() {
        let x = Array2::<f64>::zeros((4, 2));
        let y = Array2::<f64>::zeros((3, 2));
        let err = IdentityAlignment::fit(&Subject::from("B"), &Subject::from("A"), x.view(), y.view())
            .unwrap_err();
        assert!(matches!(err, AlignBenchError::DataShapeMismatch { .. }));
    }

    #[test]
    fn test_transform_only_for_source() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let fitted =
            IdentityAlignment::fit(&Subject::from("B"), &Subject::from("A"), x.view(), x.view()).unwrap();
        assert_eq!(fitted.transform(&Subject::from("B"), x.view()).unwrap(), x);
        assert_eq!(
            fitted.transform(&Subject::from("C"), x.view()).unwrap_err(),
            AlignBenchError::UnknownSubject(Subject::from("C"))
        );
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Partition of the feature axis into pieces fitted independently

use alignbench_structures::{AlignBenchError, AlignBenchResult};
use std::ops::Range;

/// Contiguous, balanced pieces covering `0..n_features` exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parcellation {
    n_features: usize,
    pieces: Vec<Range<usize>>,
}

impl Parcellation {
    /// Split `n_features` into `n_pieces` pieces whose sizes differ by at most one
    pub fn contiguous(n_features: usize, n_pieces: usize) -> AlignBenchResult<Self> {
        if n_pieces == 0 {
            return Err(AlignBenchError::InvalidParameter(
                "n_pieces must be at least 1".to_string(),
            ));
        }
        if n_pieces > n_features {
            return Err(AlignBenchError::InvalidParameter(format!(
                "n_pieces ({}) exceeds the number of features ({})",
                n_pieces, n_features
            )));
        }

        let pieces = (0..n_pieces)
            .map(|p| (p * n_features / n_pieces)..((p + 1) * n_features / n_pieces))
            .collect();
        Ok(Parcellation { n_features, pieces })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn pieces(&self) -> &[Range<usize>] {
        &self.pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pieces_cover_features_once() {
        let parcellation = Parcellation::contiguous(10, 3).unwrap();
        let pieces = parcellation.pieces();
        assert_eq!(pieces, &[0..3, 3..6, 6..10]);
    }

    #[test]
    fn test_single_piece() {
        let parcellation = Parcellation::contiguous(7, 1).unwrap();
        assert_eq!(parcellation.pieces(), &[0..7]);
    }

    #[test]
    fn test_invalid_piece_counts() {
        assert!(Parcellation::contiguous(5, 0).is_err());
        assert!(Parcellation::contiguous(5, 6).is_err());
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Masks reduce a volume to a flat feature matrix.

A mask is built once from a reference image and is read-only afterwards, so it
is shared behind an `Arc<dyn Mask>` by every stage of a run, including the
parallel cross-validation folds.
*/

use crate::error::{AlignBenchError, AlignBenchResult};
use crate::volume::Volume;
use ndarray::{Array2, Array3, Array4, ArrayView2};
use std::fmt;

/// Fixed transform from a volume to a feature matrix (one row per frame)
pub trait Mask: Send + Sync + fmt::Debug {
    /// Number of features (columns) produced by [`Mask::vectorize`]
    fn n_features(&self) -> usize;

    /// Vectorize every frame of `volume` into a row of features
    fn vectorize(&self, volume: &Volume) -> AlignBenchResult<Array2<f64>>;
}

/// Boolean voxel mask over a fixed spatial grid.
///
/// Voxels are enumerated in C order (x slowest, z fastest), which fixes the
/// feature ordering for every volume vectorized through this mask.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    shape: (usize, usize, usize),
    voxels: Vec<[usize; 3]>,
}

impl BinaryMask {
    /// Keep every voxel of `reference` whose value is strictly positive
    pub fn from_reference(reference: &Array3<f64>) -> AlignBenchResult<Self> {
        let dims = reference.dim();
        let voxels: Vec<[usize; 3]> = reference
            .indexed_iter()
            .filter(|(_, value)| **value > 0.0)
            .map(|((x, y, z), _)| [x, y, z])
            .collect();

        if voxels.is_empty() {
            return Err(AlignBenchError::InvalidParameter(
                "reference mask selects no voxels".to_string(),
            ));
        }

        tracing::debug!(
            shape = ?dims,
            voxels = voxels.len(),
            "Built binary mask from reference image"
        );

        Ok(BinaryMask {
            shape: dims,
            voxels,
        })
    }

    /// Mask selecting every voxel of a grid
    pub fn full(shape: (usize, usize, usize)) -> AlignBenchResult<Self> {
        Self::from_reference(&Array3::from_elem(shape, 1.0))
    }

    pub fn spatial_shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    /// Inverse of [`Mask::vectorize`]: scatter feature rows back onto the grid.
    ///
    /// Voxels outside the mask are zero.
    pub fn unmask(&self, features: ArrayView2<'_, f64>) -> AlignBenchResult<Volume> {
        if features.ncols() != self.voxels.len() {
            return Err(AlignBenchError::shape_mismatch(
                "unmask",
                format!("{} features", self.voxels.len()),
                format!("{} features", features.ncols()),
            ));
        }

        let (x, y, z) = self.shape;
        let mut data = Array4::<f64>::zeros((x, y, z, features.nrows()));
        for (column, [i, j, k]) in self.voxels.iter().enumerate() {
            for (frame, value) in features.column(column).iter().enumerate() {
                data[[*i, *j, *k, frame]] = *value;
            }
        }
        Ok(Volume::new(data))
    }
}

impl Mask for BinaryMask {
    fn n_features(&self) -> usize {
        self.voxels.len()
    }

    fn vectorize(&self, volume: &Volume) -> AlignBenchResult<Array2<f64>> {
        if volume.spatial_shape() != self.shape {
            return Err(AlignBenchError::shape_mismatch(
                "vectorize",
                format!("{:?}", self.shape),
                format!("{:?}", volume.spatial_shape()),
            ));
        }

        let data = volume.data();
        let mut features = Array2::<f64>::zeros((volume.n_frames(), self.voxels.len()));
        for (column, [i, j, k]) in self.voxels.iter().enumerate() {
            for frame in 0..volume.n_frames() {
                features[[frame, column]] = data[[*i, *j, *k, frame]];
            }
        }
        Ok(features)
    }
}

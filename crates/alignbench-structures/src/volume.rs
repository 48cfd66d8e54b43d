// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Volumetric samples

use ndarray::{Array3, Array4, ArrayView3, Axis};

/// A volumetric sample stored as (x, y, z, frames).
///
/// A single statistic map is a volume with one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array4<f64>,
}

impl Volume {
    pub fn new(data: Array4<f64>) -> Self {
        Volume { data }
    }

    /// Wrap a 3-D map as a one-frame volume
    pub fn from_map(map: Array3<f64>) -> Self {
        Volume {
            data: map.insert_axis(Axis(3)),
        }
    }

    pub fn spatial_shape(&self) -> (usize, usize, usize) {
        let shape = self.data.shape();
        (shape[0], shape[1], shape[2])
    }

    pub fn n_frames(&self) -> usize {
        self.data.shape()[3]
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub fn frame(&self, index: usize) -> ArrayView3<'_, f64> {
        self.data.index_axis(Axis(3), index)
    }
}

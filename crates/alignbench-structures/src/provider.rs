// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Data provider capabilities.

Acquisition, download and volume-format parsing live outside this workspace.
The evaluator only needs the two tables, a mask, and something that turns a
table path into a [`Volume`]. The in-memory implementations here back the
tests and any caller that already holds decoded arrays.
*/

use crate::error::{AlignBenchError, AlignBenchResult};
use crate::mask::Mask;
use crate::subject::{Label, Subject};
use crate::tables::{AlignmentTable, ProjectedTable};
use crate::volume::Volume;
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves a table path to a decoded volume
pub trait VolumeLoader: Send + Sync {
    fn load(&self, path: &Path) -> AlignBenchResult<Arc<Volume>>;
}

/// Supplies everything an evaluation pass reads
pub trait DataProvider: Send + Sync {
    fn alignment_table(&self) -> &AlignmentTable;
    fn projected_table(&self) -> &ProjectedTable;
    fn mask(&self) -> Arc<dyn Mask>;
    fn loader(&self) -> Arc<dyn VolumeLoader>;
}

/// Path-keyed volume store
#[derive(Debug, Clone, Default)]
pub struct InMemoryVolumeStore {
    volumes: AHashMap<PathBuf, Arc<Volume>>,
}

impl InMemoryVolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, volume: Volume) {
        self.volumes.insert(path.into(), Arc::new(volume));
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

impl VolumeLoader for InMemoryVolumeStore {
    fn load(&self, path: &Path) -> AlignBenchResult<Arc<Volume>> {
        self.volumes
            .get(path)
            .cloned()
            .ok_or_else(|| AlignBenchError::MissingVolume(path.display().to_string()))
    }
}

/// Tables, mask and volumes held in memory
#[derive(Debug, Clone)]
pub struct InMemoryDataProvider {
    alignment: AlignmentTable,
    projected: ProjectedTable,
    mask: Arc<dyn Mask>,
    store: Arc<InMemoryVolumeStore>,
}

impl InMemoryDataProvider {
    pub fn new(mask: Arc<dyn Mask>) -> Self {
        InMemoryDataProvider {
            alignment: AlignmentTable::default(),
            projected: ProjectedTable::default(),
            mask,
            store: Arc::new(InMemoryVolumeStore::new()),
        }
    }

    /// Register the training volume of `subject`
    pub fn add_alignment(
        &mut self,
        subject: impl Into<Subject>,
        path: impl Into<PathBuf>,
        volume: Volume,
    ) -> &mut Self {
        let path = path.into();
        self.alignment.push(subject, path.clone());
        Arc::make_mut(&mut self.store).insert(path, volume);
        self
    }

    /// Register a held-out volume of `subject` labelled with `condition`
    pub fn add_projected(
        &mut self,
        subject: impl Into<Subject>,
        path: impl Into<PathBuf>,
        condition: impl Into<Label>,
        volume: Volume,
    ) -> &mut Self {
        let path = path.into();
        self.projected.push(subject, path.clone(), condition);
        Arc::make_mut(&mut self.store).insert(path, volume);
        self
    }
}

impl DataProvider for InMemoryDataProvider {
    fn alignment_table(&self) -> &AlignmentTable {
        &self.alignment
    }

    fn projected_table(&self) -> &ProjectedTable {
        &self.projected
    }

    fn mask(&self) -> Arc<dyn Mask> {
        Arc::clone(&self.mask)
    }

    fn loader(&self) -> Arc<dyn VolumeLoader> {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::BinaryMask;
    use ndarray::Array3;

    #[test]
    fn test_missing_volume() {
        let store = InMemoryVolumeStore::new();
        let err = store.load(Path::new("nowhere.nii")).unwrap_err();
        assert_eq!(err, AlignBenchError::MissingVolume("nowhere.nii".to_string()));
    }

    #[test]
    fn test_provider_registers_tables_and_volumes() {
        let mask = Arc::new(BinaryMask::full((1, 1, 2)).unwrap());
        let mut provider = InMemoryDataProvider::new(mask);
        provider
            .add_alignment("A", "A/train", Volume::from_map(Array3::zeros((1, 1, 2))))
            .add_projected("A", "A/test0", "0", Volume::from_map(Array3::ones((1, 1, 2))));

        assert_eq!(provider.alignment_table().len(), 1);
        assert_eq!(provider.projected_table().len(), 1);

        let loaded = provider.loader().load(Path::new("A/test0")).unwrap();
        assert_eq!(loaded.n_frames(), 1);
        assert_eq!(provider.mask().n_features(), 2);
    }
}

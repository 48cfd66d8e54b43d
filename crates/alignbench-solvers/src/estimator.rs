// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Fitted alignment estimators and the bundle that hands them to the evaluator.

Whatever variant produced them, estimators reach the evaluator as an
[`EstimatorBundle`]: source subject → shared reference to a fitted estimator.
Per-subject variants store one distinct estimator per entry; the joint variant
stores the same `Arc` under every subject.
*/

use alignbench_structures::{AlignBenchError, AlignBenchResult, Subject};
use ndarray::{Array2, ArrayView2};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Space that [`AlignmentEstimator::transform`] maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSpace {
    /// The target subject's feature space (same width as the mask)
    Target,
    /// A latent space shared by all fitted subjects
    Shared,
}

/// A fitted mapping from a subject's feature space into target or shared space
pub trait AlignmentEstimator: Send + Sync + fmt::Debug {
    /// Name of the fitting method (e.g. `identity`, `ridge`, `srm`)
    fn method(&self) -> &str;

    fn output_space(&self) -> OutputSpace;

    /// Map the rows of `data`, which belong to `subject`, into the output space.
    /// A subject the estimator was not fitted for is `UnknownSubject`.
    fn transform(&self, subject: &Subject, data: ArrayView2<'_, f64>) -> AlignBenchResult<Array2<f64>>;
}

/// Source subject → fitted estimator
#[derive(Debug, Clone, Default)]
pub struct EstimatorBundle {
    entries: BTreeMap<Subject, Arc<dyn AlignmentEstimator>>,
}

impl EstimatorBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// One independently fitted estimator per subject
    pub fn from_independent<I>(estimators: I) -> Self
    where
        I: IntoIterator<Item = (Subject, Arc<dyn AlignmentEstimator>)>,
    {
        EstimatorBundle {
            entries: estimators.into_iter().collect(),
        }
    }

    /// The same jointly fitted estimator under every subject
    pub fn shared<'a, I>(subjects: I, estimator: Arc<dyn AlignmentEstimator>) -> Self
    where
        I: IntoIterator<Item = &'a Subject>,
    {
        EstimatorBundle {
            entries: subjects
                .into_iter()
                .map(|subject| (subject.clone(), Arc::clone(&estimator)))
                .collect(),
        }
    }

    pub fn insert(&mut self, subject: Subject, estimator: Arc<dyn AlignmentEstimator>) {
        self.entries.insert(subject, estimator);
    }

    pub fn get(&self, subject: &Subject) -> AlignBenchResult<&Arc<dyn AlignmentEstimator>> {
        self.entries
            .get(subject)
            .ok_or_else(|| AlignBenchError::UnknownSubject(subject.clone()))
    }

    pub fn contains(&self, subject: &Subject) -> bool {
        self.entries.contains_key(subject)
    }

    /// Subjects in identifier order
    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Subject, &Arc<dyn AlignmentEstimator>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct fitted objects referenced by the bundle
    pub fn distinct_estimators(&self) -> usize {
        let mut seen: Vec<*const ()> = self
            .entries
            .values()
            .map(|estimator| Arc::as_ptr(estimator) as *const ())
            .collect();
        seen.sort();
        seen.dedup();
        seen.len()
    }

    /// True when every entry aliases one fitted object
    pub fn is_shared(&self) -> bool {
        !self.entries.is_empty() && self.distinct_estimators() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityAlignment;

    fn identity(source: &str) -> Arc<dyn AlignmentEstimator> {
        let data = ndarray::Array2::<f64>::zeros((2, 2));
        let fitted =
            IdentityAlignment::fit(&Subject::from(source), &Subject::from("T"), data.view(), data.view())
                .unwrap();
        Arc::new(fitted)
    }

    #[test]
    fn test_independent_entries_are_distinct() {
        let bundle = EstimatorBundle::from_independent(vec![
            (Subject::from("B"), identity("B")),
            (Subject::from("A"), identity("A")),
        ]);
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.distinct_estimators(), 2);
        assert!(!bundle.is_shared());

        let subjects: Vec<&Subject> = bundle.subjects().collect();
        assert_eq!(subjects, vec![&Subject::from("A"), &Subject::from("B")]);
    }

    #[test]
    fn test_shared_entries_alias_one_object() {
        let subjects = [Subject::from("A"), Subject::from("B"), Subject::from("C")];
        let bundle = EstimatorBundle::shared(&subjects, identity("A"));
        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.distinct_estimators(), 1);
        assert!(bundle.is_shared());
    }

    #[test]
    fn test_missing_subject() {
        let bundle = EstimatorBundle::new();
        assert!(bundle.is_empty());
        assert!(!bundle.is_shared());
        assert_eq!(
            bundle.get(&Subject::from("Z")).unwrap_err(),
            AlignBenchError::UnknownSubject(Subject::from("Z"))
        );
    }
}

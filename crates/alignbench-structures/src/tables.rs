// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Alignment and projected tables.

- The alignment table maps each subject to the training volume used to fit
  mappings into or out of target space.
- The projected table lists held-out test volumes with their condition labels;
  a subject may have zero or more rows.

Both tables are created once by the data provider and read-only for the run.
*/

use crate::error::{AlignBenchError, AlignBenchResult};
use crate::subject::{Label, Subject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One training volume for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub subject: Subject,
    pub volume_path: PathBuf,
}

/// One held-out volume with its decoding target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedRecord {
    pub subject: Subject,
    pub volume_path: PathBuf,
    pub condition: Label,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlignmentTable {
    records: Vec<AlignmentRecord>,
}

impl AlignmentTable {
    pub fn new(records: Vec<AlignmentRecord>) -> Self {
        AlignmentTable { records }
    }

    pub fn push(&mut self, subject: impl Into<Subject>, volume_path: impl Into<PathBuf>) {
        self.records.push(AlignmentRecord {
            subject: subject.into(),
            volume_path: volume_path.into(),
        });
    }

    pub fn records(&self) -> &[AlignmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct subjects, sorted by identifier
    pub fn subjects(&self) -> BTreeSet<Subject> {
        self.records.iter().map(|r| r.subject.clone()).collect()
    }

    pub fn contains(&self, subject: &Subject) -> bool {
        self.records.iter().any(|r| &r.subject == subject)
    }

    /// Each subject has exactly one training volume
    pub fn check_unique_subjects(&self) -> AlignBenchResult<()> {
        let mut seen = BTreeSet::new();
        for record in &self.records {
            if !seen.insert(&record.subject) {
                return Err(AlignBenchError::InvalidParameter(format!(
                    "subject '{}' has more than one alignment record",
                    record.subject
                )));
            }
        }
        Ok(())
    }

    /// Training volume path of `subject`
    pub fn volume_path(&self, subject: &Subject) -> AlignBenchResult<&Path> {
        self.records
            .iter()
            .find(|r| &r.subject == subject)
            .map(|r| r.volume_path.as_path())
            .ok_or_else(|| AlignBenchError::UnknownSubject(subject.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectedTable {
    records: Vec<ProjectedRecord>,
}

impl ProjectedTable {
    pub fn new(records: Vec<ProjectedRecord>) -> Self {
        ProjectedTable { records }
    }

    pub fn push(
        &mut self,
        subject: impl Into<Subject>,
        volume_path: impl Into<PathBuf>,
        condition: impl Into<Label>,
    ) {
        self.records.push(ProjectedRecord {
            subject: subject.into(),
            volume_path: volume_path.into(),
            condition: condition.into(),
        });
    }

    pub fn records(&self) -> &[ProjectedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn subjects(&self) -> BTreeSet<Subject> {
        self.records.iter().map(|r| r.subject.clone()).collect()
    }

    /// Rows of `subject` in table order
    pub fn rows_for<'a>(
        &'a self,
        subject: &'a Subject,
    ) -> impl Iterator<Item = &'a ProjectedRecord> + 'a {
        self.records.iter().filter(move |r| &r.subject == subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects_are_distinct_and_sorted() {
        let mut table = AlignmentTable::default();
        table.push("sub-09", "b.nii");
        table.push("sub-01", "a.nii");
        table.push("sub-09", "c.nii");

        let subjects: Vec<_> = table.subjects().into_iter().collect();
        assert_eq!(subjects, vec![Subject::new("sub-01"), Subject::new("sub-09")]);
        assert_eq!(
            table.volume_path(&Subject::new("sub-09")).unwrap(),
            Path::new("b.nii")
        );
    }

    #[test]
    fn test_duplicate_alignment_subject_rejected() {
        let mut table = AlignmentTable::default();
        table.push("sub-01", "a.nii");
        table.push("sub-02", "b.nii");
        assert!(table.check_unique_subjects().is_ok());

        table.push("sub-01", "c.nii");
        assert_eq!(
            table.check_unique_subjects().unwrap_err(),
            AlignBenchError::InvalidParameter(
                "subject 'sub-01' has more than one alignment record".to_string()
            )
        );
    }

    #[test]
    fn test_unknown_subject_volume() {
        let table = AlignmentTable::default();
        assert!(matches!(
            table.volume_path(&Subject::new("sub-01")),
            Err(AlignBenchError::UnknownSubject(_))
        ));
    }

    #[test]
    fn test_rows_for_keeps_table_order() {
        let mut table = ProjectedTable::default();
        table.push("B", "b0", "0");
        table.push("C", "c0", "0");
        table.push("B", "b1", "1");

        let b = Subject::new("B");
        let conditions: Vec<_> = table.rows_for(&b).map(|r| r.condition.as_str()).collect();
        assert_eq!(conditions, vec!["0", "1"]);
    }

    #[test]
    fn test_tables_deserialize_from_json() {
        let json = r#"[
            {"subject": "sub-01", "volume_path": "sub-01/train.nii.gz"},
            {"subject": "sub-02", "volume_path": "sub-02/train.nii.gz"}
        ]"#;
        let table: AlignmentTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.contains(&Subject::new("sub-02")));
    }
}

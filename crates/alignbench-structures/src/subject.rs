// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Subject identifiers and condition labels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical decoding target attached to each projected sample
pub type Label = String;

/// Opaque subject identifier (e.g. `sub-08`).
///
/// Ordering is lexicographic on the identifier; every place that merges
/// per-subject results sorts by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Subject(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Subject {
    fn from(id: &str) -> Self {
        Subject(id.to_string())
    }
}

impl From<String> for Subject {
    fn from(id: String) -> Self {
        Subject(id)
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Non-fatal compliance diagnostics.

use std::fmt;

/// Kind of compliance deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosisType {
    /// Value present but malformed.
    Invalid,
    /// Value present but empty.
    Empty,
    /// Value well-formed but not one of the known values.
    Unknown,
    /// Non-repeatable field occurred more than once.
    Duplicate,
    /// Required field is missing.
    Wanted,
    /// Forbidden field is present.
    Unwanted,
    /// Best-practice recommendation not followed.
    Recommended,
    /// Unexpected data found between records.
    UndesiredData,
}

impl DiagnosisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisType::Invalid => "INVALID",
            DiagnosisType::Empty => "EMPTY",
            DiagnosisType::Unknown => "UNKNOWN",
            DiagnosisType::Duplicate => "DUPLICATE",
            DiagnosisType::Wanted => "WANTED",
            DiagnosisType::Unwanted => "UNWANTED",
            DiagnosisType::Recommended => "RECOMMENDED",
            DiagnosisType::UndesiredData => "UNDESIRED_DATA",
        }
    }
}

impl fmt::Display for DiagnosisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single compliance deviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    kind: DiagnosisType,
    entity: String,
    value: Option<String>,
}

impl Diagnosis {
    /// Create a new diagnosis.
    ///
    /// # Arguments
    ///
    /// * `kind` - Deviation kind
    /// * `entity` - Field name or parsing context the deviation applies to
    /// * `value` - Observed or expected value, if any
    pub fn new(kind: DiagnosisType, entity: impl Into<String>, value: Option<String>) -> Self {
        Diagnosis {
            kind,
            entity: entity.into(),
            value,
        }
    }

    pub fn with_value(kind: DiagnosisType, entity: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(kind, entity, Some(value.into()))
    }

    pub fn kind(&self) -> DiagnosisType {
        self.kind
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} {}: {}", self.kind, self.entity, v),
            None => write!(f, "{} {}", self.kind, self.entity),
        }
    }
}

/// Ordered collection of errors and warnings.
///
/// Entries are only ever appended and never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<Diagnosis>,
    warnings: Vec<Diagnosis>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, diagnosis: Diagnosis) {
        self.errors.push(diagnosis);
    }

    pub fn add_warning(&mut self, diagnosis: Diagnosis) {
        self.warnings.push(diagnosis);
    }

    /// Move all entries of `other` to the end of this collection.
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.errors.append(&mut other.errors);
        self.warnings.append(&mut other.warnings);
    }

    pub fn errors(&self) -> &[Diagnosis] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnosis] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Iterate over errors and warnings, errors first.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnosis> {
        self.errors.iter().chain(self.warnings.iter())
    }

    /// Count entries of a given kind that refer to `entity` (case-insensitive).
    pub fn count(&self, kind: DiagnosisType, entity: &str) -> usize {
        self.iter()
            .filter(|d| d.kind == kind && d.entity.eq_ignore_ascii_case(entity))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut a = Diagnostics::new();
        a.add_error(Diagnosis::new(DiagnosisType::Wanted, "WARC-Date", None));
        let mut b = Diagnostics::new();
        b.add_error(Diagnosis::new(DiagnosisType::Wanted, "WARC-Date", None));
        b.add_warning(Diagnosis::with_value(DiagnosisType::Recommended, "Content-Type", "text/plain"));
        a.append(&mut b);

        assert!(b.is_empty());
        assert_eq!(a.errors().len(), 2);
        assert_eq!(a.warnings().len(), 1);
        assert_eq!(a.count(DiagnosisType::Wanted, "warc-date"), 2);
        assert_eq!(a.iter().last().map(|d| d.kind()), Some(DiagnosisType::Recommended));
    }

    #[test]
    fn test_display() {
        let d = Diagnosis::with_value(DiagnosisType::Invalid, "WARC-Segment-Number", "1");
        assert_eq!(d.to_string(), "INVALID WARC-Segment-Number: 1");
        assert_eq!(Diagnosis::new(DiagnosisType::Empty, "Content-Type", None).to_string(), "EMPTY Content-Type");
    }
}

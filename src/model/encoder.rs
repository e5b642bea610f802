// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Categorical label encoder.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Maps category strings to dense integer codes.
///
/// Codes follow the sorted order of the distinct classes seen at fit time,
/// so `["night", "morning", "evening", "afternoon"]` encodes as
/// afternoon=0, evening=1, morning=2, night=3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the given labels
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(|s| s.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Code for `label`
    pub fn transform(&self, label: &str) -> Result<usize, ModelError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| ModelError::UnseenLabel(label.to_string()))
    }

    /// Label for `code`
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Known classes in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_codes() {
        let enc = LabelEncoder::fit(["night", "morning", "evening", "afternoon", "night"]);
        assert_eq!(enc.transform("afternoon").unwrap(), 0);
        assert_eq!(enc.transform("evening").unwrap(), 1);
        assert_eq!(enc.transform("morning").unwrap(), 2);
        assert_eq!(enc.transform("night").unwrap(), 3);
        assert_eq!(enc.inverse_transform(1), Some("evening"));
        assert_eq!(enc.inverse_transform(9), None);
    }

    #[test]
    fn test_unseen_label() {
        let enc = LabelEncoder::fit(["morning", "night"]);
        match enc.transform("dusk") {
            Err(ModelError::UnseenLabel(label)) => assert_eq!(label, "dusk"),
            other => panic!("expected UnseenLabel, got {:?}", other),
        }
    }
}

// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Labeled training samples and their CSV form.
//!
//! Columns: `distance_to_forest,distance_to_leopard,time_of_day,risk_level`.

use crate::error::ModelError;
use crate::risk::RiskLabel;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Default dataset file name
pub const DATASET_FILE: &str = "mootrack_risk_dataset.csv";

/// One labeled training row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    /// Meters to the forest reference point
    pub distance_to_forest: f64,
    /// Meters to the nearest predator sighting
    pub distance_to_leopard: f64,
    /// Time-of-day bucket name
    pub time_of_day: String,
    /// Target label
    pub risk_level: RiskLabel,
}

impl LabeledSample {
    /// Create a sample
    pub fn new(
        distance_to_forest: f64,
        distance_to_leopard: f64,
        time_of_day: impl Into<String>,
        risk_level: RiskLabel,
    ) -> Self {
        Self {
            distance_to_forest,
            distance_to_leopard,
            time_of_day: time_of_day.into(),
            risk_level,
        }
    }

    /// Both distances finite and non-negative
    pub fn has_valid_distances(&self) -> bool {
        [self.distance_to_forest, self.distance_to_leopard]
            .iter()
            .all(|d| d.is_finite() && *d >= 0.0)
    }
}

/// Read samples from any reader. Rows that fail to parse are skipped with
/// a warning; a missing or unreadable header is an error.
pub fn read_samples<R: Read>(reader: R) -> Result<Vec<LabeledSample>, ModelError> {
    let mut reader = csv::Reader::from_reader(reader);
    reader.headers()?;

    let mut samples = Vec::new();
    for (row, result) in reader.deserialize::<LabeledSample>().enumerate() {
        match result {
            Ok(sample) if sample.has_valid_distances() => samples.push(sample),
            Ok(sample) => log::warn!(
                "Skipping dataset row {}: distances must be finite and non-negative ({}, {})",
                row + 1,
                sample.distance_to_forest,
                sample.distance_to_leopard
            ),
            Err(e) => log::warn!("Skipping dataset row {}: {}", row + 1, e),
        }
    }
    Ok(samples)
}

/// Read samples from a CSV file
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<LabeledSample>, ModelError> {
    let file = std::fs::File::open(path)?;
    read_samples(file)
}

/// Write samples with a header row
pub fn write_samples<W: Write>(writer: W, samples: &[LabeledSample]) -> Result<(), ModelError> {
    let mut writer = csv::Writer::from_writer(writer);
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write samples to a CSV file
pub fn write_csv(path: impl AsRef<Path>, samples: &[LabeledSample]) -> Result<(), ModelError> {
    let file = std::fs::File::create(path)?;
    write_samples(file, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_label_strings() {
        let samples = vec![
            LabeledSample::new(120.5, 40.0, "night", RiskLabel::VeryHigh),
            LabeledSample::new(900.0, 1500.25, "morning", RiskLabel::Low),
        ];
        let mut buf = Vec::new();
        write_samples(&mut buf, &samples).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();

        assert!(text.starts_with("distance_to_forest,distance_to_leopard,time_of_day,risk_level\n"));
        assert!(text.contains("very high"));
        assert_eq!(read_samples(buf.as_slice()).unwrap(), samples);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let text = "distance_to_forest,distance_to_leopard,time_of_day,risk_level\n\
                    10.0,20.0,night,very high\n\
                    abc,20.0,night,low\n\
                    10.0,20.0,night,extreme\n\
                    NaN,20.0,night,high\n\
                    10.0,inf,morning,low\n\
                    -5.0,20.0,evening,high\n\
                    300.0,700.0,afternoon,low\n";
        let samples = read_samples(text.as_bytes()).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(LabeledSample::has_valid_distances));
        assert_eq!(samples[1].risk_level, RiskLabel::Low);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATASET_FILE);
        let samples = vec![LabeledSample::new(1.0, 2.0, "evening", RiskLabel::Medium)];
        write_csv(&path, &samples).unwrap();
        assert_eq!(read_csv(&path).unwrap(), samples);
    }
}

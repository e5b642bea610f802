//! Error types for MooTrack
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for MooTrack operations
pub type Result<T> = std::result::Result<T, MooError>;

/// Main error type for MooTrack operations
#[derive(Error, Debug)]
pub enum MooError {
    /// Geometry / coordinate error
    #[error("Geo error: {0}")]
    Geo(#[from] GeoError),

    /// Risk model error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Persistence gateway error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Notification gateway error
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors on coordinates and zones
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Coordinate outside the WGS-84 ranges (or not finite)
    #[error("Invalid coordinate: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },

    /// Zone ring has too few distinct vertices
    #[error("Zone ring needs at least 3 distinct vertices, got {count}")]
    DegenerateZone { count: usize },
}

/// Errors from the risk model (training, persistence, inference)
#[derive(Error, Debug)]
pub enum ModelError {
    /// Label not seen when the encoder was fitted
    #[error("Unseen label: {0:?}")]
    UnseenLabel(String),

    /// Unknown risk label string
    #[error("Unknown risk label: {0:?}")]
    UnknownRiskLabel(String),

    /// Feature vector has the wrong width
    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    /// Nothing to train on
    #[error("Empty training set")]
    EmptyTrainingSet,

    /// Model has no trees / classes
    #[error("Model is not fitted")]
    NotFitted,

    /// Training row with a NaN or infinite feature
    #[error("Non-finite feature in training row {row}")]
    NonFiniteFeature { row: usize },

    /// Artifact parsed but is structurally invalid
    #[error("Corrupt model artifact: {0}")]
    Corrupt(String),

    /// Artifact file missing
    #[error("Model artifact not found: {0}")]
    ArtifactNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON artifact error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV dataset error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors from the persistence gateway
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be (de)serialized
    #[error("Malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Document parsed but violates a domain invariant
    #[error("Invalid document: {0}")]
    Invalid(String),

    /// Internal lock poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Errors from the notification gateway
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Credentials or recipient missing
    #[error("Missing notification setting: {0}")]
    MissingSetting(&'static str),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider rejected the message
    #[error("Rejected by provider (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Value out of its valid range
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MooError::Geo(GeoError::InvalidCoordinate {
            lon: 200.0,
            lat: 10.0,
        });
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid coordinate"));
        assert!(msg.contains("200"));
    }

    #[test]
    fn test_error_conversion() {
        let model_err = ModelError::UnseenLabel("dusk".to_string());
        let err: MooError = model_err.into();
        assert!(matches!(err, MooError::Model(_)));
    }
}

//! Error types for Rumbo scoring
//!
//! Errors are split by blast radius: a [`RecordError`] rejects a single trip,
//! [`InsufficientPopulation`] disables clustering for one run, and
//! [`ConfigError`] stops a run before any record is touched.

use thiserror::Error;

/// Errors that abort a whole computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse telemetry payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}

/// A single trip record that cannot enter the pipeline.
///
/// The record is dropped and reported in the run's rejection summary; the
/// remaining records are still processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Missing required field: driver_id")]
    MissingDriverId,

    #[error("Invalid timestamp in {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Trip ends before it starts: start={start}, end={end}")]
    InvertedTimestamps { start: String, end: String },

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Clustering cannot be defined for the current driver population.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsufficientPopulation {
    #[error("Clustering needs at least {required} drivers, found {found}")]
    TooFewDrivers { found: usize, required: usize },

    #[error("All drivers share identical clustering features (zero variance)")]
    ZeroVariance,

    #[error("{required} clusters requested but only {found} distinct driver profiles exist")]
    TooFewDistinctProfiles { found: usize, required: usize },
}

/// Invalid scoring configuration, detected before a run starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Weights for {group} sum to {sum}, expected 1.0")]
    WeightSum { group: &'static str, sum: f64 },

    #[error("Weight {group}.{name} is invalid: {value}")]
    InvalidWeight {
        group: &'static str,
        name: &'static str,
        value: f64,
    },

    #[error("Normalization anchors for {metric} are invalid: {reason}")]
    InvalidAnchors { metric: &'static str, reason: String },

    #[error("Carbon thresholds inverted: low={low} must be below high={high}")]
    InvertedCarbonThresholds { low: f64, high: f64 },

    #[error("Parameter {name} must be {requirement}, got {value}")]
    InvalidParameter {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("Candidate cluster range is invalid: k_min={k_min}, k_max={k_max}")]
    InvalidClusterRange { k_min: usize, k_max: usize },

    #[error("Clustering feature list is empty")]
    EmptyFeatureList,

    #[error("Clustering feature listed twice: {0}")]
    DuplicateFeature(String),
}

//! Rumbo Scoring - Driver performance scoring engine for commercial fleets
//!
//! Rumbo turns completed-trip telemetry into explainable driver scores through a
//! deterministic pipeline: trip extraction → per-driver aggregation →
//! normalization → composite scoring → equity adjustment → behavioral
//! clustering → report encoding.
//!
//! ## Modules
//!
//! - **Scoring Pipeline**: Trip records (JSON, NDJSON or Scania payloads) into a driver score report
//! - **Clustering**: Unsupervised driver behavior groups with quality diagnostics

pub mod adapters;
pub mod aggregator;
pub mod clustering;
pub mod config;
pub mod encoder;
pub mod equity;
pub mod error;
pub mod features;
pub mod fleet;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod scorer;
pub mod stats;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(test)]
mod test_support;

pub use config::ScoringConfig;
pub use error::{ComputeError, ConfigError, InsufficientPopulation, RecordError};
pub use pipeline::{score_scania_json, score_trips_json, FleetRun, FleetScorer, InputFormat};

// Schema exports
pub use schema::{RawTrip, TripRecordAdapter, SCHEMA_VERSION};

// Report exports
pub use encoder::{OutputFormat, ReportEncoder, REPORT_SCHEMA_VERSION};

/// Rumbo version embedded in every report
pub const RUMBO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for driver score reports
pub const PRODUCER_NAME: &str = "rumbo-scoring";

//! Vendor telemetry adapters
//!
//! This module provides adapters that parse raw vendor JSON payloads and map them
//! to canonical fleet.trip_record.v1 raw trips.

mod scania;

pub use scania::ScaniaAdapter;

use crate::error::ComputeError;
use crate::schema::ParsedBatch;

/// Trait for vendor telemetry adapters
pub trait TelemetryAdapter {
    /// Parse a raw vendor payload into a batch of canonical raw trips.
    ///
    /// A payload whose envelope cannot be read is an error; individual trips
    /// that cannot be mapped are rejected inside the batch.
    fn parse(&self, raw_json: &str) -> Result<ParsedBatch, ComputeError>;
}

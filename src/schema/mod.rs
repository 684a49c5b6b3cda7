//! fleet.trip_record.v1 input schema
//!
//! This module defines the vendor-agnostic trip record accepted at the engine
//! boundary and the batch parsers for JSON arrays and NDJSON.

mod adapter;
mod trip_record;

pub use adapter::*;
pub use trip_record::*;

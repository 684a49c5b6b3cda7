//! Boundary parsers for fleet.trip_record.v1 batches
//!
//! A batch is either a JSON array or NDJSON. A malformed element rejects only
//! itself; a batch that is not a JSON array at all is a hard parse error.

use crate::error::{ComputeError, RecordError};
use crate::schema::trip_record::{RawTrip, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A raw trip together with its position in the input batch
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTrip {
    /// Zero-based element index (array) or line index (NDJSON)
    pub index: usize,
    pub trip: RawTrip,
}

/// A record dropped before aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub index: usize,
    pub driver_id: Option<String>,
    pub error: RecordError,
}

/// Parsed batch: accepted raw trips plus per-record rejections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    pub trips: Vec<IndexedTrip>,
    pub rejected: Vec<RejectedRecord>,
}

impl ParsedBatch {
    pub fn total(&self) -> usize {
        self.trips.len() + self.rejected.len()
    }
}

/// Adapter for trip record batches
pub struct TripRecordAdapter;

impl TripRecordAdapter {
    /// Parse a JSON string containing an array of trip records
    pub fn parse_array(json: &str) -> Result<ParsedBatch, ComputeError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let elements = match value {
            serde_json::Value::Array(elements) => elements,
            other => {
                return Err(ComputeError::ParseError(format!(
                    "Expected a JSON array of trip records, got {}",
                    json_kind(&other)
                )))
            }
        };
        Ok(Self::from_values(elements.into_iter().enumerate()))
    }

    /// Parse NDJSON (newline-delimited JSON) containing trip records
    ///
    /// Blank lines are skipped but still count towards the line index.
    pub fn parse_ndjson(ndjson: &str) -> ParsedBatch {
        let mut batch = ParsedBatch::default();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(trimmed) {
                Ok(value) => batch.push_value(line_num, value),
                Err(e) => batch.reject(
                    line_num,
                    None,
                    RecordError::Malformed(format!("line {}: {}", line_num + 1, e)),
                ),
            }
        }
        batch
    }

    /// Build a batch from already-decoded JSON values
    pub fn from_values<I>(values: I) -> ParsedBatch
    where
        I: IntoIterator<Item = (usize, serde_json::Value)>,
    {
        let mut batch = ParsedBatch::default();
        for (index, value) in values {
            batch.push_value(index, value);
        }
        batch
    }
}

impl ParsedBatch {
    fn push_value(&mut self, index: usize, value: serde_json::Value) {
        if !value.is_object() {
            let kind = json_kind(&value);
            self.reject(
                index,
                None,
                RecordError::Malformed(format!("expected an object, got {kind}")),
            );
            return;
        }
        match serde_json::from_value::<RawTrip>(value) {
            Ok(trip) => self.push_trip(index, trip),
            Err(e) => self.reject(index, None, RecordError::Malformed(e.to_string())),
        }
    }

    /// Accept a raw trip after the boundary checks that need no parsing
    pub(crate) fn push_trip(&mut self, index: usize, trip: RawTrip) {
        if let Some(version) = trip.schema_version.as_deref() {
            if version != SCHEMA_VERSION {
                let driver_id = trip.driver_id.clone();
                self.reject(
                    index,
                    driver_id,
                    RecordError::Malformed(format!(
                        "schema_version {version} is not {SCHEMA_VERSION}"
                    )),
                );
                return;
            }
        }
        debug!(index, "accepted raw trip");
        self.trips.push(IndexedTrip { index, trip });
    }

    pub(crate) fn reject(&mut self, index: usize, driver_id: Option<String>, error: RecordError) {
        warn!(index, driver_id = driver_id.as_deref().unwrap_or("-"), %error, "rejected trip record");
        self.rejected.push(RejectedRecord {
            index,
            driver_id,
            error,
        });
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// One rejected record as reported downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionSample {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub reason: String,
}

/// Count of rejected records with a bounded list of samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RejectionSummary {
    pub count: usize,
    pub samples: Vec<RejectionSample>,
}

impl RejectionSummary {
    pub fn from_rejections(rejected: &[RejectedRecord], max_samples: usize) -> Self {
        let mut sorted: Vec<&RejectedRecord> = rejected.iter().collect();
        sorted.sort_by_key(|r| r.index);
        RejectionSummary {
            count: rejected.len(),
            samples: sorted
                .into_iter()
                .take(max_samples)
                .map(|r| RejectionSample {
                    index: r.index,
                    driver_id: r.driver_id.clone(),
                    reason: r.error.to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_isolates_bad_elements() {
        let json = r#"[
            { "driver_id": "D-1", "distance_km": 100 },
            42,
            { "driver_id": "D-2", "distance_km": "far" },
            { "driver_id": "D-3" }
        ]"#;
        let batch = TripRecordAdapter::parse_array(json).unwrap();

        assert_eq!(batch.trips.len(), 2);
        assert_eq!(batch.rejected.len(), 2);
        assert_eq!(batch.trips[1].index, 3);
        assert_eq!(batch.rejected[0].index, 1);
        assert!(matches!(batch.rejected[1].error, RecordError::Malformed(_)));
        assert_eq!(batch.total(), 4);
    }

    #[test]
    fn test_parse_array_requires_array() {
        let err = TripRecordAdapter::parse_array(r#"{ "driver_id": "D-1" }"#).unwrap_err();
        assert!(matches!(err, ComputeError::ParseError(_)));

        let err = TripRecordAdapter::parse_array("not json").unwrap_err();
        assert!(matches!(err, ComputeError::JsonError(_)));
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = "{\"driver_id\":\"D-1\"}\n\n{broken\n{\"driver_id\":\"D-2\"}\n";
        let batch = TripRecordAdapter::parse_ndjson(ndjson);

        assert_eq!(batch.trips.len(), 2);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].index, 2);
        assert_eq!(batch.trips[1].index, 3);
    }

    #[test]
    fn test_schema_version_mismatch_rejected() {
        let json = r#"[{ "schema_version": "fleet.trip_record.v0", "driver_id": "D-1" },
                       { "schema_version": "fleet.trip_record.v1", "driver_id": "D-2" }]"#;
        let batch = TripRecordAdapter::parse_array(json).unwrap();
        assert_eq!(batch.trips.len(), 1);
        assert_eq!(batch.rejected[0].driver_id.as_deref(), Some("D-1"));
    }

    #[test]
    fn test_rejection_summary_caps_samples() {
        let rejected: Vec<RejectedRecord> = (0..25)
            .rev()
            .map(|i| RejectedRecord {
                index: i,
                driver_id: None,
                error: RecordError::MissingDriverId,
            })
            .collect();
        let summary = RejectionSummary::from_rejections(&rejected, 10);

        assert_eq!(summary.count, 25);
        assert_eq!(summary.samples.len(), 10);
        assert_eq!(summary.samples[0].index, 0);
        assert_eq!(summary.samples[0].reason, "Missing required field: driver_id");
    }
}

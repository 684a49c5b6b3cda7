//! fleet.trip_record.v1 schema definition
//!
//! The vendor-agnostic input record: one completed trip as produced by an
//! ingestion adapter. Every metric is optional; absent values default to zero
//! or are derived from related fields during feature extraction.

use serde::{Deserialize, Deserializer, Serialize};

/// Current input schema version
pub const SCHEMA_VERSION: &str = "fleet.trip_record.v1";

/// One raw trip as it arrives at the engine boundary.
///
/// Unknown fields are ignored. Timestamps stay as strings here so that an
/// unparsable value rejects only this record, with the offending text kept
/// for the rejection summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTrip {
    /// Optional schema tag; when present it must equal [`SCHEMA_VERSION`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub driver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub vehicle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harsh_braking_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harsh_braking_per_100km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harsh_acceleration_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harsh_acceleration_per_100km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speeding_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_speed_kmh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_liters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_per_100km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_idling_liters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_time_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cruise_control_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_with_cruise_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coasting_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_support_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anticipation_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brake_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill_driving_score: Option<f64>,
}

/// Identifiers show up as strings or plain integers depending on the exporter
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

//! Scania Driver Evaluation Report adapter
//!
//! Maps `EvaluationVehicles[].Trips[]` to canonical raw trips. Trips are indexed
//! in payload order across all vehicles.

use crate::error::{ComputeError, RecordError};
use crate::schema::{ParsedBatch, RawTrip};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::TelemetryAdapter;

/// Scania payload adapter
pub struct ScaniaAdapter;

impl TelemetryAdapter for ScaniaAdapter {
    fn parse(&self, raw_json: &str) -> Result<ParsedBatch, ComputeError> {
        let payload: ScaniaPayload = serde_json::from_str(raw_json)?;
        let mut batch = ParsedBatch::default();
        let mut index = 0;

        for vehicle in payload.evaluation_vehicles {
            debug!(
                vin = vehicle.vin.as_deref().unwrap_or("-"),
                trips = vehicle.trips.len(),
                "scania vehicle"
            );
            for value in vehicle.trips {
                match serde_json::from_value::<ScaniaTrip>(value) {
                    Ok(trip) => batch.push_trip(index, trip.into_raw(vehicle.vin.clone())),
                    Err(e) => batch.reject(index, None, RecordError::Malformed(e.to_string())),
                }
                index += 1;
            }
        }

        Ok(batch)
    }
}

#[derive(Debug, Deserialize)]
struct ScaniaPayload {
    #[serde(rename = "EvaluationVehicles", default)]
    evaluation_vehicles: Vec<ScaniaVehicle>,
}

#[derive(Debug, Deserialize)]
struct ScaniaVehicle {
    #[serde(rename = "VIN", default, deserialize_with = "lenient_string")]
    vin: Option<String>,
    #[serde(rename = "Trips", default)]
    trips: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScaniaTrip {
    #[serde(rename = "DriverRef", deserialize_with = "lenient_string")]
    driver_ref: Option<String>,
    #[serde(rename = "DriverIdentification", deserialize_with = "lenient_string")]
    driver_identification: Option<String>,
    #[serde(rename = "DriverName", deserialize_with = "lenient_string")]
    driver_name: Option<String>,
    #[serde(rename = "StartDate", deserialize_with = "lenient_string")]
    start_date: Option<String>,
    #[serde(rename = "StopDate", deserialize_with = "lenient_string")]
    stop_date: Option<String>,
    #[serde(rename = "Distance", deserialize_with = "lenient_f64")]
    distance: Option<f64>,
    #[serde(rename = "HarshBrakeApplications", deserialize_with = "lenient_f64")]
    harsh_brake_applications: Option<f64>,
    #[serde(rename = "HarshBrakeApplicationsTLValue", deserialize_with = "lenient_f64")]
    harsh_brake_per_100km: Option<f64>,
    #[serde(rename = "HarshAccelerationsValue", deserialize_with = "lenient_f64")]
    harsh_accelerations_per_100km: Option<f64>,
    #[serde(rename = "SpeedingValue", deserialize_with = "lenient_f64")]
    speeding: Option<f64>,
    #[serde(rename = "UseOfBrakesScaniaDriverSupport", deserialize_with = "lenient_f64")]
    use_of_brakes: Option<f64>,
    #[serde(rename = "AverageFuelConsumption", deserialize_with = "lenient_f64")]
    average_fuel_consumption: Option<f64>,
    #[serde(rename = "IdlingValue", deserialize_with = "lenient_f64")]
    idling: Option<f64>,
    #[serde(rename = "CoastingValue", deserialize_with = "lenient_f64")]
    coasting: Option<f64>,
    #[serde(rename = "AnticipationScaniaDriverSupport", deserialize_with = "lenient_f64")]
    anticipation: Option<f64>,
    #[serde(rename = "AverageSpeed", deserialize_with = "lenient_f64")]
    average_speed: Option<f64>,
    #[serde(rename = "ScaniaDriverSupportValue", deserialize_with = "lenient_f64")]
    driver_support: Option<f64>,
    #[serde(rename = "HillDrivingScaniaDriverSupport", deserialize_with = "lenient_f64")]
    hill_driving: Option<f64>,
    #[serde(rename = "DistanceWithCruiseControl", deserialize_with = "lenient_f64")]
    distance_with_cruise: Option<f64>,
    #[serde(rename = "TotalFuelConsumption", deserialize_with = "lenient_f64")]
    total_fuel: Option<f64>,
    #[serde(rename = "TotalFuelConsumptionIdling", deserialize_with = "lenient_f64")]
    total_fuel_idling: Option<f64>,
}

impl ScaniaTrip {
    fn into_raw(self, vin: Option<String>) -> RawTrip {
        RawTrip {
            schema_version: None,
            driver_id: self
                .driver_ref
                .filter(|s| !s.trim().is_empty())
                .or(self.driver_identification),
            driver_name: self.driver_name,
            vehicle_id: vin,
            start_time: self.start_date,
            end_time: self.stop_date,
            distance_km: self.distance,
            harsh_braking_count: self.harsh_brake_applications,
            harsh_braking_per_100km: self.harsh_brake_per_100km,
            harsh_acceleration_count: None,
            harsh_acceleration_per_100km: self.harsh_accelerations_per_100km,
            speeding_percentage: self.speeding,
            average_speed_kmh: self.average_speed,
            fuel_liters: self.total_fuel,
            fuel_per_100km: self.average_fuel_consumption,
            fuel_idling_liters: self.total_fuel_idling,
            idle_time_percentage: self.idling,
            cruise_control_percentage: None,
            distance_with_cruise_km: self.distance_with_cruise,
            coasting_percentage: self.coasting,
            driver_support_score: self.driver_support,
            anticipation_score: self.anticipation,
            brake_score: self.use_of_brakes,
            hill_driving_score: self.hill_driving,
        }
    }
}

/// Scania exports numbers either as JSON numbers or as numeric strings
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
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

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "EvaluationVehicles": [
            {
                "VIN": "YS2R4X20005399401",
                "Trips": [
                    {
                        "DriverRef": "",
                        "DriverIdentification": "SE-0042",
                        "DriverName": "Ana Lopez",
                        "StartDate": "202510210600",
                        "StopDate": "202510211030",
                        "Distance": 320.5,
                        "HarshBrakeApplications": 2,
                        "HarshAccelerationsValue": "0.4",
                        "SpeedingValue": 3.1,
                        "UseOfBrakesScaniaDriverSupport": 81,
                        "AverageFuelConsumption": 27.9,
                        "IdlingValue": 6.5,
                        "CoastingValue": 12,
                        "AnticipationScaniaDriverSupport": 74,
                        "AverageSpeed": 71.2,
                        "ScaniaDriverSupportValue": 77,
                        "HillDrivingScaniaDriverSupport": 69,
                        "DistanceWithCruiseControl": 210,
                        "TotalFuelConsumption": 89.4,
                        "TotalFuelConsumptionIdling": 1.2
                    },
                    { "DriverRef": "SE-0050", "Distance": 10 }
                ]
            },
            {
                "VIN": "YS2R4X20005399402",
                "Trips": [ 42 ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_scania_payload() {
        let batch = ScaniaAdapter.parse(PAYLOAD).unwrap();
        assert_eq!(batch.total(), 3);
        assert_eq!(batch.trips.len(), 2);

        let first = &batch.trips[0];
        assert_eq!(first.index, 0);
        assert_eq!(first.trip.driver_id.as_deref(), Some("SE-0042"));
        assert_eq!(first.trip.vehicle_id.as_deref(), Some("YS2R4X20005399401"));
        assert_eq!(first.trip.start_time.as_deref(), Some("202510210600"));
        assert_eq!(first.trip.harsh_braking_count, Some(2.0));
        assert_eq!(first.trip.harsh_acceleration_per_100km, Some(0.4));
        assert_eq!(first.trip.fuel_liters, Some(89.4));
        assert_eq!(first.trip.distance_with_cruise_km, Some(210.0));
        assert_eq!(first.trip.brake_score, Some(81.0));

        assert_eq!(batch.trips[1].trip.driver_id.as_deref(), Some("SE-0050"));
    }

    #[test]
    fn test_non_object_trip_rejected() {
        let batch = ScaniaAdapter.parse(PAYLOAD).unwrap();
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].index, 2);
        assert!(matches!(batch.rejected[0].error, RecordError::Malformed(_)));
    }

    #[test]
    fn test_empty_payload() {
        let batch = ScaniaAdapter.parse("{}").unwrap();
        assert_eq!(batch.total(), 0);
    }

    #[test]
    fn test_invalid_envelope() {
        assert!(matches!(
            ScaniaAdapter.parse("[1, 2]"),
            Err(ComputeError::JsonError(_))
        ));
    }
}

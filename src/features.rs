//! Trip feature extraction
//!
//! This module turns one raw trip into a canonical [`TripRecord`]:
//! - Timestamp parsing and duration
//! - Clamping of percentages and vendor scores to [0, 100]
//! - Counts and fuel derived from per-100km rates when only rates are given
//! - CO2 mass from fuel

use crate::config::CarbonConfig;
use crate::error::RecordError;
use crate::schema::RawTrip;
use crate::types::TripRecord;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Naive layouts accepted besides RFC 3339; interpreted as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y%m%d%H%M"];

/// Feature extractor for converting raw trips to canonical records
pub struct TripFeatureExtractor;

impl TripFeatureExtractor {
    /// Extract a canonical trip; the record is rejected only for identity or
    /// timestamp problems, never for out-of-range metrics
    pub fn extract(raw: RawTrip, carbon: &CarbonConfig) -> Result<TripRecord, RecordError> {
        let driver_id = raw
            .driver_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(RecordError::MissingDriverId)?;

        let start_time = parse_optional_timestamp("start_time", raw.start_time.as_deref())?;
        let end_time = parse_optional_timestamp("end_time", raw.end_time.as_deref())?;
        let duration_hours = match (start_time, end_time) {
            (Some(start), Some(end)) if end < start => {
                return Err(RecordError::InvertedTimestamps {
                    start: start.to_rfc3339(),
                    end: end.to_rfc3339(),
                })
            }
            (Some(start), Some(end)) => Some((end - start).num_seconds() as f64 / 3600.0),
            _ => None,
        };

        let distance_km = non_negative(raw.distance_km).unwrap_or(0.0);

        let harsh_braking_count =
            count_or_rate(raw.harsh_braking_count, raw.harsh_braking_per_100km, distance_km);
        let harsh_acceleration_count = count_or_rate(
            raw.harsh_acceleration_count,
            raw.harsh_acceleration_per_100km,
            distance_km,
        );
        let fuel_liters = count_or_rate(raw.fuel_liters, raw.fuel_per_100km, distance_km);
        let fuel_idling_liters = non_negative(raw.fuel_idling_liters).unwrap_or(0.0);

        let cruise_control_percentage = match finite(raw.cruise_control_percentage) {
            Some(pct) => pct,
            None => match non_negative(raw.distance_with_cruise_km) {
                Some(cruise_km) if distance_km > 0.0 => cruise_km / distance_km * 100.0,
                _ => 0.0,
            },
        };

        let average_speed_kmh = match non_negative(raw.average_speed_kmh) {
            Some(speed) => speed,
            None => match duration_hours {
                Some(hours) if hours > 0.0 => distance_km / hours,
                _ => 0.0,
            },
        };

        Ok(TripRecord {
            driver_id,
            driver_name: raw.driver_name.filter(|n| !n.trim().is_empty()),
            vehicle_id: raw.vehicle_id.filter(|v| !v.trim().is_empty()),
            start_time,
            end_time,
            duration_hours,
            distance_km,
            harsh_braking_count,
            harsh_acceleration_count,
            speeding_percentage: percentage(raw.speeding_percentage),
            average_speed_kmh,
            fuel_liters,
            fuel_idling_liters,
            idle_time_percentage: percentage(raw.idle_time_percentage),
            cruise_control_percentage: cruise_control_percentage.clamp(0.0, 100.0),
            coasting_percentage: percentage(raw.coasting_percentage),
            driver_support_score: percentage(raw.driver_support_score),
            anticipation_score: percentage(raw.anticipation_score),
            brake_score: percentage(raw.brake_score),
            hill_driving_score: percentage(raw.hill_driving_score),
            co2_kg: fuel_liters * carbon.emission_factor_kg_per_l,
            co2_idling_kg: fuel_idling_liters * carbon.emission_factor_kg_per_l,
        })
    }
}

/// Parse a trip timestamp; blank strings count as absent
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_optional_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, RecordError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_timestamp(text)
            .map(Some)
            .ok_or_else(|| RecordError::InvalidTimestamp {
                field,
                value: text.to_string(),
            }),
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    finite(value).map(|v| v.max(0.0))
}

fn percentage(value: Option<f64>) -> f64 {
    finite(value).map_or(0.0, |v| v.clamp(0.0, 100.0))
}

/// Absolute amount when given, otherwise rate x distance / 100
fn count_or_rate(total: Option<f64>, per_100km: Option<f64>, distance_km: f64) -> f64 {
    non_negative(total)
        .or_else(|| non_negative(per_100km).map(|rate| rate * distance_km / 100.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(driver_id: &str) -> RawTrip {
        RawTrip {
            driver_id: Some(driver_id.to_string()),
            ..Default::default()
        }
    }

    fn extract(raw: RawTrip) -> Result<TripRecord, RecordError> {
        TripFeatureExtractor::extract(raw, &CarbonConfig::default())
    }

    #[test]
    fn test_missing_driver_id() {
        assert_eq!(extract(RawTrip::default()), Err(RecordError::MissingDriverId));
        assert_eq!(extract(raw("   ")), Err(RecordError::MissingDriverId));
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        for text in [
            "2024-03-05T14:30:00Z",
            "2024-03-05T16:30:00+02:00",
            "2024-03-05T14:30:00",
            "2024-03-05 14:30:00",
            "202403051430",
        ] {
            assert_eq!(parse_timestamp(text), Some(expected), "{text}");
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let mut trip = raw("D-1");
        trip.start_time = Some("05/03/2024".to_string());
        assert_eq!(
            extract(trip),
            Err(RecordError::InvalidTimestamp {
                field: "start_time",
                value: "05/03/2024".to_string()
            })
        );
    }

    #[test]
    fn test_inverted_timestamps_rejected() {
        let mut trip = raw("D-1");
        trip.start_time = Some("2024-03-05T14:30:00Z".to_string());
        trip.end_time = Some("2024-03-05T12:00:00Z".to_string());
        assert!(matches!(
            extract(trip),
            Err(RecordError::InvertedTimestamps { .. })
        ));
    }

    #[test]
    fn test_duration_and_derived_speed() {
        let mut trip = raw("D-1");
        trip.start_time = Some("202403050800".to_string());
        trip.end_time = Some("202403051030".to_string());
        trip.distance_km = Some(200.0);

        let record = extract(trip).unwrap();
        assert_eq!(record.duration_hours, Some(2.5));
        assert!((record.average_speed_kmh - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentages_clamped_not_rejected() {
        let mut trip = raw("D-1");
        trip.speeding_percentage = Some(140.0);
        trip.idle_time_percentage = Some(-5.0);
        trip.brake_score = Some(f64::NAN);

        let record = extract(trip).unwrap();
        assert_eq!(record.speeding_percentage, 100.0);
        assert_eq!(record.idle_time_percentage, 0.0);
        assert_eq!(record.brake_score, 0.0);
    }

    #[test]
    fn test_negative_distance_clamped() {
        let mut trip = raw("D-1");
        trip.distance_km = Some(-12.0);
        trip.fuel_liters = Some(-3.0);

        let record = extract(trip).unwrap();
        assert_eq!(record.distance_km, 0.0);
        assert_eq!(record.fuel_liters, 0.0);
        assert_eq!(record.co2_kg, 0.0);
    }

    #[test]
    fn test_counts_derived_from_rates() {
        let mut trip = raw("D-1");
        trip.distance_km = Some(400.0);
        trip.harsh_braking_per_100km = Some(0.5);
        trip.fuel_per_100km = Some(30.0);
        trip.harsh_acceleration_count = Some(1.0);
        trip.harsh_acceleration_per_100km = Some(9.0);

        let record = extract(trip).unwrap();
        assert!((record.harsh_braking_count - 2.0).abs() < 1e-9);
        assert!((record.fuel_liters - 120.0).abs() < 1e-9);
        // explicit count wins over the rate
        assert_eq!(record.harsh_acceleration_count, 1.0);
    }

    #[test]
    fn test_cruise_share_from_distance() {
        let mut trip = raw("D-1");
        trip.distance_km = Some(250.0);
        trip.distance_with_cruise_km = Some(100.0);

        let record = extract(trip).unwrap();
        assert!((record.cruise_control_percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_co2_from_fuel() {
        let mut trip = raw("D-1");
        trip.fuel_liters = Some(242.25);
        trip.fuel_idling_liters = Some(10.0);

        let record = extract(trip).unwrap();
        assert!((record.co2_kg - 649.23).abs() < 1e-9);
        assert!((record.co2_idling_kg - 26.8).abs() < 1e-9);
    }
}

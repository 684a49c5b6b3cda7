//! Fixtures shared by the inline test modules.

use crate::types::{DriverAggregate, TripRecord};

pub(crate) fn make_trip(driver_id: &str, distance_km: f64) -> TripRecord {
    TripRecord {
        driver_id: driver_id.to_string(),
        driver_name: None,
        vehicle_id: None,
        start_time: None,
        end_time: None,
        duration_hours: None,
        distance_km,
        harsh_braking_count: 0.0,
        harsh_acceleration_count: 0.0,
        speeding_percentage: 0.0,
        average_speed_kmh: 60.0,
        fuel_liters: 0.0,
        fuel_idling_liters: 0.0,
        idle_time_percentage: 0.0,
        cruise_control_percentage: 0.0,
        coasting_percentage: 0.0,
        driver_support_score: 0.0,
        anticipation_score: 0.0,
        brake_score: 0.0,
        hill_driving_score: 0.0,
        co2_kg: 0.0,
        co2_idling_kg: 0.0,
    }
}

/// A one-trip aggregate with the given distance and rates; other metrics
/// sit at mid-range values
pub(crate) fn make_aggregate(
    driver_id: &str,
    total_distance_km: f64,
    harsh_braking_per_100km: f64,
    fuel_per_100km: f64,
) -> DriverAggregate {
    let defined = total_distance_km > 0.0;
    let fuel = fuel_per_100km * total_distance_km / 100.0;
    DriverAggregate {
        driver_id: driver_id.to_string(),
        driver_name: driver_id.to_string(),
        trip_count: 1,
        vehicle_count: 1,
        window_start: None,
        window_end: None,
        total_distance_km,
        total_duration_hours: 0.0,
        harsh_braking_total: harsh_braking_per_100km * total_distance_km / 100.0,
        harsh_braking_per_100km: defined.then_some(harsh_braking_per_100km),
        harsh_acceleration_total: 0.0,
        harsh_acceleration_per_100km: defined.then_some(0.0),
        speeding_percentage_avg: 5.0,
        average_speed_kmh: 60.0,
        total_fuel_liters: fuel,
        fuel_per_100km: defined.then_some(fuel_per_100km),
        idle_time_percentage_avg: 8.0,
        cruise_control_percentage_avg: 50.0,
        coasting_percentage_avg: 10.0,
        driver_support_score_avg: 70.0,
        anticipation_score_avg: 70.0,
        brake_score_avg: 70.0,
        hill_driving_score_avg: 70.0,
        total_co2_kg: fuel * 2.68,
        co2_per_km: defined.then(|| fuel * 2.68 / total_distance_km),
        total_co2_idling_kg: 0.0,
        flags: Vec::new(),
    }
}

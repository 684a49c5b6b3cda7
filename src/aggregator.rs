//! Driver aggregation
//!
//! Groups canonical trips by driver and summarizes each group:
//! - Totals for distance, duration, events, fuel and CO2
//! - Per-100km rates computed from the totals, undefined at zero distance
//! - Unweighted trip means for percentages and vendor scores

use crate::types::{AggregateFlag, DriverAggregate, TripRecord};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Aggregator for converting trips to per-driver summaries
pub struct DriverAggregator;

impl DriverAggregator {
    /// Aggregate every driver present in `trips`, ordered by driver id
    pub fn aggregate(trips: Vec<TripRecord>) -> Vec<DriverAggregate> {
        let mut by_driver: BTreeMap<String, Vec<TripRecord>> = BTreeMap::new();
        for trip in trips {
            by_driver.entry(trip.driver_id.clone()).or_default().push(trip);
        }

        by_driver
            .into_iter()
            .map(|(driver_id, trips)| aggregate_driver(driver_id, &trips))
            .collect()
    }
}

fn aggregate_driver(driver_id: String, trips: &[TripRecord]) -> DriverAggregate {
    let n = trips.len() as f64;
    let sum = |f: fn(&TripRecord) -> f64| trips.iter().map(f).sum::<f64>();
    let avg = |f: fn(&TripRecord) -> f64| sum(f) / n;

    let total_distance_km = sum(|t| t.distance_km);
    let harsh_braking_total = sum(|t| t.harsh_braking_count);
    let harsh_acceleration_total = sum(|t| t.harsh_acceleration_count);
    let total_fuel_liters = sum(|t| t.fuel_liters);
    let total_co2_kg = sum(|t| t.co2_kg);

    let per_100km = |total: f64| (total_distance_km > 0.0).then(|| total / total_distance_km * 100.0);

    let driver_name = trips
        .iter()
        .find_map(|t| t.driver_name.clone())
        .unwrap_or_else(|| driver_id.clone());
    let vehicles: BTreeSet<&str> = trips.iter().filter_map(|t| t.vehicle_id.as_deref()).collect();

    let window_start: Option<DateTime<Utc>> = trips.iter().filter_map(|t| t.start_time).min();
    let window_end: Option<DateTime<Utc>> = trips.iter().filter_map(|t| t.end_time).max();

    let mut flags = Vec::new();
    if total_distance_km <= 0.0 {
        warn!(driver_id = %driver_id, trips = trips.len(), "zero total distance, per-distance metrics undefined");
        flags.push(AggregateFlag::ZeroDistance);
    }
    if !trips.iter().any(|t| t.duration_hours.is_some()) {
        flags.push(AggregateFlag::MissingTimestamps);
    }

    debug!(driver_id = %driver_id, trips = trips.len(), distance_km = total_distance_km, "aggregated driver");

    DriverAggregate {
        driver_name,
        trip_count: trips.len() as u32,
        vehicle_count: vehicles.len() as u32,
        window_start,
        window_end,
        total_distance_km,
        total_duration_hours: trips.iter().filter_map(|t| t.duration_hours).sum(),
        harsh_braking_total,
        harsh_braking_per_100km: per_100km(harsh_braking_total),
        harsh_acceleration_total,
        harsh_acceleration_per_100km: per_100km(harsh_acceleration_total),
        speeding_percentage_avg: avg(|t| t.speeding_percentage),
        average_speed_kmh: avg(|t| t.average_speed_kmh),
        total_fuel_liters,
        fuel_per_100km: per_100km(total_fuel_liters),
        idle_time_percentage_avg: avg(|t| t.idle_time_percentage),
        cruise_control_percentage_avg: avg(|t| t.cruise_control_percentage),
        coasting_percentage_avg: avg(|t| t.coasting_percentage),
        driver_support_score_avg: avg(|t| t.driver_support_score),
        anticipation_score_avg: avg(|t| t.anticipation_score),
        brake_score_avg: avg(|t| t.brake_score),
        hill_driving_score_avg: avg(|t| t.hill_driving_score),
        total_co2_kg,
        co2_per_km: (total_distance_km > 0.0).then(|| total_co2_kg / total_distance_km),
        total_co2_idling_kg: sum(|t| t.co2_idling_kg),
        flags,
        driver_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::make_trip;

    #[test]
    fn test_rates_from_totals() {
        // 3 events and 242.25 L over 850 km split across two trips
        let mut a = make_trip("D-1", 500.0);
        a.harsh_braking_count = 2.0;
        a.fuel_liters = 150.0;
        a.co2_kg = 150.0 * 2.68;
        let mut b = make_trip("D-1", 350.0);
        b.harsh_braking_count = 1.0;
        b.fuel_liters = 92.25;
        b.co2_kg = 92.25 * 2.68;

        let aggregates = DriverAggregator::aggregate(vec![a, b]);
        assert_eq!(aggregates.len(), 1);
        let agg = &aggregates[0];

        assert_eq!(agg.trip_count, 2);
        assert_eq!(agg.total_distance_km, 850.0);
        assert!((agg.harsh_braking_per_100km.unwrap() - 0.352_941).abs() < 1e-6);
        assert!((agg.fuel_per_100km.unwrap() - 28.5).abs() < 1e-9);
        assert!((agg.total_co2_kg - 649.23).abs() < 1e-9);
        assert!((agg.co2_per_km.unwrap() - 0.763_8).abs() < 1e-4);
        assert_eq!(agg.flags, vec![AggregateFlag::MissingTimestamps]);
    }

    #[test]
    fn test_zero_distance_flagged() {
        let mut trip = make_trip("D-1", 0.0);
        trip.harsh_braking_count = 4.0;

        let aggregates = DriverAggregator::aggregate(vec![trip]);
        let agg = &aggregates[0];

        assert!(agg.has_flag(AggregateFlag::ZeroDistance));
        assert_eq!(agg.harsh_braking_per_100km, None);
        assert_eq!(agg.fuel_per_100km, None);
        assert_eq!(agg.co2_per_km, None);
        assert_eq!(agg.harsh_braking_total, 4.0);
    }

    #[test]
    fn test_grouping_and_identity() {
        let mut a = make_trip("D-2", 100.0);
        a.vehicle_id = Some("VIN-1".to_string());
        let mut b = make_trip("D-1", 100.0);
        b.driver_name = Some("Ana".to_string());
        b.vehicle_id = Some("VIN-1".to_string());
        let mut c = make_trip("D-1", 100.0);
        c.vehicle_id = Some("VIN-2".to_string());

        let aggregates = DriverAggregator::aggregate(vec![a, b, c]);

        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].driver_id, "D-1");
        assert_eq!(aggregates[0].driver_name, "Ana");
        assert_eq!(aggregates[0].vehicle_count, 2);
        assert_eq!(aggregates[1].driver_name, "D-2");
    }

    #[test]
    fn test_means_and_window() {
        let mut a = make_trip("D-1", 100.0);
        a.speeding_percentage = 10.0;
        a.start_time = Some("2024-01-01T08:00:00Z".parse().unwrap());
        a.end_time = Some("2024-01-01T10:00:00Z".parse().unwrap());
        a.duration_hours = Some(2.0);
        let mut b = make_trip("D-1", 300.0);
        b.speeding_percentage = 30.0;
        b.start_time = Some("2024-01-03T08:00:00Z".parse().unwrap());
        b.end_time = Some("2024-01-03T09:00:00Z".parse().unwrap());
        b.duration_hours = Some(1.0);

        let agg = &DriverAggregator::aggregate(vec![b, a])[0];

        // unweighted trip mean
        assert_eq!(agg.speeding_percentage_avg, 20.0);
        assert_eq!(agg.total_duration_hours, 3.0);
        assert_eq!(agg.window_start, Some("2024-01-01T08:00:00Z".parse().unwrap()));
        assert_eq!(agg.window_end, Some("2024-01-03T09:00:00Z".parse().unwrap()));
        assert!(!agg.has_flag(AggregateFlag::MissingTimestamps));
    }
}

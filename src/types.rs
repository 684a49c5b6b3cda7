//! Core types for the Rumbo scoring pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: canonical trips, driver aggregates, normalized sub-scores, pillar
//! scores, equity-adjusted scores and cluster assignments. Each stage wraps the
//! output of the previous one, so later stages only ever add information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed trip by one driver on one vehicle, in canonical units.
///
/// Percentages are already clamped to [0, 100]; distance and fuel are never
/// negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub driver_id: String,
    pub driver_name: Option<String>,
    pub vehicle_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Derived from the timestamp pair
    pub duration_hours: Option<f64>,
    pub distance_km: f64,
    pub harsh_braking_count: f64,
    pub harsh_acceleration_count: f64,
    pub speeding_percentage: f64,
    pub average_speed_kmh: f64,
    pub fuel_liters: f64,
    pub fuel_idling_liters: f64,
    pub idle_time_percentage: f64,
    pub cruise_control_percentage: f64,
    pub coasting_percentage: f64,
    /// Vendor composite driver-support score (0-100)
    pub driver_support_score: f64,
    pub anticipation_score: f64,
    pub brake_score: f64,
    pub hill_driving_score: f64,
    /// fuel_liters x emission factor
    pub co2_kg: f64,
    pub co2_idling_kg: f64,
}

/// Data-quality conditions detected while aggregating a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFlag {
    /// Total distance is zero; per-distance metrics are undefined
    ZeroDistance,
    /// No trip carried a usable timestamp pair
    MissingTimestamps,
}

/// One driver's behavior summarized over the analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverAggregate {
    pub driver_id: String,
    pub driver_name: String,
    pub trip_count: u32,
    pub vehicle_count: u32,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
    pub harsh_braking_total: f64,
    /// Undefined when total distance is zero
    pub harsh_braking_per_100km: Option<f64>,
    pub harsh_acceleration_total: f64,
    pub harsh_acceleration_per_100km: Option<f64>,
    pub speeding_percentage_avg: f64,
    pub average_speed_kmh: f64,
    pub total_fuel_liters: f64,
    pub fuel_per_100km: Option<f64>,
    pub idle_time_percentage_avg: f64,
    pub cruise_control_percentage_avg: f64,
    pub coasting_percentage_avg: f64,
    pub driver_support_score_avg: f64,
    pub anticipation_score_avg: f64,
    pub brake_score_avg: f64,
    pub hill_driving_score_avg: f64,
    pub total_co2_kg: f64,
    pub co2_per_km: Option<f64>,
    pub total_co2_idling_kg: f64,
    pub flags: Vec<AggregateFlag>,
}

impl DriverAggregate {
    pub fn has_flag(&self, flag: AggregateFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Normalized [0, 100] sub-score for every scored metric
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub harsh_braking: f64,
    pub harsh_acceleration: f64,
    pub speeding: f64,
    pub brake_quality: f64,
    pub fuel: f64,
    pub idle: f64,
    pub cruise: f64,
    pub anticipation: f64,
    pub distance: f64,
    pub speed_range: f64,
}

/// Aggregate plus its normalized sub-scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDriver {
    pub aggregate: DriverAggregate,
    pub sub_scores: SubScores,
}

/// Pillar scores and the base driver score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarScores {
    pub safety: f64,
    pub efficiency: f64,
    pub compliance: f64,
    pub carbon_efficiency: f64,
    pub driver_score_base: f64,
}

/// Normalized driver with composite scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDriver {
    pub normalized: NormalizedDriver,
    pub scores: PillarScores,
}

/// Fleet-relative distance correction applied to one driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityAdjustment {
    /// fleet mean distance minus driver distance (km)
    pub km_balance: f64,
    /// Standardized, scaled and clipped balance
    pub km_balance_scaled: f64,
    /// Points added to the base score
    pub adjustment: f64,
}

/// Scored driver with the equity correction applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedDriver {
    pub scored: ScoredDriver,
    pub equity: EquityAdjustment,
    pub driver_score_adjusted: f64,
}

impl AdjustedDriver {
    pub fn aggregate(&self) -> &DriverAggregate {
        &self.scored.normalized.aggregate
    }

    pub fn score_set(&self) -> ScoreSet {
        let s = &self.scored.scores;
        ScoreSet {
            safety_score: s.safety,
            efficiency_score: s.efficiency,
            compliance_score: s.compliance,
            carbon_efficiency_score: s.carbon_efficiency,
            driver_score_base: s.driver_score_base,
            driver_score_adjusted: self.driver_score_adjusted,
        }
    }
}

/// Final per-driver scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub safety_score: f64,
    pub efficiency_score: f64,
    pub compliance_score: f64,
    pub carbon_efficiency_score: f64,
    pub driver_score_base: f64,
    pub driver_score_adjusted: f64,
}

/// Metrics that may span the clustering feature space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterFeature {
    #[serde(rename = "harsh_braking_per_100km")]
    HarshBrakingPer100Km,
    #[serde(rename = "harsh_acceleration_per_100km")]
    HarshAccelerationPer100Km,
    #[serde(rename = "fuel_per_100km")]
    FuelPer100Km,
    #[serde(rename = "idle_time_percentage")]
    IdleTimePercentage,
    #[serde(rename = "driver_support_score")]
    DriverSupportScore,
    #[serde(rename = "speeding_percentage")]
    SpeedingPercentage,
    #[serde(rename = "average_speed_kmh")]
    AverageSpeedKmh,
    #[serde(rename = "cruise_control_percentage")]
    CruiseControlPercentage,
    #[serde(rename = "anticipation_score")]
    AnticipationScore,
    #[serde(rename = "brake_score")]
    BrakeScore,
    #[serde(rename = "co2_per_km")]
    Co2PerKm,
}

impl ClusterFeature {
    /// Braking, fuel, idling, driver support and speeding
    pub fn default_set() -> Vec<ClusterFeature> {
        vec![
            ClusterFeature::HarshBrakingPer100Km,
            ClusterFeature::FuelPer100Km,
            ClusterFeature::IdleTimePercentage,
            ClusterFeature::DriverSupportScore,
            ClusterFeature::SpeedingPercentage,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterFeature::HarshBrakingPer100Km => "harsh_braking_per_100km",
            ClusterFeature::HarshAccelerationPer100Km => "harsh_acceleration_per_100km",
            ClusterFeature::FuelPer100Km => "fuel_per_100km",
            ClusterFeature::IdleTimePercentage => "idle_time_percentage",
            ClusterFeature::DriverSupportScore => "driver_support_score",
            ClusterFeature::SpeedingPercentage => "speeding_percentage",
            ClusterFeature::AverageSpeedKmh => "average_speed_kmh",
            ClusterFeature::CruiseControlPercentage => "cruise_control_percentage",
            ClusterFeature::AnticipationScore => "anticipation_score",
            ClusterFeature::BrakeScore => "brake_score",
            ClusterFeature::Co2PerKm => "co2_per_km",
        }
    }

    /// Raw value for one driver; `None` when undefined (zero distance)
    pub fn value(&self, aggregate: &DriverAggregate) -> Option<f64> {
        match self {
            ClusterFeature::HarshBrakingPer100Km => aggregate.harsh_braking_per_100km,
            ClusterFeature::HarshAccelerationPer100Km => aggregate.harsh_acceleration_per_100km,
            ClusterFeature::FuelPer100Km => aggregate.fuel_per_100km,
            ClusterFeature::IdleTimePercentage => Some(aggregate.idle_time_percentage_avg),
            ClusterFeature::DriverSupportScore => Some(aggregate.driver_support_score_avg),
            ClusterFeature::SpeedingPercentage => Some(aggregate.speeding_percentage_avg),
            ClusterFeature::AverageSpeedKmh => Some(aggregate.average_speed_kmh),
            ClusterFeature::CruiseControlPercentage => {
                Some(aggregate.cruise_control_percentage_avg)
            }
            ClusterFeature::AnticipationScore => Some(aggregate.anticipation_score_avg),
            ClusterFeature::BrakeScore => Some(aggregate.brake_score_avg),
            ClusterFeature::Co2PerKm => aggregate.co2_per_km,
        }
    }
}

/// Human-readable behavioral segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterName {
    Conservative,
    Balanced,
    Aggressive,
}

impl ClusterName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterName::Conservative => "Conservative",
            ClusterName::Balanced => "Balanced",
            ClusterName::Aggressive => "Aggressive",
        }
    }
}

/// Cluster membership of one driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub label: usize,
    pub name: ClusterName,
    /// Coordinates on the first two principal directions
    pub projection: [f64; 2],
}

/// Fully processed driver: scores plus optional cluster membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverResult {
    pub driver: AdjustedDriver,
    /// Absent when clustering was undefined for the run
    pub cluster: Option<ClusterAssignment>,
}

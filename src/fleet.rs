//! Fleet-level statistics over the final driver results

use crate::stats;
use crate::types::{ClusterName, DriverResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Adjusted-score lower bounds of the performance bands
pub const EXCELLENT_THRESHOLD: f64 = 85.0;
pub const GOOD_THRESHOLD: f64 = 70.0;
pub const AVERAGE_THRESHOLD: f64 = 60.0;

/// Location and spread of one score across the fleet
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ScoreSummary {
    pub fn from_values(values: &[f64]) -> Self {
        ScoreSummary {
            mean: stats::mean(values).unwrap_or(0.0),
            std: stats::population_std(values).unwrap_or(0.0),
            min: values.iter().copied().reduce(f64::min).unwrap_or(0.0),
            max: values.iter().copied().reduce(f64::max).unwrap_or(0.0),
        }
    }
}

/// Driver counts per adjusted-score band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceDistribution {
    /// >= 85
    pub excellent: usize,
    /// [70, 85)
    pub good: usize,
    /// [60, 70)
    pub average: usize,
    /// < 60
    pub needs_improvement: usize,
}

impl PerformanceDistribution {
    pub fn record(&mut self, adjusted_score: f64) {
        if adjusted_score >= EXCELLENT_THRESHOLD {
            self.excellent += 1;
        } else if adjusted_score >= GOOD_THRESHOLD {
            self.good += 1;
        } else if adjusted_score >= AVERAGE_THRESHOLD {
            self.average += 1;
        } else {
            self.needs_improvement += 1;
        }
    }
}

/// A single driver singled out by some fleet-wide maximum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverHighlight {
    pub driver_id: String,
    pub driver_name: String,
    pub value: f64,
}

/// Fleet summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStatistics {
    pub driver_count: usize,
    pub trip_count: u64,
    pub total_distance_km: f64,
    pub distance_mean_km: f64,
    pub distance_std_km: f64,
    pub safety: ScoreSummary,
    pub efficiency: ScoreSummary,
    pub compliance: ScoreSummary,
    pub carbon_efficiency: ScoreSummary,
    pub driver_score_base: ScoreSummary,
    pub driver_score_adjusted: ScoreSummary,
    pub total_co2_kg: f64,
    /// Fleet CO2 over fleet distance; undefined without distance
    pub co2_per_km: Option<f64>,
    pub performance_distribution: PerformanceDistribution,
    /// Drivers per cluster name; empty when clustering was undefined
    pub cluster_distribution: BTreeMap<ClusterName, usize>,
    /// Highest adjusted score
    pub top_performer: Option<DriverHighlight>,
    /// Longest total distance
    pub most_experienced: Option<DriverHighlight>,
}

impl FleetStatistics {
    pub fn compute(results: &[DriverResult]) -> Self {
        let column = |f: fn(&DriverResult) -> f64| results.iter().map(f).collect::<Vec<f64>>();

        let distances = column(|r| r.driver.aggregate().total_distance_km);
        let total_distance_km: f64 = distances.iter().sum();
        let total_co2_kg: f64 = results.iter().map(|r| r.driver.aggregate().total_co2_kg).sum();

        let mut performance_distribution = PerformanceDistribution::default();
        let mut cluster_distribution = BTreeMap::new();
        for result in results {
            performance_distribution.record(result.driver.driver_score_adjusted);
            if let Some(cluster) = &result.cluster {
                *cluster_distribution.entry(cluster.name).or_insert(0) += 1;
            }
        }

        FleetStatistics {
            driver_count: results.len(),
            trip_count: results
                .iter()
                .map(|r| u64::from(r.driver.aggregate().trip_count))
                .sum(),
            total_distance_km,
            distance_mean_km: stats::mean(&distances).unwrap_or(0.0),
            distance_std_km: stats::population_std(&distances).unwrap_or(0.0),
            safety: ScoreSummary::from_values(&column(|r| r.driver.scored.scores.safety)),
            efficiency: ScoreSummary::from_values(&column(|r| r.driver.scored.scores.efficiency)),
            compliance: ScoreSummary::from_values(&column(|r| r.driver.scored.scores.compliance)),
            carbon_efficiency: ScoreSummary::from_values(&column(|r| {
                r.driver.scored.scores.carbon_efficiency
            })),
            driver_score_base: ScoreSummary::from_values(&column(|r| {
                r.driver.scored.scores.driver_score_base
            })),
            driver_score_adjusted: ScoreSummary::from_values(&column(|r| {
                r.driver.driver_score_adjusted
            })),
            total_co2_kg,
            co2_per_km: (total_distance_km > 0.0).then(|| total_co2_kg / total_distance_km),
            performance_distribution,
            cluster_distribution,
            top_performer: highlight(results, |r| r.driver.driver_score_adjusted),
            most_experienced: highlight(results, |r| r.driver.aggregate().total_distance_km),
        }
    }
}

/// Driver with the largest value; the first one wins ties
fn highlight(results: &[DriverResult], value: fn(&DriverResult) -> f64) -> Option<DriverHighlight> {
    let mut best: Option<(&DriverResult, f64)> = None;
    for result in results {
        let v = value(result);
        match best {
            Some((_, b)) if b >= v => {}
            _ => best = Some((result, v)),
        }
    }
    best.map(|(r, v)| DriverHighlight {
        driver_id: r.driver.aggregate().driver_id.clone(),
        driver_name: r.driver.aggregate().driver_name.clone(),
        value: v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::equity::EquityAdjuster;
    use crate::scorer::CompositeScorer;
    use crate::test_support::make_aggregate;
    use crate::types::ClusterAssignment;

    fn results(distances: &[f64]) -> Vec<DriverResult> {
        let config = ScoringConfig::default();
        let scored = distances
            .iter()
            .enumerate()
            .map(|(i, d)| {
                CompositeScorer::score_aggregate(make_aggregate(&format!("D-{i}"), *d, 0.3, 26.0), &config)
            })
            .collect();
        EquityAdjuster::adjust(scored, &config.equity)
            .into_iter()
            .map(|driver| DriverResult {
                driver,
                cluster: None,
            })
            .collect()
    }

    #[test]
    fn test_distance_statistics() {
        let stats = FleetStatistics::compute(&results(&[10_000.0, 20_000.0]));
        assert_eq!(stats.driver_count, 2);
        assert_eq!(stats.trip_count, 2);
        assert_eq!(stats.total_distance_km, 30_000.0);
        assert_eq!(stats.distance_mean_km, 15_000.0);
        assert_eq!(stats.distance_std_km, 5_000.0);
        assert_eq!(stats.most_experienced.unwrap().driver_id, "D-1");
        assert!(stats.cluster_distribution.is_empty());
    }

    #[test]
    fn test_top_performer_and_bands() {
        let mut results = results(&[1_000.0, 1_000.0, 1_000.0, 1_000.0]);
        for (r, score) in results.iter_mut().zip([90.0, 72.0, 61.0, 12.0]) {
            r.driver.driver_score_adjusted = score;
        }
        let stats = FleetStatistics::compute(&results);

        assert_eq!(
            stats.performance_distribution,
            PerformanceDistribution {
                excellent: 1,
                good: 1,
                average: 1,
                needs_improvement: 1
            }
        );
        let top = stats.top_performer.unwrap();
        assert_eq!(top.driver_id, "D-0");
        assert_eq!(top.value, 90.0);
        assert_eq!(stats.driver_score_adjusted.max, 90.0);
        assert_eq!(stats.driver_score_adjusted.min, 12.0);
    }

    #[test]
    fn test_band_edges() {
        let mut bands = PerformanceDistribution::default();
        for score in [85.0, 70.0, 60.0, 59.999] {
            bands.record(score);
        }
        assert_eq!(bands.excellent, 1);
        assert_eq!(bands.good, 1);
        assert_eq!(bands.average, 1);
        assert_eq!(bands.needs_improvement, 1);
    }

    #[test]
    fn test_cluster_distribution() {
        let mut results = results(&[100.0, 200.0, 300.0]);
        for (r, name) in results.iter_mut().zip([
            ClusterName::Conservative,
            ClusterName::Aggressive,
            ClusterName::Conservative,
        ]) {
            r.cluster = Some(ClusterAssignment {
                label: 0,
                name,
                projection: [0.0, 0.0],
            });
        }
        let stats = FleetStatistics::compute(&results);
        assert_eq!(stats.cluster_distribution[&ClusterName::Conservative], 2);
        assert_eq!(stats.cluster_distribution[&ClusterName::Aggressive], 1);
    }

    #[test]
    fn test_empty_fleet() {
        let stats = FleetStatistics::compute(&[]);
        assert_eq!(stats.driver_count, 0);
        assert!(stats.top_performer.is_none());
        assert_eq!(stats.co2_per_km, None);
    }
}

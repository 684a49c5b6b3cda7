//! Composite scoring
//!
//! Combines normalized sub-scores into the safety, efficiency and compliance
//! pillars, then into the base driver score. Carbon efficiency is scored
//! separately from the emission rate and does not enter the base score.

use crate::config::{CarbonConfig, PillarWeights, ScoringConfig};
use crate::normalizer::Normalizer;
use crate::types::{DriverAggregate, NormalizedDriver, PillarScores, ScoredDriver, SubScores};

/// Scorer for converting normalized drivers to pillar scores
pub struct CompositeScorer;

impl CompositeScorer {
    /// Normalize and score one driver aggregate
    pub fn score_aggregate(aggregate: DriverAggregate, config: &ScoringConfig) -> ScoredDriver {
        let normalized = Normalizer::normalize(aggregate, &config.anchors);
        Self::score(normalized, &config.weights, &config.carbon)
    }

    pub fn score(
        normalized: NormalizedDriver,
        weights: &PillarWeights,
        carbon: &CarbonConfig,
    ) -> ScoredDriver {
        let scores = pillar_scores(
            &normalized.sub_scores,
            normalized.aggregate.co2_per_km,
            weights,
            carbon,
        );
        ScoredDriver { normalized, scores }
    }
}

/// Pillars and base score from sub-scores
pub fn pillar_scores(
    sub: &SubScores,
    co2_per_km: Option<f64>,
    weights: &PillarWeights,
    carbon: &CarbonConfig,
) -> PillarScores {
    let w = &weights.safety;
    let safety = w.harsh_braking * sub.harsh_braking
        + w.speeding * sub.speeding
        + w.brake_quality * sub.brake_quality
        + w.harsh_acceleration * sub.harsh_acceleration;

    let w = &weights.efficiency;
    let efficiency = w.fuel * sub.fuel
        + w.idle * sub.idle
        + w.cruise * sub.cruise
        + w.anticipation * sub.anticipation;

    let w = &weights.compliance;
    let compliance = w.distance * sub.distance + w.speed_range * sub.speed_range;

    let w = &weights.overall;
    let driver_score_base = w.safety * safety + w.efficiency * efficiency + w.compliance * compliance;

    PillarScores {
        safety,
        efficiency,
        compliance,
        carbon_efficiency: carbon_score(co2_per_km, carbon),
        driver_score_base,
    }
}

/// Carbon efficiency in [0, 100]; an undefined rate scores 0
pub fn carbon_score(co2_per_km: Option<f64>, carbon: &CarbonConfig) -> f64 {
    match co2_per_km.filter(|v| v.is_finite()) {
        Some(rate) => {
            let (low, high) = (carbon.low_threshold_kg_per_km, carbon.high_threshold_kg_per_km);
            ((high - rate) / (high - low) * 100.0).clamp(0.0, 100.0)
        }
        None => 0.0,
    }
}

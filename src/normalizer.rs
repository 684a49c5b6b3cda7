//! Feature normalization
//!
//! This module converts raw driver aggregate metrics into bounded sub-scores.
//! - Every metric maps to [0, 100] through a piecewise-linear [`Transform`]
//! - Values beyond the anchors are clamped, never extrapolated
//! - Undefined metrics (zero distance upstream) score 0

use crate::config::NormalizationAnchors;
use crate::types::{DriverAggregate, NormalizedDriver, SubScores};
use serde::{Deserialize, Serialize};

/// Piecewise-linear mapping from a raw metric to a [0, 100] score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Transform {
    /// `favorable` scores 100, `unfavorable` scores 0. Either may be the
    /// larger value.
    Linear { favorable: f64, unfavorable: f64 },
    /// 100 on the plateau `[low, high]`, falling linearly to 0 at
    /// `lower_zero` and at `upper_zero`.
    Band {
        low: f64,
        high: f64,
        lower_zero: f64,
        upper_zero: f64,
    },
}

impl Transform {
    pub const fn linear(favorable: f64, unfavorable: f64) -> Self {
        Transform::Linear {
            favorable,
            unfavorable,
        }
    }

    pub const fn band(low: f64, high: f64, lower_zero: f64, upper_zero: f64) -> Self {
        Transform::Band {
            low,
            high,
            lower_zero,
            upper_zero,
        }
    }

    /// Score a raw value. NaN scores 0.
    pub fn apply(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        let score = match *self {
            Transform::Linear {
                favorable,
                unfavorable,
            } => (unfavorable - value) / (unfavorable - favorable) * 100.0,
            Transform::Band {
                low,
                high,
                lower_zero,
                upper_zero,
            } => {
                if value < low {
                    (value - lower_zero) / (low - lower_zero) * 100.0
                } else if value > high {
                    (upper_zero - value) / (upper_zero - high) * 100.0
                } else {
                    100.0
                }
            }
        };
        score.clamp(0.0, 100.0)
    }

    /// Score an optional value; undefined scores 0
    pub fn apply_opt(&self, value: Option<f64>) -> f64 {
        value.map_or(0.0, |v| self.apply(v))
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match *self {
            Transform::Linear {
                favorable,
                unfavorable,
            } => {
                if !favorable.is_finite() || !unfavorable.is_finite() {
                    return Err("anchors must be finite".to_string());
                }
                if favorable == unfavorable {
                    return Err(format!("favorable and unfavorable anchors coincide at {favorable}"));
                }
                Ok(())
            }
            Transform::Band {
                low,
                high,
                lower_zero,
                upper_zero,
            } => {
                if ![low, high, lower_zero, upper_zero].iter().all(|v| v.is_finite()) {
                    return Err("anchors must be finite".to_string());
                }
                if !(lower_zero < low && low <= high && high < upper_zero) {
                    return Err(format!(
                        "expected lower_zero < low <= high < upper_zero, got {lower_zero} / {low} / {high} / {upper_zero}"
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Normalizer for converting driver aggregates to sub-scores
pub struct Normalizer;

impl Normalizer {
    /// Normalize one driver aggregate
    pub fn normalize(aggregate: DriverAggregate, anchors: &NormalizationAnchors) -> NormalizedDriver {
        let sub_scores = Self::sub_scores(&aggregate, anchors);
        NormalizedDriver {
            aggregate,
            sub_scores,
        }
    }

    pub fn sub_scores(aggregate: &DriverAggregate, anchors: &NormalizationAnchors) -> SubScores {
        SubScores {
            harsh_braking: anchors.harsh_braking.apply_opt(aggregate.harsh_braking_per_100km),
            harsh_acceleration: anchors
                .harsh_acceleration
                .apply_opt(aggregate.harsh_acceleration_per_100km),
            speeding: anchors.speeding.apply(aggregate.speeding_percentage_avg),
            brake_quality: anchors.brake_quality.apply(aggregate.brake_score_avg),
            fuel: anchors.fuel.apply_opt(aggregate.fuel_per_100km),
            idle: anchors.idle.apply(aggregate.idle_time_percentage_avg),
            cruise: anchors.cruise.apply(aggregate.cruise_control_percentage_avg),
            anticipation: anchors.anticipation.apply(aggregate.anticipation_score_avg),
            distance: anchors.distance.apply(aggregate.total_distance_km),
            speed_range: anchors.average_speed.apply(aggregate.average_speed_kmh),
        }
    }
}

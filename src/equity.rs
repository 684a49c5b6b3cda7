//! Equity adjustment
//!
//! Drivers who logged less distance than the fleet average get a bounded
//! bonus, those above it a bounded penalty. The correction depends on the
//! whole population, so this stage runs once over every scored driver.

use crate::config::EquityConfig;
use crate::stats;
use crate::types::{AdjustedDriver, EquityAdjustment, ScoredDriver};
use tracing::debug;

/// Fleet distance statistics the adjustment is computed against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceReference {
    pub mean_km: f64,
    pub std_km: f64,
}

impl DistanceReference {
    pub fn from_drivers(drivers: &[ScoredDriver]) -> Self {
        let distances: Vec<f64> = drivers
            .iter()
            .map(|d| d.normalized.aggregate.total_distance_km)
            .collect();
        DistanceReference {
            mean_km: stats::mean(&distances).unwrap_or(0.0),
            std_km: stats::population_std(&distances).unwrap_or(0.0),
        }
    }

    /// Correction for one driver's distance
    pub fn adjustment_for(&self, distance_km: f64, config: &EquityConfig) -> EquityAdjustment {
        let km_balance = self.mean_km - distance_km;
        let km_balance_scaled = if self.std_km.is_finite() && self.std_km > 0.0 {
            (km_balance / self.std_km * config.scale).clamp(-config.cap, config.cap)
        } else {
            0.0
        };
        EquityAdjustment {
            km_balance,
            km_balance_scaled,
            adjustment: config.alpha * km_balance_scaled,
        }
    }
}

/// Adjuster applying the distance-balance correction
pub struct EquityAdjuster;

impl EquityAdjuster {
    /// Adjust every driver against the fleet they belong to.
    ///
    /// The adjusted score is not re-clipped, so it may leave [0, 100] by at
    /// most `alpha * cap`.
    pub fn adjust(drivers: Vec<ScoredDriver>, config: &EquityConfig) -> Vec<AdjustedDriver> {
        let reference = DistanceReference::from_drivers(&drivers);
        debug!(
            mean_km = reference.mean_km,
            std_km = reference.std_km,
            "equity reference"
        );

        drivers
            .into_iter()
            .map(|scored| {
                let equity = reference
                    .adjustment_for(scored.normalized.aggregate.total_distance_km, config);
                let driver_score_adjusted = scored.scores.driver_score_base + equity.adjustment;
                AdjustedDriver {
                    scored,
                    equity,
                    driver_score_adjusted,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::scorer::CompositeScorer;
    use crate::test_support::make_aggregate;

    fn scored(driver_id: &str, distance_km: f64) -> ScoredDriver {
        let config = ScoringConfig::default();
        CompositeScorer::score_aggregate(make_aggregate(driver_id, distance_km, 0.3, 26.0), &config)
    }

    #[test]
    fn test_distance_scenario_difference() {
        let mut a = scored("A", 10_000.0);
        let mut b = scored("B", 20_000.0);
        // identical base scores isolate the equity term
        a.scores.driver_score_base = 70.0;
        b.scores.driver_score_base = 70.0;

        let adjusted = EquityAdjuster::adjust(vec![a, b], &EquityConfig::default());

        assert_eq!(adjusted[0].equity.km_balance, 5_000.0);
        assert_eq!(adjusted[0].equity.km_balance_scaled, 5.0);
        assert!((adjusted[0].equity.adjustment - 0.75).abs() < 1e-12);
        assert!((adjusted[1].equity.adjustment + 0.75).abs() < 1e-12);
        let diff = adjusted[0].driver_score_adjusted - adjusted[1].driver_score_adjusted;
        assert!((diff - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_adjustment_bounded() {
        let config = EquityConfig::default();
        let mut distances = vec![10.0; 50];
        distances.push(1_000_000.0);
        let drivers: Vec<ScoredDriver> = distances
            .iter()
            .enumerate()
            .map(|(i, d)| scored(&format!("D-{i}"), *d))
            .collect();

        let adjusted = EquityAdjuster::adjust(drivers, &config);
        for driver in &adjusted {
            assert!(driver.equity.adjustment.abs() <= config.max_adjustment() + 1e-12);
        }
        // the outlier is clipped at the cap
        let outlier = adjusted.last().unwrap();
        assert!((outlier.equity.adjustment + config.max_adjustment()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_at_mean_and_sign() {
        let reference = DistanceReference {
            mean_km: 1_000.0,
            std_km: 200.0,
        };
        let config = EquityConfig::default();

        assert_eq!(reference.adjustment_for(1_000.0, &config).adjustment, 0.0);
        assert!(reference.adjustment_for(800.0, &config).adjustment > 0.0);
        assert!(reference.adjustment_for(1_200.0, &config).adjustment < 0.0);
    }

    #[test]
    fn test_zero_std_gives_zero_adjustment() {
        let drivers = vec![scored("A", 500.0), scored("B", 500.0)];
        let adjusted = EquityAdjuster::adjust(drivers, &EquityConfig::default());
        for driver in &adjusted {
            assert_eq!(driver.equity.adjustment, 0.0);
            assert_eq!(
                driver.driver_score_adjusted,
                driver.scored.scores.driver_score_base
            );
        }

        let reference = DistanceReference {
            mean_km: 1.0,
            std_km: f64::NAN,
        };
        assert_eq!(
            reference.adjustment_for(0.0, &EquityConfig::default()).adjustment,
            0.0
        );
    }

    #[test]
    fn test_single_driver_gets_no_adjustment() {
        let adjusted = EquityAdjuster::adjust(vec![scored("A", 800.0)], &EquityConfig::default());
        assert_eq!(adjusted[0].equity.adjustment, 0.0);
    }
}

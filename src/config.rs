//! Scoring configuration
//!
//! Every tunable of the pipeline (pillar weights, normalization anchors,
//! carbon thresholds, equity parameters, clustering protocol) lives in one
//! [`ScoringConfig`] value that is validated once and then passed by reference
//! into each stage. Two configurations can therefore be evaluated side by side
//! in the same process.
//!
//! Every section is `#[serde(default)]`, so a JSON override only needs the
//! keys it changes.

use crate::error::{ComputeError, ConfigError};
use crate::normalizer::Transform;
use crate::types::ClusterFeature;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Tolerance for "weights sum to 1.0"
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Diesel CO2 emission factor (kg CO2 per liter)
pub const DEFAULT_EMISSION_FACTOR_KG_PER_L: f64 = 2.68;

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: PillarWeights,
    pub anchors: NormalizationAnchors,
    pub carbon: CarbonConfig,
    pub equity: EquityConfig,
    pub clustering: ClusteringConfig,
    pub output: OutputConfig,
}

impl ScoringConfig {
    /// Parse a (possibly partial) JSON configuration and validate it
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: ScoringConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::ParseError(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every invariant; the first violation is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.anchors.validate()?;
        self.carbon.validate()?;
        self.equity.validate()?;
        self.clustering.validate()?;
        Ok(())
    }
}

/// Weights of every convex combination in the scorer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PillarWeights {
    pub safety: SafetyWeights,
    pub efficiency: EfficiencyWeights,
    pub compliance: ComplianceWeights,
    pub overall: OverallWeights,
}

impl PillarWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        check_weight_group(
            "safety",
            &[
                ("harsh_braking", self.safety.harsh_braking),
                ("speeding", self.safety.speeding),
                ("brake_quality", self.safety.brake_quality),
                ("harsh_acceleration", self.safety.harsh_acceleration),
            ],
        )?;
        check_weight_group(
            "efficiency",
            &[
                ("fuel", self.efficiency.fuel),
                ("idle", self.efficiency.idle),
                ("cruise", self.efficiency.cruise),
                ("anticipation", self.efficiency.anticipation),
            ],
        )?;
        check_weight_group(
            "compliance",
            &[
                ("distance", self.compliance.distance),
                ("speed_range", self.compliance.speed_range),
            ],
        )?;
        check_weight_group(
            "overall",
            &[
                ("safety", self.overall.safety),
                ("efficiency", self.overall.efficiency),
                ("compliance", self.overall.compliance),
            ],
        )
    }
}

fn check_weight_group(group: &'static str, weights: &[(&'static str, f64)]) -> Result<(), ConfigError> {
    for &(name, value) in weights {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidWeight { group, name, value });
        }
    }
    let sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
        return Err(ConfigError::WeightSum { group, sum });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyWeights {
    pub harsh_braking: f64,
    pub speeding: f64,
    pub brake_quality: f64,
    pub harsh_acceleration: f64,
}

impl Default for SafetyWeights {
    fn default() -> Self {
        Self {
            harsh_braking: 0.40,
            speeding: 0.30,
            brake_quality: 0.20,
            harsh_acceleration: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyWeights {
    pub fuel: f64,
    pub idle: f64,
    pub cruise: f64,
    pub anticipation: f64,
}

impl Default for EfficiencyWeights {
    fn default() -> Self {
        Self {
            fuel: 0.35,
            idle: 0.25,
            cruise: 0.20,
            anticipation: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceWeights {
    pub distance: f64,
    pub speed_range: f64,
}

impl Default for ComplianceWeights {
    fn default() -> Self {
        Self {
            distance: 0.60,
            speed_range: 0.40,
        }
    }
}

/// Weights of the pillars in the base driver score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverallWeights {
    pub safety: f64,
    pub efficiency: f64,
    pub compliance: f64,
}

impl Default for OverallWeights {
    fn default() -> Self {
        Self {
            safety: 0.40,
            efficiency: 0.35,
            compliance: 0.25,
        }
    }
}

/// Per-metric normalization transforms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationAnchors {
    /// Harsh braking events per 100 km
    pub harsh_braking: Transform,
    /// Harsh acceleration events per 100 km
    pub harsh_acceleration: Transform,
    /// Share of time over the speed limit (%)
    pub speeding: Transform,
    /// Vendor brake-usage score (0-100)
    pub brake_quality: Transform,
    /// Fuel consumption (L/100km)
    pub fuel: Transform,
    /// Idle time (%)
    pub idle: Transform,
    /// Cruise-control usage (%)
    pub cruise: Transform,
    /// Vendor anticipation score (0-100)
    pub anticipation: Transform,
    /// Total distance in the analysis window (km)
    pub distance: Transform,
    /// Mean trip speed (km/h)
    pub average_speed: Transform,
}

impl Default for NormalizationAnchors {
    fn default() -> Self {
        Self {
            harsh_braking: Transform::linear(0.0, 1.0),
            harsh_acceleration: Transform::linear(0.0, 1.0),
            speeding: Transform::linear(0.0, 100.0),
            brake_quality: Transform::linear(100.0, 0.0),
            fuel: Transform::linear(22.0, 32.0),
            idle: Transform::linear(0.0, 20.0),
            cruise: Transform::linear(100.0, 0.0),
            anticipation: Transform::linear(100.0, 0.0),
            distance: Transform::linear(15_000.0, 0.0),
            average_speed: Transform::band(50.0, 70.0, 0.0, 100.0),
        }
    }
}

impl NormalizationAnchors {
    fn validate(&self) -> Result<(), ConfigError> {
        let transforms = [
            ("harsh_braking", &self.harsh_braking),
            ("harsh_acceleration", &self.harsh_acceleration),
            ("speeding", &self.speeding),
            ("brake_quality", &self.brake_quality),
            ("fuel", &self.fuel),
            ("idle", &self.idle),
            ("cruise", &self.cruise),
            ("anticipation", &self.anticipation),
            ("distance", &self.distance),
            ("average_speed", &self.average_speed),
        ];
        for (metric, transform) in transforms {
            transform
                .validate()
                .map_err(|reason| ConfigError::InvalidAnchors { metric, reason })?;
        }
        Ok(())
    }
}

/// Carbon accounting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonConfig {
    /// kg CO2 emitted per liter of fuel
    pub emission_factor_kg_per_l: f64,
    /// Emission rate scored 100 (kg CO2/km)
    pub low_threshold_kg_per_km: f64,
    /// Emission rate scored 0 (kg CO2/km)
    pub high_threshold_kg_per_km: f64,
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            emission_factor_kg_per_l: DEFAULT_EMISSION_FACTOR_KG_PER_L,
            low_threshold_kg_per_km: 0.60,
            high_threshold_kg_per_km: 0.85,
        }
    }
}

impl CarbonConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.emission_factor_kg_per_l.is_finite() || self.emission_factor_kg_per_l <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "carbon.emission_factor_kg_per_l",
                requirement: "positive",
                value: self.emission_factor_kg_per_l,
            });
        }
        let (low, high) = (self.low_threshold_kg_per_km, self.high_threshold_kg_per_km);
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(ConfigError::InvertedCarbonThresholds { low, high });
        }
        Ok(())
    }
}

/// Distance-balance (equity) correction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquityConfig {
    /// Multiplier applied to the standardized distance deviation
    pub scale: f64,
    /// Symmetric clip applied after scaling
    pub cap: f64,
    /// Weight of the scaled balance in the adjusted score
    pub alpha: f64,
}

impl Default for EquityConfig {
    fn default() -> Self {
        Self {
            scale: 5.0,
            cap: 10.0,
            alpha: 0.15,
        }
    }
}

impl EquityConfig {
    /// Largest possible |adjustment| in score points
    pub fn max_adjustment(&self) -> f64 {
        self.alpha * self.cap
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("equity.scale", self.scale),
            ("equity.cap", self.cap),
            ("equity.alpha", self.alpha),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name,
                    requirement: "non-negative",
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Behavioral clustering protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Smallest candidate cluster count
    pub k_min: usize,
    /// Largest candidate cluster count
    pub k_max: usize,
    /// Skip K selection and fit this many clusters
    pub k_override: Option<usize>,
    /// Features used to build the standardized space
    pub features: Vec<ClusterFeature>,
    /// Seed for centroid initialization
    pub seed: u64,
    /// Independent k-means++ restarts per fit; the lowest inertia wins
    pub n_init: usize,
    /// Lloyd iteration cap per restart
    pub max_iterations: usize,
    /// Convergence threshold on the largest squared centroid shift
    pub tolerance: f64,
    /// Silhouette slack within which the elbow choice is kept
    pub silhouette_tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 5,
            k_override: None,
            features: ClusterFeature::default_set(),
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-6,
            silhouette_tolerance: 0.0,
        }
    }
}

impl ClusteringConfig {
    /// Candidate cluster counts in ascending order
    pub fn candidates(&self) -> Vec<usize> {
        (self.k_min..=self.k_max).collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.k_min < 2 || self.k_min > self.k_max {
            return Err(ConfigError::InvalidClusterRange {
                k_min: self.k_min,
                k_max: self.k_max,
            });
        }
        if let Some(k) = self.k_override {
            if k < 2 {
                return Err(ConfigError::InvalidParameter {
                    name: "clustering.k_override",
                    requirement: "at least 2",
                    value: k as f64,
                });
            }
        }
        if self.features.is_empty() {
            return Err(ConfigError::EmptyFeatureList);
        }
        let mut seen = HashSet::new();
        for feature in &self.features {
            if !seen.insert(*feature) {
                return Err(ConfigError::DuplicateFeature(feature.as_str().to_string()));
            }
        }
        for (name, value) in [
            ("clustering.n_init", self.n_init),
            ("clustering.max_iterations", self.max_iterations),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidParameter {
                    name,
                    requirement: "at least 1",
                    value: 0.0,
                });
            }
        }
        for (name, value) in [
            ("clustering.tolerance", self.tolerance),
            ("clustering.silhouette_tolerance", self.silhouette_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name,
                    requirement: "non-negative",
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Output encoding options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Decimal places kept on every emitted number
    pub decimals: u32,
    /// Rejected records kept as samples in the report
    pub max_error_samples: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            decimals: 3,
            max_error_samples: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_override() {
        let config = ScoringConfig::from_json(
            r#"{ "equity": { "alpha": 0.2 }, "clustering": { "seed": 7 } }"#,
        )
        .unwrap();

        assert_eq!(config.equity.alpha, 0.2);
        assert_eq!(config.equity.cap, 10.0);
        assert_eq!(config.clustering.seed, 7);
        assert_eq!(config.clustering.k_max, 5);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let json = r#"{ "weights": { "safety": { "harsh_braking": 0.5 } } }"#;
        let err = ScoringConfig::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::Config(ConfigError::WeightSum { group: "safety", .. })
        ));
    }

    #[test]
    fn test_weights_are_not_renormalized() {
        let mut config = ScoringConfig::default();
        config.weights.overall = OverallWeights {
            safety: 0.8,
            efficiency: 0.7,
            compliance: 0.5,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightSum { group: "overall", .. })
        ));
        // the rejected value is left untouched
        assert_eq!(config.weights.overall.safety, 0.8);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = ScoringConfig::default();
        config.weights.compliance = ComplianceWeights {
            distance: 1.2,
            speed_range: -0.2,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "speed_range", .. })
        ));
    }

    #[test]
    fn test_inverted_carbon_thresholds() {
        let mut config = ScoringConfig::default();
        config.carbon.low_threshold_kg_per_km = 0.9;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedCarbonThresholds { .. })
        ));
    }

    #[test]
    fn test_negative_equity_parameters() {
        for field in ["scale", "cap", "alpha"] {
            let mut config = ScoringConfig::default();
            match field {
                "scale" => config.equity.scale = -1.0,
                "cap" => config.equity.cap = -1.0,
                _ => config.equity.alpha = -0.1,
            }
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidParameter { .. })),
                "negative {field} accepted"
            );
        }
    }

    #[test]
    fn test_cluster_range_and_features() {
        let mut config = ScoringConfig::default();
        config.clustering.k_min = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidClusterRange { .. })
        ));

        let mut config = ScoringConfig::default();
        config.clustering.features.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyFeatureList));

        let mut config = ScoringConfig::default();
        config.clustering.features.push(ClusterFeature::FuelPer100Km);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateFeature(_))
        ));
    }

    #[test]
    fn test_inverted_band_anchors() {
        let mut config = ScoringConfig::default();
        config.anchors.average_speed = Transform::band(70.0, 50.0, 0.0, 100.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAnchors { metric: "average_speed", .. })
        ));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = ScoringConfig::default();
        let json = config.to_json().unwrap();
        let parsed = ScoringConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

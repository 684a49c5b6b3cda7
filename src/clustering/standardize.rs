//! Feature matrix construction and z-score standardization

use crate::error::InsufficientPopulation;
use crate::stats;
use crate::types::{ClusterFeature, DriverAggregate};
use std::collections::BTreeSet;

/// Drivers x features matrix in standardized units, plus what is needed to
/// map results back to raw units
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedData {
    pub features: Vec<ClusterFeature>,
    /// Raw values after median imputation, one row per driver
    pub raw: Vec<Vec<f64>>,
    /// z-scores, one row per driver
    pub rows: Vec<Vec<f64>>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    /// Number of distinct raw feature vectors
    pub distinct: usize,
}

impl StandardizedData {
    /// Build the standardized matrix for `aggregates`, in input order.
    ///
    /// Undefined values take the column median (0 when the whole column is
    /// undefined). A constant column standardizes to 0; when every column is
    /// constant the population cannot be clustered.
    pub fn build(
        aggregates: &[&DriverAggregate],
        features: &[ClusterFeature],
        min_drivers: usize,
    ) -> Result<Self, InsufficientPopulation> {
        let required = min_drivers.max(2);
        if aggregates.len() < required {
            return Err(InsufficientPopulation::TooFewDrivers {
                found: aggregates.len(),
                required,
            });
        }

        let columns: Vec<Vec<f64>> = features
            .iter()
            .map(|feature| impute_column(aggregates.iter().map(|a| feature.value(a)).collect()))
            .collect();

        let means: Vec<f64> = columns
            .iter()
            .map(|c| stats::mean(c).unwrap_or(0.0))
            .collect();
        let stds: Vec<f64> = columns
            .iter()
            .map(|c| stats::population_std(c).unwrap_or(0.0))
            .collect();

        if stds.iter().all(|s| !s.is_finite() || *s <= 0.0) {
            return Err(InsufficientPopulation::ZeroVariance);
        }

        let raw: Vec<Vec<f64>> = (0..aggregates.len())
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        let rows: Vec<Vec<f64>> = raw
            .iter()
            .map(|row| {
                row.iter()
                    .zip(means.iter().zip(&stds))
                    .map(|(v, (m, s))| standardize(*v, *m, *s))
                    .collect()
            })
            .collect();

        let distinct = raw
            .iter()
            .map(|row| row.iter().map(|v| (v + 0.0).to_bits()).collect::<Vec<u64>>())
            .collect::<BTreeSet<_>>()
            .len();

        Ok(StandardizedData {
            features: features.to_vec(),
            raw,
            rows,
            means,
            stds,
            distinct,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.features.len()
    }

    /// Map a standardized point back to raw feature units
    pub fn unstandardize(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(z, (m, s))| if *s > 0.0 { m + z * s } else { *m })
            .collect()
    }
}

fn standardize(value: f64, mean: f64, std: f64) -> f64 {
    if std.is_finite() && std > 0.0 {
        (value - mean) / std
    } else {
        0.0
    }
}

fn impute_column(values: Vec<Option<f64>>) -> Vec<f64> {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    let fill = stats::median(&defined).unwrap_or(0.0);
    values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(fill))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::make_aggregate;

    #[test]
    fn test_standardized_columns() {
        let a = make_aggregate("A", 100.0, 0.2, 24.0);
        let b = make_aggregate("B", 100.0, 0.6, 30.0);
        let features = [ClusterFeature::HarshBrakingPer100Km, ClusterFeature::FuelPer100Km];

        let data = StandardizedData::build(&[&a, &b], &features, 2).unwrap();

        assert_eq!(data.len(), 2);
        assert!((data.rows[0][0] + 1.0).abs() < 1e-9);
        assert!((data.rows[1][0] - 1.0).abs() < 1e-9);
        assert!((data.means[1] - 27.0).abs() < 1e-9);
        assert_eq!(data.distinct, 2);
    }

    #[test]
    fn test_constant_column_standardizes_to_zero() {
        let a = make_aggregate("A", 100.0, 0.2, 24.0);
        let b = make_aggregate("B", 100.0, 0.6, 24.0);
        let features = [ClusterFeature::HarshBrakingPer100Km, ClusterFeature::FuelPer100Km];

        let data = StandardizedData::build(&[&a, &b], &features, 2).unwrap();
        assert_eq!(data.rows[0][1], 0.0);
        assert_eq!(data.rows[1][1], 0.0);
    }

    #[test]
    fn test_undefined_values_take_column_median() {
        let a = make_aggregate("A", 100.0, 0.2, 24.0);
        let b = make_aggregate("B", 100.0, 0.4, 26.0);
        let c = make_aggregate("C", 100.0, 0.9, 28.0);
        let z = make_aggregate("Z", 0.0, 0.0, 0.0);
        let features = [ClusterFeature::HarshBrakingPer100Km];

        let data = StandardizedData::build(&[&a, &b, &c, &z], &features, 2).unwrap();
        assert_eq!(data.raw[3][0], 0.4);
    }

    #[test]
    fn test_too_few_drivers() {
        let a = make_aggregate("A", 100.0, 0.2, 24.0);
        let err = StandardizedData::build(&[&a], &ClusterFeature::default_set(), 2).unwrap_err();
        assert_eq!(
            err,
            InsufficientPopulation::TooFewDrivers {
                found: 1,
                required: 2
            }
        );
    }

    #[test]
    fn test_identical_drivers_have_zero_variance() {
        let a = make_aggregate("A", 100.0, 0.2, 24.0);
        let b = make_aggregate("B", 100.0, 0.2, 24.0);
        let err = StandardizedData::build(&[&a, &b], &ClusterFeature::default_set(), 2).unwrap_err();
        assert_eq!(err, InsufficientPopulation::ZeroVariance);
    }

    #[test]
    fn test_unstandardize_round_trip() {
        let a = make_aggregate("A", 100.0, 0.2, 24.0);
        let b = make_aggregate("B", 100.0, 0.6, 30.0);
        let features = [ClusterFeature::HarshBrakingPer100Km, ClusterFeature::FuelPer100Km];
        let data = StandardizedData::build(&[&a, &b], &features, 2).unwrap();

        let back = data.unstandardize(&data.rows[1]);
        assert!((back[0] - 0.6).abs() < 1e-9);
        assert!((back[1] - 30.0).abs() < 1e-9);
    }
}

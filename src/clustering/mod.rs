//! Behavioral clustering
//!
//! Segments the scored driver population with k-means on standardized
//! behavior features:
//! 1. Standardize the configured features ([`StandardizedData`])
//! 2. Evaluate every candidate K and pick one ([`select_optimal_k`])
//! 3. Fit the final model at that K ([`fit_with_k`])
//! 4. Name clusters by the mean safety score of their members
//! 5. Report silhouette, Davies-Bouldin and PCA variance explained
//!
//! Selection and fitting are separate operations; [`cluster_drivers`]
//! composes them and skips selection when a K override is configured.

pub mod kmeans;
pub mod metrics;
pub mod pca;
pub mod selection;
pub mod standardize;

pub use pca::PcaSummary;
pub use selection::{KEvaluation, KSelection, SelectionRule};
pub use standardize::StandardizedData;

use crate::config::ClusteringConfig;
use crate::error::InsufficientPopulation;
use crate::types::{AdjustedDriver, ClusterAssignment, ClusterFeature, ClusterName, DriverAggregate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Fitted partition of the population at one K
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    pub k: usize,
    /// Centroids in standardized units
    pub centroids: Vec<Vec<f64>>,
    /// Cluster label per driver, aligned with the input rows
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
    pub silhouette: f64,
    pub davies_bouldin: f64,
}

impl ClusterModel {
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Evaluate every candidate K in the configured range and choose one.
///
/// Candidates above the number of distinct feature vectors are skipped.
pub fn select_optimal_k(
    data: &StandardizedData,
    config: &ClusteringConfig,
) -> Result<KSelection, InsufficientPopulation> {
    let candidates: Vec<usize> = config
        .candidates()
        .into_iter()
        .filter(|&k| k <= data.distinct && k <= data.len())
        .collect();
    if candidates.is_empty() {
        return Err(InsufficientPopulation::TooFewDistinctProfiles {
            found: data.distinct,
            required: config.k_min,
        });
    }

    let evaluations: Vec<KEvaluation> = candidates
        .into_iter()
        .map(|k| {
            let fit = kmeans::fit(
                &data.rows,
                k,
                config.seed,
                config.n_init,
                config.max_iterations,
                config.tolerance,
            );
            let silhouette = metrics::silhouette_score(&data.rows, &fit.labels, k);
            debug!(k, inertia = fit.inertia, silhouette, "evaluated cluster count");
            KEvaluation {
                k,
                inertia: fit.inertia,
                silhouette,
            }
        })
        .collect();

    // non-empty by construction
    let selection = KSelection::decide(evaluations, config.silhouette_tolerance).ok_or(
        InsufficientPopulation::TooFewDistinctProfiles {
            found: data.distinct,
            required: config.k_min,
        },
    )?;
    info!(
        elbow_k = selection.elbow_k,
        silhouette_k = selection.silhouette_k,
        chosen_k = selection.chosen_k,
        rule = ?selection.rule,
        "selected cluster count"
    );
    Ok(selection)
}

/// Fit k-means at exactly `k` clusters with the configured seed
pub fn fit_with_k(
    data: &StandardizedData,
    k: usize,
    config: &ClusteringConfig,
) -> Result<ClusterModel, InsufficientPopulation> {
    if data.len() < k {
        return Err(InsufficientPopulation::TooFewDrivers {
            found: data.len(),
            required: k,
        });
    }
    if data.distinct < k {
        return Err(InsufficientPopulation::TooFewDistinctProfiles {
            found: data.distinct,
            required: k,
        });
    }

    let fit = kmeans::fit(
        &data.rows,
        k,
        config.seed,
        config.n_init,
        config.max_iterations,
        config.tolerance,
    );
    let silhouette = metrics::silhouette_score(&data.rows, &fit.labels, k);
    let davies_bouldin = metrics::davies_bouldin(&data.rows, &fit.labels, &fit.centroids);

    Ok(ClusterModel {
        k,
        centroids: fit.centroids,
        labels: fit.labels,
        inertia: fit.inertia,
        iterations: fit.iterations,
        converged: fit.converged,
        silhouette,
        davies_bouldin,
    })
}

/// Name clusters by mean member safety: highest is Conservative, lowest is
/// Aggressive, everything between is Balanced. Ties keep label order.
pub fn name_clusters(labels: &[usize], safety_scores: &[f64], k: usize) -> Vec<ClusterName> {
    let mut sums = vec![0.0; k];
    let mut counts = vec![0usize; k];
    for (&label, &safety) in labels.iter().zip(safety_scores) {
        sums[label] += safety;
        counts[label] += 1;
    }
    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| if n > 0 { s / n as f64 } else { f64::NEG_INFINITY })
        .collect();

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| means[b].total_cmp(&means[a]).then(a.cmp(&b)));

    let mut names = vec![ClusterName::Balanced; k];
    if let (Some(&top), Some(&bottom)) = (order.first(), order.last()) {
        names[top] = ClusterName::Conservative;
        if bottom != top {
            names[bottom] = ClusterName::Aggressive;
        }
    }
    names
}

/// Per-cluster summary handed to the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub label: usize,
    pub name: ClusterName,
    pub size: usize,
    pub mean_safety_score: f64,
    pub mean_driver_score_adjusted: f64,
    /// Centroid in raw feature units, keyed by feature name
    pub centroid: BTreeMap<String, f64>,
}

/// Everything clustering produces for one run
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringOutcome {
    pub features: Vec<ClusterFeature>,
    /// Absent when the K override skipped selection
    pub selection: Option<KSelection>,
    pub model: ClusterModel,
    pub pca: PcaSummary,
    pub profiles: Vec<ClusterProfile>,
    /// One assignment per driver, aligned with the input order
    pub assignments: Vec<ClusterAssignment>,
}

/// Standardize, select K (unless overridden), fit, name and summarize
pub fn cluster_drivers(
    drivers: &[AdjustedDriver],
    config: &ClusteringConfig,
) -> Result<ClusteringOutcome, InsufficientPopulation> {
    let aggregates: Vec<&DriverAggregate> = drivers.iter().map(|d| d.aggregate()).collect();
    // a forced K only needs as many drivers as clusters
    let min_drivers = config.k_override.unwrap_or(config.k_min);
    let data = StandardizedData::build(&aggregates, &config.features, min_drivers)?;

    let (selection, k) = match config.k_override {
        Some(k) => {
            info!(k, "cluster count fixed by configuration");
            (None, k)
        }
        None => {
            let selection = select_optimal_k(&data, config)?;
            let k = selection.chosen_k;
            (Some(selection), k)
        }
    };

    let model = fit_with_k(&data, k, config)?;
    let pca = PcaSummary::fit(&data.rows);

    let safety: Vec<f64> = drivers.iter().map(|d| d.scored.scores.safety).collect();
    let names = name_clusters(&model.labels, &safety, k);

    let assignments: Vec<ClusterAssignment> = model
        .labels
        .iter()
        .zip(&data.rows)
        .map(|(&label, row)| ClusterAssignment {
            label,
            name: names[label],
            projection: pca.project(row),
        })
        .collect();

    let profiles = build_profiles(drivers, &data, &model, &names);

    info!(
        k,
        silhouette = model.silhouette,
        davies_bouldin = model.davies_bouldin,
        variance_explained = pca.total_variance_explained(),
        "clustered drivers"
    );

    Ok(ClusteringOutcome {
        features: config.features.clone(),
        selection,
        model,
        pca,
        profiles,
        assignments,
    })
}

fn build_profiles(
    drivers: &[AdjustedDriver],
    data: &StandardizedData,
    model: &ClusterModel,
    names: &[ClusterName],
) -> Vec<ClusterProfile> {
    let sizes = model.sizes();
    (0..model.k)
        .map(|label| {
            let members: Vec<&AdjustedDriver> = drivers
                .iter()
                .zip(&model.labels)
                .filter(|(_, &l)| l == label)
                .map(|(d, _)| d)
                .collect();
            let mean_of = |f: fn(&AdjustedDriver) -> f64| {
                if members.is_empty() {
                    0.0
                } else {
                    members.iter().map(|d| f(d)).sum::<f64>() / members.len() as f64
                }
            };
            let centroid = data
                .features
                .iter()
                .zip(data.unstandardize(&model.centroids[label]))
                .map(|(feature, value)| (feature.as_str().to_string(), value))
                .collect();
            ClusterProfile {
                label,
                name: names[label],
                size: sizes[label],
                mean_safety_score: mean_of(|d| d.scored.scores.safety),
                mean_driver_score_adjusted: mean_of(|d| d.driver_score_adjusted),
                centroid,
            }
        })
        .collect()
}

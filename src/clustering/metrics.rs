//! Partition quality metrics

use crate::clustering::kmeans::distance;

/// Per-point silhouette coefficients.
///
/// Members of singleton clusters score 0, as does every point when fewer than
/// two clusters are populated.
pub fn silhouette_samples(points: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<f64> {
    let mut sizes = vec![0usize; k];
    for &label in labels {
        sizes[label] += 1;
    }
    let populated = sizes.iter().filter(|&&s| s > 0).count();
    if populated < 2 {
        return vec![0.0; points.len()];
    }

    points
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (point, &own))| {
            if sizes[own] <= 1 {
                return 0.0;
            }
            let mut sums = vec![0.0; k];
            for (j, (other, &label)) in points.iter().zip(labels).enumerate() {
                if i != j {
                    sums[label] += distance(point, other);
                }
            }
            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .collect()
}

/// Mean silhouette coefficient over every point
pub fn silhouette_score(points: &[Vec<f64>], labels: &[usize], k: usize) -> f64 {
    let samples = silhouette_samples(points, labels, k);
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Davies-Bouldin index; lower is better.
///
/// Cluster pairs whose centroids coincide are skipped, and empty clusters do
/// not contribute.
pub fn davies_bouldin(points: &[Vec<f64>], labels: &[usize], centroids: &[Vec<f64>]) -> f64 {
    let k = centroids.len();
    let mut scatter = vec![0.0; k];
    let mut sizes = vec![0usize; k];
    for (point, &label) in points.iter().zip(labels) {
        scatter[label] += distance(point, &centroids[label]);
        sizes[label] += 1;
    }
    for (s, &n) in scatter.iter_mut().zip(&sizes) {
        if n > 0 {
            *s /= n as f64;
        }
    }

    let populated: Vec<usize> = (0..k).filter(|&c| sizes[c] > 0).collect();
    if populated.len() < 2 {
        return 0.0;
    }
    let total: f64 = populated
        .iter()
        .map(|&i| {
            populated
                .iter()
                .filter(|&&j| j != i)
                .filter_map(|&j| {
                    let d = distance(&centroids[i], &centroids[j]);
                    (d > 0.0).then(|| (scatter[i] + scatter[j]) / d)
                })
                .fold(0.0, f64::max)
        })
        .sum();
    total / populated.len() as f64
}

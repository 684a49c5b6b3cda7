//! Principal components of the standardized feature space
//!
//! The covariance matrix is small (one row per clustering feature), so a
//! cyclic Jacobi eigen-decomposition is exact enough and dependency free.

const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_EPSILON: f64 = 1e-12;

/// Leading principal directions and their explained variance
#[derive(Debug, Clone, PartialEq)]
pub struct PcaSummary {
    /// Eigenvalues in descending order
    pub eigenvalues: Vec<f64>,
    /// Unit eigenvectors matching `eigenvalues`
    pub components: Vec<Vec<f64>>,
    /// Share of total variance on the first two directions
    pub variance_explained: [f64; 2],
}

impl PcaSummary {
    /// Decompose the population covariance of `rows`
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let dims = rows.first().map_or(0, Vec::len);
        let cov = covariance(rows, dims);
        let (eigenvalues, components) = jacobi_eigen(cov);

        let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let share = |i: usize| match eigenvalues.get(i) {
            Some(v) if total > 0.0 => v.max(0.0) / total,
            _ => 0.0,
        };
        let variance_explained = [share(0), share(1)];

        PcaSummary {
            eigenvalues,
            components,
            variance_explained,
        }
    }

    /// Combined share of the first two directions
    pub fn total_variance_explained(&self) -> f64 {
        self.variance_explained[0] + self.variance_explained[1]
    }

    /// Coordinates of a standardized point on the first two directions
    pub fn project(&self, row: &[f64]) -> [f64; 2] {
        let coord = |i: usize| {
            self.components
                .get(i)
                .map_or(0.0, |c| c.iter().zip(row).map(|(a, b)| a * b).sum())
        };
        [coord(0), coord(1)]
    }
}

fn covariance(rows: &[Vec<f64>], dims: usize) -> Vec<Vec<f64>> {
    let n = rows.len() as f64;
    let mut means = vec![0.0; dims];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut cov = vec![vec![0.0; dims]; dims];
    for row in rows {
        for i in 0..dims {
            for j in i..dims {
                cov[i][j] += (row[i] - means[i]) * (row[j] - means[j]) / n;
            }
        }
    }
    for i in 0..dims {
        for j in 0..i {
            cov[i][j] = cov[j][i];
        }
    }
    cov
}

/// Eigen-decomposition of a symmetric matrix, sorted by descending eigenvalue.
///
/// Each eigenvector is oriented so its largest-magnitude entry is positive.
pub fn jacobi_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[i][j] * a[i][j])
            .sum();
        if off < JACOBI_EPSILON {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[p][q].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let vkp = row[p];
                    let vkq = row[q];
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut pairs: Vec<(f64, Vec<f64>)> = (0..n)
        .map(|i| {
            let mut vector: Vec<f64> = v.iter().map(|row| row[i]).collect();
            let pivot = vector
                .iter()
                .copied()
                .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
            if pivot < 0.0 {
                vector.iter_mut().for_each(|x| *x = -*x);
            }
            (a[i][i], vector)
        })
        .collect();
    pairs.sort_by(|x, y| y.0.total_cmp(&x.0));
    pairs.into_iter().unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jacobi_known_matrix() {
        // eigenvalues 3 and 1, eigenvectors (1, 1)/sqrt2 and (1, -1)/sqrt2
        let (values, vectors) = jacobi_eigen(vec![vec![2.0, 1.0], vec![1.0, 2.0]]);
        assert!((values[0] - 3.0).abs() < 1e-9);
        assert!((values[1] - 1.0).abs() < 1e-9);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!((vectors[0][0] - h).abs() < 1e-9);
        assert!((vectors[0][1] - h).abs() < 1e-9);
        assert!((vectors[1][0].abs() - h).abs() < 1e-9);
    }

    #[test]
    fn test_jacobi_diagonal() {
        let (values, _) = jacobi_eigen(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 5.0, 0.0],
            vec![0.0, 0.0, 2.0],
        ]);
        assert_eq!(values, vec![5.0, 2.0, 1.0]);
    }

    #[test]
    fn test_collinear_data_explained_by_one_direction() {
        let rows: Vec<Vec<f64>> = (-3..=3).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let pca = PcaSummary::fit(&rows);

        assert!((pca.variance_explained[0] - 1.0).abs() < 1e-9);
        assert!(pca.variance_explained[1].abs() < 1e-9);
        assert!((pca.total_variance_explained() - 1.0).abs() < 1e-9);

        let projected = pca.project(&rows[6]);
        let norm = (3.0f64.powi(2) + 6.0f64.powi(2)).sqrt();
        assert!((projected[0] - norm).abs() < 1e-9);
    }

    #[test]
    fn test_single_feature() {
        let rows = vec![vec![-1.0], vec![1.0]];
        let pca = PcaSummary::fit(&rows);
        assert_eq!(pca.variance_explained, [1.0, 0.0]);
        assert_eq!(pca.project(&[1.0])[1], 0.0);
    }
}

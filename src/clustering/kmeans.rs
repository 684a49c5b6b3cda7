//! k-means with k-means++ seeding
//!
//! Lloyd's algorithm is written as an explicit state machine so that each
//! transition (assign, update, convergence check) can be driven and observed
//! one step at a time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Squared Euclidean distance
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Index of the nearest centroid; ties go to the lowest index
pub fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

/// Phase the Lloyd iteration is about to execute, or the terminal outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LloydPhase {
    Assign,
    Update,
    /// Convergence check on the largest squared centroid shift of the last
    /// update
    Check { shift: f64 },
    Converged,
    /// Iteration cap reached before the shift fell under the tolerance
    Exhausted,
}

impl LloydPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LloydPhase::Converged | LloydPhase::Exhausted)
    }
}

/// Lloyd iteration over a fixed point set
#[derive(Debug, Clone)]
pub struct LloydState<'a> {
    points: &'a [Vec<f64>],
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    phase: LloydPhase,
    iterations: usize,
    max_iterations: usize,
    tolerance: f64,
}

impl<'a> LloydState<'a> {
    pub fn new(
        points: &'a [Vec<f64>],
        initial_centroids: Vec<Vec<f64>>,
        max_iterations: usize,
        tolerance: f64,
    ) -> Self {
        Self {
            points,
            labels: vec![0; points.len()],
            centroids: initial_centroids,
            phase: LloydPhase::Assign,
            iterations: 0,
            max_iterations,
            tolerance,
        }
    }

    pub fn phase(&self) -> LloydPhase {
        self.phase
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Execute one transition and return the new phase
    pub fn step(&mut self) -> LloydPhase {
        self.phase = match self.phase {
            LloydPhase::Assign => {
                self.assign();
                LloydPhase::Update
            }
            LloydPhase::Update => LloydPhase::Check {
                shift: self.update(),
            },
            LloydPhase::Check { shift } => {
                self.iterations += 1;
                if shift <= self.tolerance {
                    self.assign();
                    LloydPhase::Converged
                } else if self.iterations >= self.max_iterations {
                    self.assign();
                    LloydPhase::Exhausted
                } else {
                    LloydPhase::Assign
                }
            }
            terminal => terminal,
        };
        self.phase
    }

    /// Step until a terminal phase
    pub fn run(mut self) -> KMeansFit {
        while !self.phase.is_terminal() {
            self.step();
        }
        let inertia = self.inertia();
        KMeansFit {
            converged: self.phase == LloydPhase::Converged,
            iterations: self.iterations,
            inertia,
            centroids: self.centroids,
            labels: self.labels,
        }
    }

    fn assign(&mut self) {
        for (label, point) in self.labels.iter_mut().zip(self.points) {
            *label = nearest(point, &self.centroids).0;
        }
    }

    /// Move centroids to member means; returns the largest squared shift
    fn update(&mut self) -> f64 {
        let k = self.centroids.len();
        let dims = self.centroids.first().map_or(0, Vec::len);
        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in self.points.iter().zip(&self.labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point) {
                *s += v;
            }
        }

        let mut next: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .enumerate()
            .map(|(idx, (sum, &count))| {
                if count == 0 {
                    self.centroids[idx].clone()
                } else {
                    sum.into_iter().map(|s| s / count as f64).collect()
                }
            })
            .collect();

        // an empty cluster takes over the point farthest from its own centroid
        for idx in 0..k {
            if counts[idx] > 0 {
                continue;
            }
            let farthest = self
                .points
                .iter()
                .zip(&self.labels)
                .enumerate()
                .filter(|(_, (_, &label))| counts[label] > 1)
                .map(|(i, (point, &label))| (i, squared_distance(point, &next[label])))
                .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                    Some((_, bd)) if bd >= d => best,
                    _ => Some((i, d)),
                });
            if let Some((i, _)) = farthest {
                counts[self.labels[i]] -= 1;
                counts[idx] = 1;
                self.labels[i] = idx;
                next[idx] = self.points[i].clone();
            }
        }

        let shift = self
            .centroids
            .iter()
            .zip(&next)
            .map(|(old, new)| squared_distance(old, new))
            .fold(0.0, f64::max);
        self.centroids = next;
        shift
    }

    fn inertia(&self) -> f64 {
        self.points
            .iter()
            .zip(&self.labels)
            .map(|(point, &label)| squared_distance(point, &self.centroids[label]))
            .sum()
    }
}

/// Result of one k-means fit
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// k-means++ initial centroids drawn from `points`
pub fn kmeans_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    if points.is_empty() || k == 0 {
        return centroids;
    }
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    let mut nearest_sq: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest_sq.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, d) in nearest_sq.iter().enumerate() {
                cumulative += d;
                if *d > 0.0 && cumulative >= target {
                    chosen = Some(i);
                    break;
                }
            }
            // rounding can leave the target just past the last bucket
            chosen.or_else(|| nearest_sq.iter().rposition(|d| *d > 0.0))
        } else {
            None
        };

        let Some(i) = chosen else {
            // every point coincides with a centroid already
            centroids.push(points[centroids.len() % points.len()].clone());
            continue;
        };
        let centroid = points[i].clone();
        for (d, p) in nearest_sq.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

/// Best of `n_init` seeded restarts by inertia; the earliest restart wins ties
pub fn fit(
    points: &[Vec<f64>],
    k: usize,
    seed: u64,
    n_init: usize,
    max_iterations: usize,
    tolerance: f64,
) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<KMeansFit> = None;
    for _ in 0..n_init.max(1) {
        let initial = kmeans_plus_plus(points, k, &mut rng);
        let candidate = LloydState::new(points, initial, max_iterations, tolerance).run();
        let better = match &best {
            Some(current) => candidate.inertia < current.inertia,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    let mut best = best.unwrap_or(KMeansFit {
        centroids: Vec::new(),
        labels: vec![0; points.len()],
        inertia: 0.0,
        iterations: 0,
        converged: true,
    });
    canonicalize_labels(&mut best);
    best
}

/// Renumber clusters in order of first appearance so equal partitions get
/// equal labels
fn canonicalize_labels(fit: &mut KMeansFit) {
    let k = fit.centroids.len();
    let mut mapping: Vec<Option<usize>> = vec![None; k];
    let mut next = 0;
    for &label in &fit.labels {
        if mapping[label].is_none() {
            mapping[label] = Some(next);
            next += 1;
        }
    }
    for slot in mapping.iter_mut() {
        if slot.is_none() {
            *slot = Some(next);
            next += 1;
        }
    }
    let mapping: Vec<usize> = mapping.into_iter().flatten().collect();

    let mut centroids = vec![Vec::new(); k];
    for (old, centroid) in fit.centroids.drain(..).enumerate() {
        centroids[mapping[old]] = centroid;
    }
    fit.centroids = centroids;
    for label in fit.labels.iter_mut() {
        *label = mapping[*label];
    }
}

//! Choice of the number of clusters from the elbow and silhouette criteria

use serde::{Deserialize, Serialize};

/// Fit quality of one candidate cluster count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KEvaluation {
    pub k: usize,
    pub inertia: f64,
    pub silhouette: f64,
}

/// Which rule decided the cluster count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Elbow and silhouette picked the same K
    Agreement,
    /// Elbow kept because its silhouette is within tolerance of the best
    ElbowWithinTolerance,
    /// Silhouette overrode the elbow
    Silhouette,
}

/// Outcome of cluster-count selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KSelection {
    pub evaluations: Vec<KEvaluation>,
    pub elbow_k: usize,
    pub silhouette_k: usize,
    pub chosen_k: usize,
    pub rule: SelectionRule,
}

impl KSelection {
    /// Combine the two criteria over evaluations sorted by ascending K.
    ///
    /// Returns `None` for an empty evaluation list.
    pub fn decide(evaluations: Vec<KEvaluation>, silhouette_tolerance: f64) -> Option<Self> {
        let elbow = elbow_index(&evaluations)?;
        let best = best_silhouette_index(&evaluations)?;

        let elbow_k = evaluations[elbow].k;
        let silhouette_k = evaluations[best].k;
        let (chosen_k, rule) = if elbow == best {
            (elbow_k, SelectionRule::Agreement)
        } else if evaluations[best].silhouette - evaluations[elbow].silhouette
            <= silhouette_tolerance
        {
            (elbow_k, SelectionRule::ElbowWithinTolerance)
        } else {
            (silhouette_k, SelectionRule::Silhouette)
        };

        Some(KSelection {
            evaluations,
            elbow_k,
            silhouette_k,
            chosen_k,
            rule,
        })
    }
}

/// Largest second difference of the inertia curve; the first candidate when
/// there are fewer than three
fn elbow_index(evaluations: &[KEvaluation]) -> Option<usize> {
    if evaluations.is_empty() {
        return None;
    }
    if evaluations.len() < 3 {
        return Some(0);
    }
    let mut best = (1, f64::NEG_INFINITY);
    for j in 1..evaluations.len() - 1 {
        let curvature = evaluations[j - 1].inertia - 2.0 * evaluations[j].inertia
            + evaluations[j + 1].inertia;
        if curvature > best.1 {
            best = (j, curvature);
        }
    }
    Some(best.0)
}

/// Highest mean silhouette; ties go to the smaller K
fn best_silhouette_index(evaluations: &[KEvaluation]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, e) in evaluations.iter().enumerate() {
        match best {
            Some(b) if evaluations[b].silhouette >= e.silhouette => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evals(points: &[(usize, f64, f64)]) -> Vec<KEvaluation> {
        points
            .iter()
            .map(|&(k, inertia, silhouette)| KEvaluation {
                k,
                inertia,
                silhouette,
            })
            .collect()
    }

    #[test]
    fn test_agreement() {
        let selection = KSelection::decide(
            evals(&[(2, 100.0, 0.40), (3, 30.0, 0.62), (4, 25.0, 0.50), (5, 22.0, 0.45)]),
            0.0,
        )
        .unwrap();
        assert_eq!(selection.elbow_k, 3);
        assert_eq!(selection.silhouette_k, 3);
        assert_eq!(selection.chosen_k, 3);
        assert_eq!(selection.rule, SelectionRule::Agreement);
    }

    #[test]
    fn test_silhouette_dominates() {
        let selection = KSelection::decide(
            evals(&[(2, 100.0, 0.70), (3, 30.0, 0.55), (4, 25.0, 0.50)]),
            0.0,
        )
        .unwrap();
        assert_eq!(selection.elbow_k, 3);
        assert_eq!(selection.chosen_k, 2);
        assert_eq!(selection.rule, SelectionRule::Silhouette);
    }

    #[test]
    fn test_elbow_within_tolerance() {
        let selection = KSelection::decide(
            evals(&[(2, 100.0, 0.70), (3, 30.0, 0.65), (4, 25.0, 0.50)]),
            0.1,
        )
        .unwrap();
        assert_eq!(selection.chosen_k, 3);
        assert_eq!(selection.rule, SelectionRule::ElbowWithinTolerance);
    }

    #[test]
    fn test_short_curve_uses_first_candidate_as_elbow() {
        let selection =
            KSelection::decide(evals(&[(2, 50.0, 0.30), (3, 20.0, 0.60)]), 0.0).unwrap();
        assert_eq!(selection.elbow_k, 2);
        assert_eq!(selection.chosen_k, 3);
    }

    #[test]
    fn test_silhouette_tie_prefers_smaller_k() {
        let selection = KSelection::decide(
            evals(&[(2, 50.0, 0.5), (3, 40.0, 0.5), (4, 10.0, 0.5)]),
            0.0,
        )
        .unwrap();
        assert_eq!(selection.silhouette_k, 2);
        assert_eq!(selection.elbow_k, 3);
        // equal silhouettes keep the elbow
        assert_eq!(selection.chosen_k, 3);
    }

    #[test]
    fn test_empty() {
        assert!(KSelection::decide(Vec::new(), 0.0).is_none());
    }
}

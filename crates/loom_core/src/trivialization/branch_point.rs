//! Collision structure and monodromy at a critical locus.

use super::types::Permutation;
use crate::critical_locus::gather;
use crate::error::TrivializationError;
use crate::root_system::{difference, RootSystem};
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use num_complex::Complex64;
use tracing::{info, warn};

/// Relative singular value threshold of the rank test.
const RANK_TOLERANCE: f64 = 1e-9;

/// Sheets at a branch point split into colliding groups and single sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct Collisions {
    pub groups: Vec<Vec<usize>>,
    pub singles: Vec<usize>,
}

/// Clusters the sheet values at a branch point with `threshold`.
pub fn collisions(xs: &[Complex64], threshold: f64) -> Collisions {
    let clusters = gather(xs, threshold);
    let singles = clusters
        .iter()
        .filter(|c| c.len() == 1)
        .map(|c| c[0])
        .collect();
    let groups = clusters.into_iter().filter(|c| c.len() > 1).collect();
    Collisions { groups, singles }
}

/// Positive roots vanishing at a branch point, reduced to an independent set.
///
/// Within each group every pair of weights whose difference is a positive
/// root (up to sign) contributes that root. An empty result marks an
/// accidental branch point.
pub fn vanishing_positive_roots(groups: &[Vec<usize>], g: &RootSystem) -> Vec<Vec<f64>> {
    let mut roots = Vec::new();
    for group in groups {
        for (a, &s_1) in group.iter().enumerate() {
            for &s_2 in &group[a + 1..] {
                let v = difference(&g.weights[s_1], &g.weights[s_2]);
                if let Some(k) = g.match_positive_root(&v) {
                    roots.push(g.positive_roots[k].clone());
                }
            }
        }
    }
    if roots.is_empty() {
        info!("branch point does not correspond to a positive root, may be accidental");
        return roots;
    }
    keep_linearly_independent(roots)
}

/// Keeps each vector that raises the rank of the ones kept before it.
pub fn keep_linearly_independent(vectors: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let mut kept: Vec<Vec<f64>> = Vec::new();
    let mut rank = 0;
    for v in vectors {
        let mut candidate = kept.clone();
        candidate.push(v.clone());
        let new_rank = matrix_rank(&candidate);
        if new_rank > rank {
            rank = new_rank;
            kept.push(v);
        }
    }
    kept
}

fn matrix_rank(rows: &[Vec<f64>]) -> usize {
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.is_empty() || n_cols == 0 {
        return 0;
    }
    let m = DMatrix::from_fn(rows.len(), n_cols, |i, j| rows[i][j]);
    let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    m.rank(RANK_TOLERANCE * scale)
}

/// Permutation of the sheets after continuation around a closed loop.
///
/// Entry `i` is the sheet whose final value lands nearest reference sheet
/// `i`, so that `new_sheets = M . old_sheets` for `M = sigma.matrix()`.
/// When `allow_zero_pair` is set, two references picking the same sheet at
/// `x = 0` keep their own labels.
pub fn monodromy(
    reference: &[Complex64],
    finals: &[Complex64],
    accuracy: f64,
    allow_zero_pair: bool,
) -> Result<Permutation> {
    let images: Vec<usize> = reference
        .iter()
        .map(|&r| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (j, x) in finals.iter().enumerate() {
                let d = (x - r).norm();
                if d < best_distance {
                    best = j;
                    best_distance = d;
                }
            }
            best
        })
        .collect();

    let mut hits = vec![0usize; finals.len()];
    for &j in &images {
        hits[j] += 1;
    }
    if hits.iter().all(|&h| h <= 1) {
        return Permutation::new(images);
    }

    let near_zero = images.iter().any(|&j| finals[j].norm() < accuracy);
    let doubled: Vec<usize> = (0..hits.len()).filter(|&j| hits[j] > 1).collect();
    if allow_zero_pair && near_zero && doubled.len() == 1 && hits[doubled[0]] == 2 {
        let mut repaired = images.clone();
        for (i, &j) in images.iter().enumerate() {
            if j == doubled[0] {
                repaired[i] = i;
            }
        }
        warn!(?images, ?repaired, "two sheets at x = 0 share a label after the loop");
        return Permutation::new(repaired);
    }

    bail!(TrivializationError::DegenerateSheets(format!(
        "cannot match the reference sheets uniquely to the final ones {:?}",
        images
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root_system::ClassicalRootSystems;
    use crate::traits::RootSystemProvider;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn groups_and_singles_from_clustering() {
        let xs = [c(0.0, 0.0), c(1.0, 0.0), c(0.01, 0.0), c(-1.0, 0.0)];
        let result = collisions(&xs, 0.05);
        assert_eq!(result.groups, vec![vec![0, 2]]);
        assert_eq!(result.singles, vec![1, 3]);
    }

    #[test]
    fn triple_collision_in_a2_has_order_three() {
        let g = ClassicalRootSystems.root_system("A2", 1).expect("A2");
        let roots = vanishing_positive_roots(&[vec![0, 1, 2]], &g);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots.len() + 1, 3);
    }

    #[test]
    fn accidental_collision_has_no_roots() {
        // e_0 and -e_0 in D2 differ by 2 e_0, which is not a root.
        let g = ClassicalRootSystems.root_system("D2", 1).expect("D2");
        let roots = vanishing_positive_roots(&[vec![0, 2]], &g);
        assert!(roots.is_empty());
    }

    #[test]
    fn rank_test_drops_dependent_vectors() {
        let kept = keep_linearly_independent(vec![
            vec![1.0, -1.0, 0.0],
            vec![0.0, 1.0, -1.0],
            vec![1.0, 0.0, -1.0],
            vec![1.0, -1.0, 0.0],
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn monodromy_maps_final_values_to_references() {
        let reference = [c(1.0, 0.0), c(-1.0, 0.0), c(0.0, 2.0)];
        let finals = [c(-1.0, 0.0), c(1.0, 0.0), c(0.0, 2.0)];
        let sigma = monodromy(&reference, &finals, 1e-6, false).expect("permutation");
        assert_eq!(sigma.images(), &[1, 0, 2]);
    }

    #[test]
    fn three_cycle_follows_the_reference_sheets() {
        // Around z = 0 on x^3 = z every sheet moves on by a third turn.
        let reference: Vec<Complex64> = (0..3)
            .map(|k| Complex64::from_polar(1.0, 2.0 * std::f64::consts::PI * k as f64 / 3.0))
            .collect();
        let finals = [reference[1], reference[2], reference[0]];
        let sigma = monodromy(&reference, &finals, 1e-6, false).expect("permutation");
        assert_eq!(sigma.images(), &[2, 0, 1]);
    }

    #[test]
    fn zero_pair_is_repaired_for_type_d_only() {
        let reference = [c(1.0, 0.0), c(0.0, 0.0), c(-1.0, 0.0), c(0.0, 0.0)];
        let finals = [c(-1.0, 0.0), c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)];
        let sigma = monodromy(&reference, &finals, 1e-6, true).expect("repaired");
        assert_eq!(sigma.images(), &[2, 1, 0, 3]);

        let err = monodromy(&reference, &finals, 1e-6, false).expect_err("not repaired");
        assert!(matches!(
            TrivializationError::find(&err),
            Some(TrivializationError::DegenerateSheets(_))
        ));
    }
}

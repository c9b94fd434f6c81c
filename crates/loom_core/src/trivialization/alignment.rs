//! Ordering of the sheets at the base point by weights.

use crate::critical_locus::compare_complex;
use crate::error::TrivializationError;
use crate::root_system::{AlgebraType, RootSystem};
use anyhow::{bail, Result};
use num_complex::Complex64;
use tracing::warn;

/// Tolerance for recognizing `x` and `-x` as partners in type D.
const PAIRING_TOLERANCE: f64 = 1e-8;

/// Orders the roots of the first fundamental cover like `g.ffr_weights`.
pub fn align_ffr_sheets(roots: &[Complex64], g: &RootSystem) -> Result<Vec<Complex64>> {
    if roots.len() != g.ffr_sheet_count() {
        bail!(TrivializationError::Configuration(format!(
            "the curve has {} sheets but the first fundamental representation of {} has {} weights",
            roots.len(),
            g.algebra,
            g.ffr_sheet_count()
        )));
    }
    match g.algebra_type() {
        // Weights e_0 .. e_n are interchangeable; sort for determinism.
        AlgebraType::A => {
            let mut sorted = roots.to_vec();
            sorted.sort_by(compare_complex);
            Ok(sorted)
        }
        AlgebraType::D => align_type_d(roots, g.rank()),
        AlgebraType::E => bail!(TrivializationError::NotImplemented(format!(
            "sheet alignment for {}",
            g.algebra
        ))),
    }
}

/// Largest `rank` roots by `(re, im)` take the weights `e_i`; each of the
/// others goes to `-e_j` where `x_j` is nearest to minus it.
fn align_type_d(roots: &[Complex64], rank: usize) -> Result<Vec<Complex64>> {
    let mut sorted = roots.to_vec();
    sorted.sort_by(|a, b| compare_complex(b, a));
    let positive: Vec<Complex64> = sorted[..rank].to_vec();
    let mut negative: Vec<Option<Complex64>> = vec![None; rank];

    for &nx in &sorted[rank..] {
        let j = (0..rank)
            .filter(|&j| negative[j].is_none())
            .min_by(|&a, &b| {
                (positive[a] + nx)
                    .norm()
                    .total_cmp(&(positive[b] + nx).norm())
            })
            .ok_or_else(|| {
                TrivializationError::DegenerateSheets("no positive sheet left to pair".to_string())
            })?;
        if (positive[j] + nx).norm() > PAIRING_TOLERANCE * (1.0 + nx.norm()) {
            warn!(x = %positive[j], y = %nx, "no (x, -x) pairing of the D-type sheets");
        }
        negative[j] = Some(nx);
    }

    Ok(positive
        .into_iter()
        .chain(negative.into_iter().flatten())
        .collect())
}

/// Sheets of the chosen representation from those of the first
/// fundamental one, `x_i = sum_j c_ij ffr_x_j`.
pub fn representation_sheets(ffr_xs: &[Complex64], g: &RootSystem) -> Vec<Complex64> {
    g.weight_coefficients
        .iter()
        .map(|row| {
            row.iter()
                .zip(ffr_xs)
                .map(|(&c, &x)| x * c)
                .sum()
        })
        .collect()
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
    fn type_a_sheets_are_sorted() {
        let g = ClassicalRootSystems.root_system("A2", 1).expect("A2");
        let aligned = align_ffr_sheets(&[c(1.0, 0.0), c(-1.0, 0.0), c(0.0, 1.0)], &g).expect("aligned");
        assert_eq!(aligned, vec![c(-1.0, 0.0), c(0.0, 1.0), c(1.0, 0.0)]);
    }

    #[test]
    fn type_d_sheets_pair_with_their_negatives() {
        let g = ClassicalRootSystems.root_system("D2", 1).expect("D2");
        let roots = [c(2.0, 0.0), c(-2.0, 0.0), c(0.0, 1.0), c(0.0, -1.0)];
        let aligned = align_ffr_sheets(&roots, &g).expect("aligned");
        assert_eq!(
            aligned,
            vec![c(2.0, 0.0), c(0.0, 1.0), c(-2.0, 0.0), c(0.0, -1.0)]
        );
    }

    #[test]
    fn sheet_count_must_match_the_weights() {
        let g = ClassicalRootSystems.root_system("A2", 1).expect("A2");
        let err = align_ffr_sheets(&[c(1.0, 0.0)], &g).expect_err("too few sheets");
        assert!(format!("{err}").contains("has 1 sheets"));
    }

    #[test]
    fn exterior_square_sums_pairs_of_sheets() {
        let g = ClassicalRootSystems.root_system("A2", 2).expect("A2");
        let xs = representation_sheets(&[c(1.0, 0.0), c(2.0, 0.0), c(4.0, 0.0)], &g);
        assert_eq!(xs, vec![c(3.0, 0.0), c(5.0, 0.0), c(6.0, 0.0)]);
    }
}

//! Local form of the curve at a ramification point.
//!
//! Near `(z0, x0)` the curve looks like `a dz + b dx^i = 0`, possibly times
//! a power of `dx` for degenerate points of type D:
//!
//! * type I: algebra A, or D/E with `x0 != 0`;
//! * type II: D with `x0 = 0`, `i = 2 rank` and `a != 0`;
//! * type III: D with `i = 2 rank` and `a = 0`, where the curve is
//!   `dx^2 (a dz + b dx^(i-2))` and `a` is read off `dz dx^2`.
//!
//! With `lambda = x dz`, the local differential starts with
//! `(-a/b)^(1/i) dz^(1/i)`.

use crate::critical_locus::{LocalDifferential, RamificationPoint, RamificationType};
use crate::error::TrivializationError;
use crate::polynomial::BivariatePolynomial;
use crate::root_system::{AlgebraType, RootSystem};
use anyhow::{bail, Result};
use tracing::debug;

/// Local Taylor coefficients below this multiple of the accuracy vanish.
const ZERO_THRESHOLD_FACTOR: f64 = 100.0;

pub fn classify(
    rp: &RamificationPoint,
    equation: &BivariatePolynomial,
    g: &RootSystem,
    accuracy: f64,
) -> Result<RamificationPoint> {
    let zero_threshold = ZERO_THRESHOLD_FACTOR * accuracy;
    let i = rp.multiplicity;
    let coeff = |j: usize, k: usize| equation.taylor_coefficient(rp.x, rp.z, j, k);
    let a_dz = coeff(0, 1);
    let b = coeff(i, 0);
    let full_rank = i == 2 * g.rank();

    let (ramification_type, a) = match g.algebra_type() {
        AlgebraType::A => (RamificationType::I, a_dz),
        AlgebraType::D | AlgebraType::E if rp.x.norm() > zero_threshold => {
            (RamificationType::I, a_dz)
        }
        AlgebraType::D if full_rank && a_dz.norm() > zero_threshold => {
            (RamificationType::II, a_dz)
        }
        AlgebraType::D if full_rank => (RamificationType::III, coeff(2, 1)),
        _ => bail!(TrivializationError::UnsupportedRamification {
            z: rp.z,
            x: rp.x,
            multiplicity: i,
        }),
    };

    if b.norm() == 0.0 {
        bail!(TrivializationError::DegenerateSheets(format!(
            "the local curve at {} has no dx^{} term",
            rp, i
        )));
    }

    let exponent = 1.0 / i as f64;
    let coefficient = (-a / b).powf(exponent);
    debug!(label = %rp.label, ?ramification_type, %coefficient, "classified ramification point");

    let mut classified = rp.clone();
    classified.ramification_type = Some(ramification_type);
    classified.local_differential = Some(LocalDifferential {
        coefficient,
        exponent,
    });
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation_engine::parse_polynomial;
    use crate::root_system::ClassicalRootSystems;
    use crate::traits::RootSystemProvider;
    use num_complex::Complex64;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn origin(i: usize) -> RamificationPoint {
        RamificationPoint::new(c(0.0, 0.0), c(0.0, 0.0), i)
    }

    #[test]
    fn square_root_point_is_type_one() {
        let eq = parse_polynomial("x^2 - z", &[]).expect("curve");
        let g = ClassicalRootSystems.root_system("A1", 1).expect("A1");
        let rp = classify(&origin(2), &eq, &g, 1e-6).expect("classified");
        assert_eq!(rp.ramification_type, Some(RamificationType::I));
        let diff = rp.local_differential.expect("differential");
        assert!((diff.coefficient - c(1.0, 0.0)).norm() < 1e-12);
        assert!((diff.exponent - 0.5).abs() < 1e-15);
    }

    #[test]
    fn off_origin_point_uses_local_coordinates() {
        // x^2 - (z^2 - 1) at z = 1: a = -2, b = 1.
        let eq = parse_polynomial("x^2 - (z^2 - 1)", &[]).expect("curve");
        let g = ClassicalRootSystems.root_system("A1", 1).expect("A1");
        let rp = RamificationPoint::new(c(1.0, 0.0), c(0.0, 0.0), 2);
        let diff = classify(&rp, &eq, &g, 1e-6)
            .expect("classified")
            .local_differential
            .expect("differential");
        assert!((diff.coefficient - c(2.0_f64.sqrt(), 0.0)).norm() < 1e-12);
    }

    #[test]
    fn d_type_origin_of_full_multiplicity_is_type_two() {
        let eq = parse_polynomial("x^4 - z", &[]).expect("curve");
        let g = ClassicalRootSystems.root_system("D2", 1).expect("D2");
        let rp = classify(&origin(4), &eq, &g, 1e-6).expect("classified");
        assert_eq!(rp.ramification_type, Some(RamificationType::II));
        let diff = rp.local_differential.expect("differential");
        assert!((diff.coefficient - c(1.0, 0.0)).norm() < 1e-12);
        assert!((diff.exponent - 0.25).abs() < 1e-15);
    }

    #[test]
    fn degenerate_d_type_origin_is_type_three() {
        let eq = parse_polynomial("x^4 - z*x^2", &[]).expect("curve");
        let g = ClassicalRootSystems.root_system("D2", 1).expect("D2");
        let rp = classify(&origin(4), &eq, &g, 1e-6).expect("classified");
        assert_eq!(rp.ramification_type, Some(RamificationType::III));
        let diff = rp.local_differential.expect("differential");
        assert!((diff.coefficient - c(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn other_d_type_origins_are_unsupported() {
        let eq = parse_polynomial("x^3 - z", &[]).expect("curve");
        let g = ClassicalRootSystems.root_system("D2", 1).expect("D2");
        let err = classify(&origin(3), &eq, &g, 1e-6).expect_err("type IV");
        assert!(matches!(
            TrivializationError::find(&err),
            Some(TrivializationError::UnsupportedRamification { multiplicity: 3, .. })
        ));
    }
}

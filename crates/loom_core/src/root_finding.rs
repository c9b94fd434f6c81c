//! Simultaneous root finding for complex polynomials.
//!
//! Roots are found with the Aberth–Ehrlich iteration. A root is accepted
//! once its residual is at the level of the rounding error of evaluating the
//! polynomial there, so multiple roots terminate as well. When an attempt
//! runs out of iterations, the budget is raised and the starting circle is
//! rotated; the number of such escalations is bounded.
//!
//! Iterates of a multiple root scatter by about `noise^(1/m)`. `root_clusters`
//! regroups them and polishes each group with Newton's method on the
//! `(m - 1)`-th derivative, where the root is simple.

use crate::error::TrivializationError;
use crate::polynomial::Polynomial;
use anyhow::Result;
use num_complex::Complex64;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::warn;

/// Angular offset of the initial guesses, keeps them off symmetry axes.
const INITIAL_ANGLE_OFFSET: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootSolverSettings {
    /// Iteration budget of the first attempt.
    pub max_steps: usize,
    /// Added to the budget on every escalation.
    pub step_increment: usize,
    /// Escalations allowed after the first attempt.
    pub max_escalations: usize,
    /// Residual threshold relative to `sum |c_k| |z|^k`.
    pub tolerance: f64,
}

impl Default for RootSolverSettings {
    fn default() -> Self {
        Self {
            max_steps: 50,
            step_increment: 10,
            max_escalations: 8,
            tolerance: 1e-13,
        }
    }
}

/// Relative size of coefficient errors a multiple root is allowed to absorb.
const COEFFICIENT_NOISE: f64 = 1e-12;

/// Slack on the expected scatter `noise^(1/m)` of an `m`-fold root.
const CLUSTER_SLACK: f64 = 10.0;

/// Upper bound on the relative scatter of any cluster.
const MAX_SCATTER: f64 = 1e-2;

/// A distinct root and how many times it repeats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootCluster {
    pub root: Complex64,
    pub multiplicity: usize,
}

/// Returns all roots of `poly`, repeated according to multiplicity.
pub fn polynomial_roots(poly: &Polynomial, settings: &RootSolverSettings) -> Result<Vec<Complex64>> {
    if poly.is_zero() {
        return Err(TrivializationError::Configuration(
            "cannot find the roots of the zero polynomial".to_string(),
        )
        .into());
    }

    // Exact zero roots are split off so the iteration only sees c_0 != 0.
    let coeffs = poly.coeffs();
    let zero_roots = coeffs.iter().take_while(|c| c.is_zero()).count();
    let deflated = Polynomial::new(coeffs[zero_roots..].to_vec());
    let mut roots = vec![Complex64::zero(); zero_roots];

    let mut max_steps = settings.max_steps;
    for attempt in 0..=settings.max_escalations {
        let rotation = attempt as f64 * PI / (2.0 * (settings.max_escalations + 1) as f64);
        match aberth(&deflated, max_steps, settings.tolerance, rotation) {
            Some(found) => {
                roots.extend(found);
                return Ok(roots);
            }
            None => {
                warn!(
                    attempt,
                    max_steps,
                    degree = deflated.degree().unwrap_or(0),
                    "root finding did not converge; increasing iteration budget"
                );
                if attempt < settings.max_escalations {
                    max_steps += settings.step_increment;
                }
            }
        }
    }

    Err(TrivializationError::NonConvergence {
        attempts: settings.max_escalations + 1,
        max_steps,
    }
    .into())
}

/// Distinct roots of `poly` with multiplicities.
///
/// An `m`-fold root is a group of `m` roots that all lie within
/// `CLUSTER_SLACK * COEFFICIENT_NOISE^(1/m) * (1 + |center|)` of their mean,
/// with the relative part capped at `MAX_SCATTER`.
pub fn root_clusters(poly: &Polynomial, settings: &RootSolverSettings) -> Result<Vec<RootCluster>> {
    let mut remaining = polynomial_roots(poly, settings)?;
    let mut groups: Vec<Vec<Complex64>> = Vec::new();

    while !remaining.is_empty() {
        let seed = remaining[0];
        let mut order: Vec<usize> = (1..remaining.len()).collect();
        order.sort_by(|&a, &b| {
            (remaining[a] - seed)
                .norm()
                .total_cmp(&(remaining[b] - seed).norm())
        });

        // Largest group of the seed and its nearest neighbours that is
        // tight enough to be one root of that multiplicity.
        let mut taken = 0;
        for extra in (1..=order.len()).rev() {
            let mut group = vec![seed];
            group.extend(order[..extra].iter().map(|&j| remaining[j]));
            let center = centroid(&group);
            let spread = group
                .iter()
                .map(|r| (r - center).norm())
                .fold(0.0, f64::max);
            if spread <= scatter_radius(center, group.len()) {
                taken = extra;
                break;
            }
        }

        let mut members: Vec<usize> = vec![0];
        members.extend_from_slice(&order[..taken]);
        members.sort_unstable_by(|a, b| b.cmp(a));
        let group: Vec<Complex64> = members.into_iter().map(|j| remaining.swap_remove(j)).collect();
        groups.push(group);
    }

    let mut clusters: Vec<RootCluster> = groups
        .iter()
        .map(|group| {
            let center = centroid(group);
            let multiplicity = group.len();
            let root = if multiplicity > 1 {
                polish_multiple_root(poly, center, multiplicity, settings.max_steps)
            } else {
                center
            };
            RootCluster { root, multiplicity }
        })
        .collect();
    clusters.sort_by(|a, b| a.root.re.total_cmp(&b.root.re).then(a.root.im.total_cmp(&b.root.im)));
    Ok(clusters)
}

fn centroid(values: &[Complex64]) -> Complex64 {
    values.iter().sum::<Complex64>() / values.len() as f64
}

fn scatter_radius(center: Complex64, multiplicity: usize) -> f64 {
    let relative = CLUSTER_SLACK * COEFFICIENT_NOISE.powf(1.0 / multiplicity as f64);
    relative.min(MAX_SCATTER) * (1.0 + center.norm())
}

/// Newton's method on `p^(m-1)` from the cluster mean. Falls back to the
/// mean if the iteration leaves the cluster.
fn polish_multiple_root(
    poly: &Polynomial,
    center: Complex64,
    multiplicity: usize,
    max_steps: usize,
) -> Complex64 {
    let mut target = poly.clone();
    for _ in 1..multiplicity {
        target = target.derivative();
    }
    let mut t = center;
    for _ in 0..max_steps {
        let (value, derivative) = target.eval_with_derivative(t);
        if value.is_zero() || derivative.is_zero() {
            break;
        }
        let step = value / derivative;
        t -= step;
        if !t.re.is_finite() || !t.im.is_finite() {
            return center;
        }
        if step.norm() <= 4.0 * f64::EPSILON * (1.0 + t.norm()) {
            break;
        }
    }
    if (t - center).norm() <= scatter_radius(center, multiplicity) {
        t
    } else {
        warn!(%center, multiplicity, "polishing left the root cluster; keeping its mean");
        center
    }
}

fn aberth(
    poly: &Polynomial,
    max_steps: usize,
    tolerance: f64,
    rotation: f64,
) -> Option<Vec<Complex64>> {
    let degree = poly.degree()?;
    let coeffs = poly.coeffs();
    match degree {
        0 => return Some(Vec::new()),
        1 => return Some(vec![-coeffs[0] / coeffs[1]]),
        _ => {}
    }

    let radius = (coeffs[0] / coeffs[degree]).norm().powf(1.0 / degree as f64);
    let radius = if radius.is_finite() && radius > 0.0 {
        radius
    } else {
        1.0
    };
    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| {
            let angle = 2.0 * PI * k as f64 / degree as f64 + INITIAL_ANGLE_OFFSET + rotation;
            Complex64::from_polar(radius, angle)
        })
        .collect();
    let mut converged = vec![false; degree];

    for _ in 0..max_steps {
        for k in 0..degree {
            if converged[k] {
                continue;
            }
            let z = roots[k];
            let (value, derivative) = poly.eval_with_derivative(z);
            if value.norm() <= tolerance * poly.abs_eval(z.norm()) {
                converged[k] = true;
                continue;
            }
            if derivative.is_zero() {
                // Critical point of p: nudge off it and try again next sweep.
                roots[k] += Complex64::from_polar(1e-8 * (1.0 + z.norm()), k as f64 + 1.0);
                continue;
            }
            let newton = value / derivative;
            let repulsion: Complex64 = (0..degree)
                .filter(|&j| j != k)
                .map(|j| {
                    let diff = z - roots[j];
                    if diff.is_zero() {
                        Complex64::zero()
                    } else {
                        diff.inv()
                    }
                })
                .sum();
            let denominator = Complex64::new(1.0, 0.0) - newton * repulsion;
            let step = if denominator.is_zero() {
                newton
            } else {
                newton / denominator
            };
            let next = z - step;
            if !next.re.is_finite() || !next.im.is_finite() {
                return None;
            }
            roots[k] = next;
            if step.norm() <= f64::EPSILON * next.norm() {
                converged[k] = true;
            }
        }
        if converged.iter().all(|&done| done) {
            return Some(roots);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn assert_roots_match(found: &[Complex64], expected: &[Complex64], tol: f64) {
        assert_eq!(found.len(), expected.len(), "root count mismatch: {found:?}");
        let mut used = vec![false; found.len()];
        for e in expected {
            let hit = found
                .iter()
                .enumerate()
                .filter(|(i, _)| !used[*i])
                .find(|(_, r)| (**r - *e).norm() < tol)
                .map(|(i, _)| i);
            match hit {
                Some(i) => used[i] = true,
                None => panic!("expected root {e} not found in {found:?}"),
            }
        }
    }

    #[test]
    fn finds_roots_of_a_quadratic() {
        // x^2 + 3i
        let p = Polynomial::new(vec![c(0.0, 3.0), c(0.0, 0.0), c(1.0, 0.0)]);
        let roots = polynomial_roots(&p, &RootSolverSettings::default()).expect("roots");
        let r = c(0.0, -3.0).sqrt();
        assert_roots_match(&roots, &[r, -r], 1e-10);
    }

    #[test]
    fn splits_off_exact_zero_roots() {
        // x^2 (x - 1)
        let p = Polynomial::from_real(&[0.0, 0.0, -1.0, 1.0]);
        let roots = polynomial_roots(&p, &RootSolverSettings::default()).expect("roots");
        assert_roots_match(&roots, &[c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)], 1e-10);
    }

    #[test]
    fn terminates_on_a_double_root() {
        // (x - 1)^2 (x + 2) = x^3 - 3x + 2
        let p = Polynomial::from_real(&[2.0, -3.0, 0.0, 1.0]);
        let roots = polynomial_roots(&p, &RootSolverSettings::default()).expect("roots");
        assert_roots_match(&roots, &[c(1.0, 0.0), c(1.0, 0.0), c(-2.0, 0.0)], 1e-6);
    }

    #[test]
    fn finds_roots_of_unity() {
        let p = Polynomial::from_real(&[-1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let roots = polynomial_roots(&p, &RootSolverSettings::default()).expect("roots");
        let expected: Vec<Complex64> = (0..5)
            .map(|k| Complex64::from_polar(1.0, 2.0 * PI * k as f64 / 5.0))
            .collect();
        assert_roots_match(&roots, &expected, 1e-10);
    }

    #[test]
    fn constant_polynomial_has_no_roots() {
        let p = Polynomial::constant(c(2.0, 0.0));
        let roots = polynomial_roots(&p, &RootSolverSettings::default()).expect("roots");
        assert!(roots.is_empty());
    }

    #[test]
    fn zero_polynomial_is_rejected() {
        let err = polynomial_roots(&Polynomial::zero(), &RootSolverSettings::default())
            .expect_err("zero polynomial should fail");
        assert!(format!("{err}").contains("zero polynomial"));
    }

    #[test]
    fn clusters_recover_multiple_roots_from_noisy_coefficients() {
        // (t^2 - 4)^2 with round-off sized perturbations.
        let p = Polynomial::new(vec![
            c(16.0 + 3e-14, 1e-14),
            c(-2e-14, 0.0),
            c(-8.0, -1e-14),
            c(1e-14, 0.0),
            c(1.0, 0.0),
        ]);
        let clusters = root_clusters(&p, &RootSolverSettings::default()).expect("clusters");
        assert_eq!(clusters.len(), 2);
        assert!((clusters[0].root - c(-2.0, 0.0)).norm() < 1e-10);
        assert!((clusters[1].root - c(2.0, 0.0)).norm() < 1e-10);
        assert!(clusters.iter().all(|cluster| cluster.multiplicity == 2));
    }

    #[test]
    fn clusters_keep_triple_and_simple_roots_apart() {
        // (t - 1)^3 (t + 1)
        let p = Polynomial::from_real(&[-1.0, 2.0, 0.0, -2.0, 1.0]);
        let clusters = root_clusters(&p, &RootSolverSettings::default()).expect("clusters");
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].multiplicity, 1);
        assert!((clusters[0].root - c(-1.0, 0.0)).norm() < 1e-10);
        assert_eq!(clusters[1].multiplicity, 3);
        assert!((clusters[1].root - c(1.0, 0.0)).norm() < 1e-10);
    }

    #[test]
    fn close_simple_roots_are_not_merged() {
        // (t - 1)(t - 1.001)
        let p = Polynomial::from_real(&[1.001, -2.001, 1.0]);
        let clusters = root_clusters(&p, &RootSolverSettings::default()).expect("clusters");
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|cluster| cluster.multiplicity == 1));
    }

    #[test]
    fn roots_of_unity_stay_distinct() {
        let mut coeffs = vec![0.0; 13];
        coeffs[0] = -1.0;
        coeffs[12] = 1.0;
        let clusters =
            root_clusters(&Polynomial::from_real(&coeffs), &RootSolverSettings::default())
                .expect("clusters");
        assert_eq!(clusters.len(), 12);
    }

    #[test]
    fn exhausted_budget_reports_non_convergence() {
        let settings = RootSolverSettings {
            max_steps: 0,
            step_increment: 0,
            max_escalations: 2,
            ..RootSolverSettings::default()
        };
        let p = Polynomial::from_real(&[-1.0, 0.0, 0.0, 1.0]);
        let err = polynomial_roots(&p, &settings).expect_err("should not converge");
        match TrivializationError::find(&err) {
            Some(TrivializationError::NonConvergence { attempts, .. }) => assert_eq!(*attempts, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

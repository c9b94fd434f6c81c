//! Paths from the base point that keep away from the critical loci.
//!
//! The base point lies below every critical locus. A path to `z` first runs
//! horizontally along the base line to `Re z` and then straight up, so it
//! never crosses the vertical ray above another locus. When a known branch
//! point sits right below `z` the path detours around it on a circle of
//! radius `r`, half the smallest horizontal separation of the loci.

use super::types::Path;
use crate::error::TrivializationError;
use anyhow::{bail, Result};
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PathPlanner {
    base_point: Complex64,
    radius: f64,
    n_path_to_pt: usize,
    n_path_around_pt: usize,
    branch_points: Vec<Complex64>,
}

/// Distance scales derived from the positions of the critical loci.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocusScales {
    pub base_point: Complex64,
    pub max_distance: f64,
    pub min_horizontal_distance: f64,
}

impl LocusScales {
    /// `loci` must already be free of duplicates.
    pub fn new(loci: &[Complex64], accuracy: f64, single_locus_scale: f64) -> Result<Self> {
        let (max_distance, min_horizontal_distance) = match loci.len() {
            0 => bail!(TrivializationError::Configuration(
                "there must be at least one critical locus".to_string()
            )),
            1 => (single_locus_scale, single_locus_scale),
            _ => {
                let mut max_distance: f64 = 0.0;
                let mut min_horizontal = f64::INFINITY;
                for (i, a) in loci.iter().enumerate() {
                    for b in &loci[i + 1..] {
                        let d = (a - b).norm();
                        max_distance = max_distance.max(d);
                        let h = (a.re - b.re).abs();
                        if h > accuracy {
                            min_horizontal = min_horizontal.min(h);
                        }
                    }
                }
                if !min_horizontal.is_finite() {
                    bail!(TrivializationError::Configuration(
                        "all critical loci are vertically aligned; rotate the z-plane".to_string()
                    ));
                }
                (max_distance, min_horizontal)
            }
        };
        let center: Complex64 = loci.iter().sum::<Complex64>() / loci.len() as f64;
        Ok(Self {
            base_point: center - Complex64::i() * max_distance,
            max_distance,
            min_horizontal_distance,
        })
    }
}

impl PathPlanner {
    pub fn new(scales: &LocusScales, n_path_to_pt: usize, n_path_around_pt: usize) -> Self {
        Self {
            base_point: scales.base_point,
            radius: scales.min_horizontal_distance / 2.0,
            n_path_to_pt,
            n_path_around_pt,
            branch_points: Vec::new(),
        }
    }

    pub fn base_point(&self) -> Complex64 {
        self.base_point
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Registers a branch point that later paths must avoid.
    pub fn add_branch_point(&mut self, z: Complex64) {
        self.branch_points.push(z);
    }

    /// Path from the base point to `z`.
    pub fn path_to(&self, z: Complex64) -> Path {
        debug!(from = %self.base_point, to = %z, "constructing a path");
        // Only one branch point can be this close horizontally.
        let closest = self.branch_points.iter().copied().find(|bp| {
            let delta = z - bp;
            delta.re.abs() < self.radius && delta.im > 0.0
        });

        match closest {
            None => {
                let half_steps = self.n_path_to_pt / 2;
                let z_1 = Complex64::new(z.re, self.base_point.im);
                Path::concat(
                    Path::segment(self.base_point, z_1, half_steps),
                    &[Path::segment(z_1, z, half_steps)],
                )
            }
            Some(bp) => {
                let steps = self.n_path_to_pt / 5;
                let z_1 = Complex64::new(bp.re, self.base_point.im);
                let z_2 = Complex64::new(bp.re, bp.im - self.radius);
                let theta = (z - bp).arg();
                let sweep = if (z - bp).re > 0.0 {
                    theta + PI / 2.0
                } else {
                    -(3.0 * PI / 2.0 - theta)
                };
                let arc = Path::arc(bp, self.radius, -PI / 2.0, sweep, steps);
                let z_3 = arc.end();
                Path::concat(
                    Path::segment(self.base_point, z_1, steps),
                    &[
                        Path::segment(z_1, z_2, steps),
                        arc,
                        Path::segment(z_3, z, steps),
                    ],
                )
            }
        }
    }

    /// Closed loop from the base point around `z` counter-clockwise.
    pub fn path_around(&self, z: Complex64) -> Path {
        debug!(around = %z, "constructing a closed path");
        let steps = self.n_path_around_pt;
        let z_1 = Complex64::new(z.re, self.base_point.im);
        let z_2 = z - Complex64::i() * self.radius;
        let approach_1 = Path::segment(self.base_point, z_1, steps);
        let approach_2 = Path::segment(z_1, z_2, steps);
        let back_1 = approach_1.reversed();
        Path::concat(
            approach_1,
            &[
                approach_2.clone(),
                Path::circle(z, self.radius, steps),
                approach_2.reversed(),
                back_1,
            ],
        )
        .mark_closed()
    }
}

//! Locating the points `(z, x)` where two or more sheets of the curve meet.

use crate::error::TrivializationError;
use crate::polynomial::BivariatePolynomial;
use crate::root_finding::{root_clusters, RootCluster, RootSolverSettings};
use anyhow::{bail, Context, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Multiple roots in `x` are computed less accurately than simple ones, so
/// they are matched with a looser tolerance.
pub const X_GATHERING_FACTOR: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RamificationPointMethod {
    /// Roots of `Res_x(F, dF/dx)`, then the fiber over each root.
    #[default]
    Discriminant,
    /// Solve `F = dF/dx = 0` by eliminating `z`.
    SystemOfEqs,
}

impl FromStr for RamificationPointMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "discriminant" => Ok(Self::Discriminant),
            "system_of_eqs" => Ok(Self::SystemOfEqs),
            other => bail!(TrivializationError::Configuration(format!(
                "unknown ramification point finding method '{}', \
                 expected discriminant or system_of_eqs",
                other
            ))),
        }
    }
}

impl fmt::Display for RamificationPointMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discriminant => f.write_str("discriminant"),
            Self::SystemOfEqs => f.write_str("system_of_eqs"),
        }
    }
}

/// Local type of a ramification point, see `trivialization::ramification`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RamificationType {
    I,
    II,
    III,
}

/// Leading term `c * dz^e` of the local expansion of `x dz`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalDifferential {
    pub coefficient: Complex64,
    pub exponent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamificationPoint {
    pub z: Complex64,
    pub x: Complex64,
    /// Number of sheets meeting at `x`.
    pub multiplicity: usize,
    pub label: String,
    pub ramification_type: Option<RamificationType>,
    pub local_differential: Option<LocalDifferential>,
}

impl RamificationPoint {
    pub fn new(z: Complex64, x: Complex64, multiplicity: usize) -> Self {
        Self {
            z,
            x,
            multiplicity,
            label: String::new(),
            ramification_type: None,
            local_differential: None,
        }
    }
}

impl fmt::Display for RamificationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z = {}, x = {}, i = {}", self.z, self.x, self.multiplicity)
    }
}

/// Greedy clustering: each value joins the first cluster holding a member
/// within `tolerance`, otherwise it opens a new one. Returns index sets.
pub fn gather(values: &[Complex64], tolerance: f64) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for (i, v) in values.iter().enumerate() {
        let home = clusters
            .iter_mut()
            .find(|cluster| cluster.iter().any(|&j| (values[j] - v).norm() < tolerance));
        match home {
            Some(cluster) => cluster.push(i),
            None => clusters.push(vec![i]),
        }
    }
    clusters
}

pub(crate) fn mean(values: &[Complex64], indices: &[usize]) -> Complex64 {
    let sum: Complex64 = indices.iter().map(|&i| values[i]).sum();
    sum / indices.len() as f64
}

/// Lexicographic order on `(re, im)`.
pub(crate) fn compare_complex(a: &Complex64, b: &Complex64) -> Ordering {
    a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im))
}

pub struct CriticalLocusFinder<'a> {
    equation: &'a BivariatePolynomial,
    accuracy: f64,
    punctures: &'a [Complex64],
    root_solver: RootSolverSettings,
}

impl<'a> CriticalLocusFinder<'a> {
    pub fn new(
        equation: &'a BivariatePolynomial,
        accuracy: f64,
        punctures: &'a [Complex64],
        root_solver: RootSolverSettings,
    ) -> Self {
        Self {
            equation,
            accuracy,
            punctures,
            root_solver,
        }
    }

    /// Ramification points ordered by `z` then `x`, labeled in that order.
    pub fn find(&self, method: RamificationPointMethod) -> Result<Vec<RamificationPoint>> {
        let mut points = match method {
            RamificationPointMethod::Discriminant => self.using_discriminant()?,
            RamificationPointMethod::SystemOfEqs => self.using_system_of_eqs()?,
        };
        points.sort_by(|a, b| compare_complex(&a.z, &b.z).then(compare_complex(&a.x, &b.x)));
        for (k, rp) in points.iter_mut().enumerate() {
            rp.label = format!("ramification point #{}", k);
            info!(label = %rp.label, z = %rp.z, x = %rp.x, i = rp.multiplicity, "found ramification point");
        }
        Ok(points)
    }

    fn is_puncture(&self, z: Complex64) -> bool {
        self.punctures
            .iter()
            .any(|p| (z - p).norm() < self.accuracy)
    }

    fn fiber_clusters(&self, z: Complex64) -> Result<Vec<RootCluster>> {
        root_clusters(&self.equation.at_z(z), &self.root_solver)
            .with_context(|| format!("Failed to solve the fiber over z = {}", z))
    }

    /// Cluster centers, merged once more at the working accuracy.
    fn distinct_roots(&self, clusters: Vec<RootCluster>) -> Vec<Complex64> {
        let roots: Vec<Complex64> = clusters.iter().map(|cluster| cluster.root).collect();
        gather(&roots, self.accuracy)
            .iter()
            .map(|indices| mean(&roots, indices))
            .collect()
    }

    fn using_discriminant(&self) -> Result<Vec<RamificationPoint>> {
        let discriminant = self.equation.discriminant()?;
        if discriminant.is_zero() {
            bail!(TrivializationError::Configuration(
                "the discriminant vanishes identically; the curve has a repeated factor".to_string()
            ));
        }
        let z_clusters = root_clusters(&discriminant, &self.root_solver)
            .context("Failed to find the roots of the discriminant")?;

        let mut points = Vec::new();
        for z_i in self.distinct_roots(z_clusters) {
            if self.is_puncture(z_i) {
                debug!(z = %z_i, "discriminant root at a puncture");
                continue;
            }
            for x_cluster in self.fiber_clusters(z_i)? {
                if x_cluster.multiplicity < 2 {
                    continue;
                }
                points.push(RamificationPoint::new(
                    z_i,
                    x_cluster.root,
                    x_cluster.multiplicity,
                ));
            }
        }
        Ok(points)
    }

    fn using_system_of_eqs(&self) -> Result<Vec<RamificationPoint>> {
        let eliminant = self
            .equation
            .resultant_z(&self.equation.derivative_x())?;
        if eliminant.is_zero() {
            bail!(TrivializationError::Configuration(
                "F and dF/dx share a factor; the curve has a repeated factor".to_string()
            ));
        }
        let x_clusters = root_clusters(&eliminant, &self.root_solver)
            .context("Failed to eliminate z from F = dF/dx = 0")?;

        let mut points: Vec<RamificationPoint> = Vec::new();
        for x_k in self.distinct_roots(x_clusters) {
            let along_z = self.equation.at_x(x_k);
            if along_z.degree().unwrap_or(0) == 0 {
                continue;
            }
            let z_clusters = root_clusters(&along_z, &self.root_solver)?;
            for z_i in self.distinct_roots(z_clusters) {
                if self.is_puncture(z_i) {
                    continue;
                }
                let fiber = self.fiber_clusters(z_i)?;
                let meeting = fiber.iter().find(|cluster| {
                    cluster.multiplicity >= 2
                        && (cluster.root - x_k).norm() < X_GATHERING_FACTOR * self.accuracy
                });
                let cluster = match meeting {
                    Some(cluster) => cluster,
                    None => continue,
                };
                let duplicate = points.iter().any(|rp| {
                    (rp.z - z_i).norm() < self.accuracy
                        && (rp.x - cluster.root).norm() < X_GATHERING_FACTOR * self.accuracy
                });
                if !duplicate {
                    points.push(RamificationPoint::new(z_i, cluster.root, cluster.multiplicity));
                }
            }
        }
        Ok(points)
    }
}

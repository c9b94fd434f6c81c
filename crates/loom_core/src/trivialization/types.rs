//! Core types for trivializing a branched covering.
//!
//! This module contains the settings, paths, permutations and the records
//! produced for every branch point and irregular singularity.

use crate::critical_locus::{RamificationPoint, RamificationPointMethod};
use crate::error::TrivializationError;
use crate::root_finding::RootSolverSettings;
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Settings controlling the trivialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrivializationSettings {
    /// Sheets closer than this are considered indistinguishable.
    pub accuracy: f64,
    /// Sample count of a path from the base point to a point.
    pub n_path_to_pt: usize,
    /// Sample count of the circle of a loop around a point.
    pub n_path_around_pt: usize,
    pub max_zoom_level: usize,
    pub zoom_factor: usize,
    /// Sheets closer than this at a branch point collide.
    pub bp_proximity_threshold: f64,
    pub ramification_point_finding_method: RamificationPointMethod,
    /// Distance scale used when there is a single critical locus.
    pub single_locus_scale: f64,
    pub root_solver: RootSolverSettings,
}

impl Default for TrivializationSettings {
    fn default() -> Self {
        Self {
            accuracy: 1e-6,
            n_path_to_pt: 100,
            n_path_around_pt: 60,
            max_zoom_level: 2,
            zoom_factor: 10,
            bp_proximity_threshold: 0.05,
            ramification_point_finding_method: RamificationPointMethod::Discriminant,
            single_locus_scale: 3.0,
            root_solver: RootSolverSettings::default(),
        }
    }
}

impl TrivializationSettings {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("accuracy", self.accuracy),
            ("bp_proximity_threshold", self.bp_proximity_threshold),
            ("single_locus_scale", self.single_locus_scale),
            ("root_solver.tolerance", self.root_solver.tolerance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                bail!(TrivializationError::Configuration(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.n_path_to_pt < 10 {
            bail!(TrivializationError::Configuration(
                "n_path_to_pt must be at least 10".to_string()
            ));
        }
        if self.n_path_around_pt < 4 {
            bail!(TrivializationError::Configuration(
                "n_path_around_pt must be at least 4".to_string()
            ));
        }
        if self.zoom_factor < 2 {
            bail!(TrivializationError::Configuration(
                "zoom_factor must be at least 2".to_string()
            ));
        }
        if self.root_solver.max_steps == 0 {
            bail!(TrivializationError::Configuration(
                "root_solver.max_steps must be positive".to_string()
            ));
        }
        Ok(())
    }
}

/// An ordered, non-empty sequence of sample points in the `z`-plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PathRecord")]
pub struct Path {
    points: Vec<Complex64>,
    closed: bool,
}

#[derive(Deserialize)]
struct PathRecord {
    points: Vec<Complex64>,
    #[serde(default)]
    closed: bool,
}

impl TryFrom<PathRecord> for Path {
    type Error = anyhow::Error;

    fn try_from(record: PathRecord) -> Result<Self> {
        if record.closed {
            Path::closed(record.points, 0.0)
        } else {
            Path::new(record.points)
        }
    }
}

impl Path {
    /// An open path through `points`.
    pub fn new(points: Vec<Complex64>) -> Result<Self> {
        if points.is_empty() {
            bail!("A path needs at least one point.");
        }
        Ok(Self {
            points,
            closed: false,
        })
    }

    /// A closed path; the last point must coincide with the first.
    pub fn closed(points: Vec<Complex64>, tolerance: f64) -> Result<Self> {
        let mut path = Self::new(points)?;
        if (path.start() - path.end()).norm() > tolerance {
            bail!(
                "A closed path must end where it starts ({} != {}).",
                path.start(),
                path.end()
            );
        }
        path.closed = true;
        Ok(path)
    }

    /// `steps` equal steps from `from` to `to`. A zero-length segment is
    /// the single point `from`.
    pub fn segment(from: Complex64, to: Complex64, steps: usize) -> Self {
        if from == to || steps == 0 {
            return Self {
                points: vec![from, to],
                closed: false,
            }
            .deduplicated();
        }
        let delta = (to - from) / steps as f64;
        let mut points: Vec<Complex64> = (0..steps).map(|i| from + delta * i as f64).collect();
        points.push(to);
        Self {
            points,
            closed: false,
        }
    }

    /// `center + radius * e^{i(start_angle + sweep t)}` for `t` in `[0, 1]`.
    pub fn arc(center: Complex64, radius: f64, start_angle: f64, sweep: f64, steps: usize) -> Self {
        let steps = steps.max(1);
        let points = (0..=steps)
            .map(|i| {
                let t = i as f64 / steps as f64;
                center + Complex64::from_polar(radius, start_angle + sweep * t)
            })
            .collect();
        Self {
            points,
            closed: false,
        }
    }

    /// Counter-clockwise circle starting and ending at `center - i radius`.
    pub fn circle(center: Complex64, radius: f64, steps: usize) -> Self {
        let mut path = Self::arc(center, radius, -PI / 2.0, 2.0 * PI, steps);
        let start = path.points[0];
        if let Some(last) = path.points.last_mut() {
            *last = start;
        }
        path.closed = true;
        path
    }

    /// Joins `first` and `rest` end to end; a junction point shared by
    /// consecutive pieces appears once.
    pub fn concat(first: Path, rest: &[Path]) -> Self {
        let mut points = first.points;
        for piece in rest {
            for &p in &piece.points {
                if points.last() != Some(&p) {
                    points.push(p);
                }
            }
        }
        Self {
            points,
            closed: false,
        }
    }

    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            closed: self.closed,
        }
    }

    pub(crate) fn mark_closed(mut self) -> Self {
        self.closed = true;
        self
    }

    fn deduplicated(mut self) -> Self {
        self.points.dedup();
        self
    }

    pub fn points(&self) -> &[Complex64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn start(&self) -> Complex64 {
        self.points[0]
    }

    pub fn end(&self) -> Complex64 {
        self.points[self.points.len() - 1]
    }
}

/// A bijection of sheet indices, `i -> sigma(i)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Permutation {
    images: Vec<usize>,
}

impl Permutation {
    pub fn new(images: Vec<usize>) -> Result<Self> {
        let n = images.len();
        let mut seen = vec![false; n];
        for &j in &images {
            if j >= n || seen[j] {
                bail!(TrivializationError::DegenerateSheets(format!(
                    "{:?} is not a permutation",
                    images
                )));
            }
            seen[j] = true;
        }
        Ok(Self { images })
    }

    pub fn identity(n: usize) -> Self {
        Self {
            images: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn apply(&self, i: usize) -> usize {
        self.images[i]
    }

    pub fn images(&self) -> &[usize] {
        &self.images
    }

    pub fn is_identity(&self) -> bool {
        self.images.iter().enumerate().all(|(i, &j)| i == j)
    }

    pub fn inverse(&self) -> Self {
        let mut images = vec![0; self.images.len()];
        for (i, &j) in self.images.iter().enumerate() {
            images[j] = i;
        }
        Self { images }
    }

    /// `self ∘ other`, i.e. `other` acts first.
    pub fn compose(&self, other: &Permutation) -> Result<Self> {
        if self.len() != other.len() {
            bail!(
                "Cannot compose permutations of {} and {} elements.",
                self.len(),
                other.len()
            );
        }
        Ok(Self {
            images: other.images.iter().map(|&j| self.images[j]).collect(),
        })
    }

    /// Matrix acting on column vectors of sheets, `M[sigma(i), i] = 1`.
    pub fn matrix(&self) -> DMatrix<f64> {
        let n = self.images.len();
        let mut m = DMatrix::zeros(n, n);
        for (i, &j) in self.images.iter().enumerate() {
            m[(j, i)] = 1.0;
        }
        m
    }

    /// Non-trivial cycles, each starting at its smallest element.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.images.len()];
        let mut cycles = Vec::new();
        for start in 0..self.images.len() {
            if visited[start] {
                continue;
            }
            let mut cycle = vec![start];
            visited[start] = true;
            let mut next = self.images[start];
            while next != start {
                visited[next] = true;
                cycle.push(next);
                next = self.images[next];
            }
            if cycle.len() > 1 {
                cycles.push(cycle);
            }
        }
        cycles
    }

    /// True when the permutation is a single cycle of length `length`.
    pub fn is_cycle_of_length(&self, length: usize) -> bool {
        let cycles = self.cycles();
        cycles.len() == 1 && cycles[0].len() == length
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = anyhow::Error;

    fn try_from(images: Vec<usize>) -> Result<Self> {
        Self::new(images)
    }
}

impl From<Permutation> for Vec<usize> {
    fn from(p: Permutation) -> Self {
        p.images
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cycles = self.cycles();
        if cycles.is_empty() {
            return f.write_str("()");
        }
        for cycle in cycles {
            let body: Vec<String> = cycle.iter().map(|i| i.to_string()).collect();
            write!(f, "({})", body.join(" "))?;
        }
        Ok(())
    }
}

/// Counters reported by the sheet tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingDiagnostics {
    /// Deepest zoom level reached, 0 when no step was subdivided.
    pub max_zoom_depth: usize,
    /// Number of subdivided steps, at every level.
    pub zoom_count: usize,
    /// Number of steps resolved by comparing displacements.
    pub derivative_tie_breaks: usize,
}

impl TrackingDiagnostics {
    pub fn absorb(&mut self, nested: &TrackingDiagnostics) {
        self.max_zoom_depth = self.max_zoom_depth.max(nested.max_zoom_depth);
        self.zoom_count += nested.zoom_count;
        self.derivative_tie_breaks += nested.derivative_tie_breaks;
    }
}

/// A point of the base where sheets collide at finite `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchPoint {
    pub z: Complex64,
    pub label: String,
    /// Sheets colliding at the branch point, clusters of two or more.
    pub groups: Vec<Vec<usize>>,
    /// Sheets that stay apart.
    pub singles: Vec<usize>,
    /// Minimal independent set of positive roots vanishing here.
    pub positive_roots: Vec<Vec<f64>>,
    pub order: usize,
    pub monodromy: Permutation,
    /// Sheet values at the branch point, indexed by sheet label.
    pub sheets: Vec<Complex64>,
    pub ramification_points: Vec<RamificationPoint>,
}

/// A puncture of the base around which the sheets may be permuted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrregularSingularity {
    pub z: Complex64,
    pub label: String,
    pub monodromy: Permutation,
}

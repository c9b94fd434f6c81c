//! Continuation of the sheets along a path.
//!
//! At every sample the fiber is solved and each sheet is continued to the
//! nearest root. The ordering is accepted only if the continued sheets are
//! pairwise further apart than the accuracy. A rejected step is first
//! subdivided ("zoom"), with the accuracy tightened by the zoom factor;
//! when the zoom budget is spent, a pair of sheets sharing one root is
//! split by comparing each sheet's displacement with its previous one.

use super::types::{TrackingDiagnostics, TrivializationSettings};
use crate::error::{TrackingFailure, TrivializationError};
use crate::traits::CurveEvaluator;
use anyhow::Result;
use num_complex::Complex64;
use tracing::debug;

/// Result of ordering the roots at one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SortOutcome {
    Sorted(Vec<Complex64>),
    Failed(TrackingFailure),
}

/// Sheet values along a path, one `n`-tuple per path sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTracks {
    pub samples: Vec<Vec<Complex64>>,
    pub diagnostics: TrackingDiagnostics,
}

impl SheetTracks {
    pub fn final_values(&self) -> &[Complex64] {
        self.samples.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values of sheet `i` along the path.
    pub fn sheet(&self, i: usize) -> Vec<Complex64> {
        self.samples.iter().map(|tuple| tuple[i]).collect()
    }
}

pub struct SheetTracker<'a, C: CurveEvaluator> {
    curve: &'a C,
    settings: &'a TrivializationSettings,
    allow_zero_pair: bool,
}

impl<'a, C: CurveEvaluator> SheetTracker<'a, C> {
    /// `allow_zero_pair` tolerates one pair of sheets coinciding at `x = 0`,
    /// which is structural for curves of type D.
    pub fn new(curve: &'a C, settings: &'a TrivializationSettings, allow_zero_pair: bool) -> Self {
        Self {
            curve,
            settings,
            allow_zero_pair,
        }
    }

    /// Tracks `initial`, the sheet values at `points[0]`, along `points`.
    ///
    /// With `end_at_branch_point` the distinctness check is skipped within
    /// the accuracy of the last point, where sheets are expected to meet.
    pub fn track(
        &self,
        points: &[Complex64],
        initial: &[Complex64],
        end_at_branch_point: bool,
    ) -> Result<SheetTracks> {
        let terminal = if end_at_branch_point {
            points.last().copied()
        } else {
            None
        };
        self.track_level(
            points,
            initial,
            None,
            self.settings.accuracy,
            self.settings.max_zoom_level,
            0,
            terminal,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn track_level(
        &self,
        points: &[Complex64],
        initial: &[Complex64],
        previous: Option<&[Complex64]>,
        accuracy: f64,
        zoom_level: usize,
        depth: usize,
        terminal: Option<Complex64>,
    ) -> Result<SheetTracks> {
        let mut diagnostics = TrackingDiagnostics {
            max_zoom_depth: depth,
            ..TrackingDiagnostics::default()
        };
        let mut samples: Vec<Vec<Complex64>> = Vec::with_capacity(points.len());
        samples.push(initial.to_vec());

        for k in 1..points.len() {
            let (z_0, z_1) = (points[k - 1], points[k]);
            let current = &samples[k - 1];
            let before: Option<&[Complex64]> = if k >= 2 {
                Some(samples[k - 2].as_slice())
            } else {
                previous
            };

            let candidates = self.fiber(z_1)?;
            let check = match terminal {
                Some(end) => (z_1 - end).norm() >= self.settings.accuracy,
                None => true,
            };

            let outcome =
                sort_by_proximity(current, &candidates, accuracy, check, self.allow_zero_pair);
            let next = match outcome {
                SortOutcome::Sorted(sorted) => sorted,
                SortOutcome::Failed(reason) if zoom_level > 0 => {
                    debug!(%z_0, %z_1, %reason, depth, "having trouble tracking sheets, zooming in");
                    let zoom_factor = self.settings.zoom_factor;
                    let delta = (z_1 - z_0) / zoom_factor as f64;
                    let mut zoomed: Vec<Complex64> =
                        (0..zoom_factor).map(|j| z_0 + delta * j as f64).collect();
                    zoomed.push(z_1);
                    let nested = self.track_level(
                        &zoomed,
                        current,
                        before,
                        accuracy / zoom_factor as f64,
                        zoom_level - 1,
                        depth + 1,
                        terminal,
                    )?;
                    diagnostics.zoom_count += 1;
                    diagnostics.absorb(&nested.diagnostics);
                    nested.final_values().to_vec()
                }
                SortOutcome::Failed(reason) => {
                    debug!(%z_0, %z_1, %reason, "resorting to tracking sheets by their derivatives");
                    let outcome = match before {
                        Some(before) => {
                            let displacements: Vec<Complex64> =
                                current.iter().zip(before).map(|(x, y)| x - y).collect();
                            sort_by_derivative(
                                current,
                                &candidates,
                                &displacements,
                                accuracy,
                                self.allow_zero_pair,
                            )
                        }
                        None => SortOutcome::Failed(TrackingFailure::MissingDisplacement {
                            sheet: first_contested(current, &candidates).unwrap_or(0),
                        }),
                    };
                    match outcome {
                        SortOutcome::Sorted(sorted) => {
                            diagnostics.derivative_tie_breaks += 1;
                            sorted
                        }
                        SortOutcome::Failed(reason) => {
                            return Err(TrivializationError::SheetTracking {
                                from: z_0,
                                to: z_1,
                                zoom_depth: depth,
                                reason,
                            }
                            .into());
                        }
                    }
                }
            };
            samples.push(next);
        }

        Ok(SheetTracks {
            samples,
            diagnostics,
        })
    }

    fn fiber(&self, z: Complex64) -> Result<Vec<Complex64>> {
        let roots = self.curve.roots(z, &self.settings.root_solver)?;
        let expected = self.curve.sheet_count();
        if roots.len() != expected {
            return Err(TrivializationError::SheetCount {
                z,
                expected,
                found: roots.len(),
            }
            .into());
        }
        Ok(roots)
    }
}

/// Index of the candidate nearest to `x`; ties go to the lowest index.
fn nearest_index(x: Complex64, candidates: &[Complex64]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (j, c) in candidates.iter().enumerate() {
        let d = (c - x).norm();
        if d < best_distance {
            best = j;
            best_distance = d;
        }
    }
    best
}

/// Indices of the two candidates nearest to `x`, nearest first.
fn two_nearest(x: Complex64, candidates: &[Complex64]) -> [usize; 2] {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        (candidates[a] - x)
            .norm()
            .total_cmp(&(candidates[b] - x).norm())
            .then(a.cmp(&b))
    });
    [order[0], order[1]]
}

fn first_contested(refs: &[Complex64], candidates: &[Complex64]) -> Option<usize> {
    let assigned: Vec<usize> = refs.iter().map(|&x| nearest_index(x, candidates)).collect();
    (0..assigned.len()).find(|&i| assigned.iter().filter(|&&a| a == assigned[i]).count() > 1)
}

/// Checks that sheets are pairwise further apart than `accuracy`.
///
/// With `allow_zero_pair`, a single pair closer than `accuracy` is accepted
/// if some sheet is within `accuracy` of zero.
pub fn check_distinct(
    xs: &[Complex64],
    accuracy: f64,
    allow_zero_pair: bool,
) -> std::result::Result<(), TrackingFailure> {
    let mut pairs = 0;
    for i in 0..xs.len() {
        for j in (i + 1)..xs.len() {
            if (xs[i] - xs[j]).norm() <= accuracy {
                pairs += 1;
            }
        }
    }
    if pairs == 0 {
        return Ok(());
    }
    let near_zero = xs.iter().any(|x| x.norm() < accuracy);
    if allow_zero_pair && pairs == 1 && near_zero {
        return Ok(());
    }
    Err(TrackingFailure::Indistinct { pairs, accuracy })
}

/// Continues each reference sheet to its nearest candidate.
pub fn sort_by_proximity(
    refs: &[Complex64],
    candidates: &[Complex64],
    accuracy: f64,
    check: bool,
    allow_zero_pair: bool,
) -> SortOutcome {
    let sorted: Vec<Complex64> = refs
        .iter()
        .map(|&x| candidates[nearest_index(x, candidates)])
        .collect();
    if check {
        if let Err(reason) = check_distinct(&sorted, accuracy, allow_zero_pair) {
            return SortOutcome::Failed(reason);
        }
    }
    SortOutcome::Sorted(sorted)
}

/// Splits pairs of sheets sharing a nearest candidate by the phase of
/// their displacement relative to the previous step.
pub fn sort_by_derivative(
    refs: &[Complex64],
    candidates: &[Complex64],
    displacements: &[Complex64],
    accuracy: f64,
    allow_zero_pair: bool,
) -> SortOutcome {
    let assigned: Vec<usize> = refs.iter().map(|&x| nearest_index(x, candidates)).collect();
    let mut chosen: Vec<Option<usize>> = vec![None; refs.len()];

    for (i, &a) in assigned.iter().enumerate() {
        let sharing: Vec<usize> = (0..refs.len()).filter(|&j| assigned[j] == a).collect();
        match sharing.len() {
            1 => chosen[i] = Some(a),
            2 => {}
            size => return SortOutcome::Failed(TrackingFailure::TooManyCollisions { size }),
        }
    }

    for first in 0..refs.len() {
        if chosen[first].is_some() {
            continue;
        }
        let second = match (first + 1..refs.len()).find(|&j| assigned[j] == assigned[first]) {
            Some(j) => j,
            None => continue,
        };
        if candidates.len() < 2 {
            return SortOutcome::Failed(TrackingFailure::TooManyCollisions { size: 2 });
        }
        let near_first = two_nearest(refs[first], candidates);
        let near_second = two_nearest(refs[second], candidates);
        let same_set = near_first == near_second
            || (near_first[0] == near_second[1] && near_first[1] == near_second[0]);
        if !same_set {
            return SortOutcome::Failed(TrackingFailure::MismatchedCandidates { first, second });
        }
        for sheet in [first, second] {
            let reference = displacements[sheet];
            if reference.norm() == 0.0 {
                return SortOutcome::Failed(TrackingFailure::MissingDisplacement { sheet });
            }
            let deviation = |c: usize| ((candidates[c] - refs[sheet]) / reference).arg().abs();
            chosen[sheet] = Some(if deviation(near_first[0]) < deviation(near_first[1]) {
                near_first[0]
            } else {
                near_first[1]
            });
        }
    }

    let indices: Vec<usize> = chosen.into_iter().flatten().collect();
    let mut unique = indices.clone();
    unique.sort_unstable();
    unique.dedup();
    if indices.len() != refs.len() || unique.len() != indices.len() {
        return SortOutcome::Failed(TrackingFailure::Indistinct {
            pairs: indices.len() - unique.len(),
            accuracy,
        });
    }
    let sorted: Vec<Complex64> = indices.iter().map(|&j| candidates[j]).collect();
    match check_distinct(&sorted, accuracy, allow_zero_pair) {
        Ok(()) => SortOutcome::Sorted(sorted),
        Err(reason) => SortOutcome::Failed(reason),
    }
}

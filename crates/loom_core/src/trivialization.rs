//! Trivialization of a branched covering of the `z`-plane.
//!
//! The context fixes a base point below every critical locus, labels the
//! sheets there by weights of the chosen representation and continues the
//! labels to the rest of the plane along paths that never cross the
//! vertical rays above the critical loci. Construction runs once, stage by
//! stage; afterwards the context only answers queries.

pub mod alignment;
pub mod branch_point;
pub mod path;
pub mod ramification;
pub mod tracking;
pub mod types;

pub use path::{LocusScales, PathPlanner};
pub use tracking::{SheetTracker, SheetTracks, SortOutcome};
pub use types::{
    BranchPoint, IrregularSingularity, Path, Permutation, TrackingDiagnostics,
    TrivializationSettings,
};

use crate::critical_locus::{CriticalLocusFinder, RamificationPoint};
use crate::error::TrivializationError;
use crate::root_system::RootSystem;
use crate::traits::{CurveEvaluator, RootSystemProvider};
use alignment::{align_ffr_sheets, representation_sheets};
use anyhow::{bail, Context, Result};
use num_complex::Complex64;
use std::fmt;
use tracing::info;

/// Construction stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    LocateCriticalLoci,
    FixReferenceSheets,
    AnalyzeBranchPoints,
    AnalyzeIrregularSingularities,
    ClassifyRamificationPoints,
    Done,
}

impl BuildStage {
    fn next(self) -> Self {
        match self {
            Self::LocateCriticalLoci => Self::FixReferenceSheets,
            Self::FixReferenceSheets => Self::AnalyzeBranchPoints,
            Self::AnalyzeBranchPoints => Self::AnalyzeIrregularSingularities,
            Self::AnalyzeIrregularSingularities => Self::ClassifyRamificationPoints,
            Self::ClassifyRamificationPoints | Self::Done => Self::Done,
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::LocateCriticalLoci => "locating critical loci",
            Self::FixReferenceSheets => "fixing reference sheets",
            Self::AnalyzeBranchPoints => "analyzing branch points",
            Self::AnalyzeIrregularSingularities => "analyzing irregular singularities",
            Self::ClassifyRamificationPoints => "classifying ramification points",
            Self::Done => "done",
        };
        f.write_str(text)
    }
}

/// Read-only view shared by construction and queries.
struct Frame<'a, C: CurveEvaluator> {
    curve: &'a C,
    root_system: &'a RootSystem,
    settings: &'a TrivializationSettings,
    base_point: Complex64,
    reference_ffr_sheets: &'a [Complex64],
    reference_sheets: &'a [Complex64],
}

impl<C: CurveEvaluator> Frame<'_, C> {
    fn tracker(&self) -> SheetTracker<'_, C> {
        SheetTracker::new(
            self.curve,
            self.settings,
            self.root_system.allows_zero_sheet_pair(),
        )
    }

    fn ffr_sheets_along(&self, path: &Path, to_branch_point: bool) -> Result<SheetTracks> {
        if (path.start() - self.base_point).norm() > self.settings.accuracy {
            bail!(TrivializationError::Configuration(format!(
                "paths must start at the base point {}, got {}",
                self.base_point,
                path.start()
            )));
        }
        self.tracker()
            .track(path.points(), self.reference_ffr_sheets, to_branch_point)
    }

    fn sheets_along(&self, path: &Path, to_branch_point: bool) -> Result<SheetTracks> {
        let ffr = self.ffr_sheets_along(path, to_branch_point)?;
        Ok(SheetTracks {
            samples: ffr
                .samples
                .iter()
                .map(|xs| representation_sheets(xs, self.root_system))
                .collect(),
            diagnostics: ffr.diagnostics,
        })
    }

    fn monodromy_around(&self, path: &Path) -> Result<(Permutation, TrackingDiagnostics)> {
        if !path.is_closed() && (path.end() - path.start()).norm() > self.settings.accuracy {
            bail!(TrivializationError::Configuration(
                "monodromy needs a closed path".to_string()
            ));
        }
        let tracks = self.sheets_along(path, false)?;
        let permutation = branch_point::monodromy(
            self.reference_sheets,
            tracks.final_values(),
            self.settings.accuracy,
            self.root_system.allows_zero_sheet_pair(),
        )?;
        Ok((permutation, tracks.diagnostics))
    }
}

/// A fully analyzed covering.
#[derive(Debug, Clone)]
pub struct TrivializationContext<C: CurveEvaluator> {
    curve: C,
    root_system: RootSystem,
    settings: TrivializationSettings,
    punctures: Vec<Complex64>,
    scales: LocusScales,
    planner: PathPlanner,
    ramification_points: Vec<RamificationPoint>,
    reference_ffr_sheets: Vec<Complex64>,
    reference_sheets: Vec<Complex64>,
    branch_points: Vec<BranchPoint>,
    irregular_singularities: Vec<IrregularSingularity>,
    diagnostics: TrackingDiagnostics,
}

impl<C: CurveEvaluator> TrivializationContext<C> {
    /// Analyzes `curve` with the weights of `root_system`; `punctures` are
    /// the irregular singularities.
    pub fn new(
        curve: C,
        root_system: RootSystem,
        punctures: &[Complex64],
        settings: TrivializationSettings,
    ) -> Result<Self> {
        ContextBuilder::new(curve, root_system, punctures, settings).build()
    }

    pub fn from_provider<P: RootSystemProvider>(
        curve: C,
        provider: &P,
        algebra: &str,
        representation: usize,
        punctures: &[Complex64],
        settings: TrivializationSettings,
    ) -> Result<Self> {
        let root_system = provider
            .root_system(algebra, representation)
            .with_context(|| format!("Failed to get weight data of {} ({})", algebra, representation))?;
        Self::new(curve, root_system, punctures, settings)
    }

    fn frame(&self) -> Frame<'_, C> {
        Frame {
            curve: &self.curve,
            root_system: &self.root_system,
            settings: &self.settings,
            base_point: self.planner.base_point(),
            reference_ffr_sheets: &self.reference_ffr_sheets,
            reference_sheets: &self.reference_sheets,
        }
    }

    pub fn curve(&self) -> &C {
        &self.curve
    }

    pub fn root_system(&self) -> &RootSystem {
        &self.root_system
    }

    pub fn settings(&self) -> &TrivializationSettings {
        &self.settings
    }

    pub fn punctures(&self) -> &[Complex64] {
        &self.punctures
    }

    pub fn base_point(&self) -> Complex64 {
        self.planner.base_point()
    }

    pub fn scales(&self) -> &LocusScales {
        &self.scales
    }

    /// Sheet values at the base point, ordered like the weights of the
    /// first fundamental representation.
    pub fn reference_ffr_sheets(&self) -> &[Complex64] {
        &self.reference_ffr_sheets
    }

    /// Sheet values at the base point, ordered like the weights of the
    /// chosen representation.
    pub fn reference_sheets(&self) -> &[Complex64] {
        &self.reference_sheets
    }

    /// Every ramification point found, including those above accidental
    /// branch points.
    pub fn ramification_points(&self) -> &[RamificationPoint] {
        &self.ramification_points
    }

    pub fn branch_points(&self) -> &[BranchPoint] {
        &self.branch_points
    }

    pub fn irregular_singularities(&self) -> &[IrregularSingularity] {
        &self.irregular_singularities
    }

    /// Tracking counters accumulated while building the context.
    pub fn diagnostics(&self) -> &TrackingDiagnostics {
        &self.diagnostics
    }

    pub fn path_to(&self, z: Complex64) -> Path {
        self.planner.path_to(z)
    }

    pub fn path_around(&self, z: Complex64) -> Path {
        self.planner.path_around(z)
    }

    /// Sheets of the chosen representation along a path from the base point.
    pub fn sheets_along(&self, path: &Path) -> Result<SheetTracks> {
        self.frame().sheets_along(path, false)
    }

    /// Sheets of the first fundamental representation along a path.
    pub fn ffr_sheets_along(&self, path: &Path) -> Result<SheetTracks> {
        self.frame().ffr_sheets_along(path, false)
    }

    /// Sheet values at `z`, indexed by sheet label. `z` must not be a
    /// critical locus.
    pub fn sheets_at(&self, z: Complex64) -> Result<Vec<Complex64>> {
        let tracks = self.sheets_along(&self.path_to(z))?;
        Ok(tracks.final_values().to_vec())
    }

    /// Permutation of the sheet labels along a closed path from the base
    /// point.
    pub fn monodromy_around(&self, path: &Path) -> Result<Permutation> {
        self.frame().monodromy_around(path).map(|(p, _)| p)
    }

    /// The `count` sheets at `z` nearest to `x0`, with their labels.
    pub fn sheets_near(
        &self,
        z: Complex64,
        x0: Complex64,
        count: usize,
    ) -> Result<Vec<(usize, Complex64)>> {
        let mut sheets: Vec<(usize, Complex64)> =
            self.sheets_at(z)?.into_iter().enumerate().collect();
        sheets.sort_by(|a, b| {
            (a.1 - x0)
                .norm()
                .total_cmp(&(b.1 - x0).norm())
                .then(a.0.cmp(&b.0))
        });
        sheets.truncate(count);
        Ok(sheets)
    }
}

/// Owns everything while the context is incomplete.
struct ContextBuilder<C: CurveEvaluator> {
    curve: C,
    root_system: RootSystem,
    settings: TrivializationSettings,
    punctures: Vec<Complex64>,
    stage: BuildStage,
    ramification_points: Vec<RamificationPoint>,
    branch_point_zs: Vec<Complex64>,
    scales: Option<LocusScales>,
    planner: Option<PathPlanner>,
    reference_ffr_sheets: Vec<Complex64>,
    reference_sheets: Vec<Complex64>,
    branch_points: Vec<BranchPoint>,
    irregular_singularities: Vec<IrregularSingularity>,
    diagnostics: TrackingDiagnostics,
}

impl<C: CurveEvaluator> ContextBuilder<C> {
    fn new(
        curve: C,
        root_system: RootSystem,
        punctures: &[Complex64],
        settings: TrivializationSettings,
    ) -> Self {
        Self {
            curve,
            root_system,
            settings,
            punctures: punctures.to_vec(),
            stage: BuildStage::LocateCriticalLoci,
            ramification_points: Vec::new(),
            branch_point_zs: Vec::new(),
            scales: None,
            planner: None,
            reference_ffr_sheets: Vec::new(),
            reference_sheets: Vec::new(),
            branch_points: Vec::new(),
            irregular_singularities: Vec::new(),
            diagnostics: TrackingDiagnostics::default(),
        }
    }

    fn build(mut self) -> Result<TrivializationContext<C>> {
        while self.stage != BuildStage::Done {
            let stage = self.stage;
            info!(%stage, "trivialization stage");
            let result = match stage {
                BuildStage::LocateCriticalLoci => self.locate_critical_loci(),
                BuildStage::FixReferenceSheets => self.fix_reference_sheets(),
                BuildStage::AnalyzeBranchPoints => self.analyze_branch_points(),
                BuildStage::AnalyzeIrregularSingularities => self.analyze_irregular_singularities(),
                BuildStage::ClassifyRamificationPoints => self.classify_ramification_points(),
                BuildStage::Done => Ok(()),
            };
            result.with_context(|| format!("Trivialization failed while {}", stage))?;
            self.stage = stage.next();
        }

        let (scales, planner) = match (self.scales, self.planner) {
            (Some(scales), Some(planner)) => (scales, planner),
            _ => bail!("Trivialization finished without a base point."),
        };
        Ok(TrivializationContext {
            curve: self.curve,
            root_system: self.root_system,
            settings: self.settings,
            punctures: self.punctures,
            scales,
            planner,
            ramification_points: self.ramification_points,
            reference_ffr_sheets: self.reference_ffr_sheets,
            reference_sheets: self.reference_sheets,
            branch_points: self.branch_points,
            irregular_singularities: self.irregular_singularities,
            diagnostics: self.diagnostics,
        })
    }

    fn planner(&self) -> Result<&PathPlanner> {
        self.planner
            .as_ref()
            .context("the base point has not been fixed yet")
    }

    fn frame(&self) -> Result<Frame<'_, C>> {
        Ok(Frame {
            curve: &self.curve,
            root_system: &self.root_system,
            settings: &self.settings,
            base_point: self.planner()?.base_point(),
            reference_ffr_sheets: &self.reference_ffr_sheets,
            reference_sheets: &self.reference_sheets,
        })
    }

    fn locate_critical_loci(&mut self) -> Result<()> {
        self.settings.validate()?;
        self.root_system.validate()?;
        if self.curve.sheet_count() != self.root_system.ffr_sheet_count() {
            bail!(TrivializationError::Configuration(format!(
                "the curve has {} sheets, the first fundamental representation of {} has {} weights",
                self.curve.sheet_count(),
                self.root_system.algebra,
                self.root_system.ffr_sheet_count()
            )));
        }
        let equation = self.curve.polynomial().ok_or_else(|| {
            TrivializationError::NotImplemented(
                "locating critical loci needs the curve's polynomial equation".to_string(),
            )
        })?;

        let accuracy = self.settings.accuracy;
        self.punctures = remove_duplicates(&self.punctures, accuracy);
        self.ramification_points = CriticalLocusFinder::new(
            equation,
            accuracy,
            &self.punctures,
            self.settings.root_solver,
        )
        .find(self.settings.ramification_point_finding_method)?;

        let rp_zs: Vec<Complex64> = self.ramification_points.iter().map(|rp| rp.z).collect();
        self.branch_point_zs = remove_duplicates(&rp_zs, accuracy);

        let loci: Vec<Complex64> = self
            .branch_point_zs
            .iter()
            .chain(&self.punctures)
            .copied()
            .collect();
        let scales = LocusScales::new(&loci, accuracy, self.settings.single_locus_scale)?;
        info!(
            branch_points = self.branch_point_zs.len(),
            punctures = self.punctures.len(),
            base_point = %scales.base_point,
            "located critical loci"
        );
        self.planner = Some(PathPlanner::new(
            &scales,
            self.settings.n_path_to_pt,
            self.settings.n_path_around_pt,
        ));
        self.scales = Some(scales);
        Ok(())
    }

    fn fix_reference_sheets(&mut self) -> Result<()> {
        let base_point = self.planner()?.base_point();
        let roots = self.curve.roots(base_point, &self.settings.root_solver)?;
        let ffr = align_ffr_sheets(&roots, &self.root_system)?;
        tracking::check_distinct(
            &ffr,
            self.settings.accuracy,
            self.root_system.allows_zero_sheet_pair(),
        )
        .map_err(|reason| {
            TrivializationError::DegenerateSheets(format!(
                "sheets at the base point {} are not distinct: {}",
                base_point, reason
            ))
        })?;
        self.reference_sheets = representation_sheets(&ffr, &self.root_system);
        self.reference_ffr_sheets = ffr;
        Ok(())
    }

    fn analyze_branch_points(&mut self) -> Result<()> {
        let zs = self.branch_point_zs.clone();
        for (i, z) in zs.into_iter().enumerate() {
            let label = format!("Branch point #{}", i);
            info!(%label, %z, "analyzing a branch point");
            let analysis = self
                .analyze_branch_point(z, label.clone())
                .with_context(|| format!("Failed to analyze {} at z = {}", label, z))?;
            match analysis {
                Some(bp) => {
                    if let Some(planner) = self.planner.as_mut() {
                        planner.add_branch_point(bp.z);
                    }
                    self.branch_points.push(bp);
                }
                None => info!(%label, "skipping accidental branch point"),
            }
        }
        Ok(())
    }

    fn analyze_branch_point(&mut self, z: Complex64, label: String) -> Result<Option<BranchPoint>> {
        let frame = self.frame()?;
        let planner = self.planner()?;
        let tracks = frame.sheets_along(&planner.path_to(z), true)?;
        let sheets = tracks.final_values().to_vec();
        let collisions = branch_point::collisions(&sheets, self.settings.bp_proximity_threshold);
        let positive_roots =
            branch_point::vanishing_positive_roots(&collisions.groups, &self.root_system);
        let mut diagnostics = tracks.diagnostics;

        let order = positive_roots.len() + 1;
        let result = if order > 1 {
            let (monodromy, loop_diagnostics) = frame.monodromy_around(&planner.path_around(z))?;
            diagnostics.absorb(&loop_diagnostics);
            info!(%label, order, %monodromy, "branch point");
            let ramification_points = self
                .ramification_points
                .iter()
                .filter(|rp| (rp.z - z).norm() < self.settings.accuracy)
                .cloned()
                .collect();
            Some(BranchPoint {
                z,
                label,
                groups: collisions.groups,
                singles: collisions.singles,
                positive_roots,
                order,
                monodromy,
                sheets,
                ramification_points,
            })
        } else {
            None
        };
        self.diagnostics.absorb(&diagnostics);
        Ok(result)
    }

    fn analyze_irregular_singularities(&mut self) -> Result<()> {
        let mut found = Vec::with_capacity(self.punctures.len());
        for (j, &z) in self.punctures.iter().enumerate() {
            let label = format!("Irr.Sing. #{}", j);
            info!(%label, %z, "analyzing an irregular singularity");
            let frame = self.frame()?;
            let path = self.planner()?.path_around(z);
            let (monodromy, diagnostics) = frame
                .monodromy_around(&path)
                .with_context(|| format!("Failed to analyze {} at z = {}", label, z))?;
            self.diagnostics.absorb(&diagnostics);
            found.push(IrregularSingularity {
                z,
                label,
                monodromy,
            });
        }
        self.irregular_singularities = found;
        Ok(())
    }

    fn classify_ramification_points(&mut self) -> Result<()> {
        let equation = self.curve.polynomial().ok_or_else(|| {
            TrivializationError::NotImplemented(
                "classifying ramification points needs the curve's polynomial equation"
                    .to_string(),
            )
        })?;
        for bp in &mut self.branch_points {
            let mut classified = Vec::with_capacity(bp.ramification_points.len());
            for rp in &bp.ramification_points {
                classified.push(ramification::classify(
                    rp,
                    equation,
                    &self.root_system,
                    self.settings.accuracy,
                )?);
            }
            bp.ramification_points = classified;
        }
        Ok(())
    }
}

/// Keeps the first of every group of values closer than `tolerance`.
fn remove_duplicates(values: &[Complex64], tolerance: f64) -> Vec<Complex64> {
    let mut unique: Vec<Complex64> = Vec::with_capacity(values.len());
    for &v in values {
        if unique.iter().all(|u| (u - v).norm() >= tolerance) {
            unique.push(v);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critical_locus::{RamificationPointMethod, RamificationType};
    use crate::curve::PolynomialCurve;
    use crate::root_system::ClassicalRootSystems;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn build(
        curve: &str,
        algebra: &str,
        punctures: &[Complex64],
        settings: TrivializationSettings,
    ) -> Result<TrivializationContext<PolynomialCurve>> {
        let curve = PolynomialCurve::parse(curve, &[]).expect("curve");
        TrivializationContext::from_provider(
            curve,
            &ClassicalRootSystems,
            algebra,
            1,
            punctures,
            settings,
        )
    }

    #[test]
    fn square_root_cover() {
        let ctx = build("x^2 - z", "A1", &[], TrivializationSettings::default()).expect("context");
        assert!((ctx.base_point() - c(0.0, -3.0)).norm() < 1e-6);
        assert_eq!(ctx.branch_points().len(), 1);

        let bp = &ctx.branch_points()[0];
        assert_eq!(bp.label, "Branch point #0");
        assert_eq!(bp.order, 2);
        assert_eq!(bp.groups, vec![vec![0, 1]]);
        assert_eq!(bp.monodromy.images(), &[1, 0]);
        assert_eq!(bp.ramification_points.len(), 1);

        let rp = &bp.ramification_points[0];
        assert_eq!(rp.ramification_type, Some(RamificationType::I));
        let diff = rp.local_differential.expect("differential");
        assert!((diff.coefficient - c(1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn two_branch_points_are_both_transpositions() {
        let ctx = build("x^2 - (z^2 - 1)", "A1", &[], TrivializationSettings::default())
            .expect("context");
        assert!((ctx.base_point() - c(0.0, -2.0)).norm() < 1e-6);
        assert_eq!(ctx.branch_points().len(), 2);
        for bp in ctx.branch_points() {
            assert_eq!(bp.order, 2);
            assert!(bp.monodromy.is_cycle_of_length(2));
        }
        assert!((ctx.branch_points()[0].z - c(-1.0, 0.0)).norm() < 1e-6);
        assert!((ctx.branch_points()[1].z - c(1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn trivial_loop_and_clean_paths() {
        let ctx = build("x^2 - z", "A1", &[], TrivializationSettings::default()).expect("context");

        let identity = ctx
            .monodromy_around(&ctx.path_around(c(3.0, 0.0)))
            .expect("loop");
        assert!(identity.is_identity());

        let tracks = ctx.sheets_along(&ctx.path_to(c(2.0, 1.0))).expect("tracks");
        assert_eq!(tracks.diagnostics.max_zoom_depth, 0);
        let sheets = ctx.sheets_at(c(2.0, 1.0)).expect("sheets");
        assert_eq!(sheets, tracks.final_values());
        for x in &sheets {
            assert!((x * x - c(2.0, 1.0)).norm() < 1e-9);
        }
    }

    #[test]
    fn sheet_labels_do_not_depend_on_the_path() {
        let ctx = build("x^2 - z", "A1", &[], TrivializationSettings::default()).expect("context");
        let target = c(2.0, -0.2);
        let direct = ctx.sheets_at(target).expect("direct");
        // Along the base line and then straight to the target, avoiding the
        // vertical ray above the branch point.
        let detour = Path::concat(
            Path::segment(ctx.base_point(), c(-2.0, -3.0), 50),
            &[
                Path::segment(c(-2.0, -3.0), c(-2.0, -0.5), 50),
                Path::segment(c(-2.0, -0.5), target, 100),
            ],
        );
        let other = ctx.sheets_along(&detour).expect("detour");
        for (a, b) in direct.iter().zip(other.final_values()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn sheets_near_returns_the_closest_labels() {
        let ctx = build("x^2 - z", "A1", &[], TrivializationSettings::default()).expect("context");
        let sheets = ctx.sheets_at(c(4.0, 0.0)).expect("sheets");
        let near = ctx.sheets_near(c(4.0, 0.0), c(2.0, 0.0), 1).expect("near");
        assert_eq!(near.len(), 1);
        assert!((near[0].1 - c(2.0, 0.0)).norm() < 1e-9);
        assert_eq!(sheets[near[0].0], near[0].1);
    }

    #[test]
    fn puncture_becomes_an_irregular_singularity() {
        let ctx = build("x^2 - z", "A1", &[c(0.0, 0.0)], TrivializationSettings::default())
            .expect("context");
        assert!(ctx.branch_points().is_empty());
        assert!(ctx.ramification_points().is_empty());
        assert_eq!(ctx.irregular_singularities().len(), 1);
        let irr = &ctx.irregular_singularities()[0];
        assert_eq!(irr.label, "Irr.Sing. #0");
        assert_eq!(irr.monodromy.images(), &[1, 0]);
    }

    #[test]
    fn both_finding_methods_give_the_same_branch_points() {
        let settings = TrivializationSettings {
            ramification_point_finding_method: RamificationPointMethod::SystemOfEqs,
            ..TrivializationSettings::default()
        };
        let by_system = build("x^2 - (z^2 - 1)", "A1", &[], settings).expect("context");
        let by_discriminant =
            build("x^2 - (z^2 - 1)", "A1", &[], TrivializationSettings::default()).expect("context");
        assert_eq!(by_system.branch_points().len(), by_discriminant.branch_points().len());
        for (a, b) in by_system.branch_points().iter().zip(by_discriminant.branch_points()) {
            assert!((a.z - b.z).norm() < 1e-6);
            assert_eq!(a.monodromy, b.monodromy);
        }
    }

    #[test]
    fn triple_collisions_give_three_cycles() {
        let ctx = build("x^3 - z^2 + 1", "A2", &[], TrivializationSettings::default())
            .expect("context");
        assert!((ctx.base_point() - c(0.0, -2.0)).norm() < 1e-6);
        assert_eq!(ctx.branch_points().len(), 2);
        for (bp, z) in ctx.branch_points().iter().zip([-1.0, 1.0]) {
            assert!((bp.z - c(z, 0.0)).norm() < 1e-8);
            assert_eq!(bp.groups, vec![vec![0, 1, 2]]);
            assert_eq!(bp.order, 3);
            assert!(bp.monodromy.is_cycle_of_length(3), "{}", bp.monodromy);
            assert_eq!(bp.ramification_points.len(), 1);
            let rp = &bp.ramification_points[0];
            assert_eq!(rp.multiplicity, 3);
            assert_eq!(rp.ramification_type, Some(RamificationType::I));
        }
        // Near z = 1 the curve is dx^3 = 2 dz.
        let diff = ctx.branch_points()[1].ramification_points[0]
            .local_differential
            .expect("differential");
        assert!((diff.coefficient - c(2.0_f64.cbrt(), 0.0)).norm() < 1e-6);
        assert!((diff.exponent - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn d_type_curve_with_paired_collisions() {
        let ctx = build("x^4 + z*x^2 + 1", "D2", &[], TrivializationSettings::default())
            .expect("context");
        assert!((ctx.base_point() - c(0.0, -4.0)).norm() < 1e-6);
        let reference = ctx.reference_ffr_sheets();
        for j in 0..2 {
            assert!((reference[j] + reference[j + 2]).norm() < 1e-9);
        }

        assert_eq!(ctx.branch_points().len(), 2);
        for bp in ctx.branch_points() {
            assert_eq!(bp.groups.len(), 2);
            assert_eq!(bp.order, 2);
            let squared = bp.monodromy.compose(&bp.monodromy).expect("compose");
            assert!(squared.is_identity());
            assert!((0..4).all(|i| bp.monodromy.apply(i) != i), "{}", bp.monodromy);
            assert_eq!(bp.ramification_points.len(), 2);
            for rp in &bp.ramification_points {
                assert_eq!(rp.multiplicity, 2);
                assert_eq!(rp.ramification_type, Some(RamificationType::I));
            }
        }
    }

    #[test]
    fn d_type_origin_is_a_type_two_point() {
        let ctx = build("x^4 - z", "D2", &[], TrivializationSettings::default()).expect("context");
        assert_eq!(ctx.branch_points().len(), 1);
        let bp = &ctx.branch_points()[0];
        assert_eq!(bp.groups, vec![vec![0, 1, 2, 3]]);
        assert_eq!(bp.positive_roots.len(), 2);
        assert_eq!(bp.order, 3);
        assert!(bp.monodromy.is_cycle_of_length(4), "{}", bp.monodromy);
        assert_eq!(bp.ramification_points.len(), 1);
        let rp = &bp.ramification_points[0];
        assert_eq!(rp.multiplicity, 4);
        assert_eq!(rp.ramification_type, Some(RamificationType::II));
    }

    #[test]
    fn construction_errors() {
        assert_err_contains(
            build("x^2 - 1", "A1", &[], TrivializationSettings::default()),
            "at least one critical locus",
        );
        assert_err_contains(
            build("x^2 - 1", "A1", &[], TrivializationSettings::default()),
            "locating critical loci",
        );
        assert_err_contains(
            build("x^3 - z", "A1", &[], TrivializationSettings::default()),
            "the curve has 3 sheets",
        );
        assert_err_contains(
            build("x^2 - (z^2 + 1)", "A1", &[], TrivializationSettings::default()),
            "vertically aligned",
        );
        let settings = TrivializationSettings {
            zoom_factor: 1,
            ..TrivializationSettings::default()
        };
        assert_err_contains(build("x^2 - z", "A1", &[], settings), "zoom_factor");
    }

    #[test]
    fn paths_must_start_at_the_base_point() {
        let ctx = build("x^2 - z", "A1", &[], TrivializationSettings::default()).expect("context");
        let stray = Path::segment(c(5.0, 0.0), c(6.0, 0.0), 10);
        assert_err_contains(ctx.sheets_along(&stray), "must start at the base point");
        let open = ctx.path_to(c(1.0, 1.0));
        assert_err_contains(ctx.monodromy_around(&open), "closed path");
    }
}

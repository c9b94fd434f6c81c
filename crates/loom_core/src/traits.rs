use crate::polynomial::BivariatePolynomial;
use crate::root_finding::RootSolverSettings;
use crate::root_system::RootSystem;
use anyhow::Result;
use num_complex::Complex64;

/// A multi-valued algebraic curve `F(x, z) = 0` seen as a covering of the
/// `z`-plane.
pub trait CurveEvaluator {
    /// Number of sheets `n`, i.e. the degree of `F` in `x`.
    fn sheet_count(&self) -> usize;

    /// All `n` roots of `x -> F(x, z)`, repeated according to multiplicity.
    /// Must be deterministic for a given `z`.
    fn roots(&self, z: Complex64, settings: &RootSolverSettings) -> Result<Vec<Complex64>>;

    /// The numeric equation, when the curve has one. Needed for locating
    /// critical loci and for the local analysis of ramification points.
    fn polynomial(&self) -> Option<&BivariatePolynomial> {
        None
    }
}

/// Supplies the weight system of a Lie algebra in a given representation.
pub trait RootSystemProvider {
    /// `algebra` is a name such as `"A2"` or `"D4"`; `representation` is the
    /// index of a fundamental representation, starting at 1.
    fn root_system(&self, algebra: &str, representation: usize) -> Result<RootSystem>;
}

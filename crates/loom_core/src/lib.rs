pub mod critical_locus;
pub mod curve;
pub mod equation_engine;
pub mod error;
pub mod polynomial;
pub mod root_finding;
pub mod root_system;
/// The `loom_core` crate trivializes branched coverings of the complex plane
/// given by spectral curves `F(x, z) = 0` of ADE type.
///
/// Key components:
/// - **Traits**: `CurveEvaluator` (fiber roots over `z`), `RootSystemProvider` (weight data).
/// - **Equation Engine**: Parser and expander turning equation text into bivariate polynomials.
/// - **Critical Locus**: Ramification points via the discriminant or the system `F = dF/dx = 0`.
/// - **Trivialization**: Base point, sheet labels, branch point monodromy and local classification.
pub mod traits;
pub mod trivialization;

pub use error::TrivializationError;

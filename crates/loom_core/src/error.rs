//! Error taxonomy for the trivialization pipeline.
//!
//! Public functions return `anyhow::Result`; the variants below travel inside
//! the `anyhow::Error` so callers can recover the kind with `downcast_ref`
//! (or by walking `chain()` when context has been attached).

use num_complex::Complex64;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrivializationError {
    /// Polynomial root finding gave up after the configured escalations.
    #[error(
        "polynomial root finding did not converge after {attempts} attempts \
         (last iteration budget {max_steps})"
    )]
    NonConvergence { attempts: usize, max_steps: usize },

    #[error(
        "cannot track the sheets between z = {from} and z = {to} (zoom depth {zoom_depth}): \
         {reason}. Probably passing too close to a branch point or a puncture; \
         try increasing n_path_to_pt, n_path_around_pt or max_zoom_level"
    )]
    SheetTracking {
        from: Complex64,
        to: Complex64,
        zoom_depth: usize,
        reason: TrackingFailure,
    },

    #[error("expected {expected} sheets over z = {z}, the curve returned {found}")]
    SheetCount {
        z: Complex64,
        expected: usize,
        found: usize,
    },

    #[error("degenerate sheets: {0}")]
    DegenerateSheets(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("cannot handle this type of ramification point at z = {z}, x = {x} (i = {multiplicity})")]
    UnsupportedRamification {
        z: Complex64,
        x: Complex64,
        multiplicity: usize,
    },
}

/// Why a single tracking step could not order the sheets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingFailure {
    #[error("{pairs} pair(s) of sheets closer than the accuracy {accuracy:e}")]
    Indistinct { pairs: usize, accuracy: f64 },

    #[error("{size} sheets share the same nearest root, only pairs can be resolved")]
    TooManyCollisions { size: usize },

    #[error("the nearest roots of the contested pair ({first}, {second}) do not match")]
    MismatchedCandidates { first: usize, second: usize },

    #[error("no previous displacement is available for sheet {sheet}")]
    MissingDisplacement { sheet: usize },
}

impl TrivializationError {
    /// Finds the first `TrivializationError` in an error chain.
    pub fn find(err: &anyhow::Error) -> Option<&TrivializationError> {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<TrivializationError>())
    }
}

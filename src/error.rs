//! Structured error types for the alignment engine.

use thiserror::Error;

use crate::align::dispatch::Operation;
use crate::compute::simd::LaneWidth;

/// Everything that can go wrong on a library path.
///
/// Score saturation is deliberately absent: a run that overflows its lane
/// width still succeeds and reports `saturated` on the result, so the
/// caller can decide whether to escalate to a wider lane type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AlignError {
    /// No kernel is registered for this operation/width slot at any tier.
    #[error("no {op} kernel available for {width} lanes")]
    UnsupportedConfiguration { op: Operation, width: LaneWidth },

    /// Profiles require at least one query symbol.
    #[error("query must not be empty")]
    EmptyQuery,

    /// Matrices require at least one alphabet symbol.
    #[error("scoring matrix alphabet must not be empty")]
    EmptyAlphabet,

    /// Gap penalties are magnitudes and must be non-negative.
    #[error("gap penalties must be non-negative (open {open}, extend {extend})")]
    InvalidPenalties { open: i32, extend: i32 },

    /// The profile was not built for the requested lane width.
    #[error("profile was not built for {width} lanes")]
    ProfileWidthMissing { width: LaneWidth },

    /// The result was produced without trace capture.
    #[error("result carries no trace table; rerun with trace capture")]
    MissingTrace,

    /// A trace cell had no valid continuation for the walker's state.
    #[error("inconsistent trace at query {query}, database {database}: {reason}")]
    InconsistentTrace {
        query: i32,
        database: i32,
        reason: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AlignError>;

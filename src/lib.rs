//! Striped semi-global sequence alignment.
//!
//! The query is profiled once into striped vector order, then aligned
//! against any number of databases with the striped (Farrar) affine-gap
//! recurrence. Vector backends (AVX2, SSE4.1, portable) are chosen at
//! runtime per process; narrow lane widths detect score saturation and
//! report it on the result so callers can escalate to a wider width.
//!
//! ```
//! use striped_align::{walk, AlignConfig, LaneWidth, Profile, ScoringMatrix, SgFlags};
//!
//! let matrix = ScoringMatrix::dna();
//! let profile = Profile::build(b"ACGT", &matrix, &[LaneWidth::W16])?;
//! let config = AlignConfig::new(3, 1, SgFlags::all_free());
//! let result = striped_align::semi_global_trace(&profile, b"ACGT", &config, LaneWidth::W16)?;
//! assert_eq!(result.score(), 8);
//! assert_eq!((result.end_query(), result.end_ref()), (3, 3));
//!
//! let path = walk(&result, b"ACGT", b"ACGT")?;
//! assert_eq!(path.to_string(), "4=");
//! # Ok::<(), striped_align::AlignError>(())
//! ```

pub mod align;
pub mod compute;
pub mod error;
pub mod matrix;

pub use align::scalar;
pub use align::{
    semi_global, semi_global_auto, semi_global_trace, walk, AlignConfig, AlignResult,
    AlignmentPath, Operation, PathOp, PathSegment, Profile, SgFlags, TraceTable,
};
pub use compute::capability::{detect, tier, Tier, TIER_ENV};
pub use compute::simd::LaneWidth;
pub use error::{AlignError, Result};
pub use matrix::ScoringMatrix;

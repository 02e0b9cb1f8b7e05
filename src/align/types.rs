//! Parameter and result types for semi-global alignment.

use crate::align::trace::TraceTable;
use crate::compute::capability::Tier;
use crate::compute::simd::LaneWidth;
use crate::error::{AlignError, Result};

/// Which sequence ends are free (unpenalized).
///
/// All false is a fully anchored, global-style alignment; all true leaves
/// both ends of both sequences open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SgFlags {
    /// No penalty for skipping a query prefix.
    pub free_query_start: bool,
    /// No penalty for leaving a query suffix unaligned.
    pub free_query_end: bool,
    /// No penalty for skipping a database prefix.
    pub free_ref_start: bool,
    /// No penalty for leaving a database suffix unaligned.
    pub free_ref_end: bool,
}

impl SgFlags {
    /// Both sequences anchored at both ends.
    pub fn anchored() -> Self {
        SgFlags::default()
    }

    /// All four ends free.
    pub fn all_free() -> Self {
        SgFlags {
            free_query_start: true,
            free_query_end: true,
            free_ref_start: true,
            free_ref_end: true,
        }
    }

    /// The flags with query and database roles exchanged.
    pub fn swapped(self) -> Self {
        SgFlags {
            free_query_start: self.free_ref_start,
            free_query_end: self.free_ref_end,
            free_ref_start: self.free_query_start,
            free_ref_end: self.free_query_end,
        }
    }
}

/// Gap penalties plus boundary flags.
///
/// Penalties are magnitudes: a gap of length L costs
/// `gap_open + (L - 1) * gap_extend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignConfig {
    pub gap_open: i32,
    pub gap_extend: i32,
    pub flags: SgFlags,
}

impl AlignConfig {
    pub fn new(gap_open: i32, gap_extend: i32, flags: SgFlags) -> Self {
        AlignConfig {
            gap_open,
            gap_extend,
            flags,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.gap_open < 0 || self.gap_extend < 0 {
            return Err(AlignError::InvalidPenalties {
                open: self.gap_open,
                extend: self.gap_extend,
            });
        }
        Ok(())
    }
}

/// Outcome of one alignment run.
#[derive(Debug)]
pub struct AlignResult {
    score: i64,
    end_query: i32,
    end_ref: i32,
    saturated: bool,
    width: LaneWidth,
    tier: Tier,
    flags: SgFlags,
    trace: Option<TraceTable>,
}

impl AlignResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        score: i64,
        end_query: i32,
        end_ref: i32,
        saturated: bool,
        width: LaneWidth,
        tier: Tier,
        flags: SgFlags,
        trace: Option<TraceTable>,
    ) -> Self {
        AlignResult {
            score,
            end_query,
            end_ref,
            saturated,
            width,
            tier,
            flags,
            trace,
        }
    }

    /// Optimal score under the run's flags.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// 0-based query position of the last aligned cell.
    pub fn end_query(&self) -> i32 {
        self.end_query
    }

    /// 0-based database position of the last aligned cell (-1 for an
    /// empty database).
    pub fn end_ref(&self) -> i32 {
        self.end_ref
    }

    /// True when the lane width could not represent the scores; escalate
    /// to a wider width for an exact result.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Lane width the run executed at.
    pub fn width(&self) -> LaneWidth {
        self.width
    }

    /// Capability tier the kernel was bound at.
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Boundary flags the run was configured with.
    pub fn flags(&self) -> SgFlags {
        self.flags
    }

    pub fn has_trace(&self) -> bool {
        self.trace.is_some()
    }

    pub(crate) fn trace(&self) -> Option<&TraceTable> {
        self.trace.as_ref()
    }
}

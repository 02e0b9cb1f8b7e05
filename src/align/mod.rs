//! Semi-global alignment over striped query profiles.
//!
//! Build a [`Profile`] once per query, then run it against any number of
//! databases. [`semi_global`] returns score and end coordinates,
//! [`semi_global_trace`] additionally captures the per-cell trace that
//! [`walk`] turns into an [`AlignmentPath`], and [`semi_global_auto`]
//! starts at the narrowest built width and escalates while results come
//! back saturated. Kernel selection is transparent: the dispatch registry
//! binds each operation to the best backend the host supports.

pub(crate) mod dispatch;
mod profile;
pub mod scalar;
mod striped;
mod trace;
mod traceback;
mod types;

pub use self::dispatch::Operation;
pub use self::profile::Profile;
pub use self::trace::TraceTable;
pub use self::traceback::{walk, AlignmentPath, PathOp, PathSegment};
pub use self::types::{AlignConfig, AlignResult, SgFlags};

use crate::compute::simd::LaneWidth;
use crate::error::{AlignError, Result};

/// Semi-global alignment of the profiled query against `database`,
/// score and end coordinates only.
pub fn semi_global(
    profile: &Profile<'_>,
    database: &[u8],
    config: &AlignConfig,
    width: LaneWidth,
) -> Result<AlignResult> {
    run(profile, database, config, width, Operation::SemiGlobal)
}

/// Semi-global alignment with trace capture, for [`walk`].
pub fn semi_global_trace(
    profile: &Profile<'_>,
    database: &[u8],
    config: &AlignConfig,
    width: LaneWidth,
) -> Result<AlignResult> {
    run(profile, database, config, width, Operation::SemiGlobalTrace)
}

/// Score at the narrowest width the profile carries, escalating while the
/// result saturates. All widths saturating returns the widest, flagged.
pub fn semi_global_auto(
    profile: &Profile<'_>,
    database: &[u8],
    config: &AlignConfig,
) -> Result<AlignResult> {
    let widths = profile.widths();
    let (first, rest) = widths
        .split_first()
        .ok_or(AlignError::ProfileWidthMissing {
            width: LaneWidth::W8,
        })?;
    let mut result = semi_global(profile, database, config, *first)?;
    for &width in rest {
        if !result.is_saturated() {
            break;
        }
        log::debug!("{} lanes saturated, escalating to {width}", result.width());
        result = semi_global(profile, database, config, width)?;
    }
    Ok(result)
}

fn run(
    profile: &Profile<'_>,
    database: &[u8],
    config: &AlignConfig,
    width: LaneWidth,
    op: Operation,
) -> Result<AlignResult> {
    config.validate()?;
    if !profile.has_width(width) {
        return Err(AlignError::ProfileWidthMissing { width });
    }
    let binding = dispatch::resolve(op, width)?;
    if database.is_empty() {
        return Ok(empty_database_result(profile, config, width, op, &binding));
    }
    let matrix = profile.matrix();
    let db_codes: Vec<u8> = database.iter().map(|&b| matrix.code(b)).collect();
    let input = striped::KernelInput {
        profile,
        db_codes: &db_codes,
        gap_open: config.gap_open,
        gap_extend: config.gap_extend,
        flags: config.flags,
    };
    // the registry never hands out a kernel the detected tier cannot run
    let out = unsafe { (binding.kernel)(&input) }?;
    Ok(AlignResult::new(
        out.score,
        out.end_query,
        out.end_ref,
        out.saturated,
        width,
        binding.tier,
        config.flags,
        out.trace,
    ))
}

/// No DP columns to run: the result is read off the initial column, in
/// exact arithmetic, with `end_ref = -1`. Traced runs get a table with
/// zero columns so the walker still works.
fn empty_database_result(
    profile: &Profile<'_>,
    config: &AlignConfig,
    width: LaneWidth,
    op: Operation,
    binding: &dispatch::Binding,
) -> AlignResult {
    let (score, end_query) = scalar::empty_database_score(profile.query_len(), config);
    let trace = match op {
        Operation::SemiGlobal => None,
        Operation::SemiGlobalTrace => {
            let seg_len = profile.query_len().div_ceil(binding.lanes);
            Some(TraceTable::new(
                trace::Cells::empty(width),
                seg_len,
                binding.lanes,
                profile.query_len(),
                0,
            ))
        }
    };
    AlignResult::new(
        score,
        end_query,
        -1,
        false,
        width,
        binding.tier,
        config.flags,
        trace,
    )
}

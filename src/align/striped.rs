//! Striped semi-global DP kernels.
//!
//! The Farrar formulation: the query is split into `lanes` interleaved
//! stripes so one vector holds `lanes` non-adjacent query rows, the inner
//! loop walks segments with a carried F, and a bounded lazy pass afterwards
//! rotates the F carry across lane wraps. The core is written once per
//! operation, generic over [`SimdVec`], and instantiated for every backend
//! and lane width behind `#[target_feature]` wrappers. Nothing here is
//! callable except through the dispatch registry, which only binds what the
//! host supports.

use crate::align::dispatch::Operation;
use crate::align::profile::{Profile, ProfileSlot};
use crate::align::trace::{
    CLEAR_F, CLEAR_PRIMARY, DIAG, DIAG_E, DIAG_F, LEFT, LEFT_E, TraceElem, TraceTable, UP, UP_F,
};
use crate::align::types::SgFlags;
use crate::compute::capability::Tier;
use crate::compute::simd::portable::{P16, P32, P64, P8};
use crate::compute::simd::{LaneElem, LaneWidth, SimdVec};
use crate::error::{AlignError, Result};

#[cfg(target_arch = "x86_64")]
use crate::compute::simd::avx2::{A16, A32, A8};
#[cfg(target_arch = "x86_64")]
use crate::compute::simd::sse41::{S16, S32, S8};

/// Everything a kernel needs for one run. The database is already mapped
/// to matrix codes.
pub(crate) struct KernelInput<'a> {
    pub(crate) profile: &'a Profile<'a>,
    pub(crate) db_codes: &'a [u8],
    pub(crate) gap_open: i32,
    pub(crate) gap_extend: i32,
    pub(crate) flags: SgFlags,
}

/// Raw kernel output before result assembly.
pub(crate) struct KernelOut {
    pub(crate) score: i64,
    pub(crate) end_query: i32,
    pub(crate) end_ref: i32,
    pub(crate) saturated: bool,
    pub(crate) trace: Option<TraceTable>,
}

/// Kernels execute vector code chosen at runtime, so calls must go through
/// the registry after the matching tier was detected.
pub(crate) type KernelFn = unsafe fn(&KernelInput<'_>) -> Result<KernelOut>;

/// The kernel registered for (tier, operation, width) and its lane count,
/// if that backend covers the width.
pub(crate) fn kernel_for(tier: Tier, op: Operation, width: LaneWidth) -> Option<(KernelFn, usize)> {
    match tier {
        Tier::Portable => Some(portable_kernel(op, width)),
        #[cfg(target_arch = "x86_64")]
        Tier::Sse41 => sse41_kernel(op, width),
        #[cfg(target_arch = "x86_64")]
        Tier::Avx2 => avx2_kernel(op, width),
        #[cfg(not(target_arch = "x86_64"))]
        _ => None,
    }
}

fn portable_kernel(op: Operation, width: LaneWidth) -> (KernelFn, usize) {
    let entry: (KernelFn, usize) = match (op, width) {
        (Operation::SemiGlobal, LaneWidth::W8) => (sg_portable_w8, P8::LANES),
        (Operation::SemiGlobal, LaneWidth::W16) => (sg_portable_w16, P16::LANES),
        (Operation::SemiGlobal, LaneWidth::W32) => (sg_portable_w32, P32::LANES),
        (Operation::SemiGlobal, LaneWidth::W64) => (sg_portable_w64, P64::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W8) => (sg_trace_portable_w8, P8::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W16) => (sg_trace_portable_w16, P16::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W32) => (sg_trace_portable_w32, P32::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W64) => (sg_trace_portable_w64, P64::LANES),
    };
    entry
}

#[cfg(target_arch = "x86_64")]
fn sse41_kernel(op: Operation, width: LaneWidth) -> Option<(KernelFn, usize)> {
    let entry: (KernelFn, usize) = match (op, width) {
        (Operation::SemiGlobal, LaneWidth::W8) => (sg_sse41_w8, S8::LANES),
        (Operation::SemiGlobal, LaneWidth::W16) => (sg_sse41_w16, S16::LANES),
        (Operation::SemiGlobal, LaneWidth::W32) => (sg_sse41_w32, S32::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W8) => (sg_trace_sse41_w8, S8::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W16) => (sg_trace_sse41_w16, S16::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W32) => (sg_trace_sse41_w32, S32::LANES),
        (_, LaneWidth::W64) => return None,
    };
    Some(entry)
}

#[cfg(target_arch = "x86_64")]
fn avx2_kernel(op: Operation, width: LaneWidth) -> Option<(KernelFn, usize)> {
    let entry: (KernelFn, usize) = match (op, width) {
        (Operation::SemiGlobal, LaneWidth::W8) => (sg_avx2_w8, A8::LANES),
        (Operation::SemiGlobal, LaneWidth::W16) => (sg_avx2_w16, A16::LANES),
        (Operation::SemiGlobal, LaneWidth::W32) => (sg_avx2_w32, A32::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W8) => (sg_trace_avx2_w8, A8::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W16) => (sg_trace_avx2_w16, A16::LANES),
        (Operation::SemiGlobalTrace, LaneWidth::W32) => (sg_trace_avx2_w32, A32::LANES),
        (_, LaneWidth::W64) => return None,
    };
    Some(entry)
}

unsafe fn sg_portable_w8(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<P8>(input)
}

unsafe fn sg_portable_w16(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<P16>(input)
}

unsafe fn sg_portable_w32(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<P32>(input)
}

unsafe fn sg_portable_w64(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<P64>(input)
}

unsafe fn sg_trace_portable_w8(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<P8>(input)
}

unsafe fn sg_trace_portable_w16(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<P16>(input)
}

unsafe fn sg_trace_portable_w32(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<P32>(input)
}

unsafe fn sg_trace_portable_w64(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<P64>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn sg_sse41_w8(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<S8>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn sg_sse41_w16(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<S16>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn sg_sse41_w32(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<S32>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn sg_trace_sse41_w8(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<S8>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn sg_trace_sse41_w16(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<S16>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn sg_trace_sse41_w32(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<S32>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sg_avx2_w8(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<A8>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sg_avx2_w16(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<A16>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sg_avx2_w32(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_kernel::<A32>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sg_trace_avx2_w8(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<A8>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sg_trace_avx2_w16(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<A16>(input)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sg_trace_avx2_w32(input: &KernelInput<'_>) -> Result<KernelOut> {
    sg_trace_kernel::<A32>(input)
}

/// Striped geometry for one (query, lane count) pair.
struct Layout {
    seg_len: usize,
    /// Segment holding the last query row.
    offset: usize,
    /// Lane holding the last query row.
    last_lane: usize,
}

fn layout(query_len: usize, lanes: usize) -> Layout {
    let seg_len = query_len.div_ceil(lanes);
    Layout {
        seg_len,
        offset: (query_len - 1) % seg_len,
        last_lane: (query_len - 1) / seg_len,
    }
}

/// H and E for the column left of the first database symbol, striped.
/// Padding lanes past the query end are initialized like real rows.
fn init_columns<T: LaneElem>(
    seg_len: usize,
    lanes: usize,
    gap_open: i64,
    gap_extend: i64,
    free_query_start: bool,
) -> (Vec<T>, Vec<T>) {
    let mut h = vec![T::ZERO; seg_len * lanes];
    let mut e = vec![T::ZERO; seg_len * lanes];
    for i in 0..seg_len {
        for lane in 0..lanes {
            let pos = (lane * seg_len + i) as i64;
            let tmp = if free_query_start {
                0
            } else {
                -gap_open - gap_extend * pos
            };
            h[i * lanes + lane] = T::from_i64_sat(tmp);
            e[i * lanes + lane] = T::from_i64_sat(tmp - gap_open);
        }
    }
    (h, e)
}

/// Implicit scores for entering the DP with `j` database symbols already
/// consumed; `boundary[j]` is the row-above value for column `j - 1`.
fn boundary_row<T: LaneElem>(
    db_len: usize,
    gap_open: i64,
    gap_extend: i64,
    free_ref_start: bool,
) -> Vec<T> {
    let mut boundary = vec![T::ZERO; db_len + 1];
    for (j, cell) in boundary.iter_mut().enumerate().skip(1) {
        let tmp = if free_ref_start {
            0
        } else {
            -gap_open - gap_extend * (j as i64 - 1)
        };
        *cell = T::from_i64_sat(tmp);
    }
    boundary
}

/// Score and end coordinates from the final column state.
///
/// Order matters: the free-database-end candidate (best last-row value over
/// all columns, earliest column on ties) is taken first, then a
/// free-query-end scan of the last column may override it with strictly
/// greater values, preferring the smaller query end among equals that end
/// in the last column. With neither flag the bottom-right cell wins.
unsafe fn extract_ends<V: SimdVec>(
    h_store: &[V::Elem],
    lay: &Layout,
    flags: SgFlags,
    query_len: usize,
    db_len: usize,
    col_best: i64,
    col_best_ref: i32,
) -> (i64, i32, i32) {
    let lanes = V::LANES;
    let mut score = V::Elem::NEG_INF.to_i64();
    let mut end_query = query_len as i32 - 1;
    let mut end_ref = db_len as i32 - 1;

    if flags.free_ref_end {
        score = col_best;
        end_ref = col_best_ref;
    }

    if flags.free_query_end {
        for seg in 0..lay.seg_len {
            for lane in 0..lanes {
                let pos = seg + lane * lay.seg_len;
                if pos >= query_len {
                    continue;
                }
                let value = h_store[seg * lanes + lane].to_i64();
                if value > score {
                    score = value;
                    end_query = pos as i32;
                    end_ref = db_len as i32 - 1;
                } else if value == score && end_ref == db_len as i32 - 1 && (pos as i32) < end_query
                {
                    end_query = pos as i32;
                }
            }
        }
    }

    if !flags.free_ref_end && !flags.free_query_end {
        let v = V::load(h_store.as_ptr().add(lay.offset * lanes));
        score = V::extract(v, lay.last_lane).to_i64();
    }

    (score, end_query, end_ref)
}

/// True when any stored H left the exactly-representable band for this
/// width: at or below the sentinel, or close enough to the type maximum
/// that one more matrix addition could clamp.
unsafe fn saturation_tripped<V: SimdVec>(v_min: V, v_max: V, matrix_max: i64) -> bool {
    let mut lowest = i64::MAX;
    let mut highest = i64::MIN;
    for lane in 0..V::LANES {
        let lo = V::extract(v_min, lane).to_i64();
        if lo < lowest {
            lowest = lo;
        }
        let hi = V::extract(v_max, lane).to_i64();
        if hi > highest {
            highest = hi;
        }
    }
    lowest <= V::Elem::NEG_INF.to_i64() || highest > V::Elem::MAX.to_i64() - matrix_max - 1
}

#[inline]
unsafe fn code_splat<V: SimdVec>(code: u8) -> V {
    V::splat(V::Elem::from_i64_sat(i64::from(code)))
}

/// Score-only semi-global kernel.
#[inline]
unsafe fn sg_kernel<V>(input: &KernelInput<'_>) -> Result<KernelOut>
where
    V: SimdVec,
    V::Elem: ProfileSlot,
{
    let data = input
        .profile
        .data::<V::Elem>()
        .ok_or(AlignError::ProfileWidthMissing {
            width: V::Elem::WIDTH,
        })?;
    let lanes = V::LANES;
    debug_assert_eq!(lanes, data.lanes);
    let query_len = input.profile.query_len();
    let db = input.db_codes;
    let db_len = db.len();
    debug_assert!(db_len > 0);
    let lay = layout(query_len, lanes);
    let seg_len = lay.seg_len;
    let open = i64::from(input.gap_open);
    let extend = i64::from(input.gap_extend);
    let flags = input.flags;

    let (mut h_store, mut e) =
        init_columns::<V::Elem>(seg_len, lanes, open, extend, flags.free_query_start);
    let mut h_load = vec![V::Elem::ZERO; seg_len * lanes];
    let boundary = boundary_row::<V::Elem>(db_len, open, extend, flags.free_ref_start);

    let v_gap_open = V::splat(V::Elem::from_i64_sat(open));
    let v_gap_extend = V::splat(V::Elem::from_i64_sat(extend));
    let v_neg_inf = V::splat(V::Elem::NEG_INF);
    let mut v_sat_min = V::splat(V::Elem::MAX);
    let mut v_sat_max = V::splat(V::Elem::MIN);

    let mut col_best = V::Elem::NEG_INF.to_i64();
    let mut col_best_ref = db_len as i32 - 1;

    for j in 0..db_len {
        let mut v_f = v_neg_inf;

        // previous column's last segment, moved up one query row
        let mut v_h = V::shift_lane_up(V::load(h_store.as_ptr().add((seg_len - 1) * lanes)));
        v_h = V::insert_lane0(v_h, boundary[j]);

        let row = data.score.as_ptr().add(db[j] as usize * seg_len * lanes);

        std::mem::swap(&mut h_load, &mut h_store);

        for i in 0..seg_len {
            let v_e = V::load(e.as_ptr().add(i * lanes));
            let v_h_dag = V::adds(v_h, V::load(row.add(i * lanes)));
            let mut v_h_new = V::max(v_h_dag, v_e);
            v_h_new = V::max(v_h_new, v_f);
            V::store(h_store.as_mut_ptr().add(i * lanes), v_h_new);
            v_sat_min = V::min(v_sat_min, v_h_new);
            v_sat_max = V::max(v_sat_max, v_h_new);

            let v_ef_opn = V::subs(v_h_new, v_gap_open);

            let v_e_ext = V::subs(v_e, v_gap_extend);
            V::store(e.as_mut_ptr().add(i * lanes), V::max(v_ef_opn, v_e_ext));

            let v_f_ext = V::subs(v_f, v_gap_extend);
            v_f = V::max(v_ef_opn, v_f_ext);

            v_h = V::load(h_load.as_ptr().add(i * lanes));
        }

        // Rotate the F carry across lane wraps. F propagates as its
        // extension only and E is left alone, so an insertion is never
        // followed directly by a deletion.
        'lazy: for _ in 0..lanes {
            let seed = V::Elem::from_i64_sat(boundary[j + 1].to_i64() - open);
            v_f = V::insert_lane0(V::shift_lane_up(v_f), seed);
            for i in 0..seg_len {
                let mut v_h_new = V::load(h_store.as_ptr().add(i * lanes));
                v_h_new = V::max(v_h_new, v_f);
                V::store(h_store.as_mut_ptr().add(i * lanes), v_h_new);
                v_sat_min = V::min(v_sat_min, v_h_new);
                v_sat_max = V::max(v_sat_max, v_h_new);

                let v_ef_opn = V::subs(v_h_new, v_gap_open);
                let v_f_ext = V::subs(v_f, v_gap_extend);
                let still_rising = V::any(V::or(
                    V::cmpgt(v_f_ext, v_ef_opn),
                    V::cmpeq(v_f_ext, v_ef_opn),
                ));
                if !still_rising {
                    break 'lazy;
                }
                v_f = v_f_ext;
            }
        }

        let v_last = V::load(h_store.as_ptr().add(lay.offset * lanes));
        let h_last = V::extract(v_last, lay.last_lane).to_i64();
        if h_last > col_best {
            col_best = h_last;
            col_best_ref = j as i32;
        }
    }

    let (mut score, mut end_query, mut end_ref) = extract_ends::<V>(
        &h_store, &lay, flags, query_len, db_len, col_best, col_best_ref,
    );

    let matrix_max = i64::from(input.profile.matrix().max());
    let saturated = saturation_tripped::<V>(v_sat_min, v_sat_max, matrix_max);
    if saturated {
        score = 0;
        end_query = 0;
        end_ref = 0;
    }

    Ok(KernelOut {
        score,
        end_query,
        end_ref,
        saturated,
        trace: None,
    })
}

/// Semi-global kernel with full trace capture.
///
/// Identical H/E/F arithmetic to [`sg_kernel`], plus a packed provenance
/// byte per cell: the main pass records which term produced H and the
/// open-vs-extend choice for E (written one column ahead) and F (one
/// segment ahead); the lazy pass re-settles the primary and F bits with
/// the clear masks wherever the rotated carry raised H.
#[inline]
unsafe fn sg_trace_kernel<V>(input: &KernelInput<'_>) -> Result<KernelOut>
where
    V: SimdVec,
    V::Elem: ProfileSlot + TraceElem,
{
    let data = input
        .profile
        .data::<V::Elem>()
        .ok_or(AlignError::ProfileWidthMissing {
            width: V::Elem::WIDTH,
        })?;
    let lanes = V::LANES;
    debug_assert_eq!(lanes, data.lanes);
    let query_len = input.profile.query_len();
    let db = input.db_codes;
    let db_len = db.len();
    debug_assert!(db_len > 0);
    let lay = layout(query_len, lanes);
    let seg_len = lay.seg_len;
    let open = i64::from(input.gap_open);
    let extend = i64::from(input.gap_extend);
    let flags = input.flags;

    let (mut h_store, e_init) =
        init_columns::<V::Elem>(seg_len, lanes, open, extend, flags.free_query_start);
    let mut h_load = vec![V::Elem::ZERO; seg_len * lanes];
    let mut e = e_init.clone();
    let mut ea_store = e_init;
    let mut ea_load = vec![V::Elem::ZERO; seg_len * lanes];
    let mut ht = vec![V::Elem::ZERO; seg_len * lanes];
    let boundary = boundary_row::<V::Elem>(db_len, open, extend, flags.free_ref_start);

    let mut trace_buf = vec![V::Elem::ZERO; db_len * seg_len * lanes];
    // column 0 starts as an opened E, the entry from the initial column
    let diag_e = V::Elem::from_i64_sat(i64::from(DIAG_E));
    for cell in trace_buf.iter_mut().take(seg_len * lanes) {
        *cell = diag_e;
    }

    let v_left = code_splat::<V>(LEFT);
    let v_up = code_splat::<V>(UP);
    let v_diag = code_splat::<V>(DIAG);
    let v_diag_e = code_splat::<V>(DIAG_E);
    let v_left_e = code_splat::<V>(LEFT_E);
    let v_diag_f = code_splat::<V>(DIAG_F);
    let v_up_f = code_splat::<V>(UP_F);
    let v_clear_primary = code_splat::<V>(CLEAR_PRIMARY);
    let v_clear_f = code_splat::<V>(CLEAR_F);

    let v_gap_open = V::splat(V::Elem::from_i64_sat(open));
    let v_gap_extend = V::splat(V::Elem::from_i64_sat(extend));
    let v_neg_inf = V::splat(V::Elem::NEG_INF);
    let mut v_sat_min = V::splat(V::Elem::MAX);
    let mut v_sat_max = V::splat(V::Elem::MIN);

    let mut col_best = V::Elem::NEG_INF.to_i64();
    let mut col_best_ref = db_len as i32 - 1;

    for j in 0..db_len {
        let mut v_f = v_neg_inf;
        let mut v_ef_opn = v_neg_inf;
        let mut v_f_ext = v_neg_inf;

        let mut v_h = V::shift_lane_up(V::load(h_store.as_ptr().add((seg_len - 1) * lanes)));
        v_h = V::insert_lane0(v_h, boundary[j]);

        let row = data.score.as_ptr().add(db[j] as usize * seg_len * lanes);
        let col = trace_buf.as_mut_ptr().add(j * seg_len * lanes);

        std::mem::swap(&mut h_load, &mut h_store);
        std::mem::swap(&mut ea_load, &mut ea_store);

        for i in 0..seg_len {
            let v_e = V::load(e.as_ptr().add(i * lanes));
            let v_h_dag = V::adds(v_h, V::load(row.add(i * lanes)));
            let mut v_h_new = V::max(v_h_dag, v_e);
            v_h_new = V::max(v_h_new, v_f);
            V::store(h_store.as_mut_ptr().add(i * lanes), v_h_new);
            v_sat_min = V::min(v_sat_min, v_h_new);
            v_sat_max = V::max(v_sat_max, v_h_new);

            // diagonal beats the vertical F, which beats the horizontal E
            let v_t_all = V::load(col.add(i * lanes));
            let case1 = V::cmpeq(v_h_new, v_h_dag);
            let case2 = V::cmpeq(v_h_new, v_f);
            let v_t = V::blend(V::blend(v_left, v_up, case2), v_diag, case1);
            V::store(ht.as_mut_ptr().add(i * lanes), v_t);
            V::store(col.add(i * lanes), V::or(v_t, v_t_all));

            v_ef_opn = V::subs(v_h_new, v_gap_open);

            let v_e_ext = V::subs(v_e, v_gap_extend);
            V::store(e.as_mut_ptr().add(i * lanes), V::max(v_ef_opn, v_e_ext));

            let v_ea = V::load(ea_load.as_ptr().add(i * lanes));
            let v_ea_ext = V::subs(v_ea, v_gap_extend);
            V::store(ea_store.as_mut_ptr().add(i * lanes), V::max(v_ef_opn, v_ea_ext));
            if j + 1 < db_len {
                let cond = V::cmpgt(v_ef_opn, v_ea_ext);
                let v_t_e = V::blend(v_left_e, v_diag_e, cond);
                V::store(col.add((seg_len + i) * lanes), v_t_e);
            }

            v_f_ext = V::subs(v_f, v_gap_extend);
            v_f = V::max(v_ef_opn, v_f_ext);
            if i + 1 < seg_len {
                let v_t_all = V::load(col.add((i + 1) * lanes));
                let cond = V::cmpgt(v_ef_opn, v_f_ext);
                let v_t_f = V::blend(v_up_f, v_diag_f, cond);
                V::store(col.add((i + 1) * lanes), V::or(v_t_f, v_t_all));
            }

            v_h = V::load(h_load.as_ptr().add(i * lanes));
        }

        // Rotate the F carry across lane wraps, re-settling trace bits as
        // H rises. F propagates as its extension only and E is left alone,
        // so an insertion is never followed directly by a deletion.
        let mut v_fa_ext = v_f_ext;
        let mut v_fa = v_f;
        let mut v_hp;
        'lazy: for _ in 0..lanes {
            let seed = V::Elem::from_i64_sat(boundary[j + 1].to_i64() - open);
            v_hp = V::shift_lane_up(V::load(h_load.as_ptr().add((seg_len - 1) * lanes)));
            v_hp = V::insert_lane0(v_hp, boundary[j]);
            v_ef_opn = V::insert_lane0(V::shift_lane_up(v_ef_opn), seed);
            v_f_ext = V::insert_lane0(V::shift_lane_up(v_f_ext), V::Elem::NEG_INF);
            v_f = V::insert_lane0(V::shift_lane_up(v_f), seed);
            v_fa_ext = V::insert_lane0(V::shift_lane_up(v_fa_ext), V::Elem::NEG_INF);
            v_fa = V::insert_lane0(V::shift_lane_up(v_fa), seed);
            for i in 0..seg_len {
                let mut v_h_new = V::load(h_store.as_ptr().add(i * lanes));
                v_h_new = V::max(v_h_new, v_f);
                V::store(h_store.as_mut_ptr().add(i * lanes), v_h_new);
                v_sat_min = V::min(v_sat_min, v_h_new);
                v_sat_max = V::max(v_sat_max, v_h_new);

                // re-settle the primary direction where the carry took over
                v_hp = V::adds(v_hp, V::load(row.add(i * lanes)));
                let case1 = V::cmpeq(v_h_new, v_hp);
                let case2 = V::cmpeq(v_h_new, v_f);
                let cond = V::andnot(case1, case2);
                let v_t_all = V::load(col.add(i * lanes));
                let v_t = V::blend(V::load(ht.as_ptr().add(i * lanes)), v_up, cond);
                V::store(ht.as_mut_ptr().add(i * lanes), v_t);
                V::store(
                    col.add(i * lanes),
                    V::or(V::and(v_t_all, v_clear_primary), v_t),
                );

                // F provenance from the carry state entering this segment
                let v_t_all = V::load(col.add(i * lanes));
                let cond_f = V::cmpgt(v_ef_opn, v_fa_ext);
                let v_t_f = V::blend(v_up_f, v_diag_f, cond_f);
                V::store(col.add(i * lanes), V::or(V::and(v_t_all, v_clear_f), v_t_f));

                v_ef_opn = V::subs(v_h_new, v_gap_open);
                v_f_ext = V::subs(v_f, v_gap_extend);

                let v_ea = V::load(ea_load.as_ptr().add(i * lanes));
                let v_ea_ext = V::subs(v_ea, v_gap_extend);
                V::store(ea_store.as_mut_ptr().add(i * lanes), V::max(v_ef_opn, v_ea_ext));
                if j + 1 < db_len {
                    let cond = V::cmpgt(v_ef_opn, v_ea_ext);
                    let v_t_e = V::blend(v_left_e, v_diag_e, cond);
                    V::store(col.add((seg_len + i) * lanes), v_t_e);
                }

                let still_rising = V::any(V::or(
                    V::cmpgt(v_f_ext, v_ef_opn),
                    V::cmpeq(v_f_ext, v_ef_opn),
                ));
                if !still_rising {
                    break 'lazy;
                }
                v_f = v_f_ext;
                v_fa_ext = V::subs(v_fa, v_gap_extend);
                v_fa = V::max(v_ef_opn, v_fa_ext);
                v_hp = V::load(h_load.as_ptr().add(i * lanes));
            }
        }

        let v_last = V::load(h_store.as_ptr().add(lay.offset * lanes));
        let h_last = V::extract(v_last, lay.last_lane).to_i64();
        if h_last > col_best {
            col_best = h_last;
            col_best_ref = j as i32;
        }
    }

    let (mut score, mut end_query, mut end_ref) = extract_ends::<V>(
        &h_store, &lay, flags, query_len, db_len, col_best, col_best_ref,
    );

    let matrix_max = i64::from(input.profile.matrix().max());
    let saturated = saturation_tripped::<V>(v_sat_min, v_sat_max, matrix_max);
    if saturated {
        score = 0;
        end_query = 0;
        end_ref = 0;
    }

    let trace = TraceTable::new(
        V::Elem::into_cells(trace_buf),
        seg_len,
        lanes,
        query_len,
        db_len,
    );

    Ok(KernelOut {
        score,
        end_query,
        end_ref,
        saturated,
        trace: Some(trace),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::scalar;
    use crate::align::types::AlignConfig;
    use crate::matrix::ScoringMatrix;

    fn run_portable_w16(
        query: &[u8],
        database: &[u8],
        open: i32,
        extend: i32,
        flags: SgFlags,
    ) -> KernelOut {
        let matrix = ScoringMatrix::dna();
        let profile =
            Profile::build_for_lanes(query, &matrix, LaneWidth::W16, P16::LANES);
        let db_codes: Vec<u8> = database.iter().map(|&b| matrix.code(b)).collect();
        let input = KernelInput {
            profile: &profile,
            db_codes: &db_codes,
            gap_open: open,
            gap_extend: extend,
            flags,
        };
        unsafe { sg_kernel::<P16>(&input) }.unwrap()
    }

    #[test]
    fn layout_places_last_query_row() {
        let lay = layout(10, 8);
        assert_eq!(lay.seg_len, 2);
        assert_eq!(lay.offset, 1);
        assert_eq!(lay.last_lane, 4);

        let short = layout(3, 8);
        assert_eq!(short.seg_len, 1);
        assert_eq!(short.offset, 0);
        assert_eq!(short.last_lane, 2);
    }

    #[test]
    fn init_column_is_affine() {
        let (h, e) = init_columns::<i16>(2, 4, 3, 1, false);
        // position of (segment i, lane s) is s * seg_len + i
        assert_eq!(h[0], -3);
        assert_eq!(h[4], -4);
        assert_eq!(h[1], -5);
        assert_eq!(e[0], -6);
        let (h0, _) = init_columns::<i16>(2, 4, 3, 1, true);
        assert!(h0.iter().all(|&v| v == 0));
    }

    #[test]
    fn boundary_row_is_affine() {
        let b = boundary_row::<i16>(3, 3, 1, false);
        assert_eq!(b, vec![0, -3, -4, -5]);
        let free = boundary_row::<i16>(3, 3, 1, true);
        assert_eq!(free, vec![0, 0, 0, 0]);
    }

    #[test]
    fn anchored_pair_scores_bottom_right() {
        let out = run_portable_w16(b"AC", b"AC", 3, 1, SgFlags::anchored());
        assert_eq!(out.score, 4);
        assert_eq!((out.end_query, out.end_ref), (1, 1));
        assert!(!out.saturated);
    }

    #[test]
    fn anchored_insertion_pays_one_gap() {
        let out = run_portable_w16(b"ACGT", b"AGT", 3, 1, SgFlags::anchored());
        assert_eq!(out.score, 3);
        assert_eq!((out.end_query, out.end_ref), (3, 2));
    }

    #[test]
    fn all_free_perfect_match() {
        let out = run_portable_w16(b"ACGT", b"ACGT", 3, 1, SgFlags::all_free());
        assert_eq!(out.score, 8);
        assert_eq!((out.end_query, out.end_ref), (3, 3));
    }

    #[test]
    fn free_query_end_stops_early() {
        let mut flags = SgFlags::anchored();
        flags.free_query_end = true;
        let out = run_portable_w16(b"AAAA", b"AA", 3, 1, flags);
        assert_eq!(out.score, 4);
        assert_eq!((out.end_query, out.end_ref), (1, 1));
    }

    #[test]
    fn trace_kernel_scores_match_score_kernel() {
        let matrix = ScoringMatrix::dna();
        let query = b"ACGTACGTTGCA";
        let database = b"ACGTTCGTTGA";
        for flags in all_flag_combinations() {
            let profile =
                Profile::build_for_lanes(query, &matrix, LaneWidth::W16, P16::LANES);
            let db_codes: Vec<u8> = database.iter().map(|&b| matrix.code(b)).collect();
            let input = KernelInput {
                profile: &profile,
                db_codes: &db_codes,
                gap_open: 3,
                gap_extend: 1,
                flags,
            };
            let plain = unsafe { sg_kernel::<P16>(&input) }.unwrap();
            let traced = unsafe { sg_trace_kernel::<P16>(&input) }.unwrap();
            assert_eq!(plain.score, traced.score, "flags {flags:?}");
            assert_eq!(plain.end_query, traced.end_query, "flags {flags:?}");
            assert_eq!(plain.end_ref, traced.end_ref, "flags {flags:?}");
            assert!(traced.trace.is_some());
        }
    }

    #[test]
    fn portable_widths_agree_with_reference() {
        let matrix = ScoringMatrix::dna();
        let config = AlignConfig::new(3, 1, SgFlags::all_free());
        let query = b"GATTACAGATTACA";
        let database = b"GATCACAGATTA";
        let expected = scalar::semi_global(query, database, &matrix, &config).unwrap();

        let db_codes: Vec<u8> = database.iter().map(|&b| matrix.code(b)).collect();
        macro_rules! check {
            ($vec:ty, $width:expr) => {
                let profile =
                    Profile::build_for_lanes(query, &matrix, $width, <$vec>::LANES);
                let input = KernelInput {
                    profile: &profile,
                    db_codes: &db_codes,
                    gap_open: 3,
                    gap_extend: 1,
                    flags: SgFlags::all_free(),
                };
                let out = unsafe { sg_kernel::<$vec>(&input) }.unwrap();
                assert!(!out.saturated);
                assert_eq!(out.score, expected.score());
                assert_eq!(out.end_query, expected.end_query());
                assert_eq!(out.end_ref, expected.end_ref());
            };
        }
        check!(P8, LaneWidth::W8);
        check!(P16, LaneWidth::W16);
        check!(P32, LaneWidth::W32);
        check!(P64, LaneWidth::W64);
    }

    #[test]
    fn portable_matches_reference_across_flags() {
        let matrix = ScoringMatrix::dna();
        let query = b"TTGACCTGAAGGTT";
        let database = b"TGACCTTGAAGT";
        for flags in all_flag_combinations() {
            let config = AlignConfig::new(3, 1, flags);
            let expected = scalar::semi_global(query, database, &matrix, &config).unwrap();
            let out = run_portable_w16(query, database, 3, 1, flags);
            assert!(!out.saturated);
            assert_eq!(out.score, expected.score(), "flags {flags:?}");
            assert_eq!(out.end_query, expected.end_query(), "flags {flags:?}");
            assert_eq!(out.end_ref, expected.end_ref(), "flags {flags:?}");
        }
    }

    #[test]
    fn narrow_width_flags_saturation() {
        // 80 matches at +2 exceed the 8-bit positive band
        let query = vec![b'A'; 80];
        let out = run_portable_w16(&query, &query, 3, 1, SgFlags::all_free());
        assert_eq!(out.score, 160);

        let matrix = ScoringMatrix::dna();
        let profile = Profile::build_for_lanes(&query, &matrix, LaneWidth::W8, P8::LANES);
        let db_codes: Vec<u8> = query.iter().map(|&b| matrix.code(b)).collect();
        let input = KernelInput {
            profile: &profile,
            db_codes: &db_codes,
            gap_open: 3,
            gap_extend: 1,
            flags: SgFlags::all_free(),
        };
        let narrow = unsafe { sg_kernel::<P8>(&input) }.unwrap();
        assert!(narrow.saturated);
        assert_eq!(narrow.score, 0);
        assert_eq!((narrow.end_query, narrow.end_ref), (0, 0));
    }

    fn all_flag_combinations() -> Vec<SgFlags> {
        (0..16)
            .map(|bits| SgFlags {
                free_query_start: bits & 1 != 0,
                free_query_end: bits & 2 != 0,
                free_ref_start: bits & 4 != 0,
                free_ref_end: bits & 8 != 0,
            })
            .collect()
    }
}

//! Striped query profiles.
//!
//! A profile pre-computes, for every matrix code, the query's scores in
//! striped vector order so the kernel inner loop is a single contiguous
//! load. Entry for (code k, segment i, lane s) is the matrix score of k
//! against query position `i + s * seg_len`; positions past the query end
//! pad with zero. A profile can carry several lane widths at once so the
//! escalating driver never rebuilds.

use crate::align::dispatch;
use crate::compute::simd::{LaneElem, LaneWidth};
use crate::error::{AlignError, Result};
use crate::matrix::ScoringMatrix;

/// One lane width's striped tables.
#[derive(Debug, Clone)]
pub(crate) struct ProfileData<T> {
    pub(crate) score: Vec<T>,
    pub(crate) matches: Option<Vec<T>>,
    pub(crate) similar: Option<Vec<T>>,
    pub(crate) seg_len: usize,
    pub(crate) lanes: usize,
}

/// Striped query profile, valid for exactly one (query, matrix) pair.
#[derive(Debug, Clone)]
pub struct Profile<'a> {
    query: &'a [u8],
    matrix: &'a ScoringMatrix,
    query_codes: Vec<u8>,
    w8: Option<ProfileData<i8>>,
    w16: Option<ProfileData<i16>>,
    w32: Option<ProfileData<i32>>,
    w64: Option<ProfileData<i64>>,
}

impl<'a> Profile<'a> {
    /// Build striped tables for the requested lane widths.
    pub fn build(
        query: &'a [u8],
        matrix: &'a ScoringMatrix,
        widths: &[LaneWidth],
    ) -> Result<Profile<'a>> {
        Self::build_inner(query, matrix, widths, false)
    }

    /// [`Profile::build`] plus per-width match and similarity tables.
    pub fn build_with_stats(
        query: &'a [u8],
        matrix: &'a ScoringMatrix,
        widths: &[LaneWidth],
    ) -> Result<Profile<'a>> {
        Self::build_inner(query, matrix, widths, true)
    }

    /// The 8-, 16- and 32-bit builds in one pass, for width escalation.
    pub fn build_saturated(query: &'a [u8], matrix: &'a ScoringMatrix) -> Result<Profile<'a>> {
        Self::build_inner(
            query,
            matrix,
            &[LaneWidth::W8, LaneWidth::W16, LaneWidth::W32],
            false,
        )
    }

    fn build_inner(
        query: &'a [u8],
        matrix: &'a ScoringMatrix,
        widths: &[LaneWidth],
        with_stats: bool,
    ) -> Result<Profile<'a>> {
        if query.is_empty() {
            return Err(AlignError::EmptyQuery);
        }
        let query_codes: Vec<u8> = query.iter().map(|&b| matrix.code(b)).collect();
        let mut profile = Profile {
            query,
            matrix,
            query_codes,
            w8: None,
            w16: None,
            w32: None,
            w64: None,
        };
        for &width in widths {
            let lanes = dispatch::lanes_for(width)?;
            match width {
                LaneWidth::W8 => {
                    profile.w8 = Some(build_lane(&profile.query_codes, matrix, lanes, with_stats));
                }
                LaneWidth::W16 => {
                    profile.w16 = Some(build_lane(&profile.query_codes, matrix, lanes, with_stats));
                }
                LaneWidth::W32 => {
                    profile.w32 = Some(build_lane(&profile.query_codes, matrix, lanes, with_stats));
                }
                LaneWidth::W64 => {
                    profile.w64 = Some(build_lane(&profile.query_codes, matrix, lanes, with_stats));
                }
            }
        }
        Ok(profile)
    }

    /// Build one width with an explicit lane count, bypassing dispatch, so
    /// kernel tests can pin a backend regardless of the host tier.
    #[cfg(test)]
    pub(crate) fn build_for_lanes(
        query: &'a [u8],
        matrix: &'a ScoringMatrix,
        width: LaneWidth,
        lanes: usize,
    ) -> Profile<'a> {
        let query_codes: Vec<u8> = query.iter().map(|&b| matrix.code(b)).collect();
        let mut profile = Profile {
            query,
            matrix,
            query_codes,
            w8: None,
            w16: None,
            w32: None,
            w64: None,
        };
        match width {
            LaneWidth::W8 => {
                profile.w8 = Some(build_lane(&profile.query_codes, matrix, lanes, false));
            }
            LaneWidth::W16 => {
                profile.w16 = Some(build_lane(&profile.query_codes, matrix, lanes, false));
            }
            LaneWidth::W32 => {
                profile.w32 = Some(build_lane(&profile.query_codes, matrix, lanes, false));
            }
            LaneWidth::W64 => {
                profile.w64 = Some(build_lane(&profile.query_codes, matrix, lanes, false));
            }
        }
        profile
    }

    pub fn query_len(&self) -> usize {
        self.query.len()
    }

    pub fn query(&self) -> &'a [u8] {
        self.query
    }

    pub fn matrix(&self) -> &'a ScoringMatrix {
        self.matrix
    }

    /// Widths this profile was built for, narrowest first.
    pub fn widths(&self) -> Vec<LaneWidth> {
        LaneWidth::ALL
            .into_iter()
            .filter(|&w| self.has_width(w))
            .collect()
    }

    pub fn has_width(&self, width: LaneWidth) -> bool {
        match width {
            LaneWidth::W8 => self.w8.is_some(),
            LaneWidth::W16 => self.w16.is_some(),
            LaneWidth::W32 => self.w32.is_some(),
            LaneWidth::W64 => self.w64.is_some(),
        }
    }

    pub(crate) fn data<T: ProfileSlot>(&self) -> Option<&ProfileData<T>> {
        T::slot(self)
    }
}

/// Per-element access to the matching profile slot.
pub(crate) trait ProfileSlot: LaneElem {
    fn slot<'p>(profile: &'p Profile<'_>) -> Option<&'p ProfileData<Self>>
    where
        Self: Sized;
}

impl ProfileSlot for i8 {
    fn slot<'p>(profile: &'p Profile<'_>) -> Option<&'p ProfileData<Self>> {
        profile.w8.as_ref()
    }
}

impl ProfileSlot for i16 {
    fn slot<'p>(profile: &'p Profile<'_>) -> Option<&'p ProfileData<Self>> {
        profile.w16.as_ref()
    }
}

impl ProfileSlot for i32 {
    fn slot<'p>(profile: &'p Profile<'_>) -> Option<&'p ProfileData<Self>> {
        profile.w32.as_ref()
    }
}

impl ProfileSlot for i64 {
    fn slot<'p>(profile: &'p Profile<'_>) -> Option<&'p ProfileData<Self>> {
        profile.w64.as_ref()
    }
}

fn build_lane<T: LaneElem>(
    query_codes: &[u8],
    matrix: &ScoringMatrix,
    lanes: usize,
    with_stats: bool,
) -> ProfileData<T> {
    let qlen = query_codes.len();
    let seg_len = qlen.div_ceil(lanes);
    let n = matrix.size();
    let table = seg_len * lanes;

    let mut score = Vec::with_capacity(n * table);
    let mut matches = with_stats.then(|| Vec::with_capacity(n * table));
    let mut similar = with_stats.then(|| Vec::with_capacity(n * table));

    for k in 0..n {
        let row = matrix.row(k as u8);
        for i in 0..seg_len {
            let mut pos = i;
            for _ in 0..lanes {
                let (s, m, sim) = if pos >= qlen {
                    (0, 0, 0)
                } else {
                    let entry = row[query_codes[pos] as usize];
                    (
                        entry,
                        (query_codes[pos] as usize == k) as i32,
                        (entry > 0) as i32,
                    )
                };
                score.push(T::from_i64_sat(s as i64));
                if let Some(v) = matches.as_mut() {
                    v.push(T::from_i64_sat(m as i64));
                }
                if let Some(v) = similar.as_mut() {
                    v.push(T::from_i64_sat(sim as i64));
                }
                pos += seg_len;
            }
        }
    }

    ProfileData {
        score,
        matches,
        similar,
        seg_len,
        lanes,
    }
}

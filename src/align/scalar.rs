//! Row-major reference implementation.
//!
//! Plain i64 scoring with the same boundary flags and the same extraction
//! tie-breaks as the striped kernels, one query row at a time. The test
//! suite uses it as the oracle; it is also the right tool when exactness
//! matters more than speed, since i64 cannot saturate on realistic input.

use crate::align::types::{AlignConfig, AlignResult};
use crate::compute::capability::Tier;
use crate::compute::simd::LaneWidth;
use crate::error::{AlignError, Result};
use crate::matrix::ScoringMatrix;

const NEG_INF: i64 = i64::MIN / 2;

/// Semi-global alignment without vectorization.
///
/// Scores and end coordinates follow the same rules as the striped path,
/// so results are interchangeable; only the trace is never produced.
pub fn semi_global(
    query: &[u8],
    database: &[u8],
    matrix: &ScoringMatrix,
    config: &AlignConfig,
) -> Result<AlignResult> {
    config.validate()?;
    if query.is_empty() {
        return Err(AlignError::EmptyQuery);
    }
    let flags = config.flags;
    let open = i64::from(config.gap_open);
    let extend = i64::from(config.gap_extend);
    let query_len = query.len();
    let db_len = database.len();

    if db_len == 0 {
        let (score, end_query) = empty_database_score(query_len, config);
        return Ok(AlignResult::new(
            score,
            end_query,
            -1,
            false,
            LaneWidth::W64,
            Tier::Portable,
            flags,
            None,
        ));
    }

    let query_codes: Vec<u8> = query.iter().map(|&b| matrix.code(b)).collect();

    // current column of H and E, overwritten in place left to right
    let mut h: Vec<i64> = (0..query_len)
        .map(|p| {
            if flags.free_query_start {
                0
            } else {
                -open - extend * p as i64
            }
        })
        .collect();
    let mut e: Vec<i64> = h.iter().map(|&v| v - open).collect();

    let mut col_best = NEG_INF;
    let mut col_best_ref = db_len as i32 - 1;

    for j in 0..db_len {
        let row = matrix.row(matrix.code(database[j]));
        let above = if flags.free_ref_start {
            0
        } else {
            -open - extend * j as i64
        };
        let mut diag = if j == 0 {
            0
        } else if flags.free_ref_start {
            0
        } else {
            -open - extend * (j as i64 - 1)
        };
        let mut f = above - open;
        for p in 0..query_len {
            let up = h[p];
            let h_dag = diag + i64::from(row[query_codes[p] as usize]);
            let best = h_dag.max(e[p]).max(f);
            h[p] = best;
            let opened = best - open;
            e[p] = opened.max(e[p] - extend);
            f = opened.max(f - extend);
            diag = up;
        }
        let last = h[query_len - 1];
        if last > col_best {
            col_best = last;
            col_best_ref = j as i32;
        }
    }

    let mut score = NEG_INF;
    let mut end_query = query_len as i32 - 1;
    let mut end_ref = db_len as i32 - 1;

    if flags.free_ref_end {
        score = col_best;
        end_ref = col_best_ref;
    }
    if flags.free_query_end {
        for (p, &value) in h.iter().enumerate() {
            if value > score {
                score = value;
                end_query = p as i32;
                end_ref = db_len as i32 - 1;
            } else if value == score && end_ref == db_len as i32 - 1 && (p as i32) < end_query {
                end_query = p as i32;
            }
        }
    }
    if !flags.free_ref_end && !flags.free_query_end {
        score = h[query_len - 1];
    }

    Ok(AlignResult::new(
        score,
        end_query,
        end_ref,
        false,
        LaneWidth::W64,
        Tier::Portable,
        flags,
        None,
    ))
}

/// Score and query end against an empty database, read straight off the
/// initial column. With a free query end the earliest best row wins, as
/// in the striped last-column scan.
pub(crate) fn empty_database_score(query_len: usize, config: &AlignConfig) -> (i64, i32) {
    let open = i64::from(config.gap_open);
    let extend = i64::from(config.gap_extend);
    let init = |p: usize| {
        if config.flags.free_query_start {
            0
        } else {
            -open - extend * p as i64
        }
    };
    if config.flags.free_query_end {
        let mut score = NEG_INF;
        let mut end_query = 0i32;
        for p in 0..query_len {
            let value = init(p);
            if value > score {
                score = value;
                end_query = p as i32;
            }
        }
        (score, end_query)
    } else {
        (init(query_len - 1), query_len as i32 - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::types::SgFlags;

    fn dna() -> ScoringMatrix {
        ScoringMatrix::dna()
    }

    #[test]
    fn anchored_identity() {
        let matrix = dna();
        let config = AlignConfig::new(3, 1, SgFlags::anchored());
        let result = semi_global(b"ACGT", b"ACGT", &matrix, &config).unwrap();
        assert_eq!(result.score(), 8);
        assert_eq!((result.end_query(), result.end_ref()), (3, 3));
        assert!(!result.is_saturated());
        assert!(!result.has_trace());
    }

    #[test]
    fn anchored_gap_costs_open_plus_extends() {
        let matrix = dna();
        let config = AlignConfig::new(3, 1, SgFlags::anchored());
        // one query symbol unmatched: 3 matches minus one 1-long gap
        let result = semi_global(b"ACGT", b"AGT", &matrix, &config).unwrap();
        assert_eq!(result.score(), 3);
        assert_eq!((result.end_query(), result.end_ref()), (3, 2));
    }

    #[test]
    fn free_ref_ends_find_contained_query() {
        let matrix = dna();
        let mut flags = SgFlags::anchored();
        flags.free_ref_start = true;
        flags.free_ref_end = true;
        let config = AlignConfig::new(3, 1, flags);
        let result = semi_global(b"CGT", b"AACGTAA", &matrix, &config).unwrap();
        assert_eq!(result.score(), 6);
        assert_eq!((result.end_query(), result.end_ref()), (2, 4));
    }

    #[test]
    fn free_ref_end_prefers_earliest_column() {
        let matrix = dna();
        let mut flags = SgFlags::anchored();
        flags.free_ref_start = true;
        flags.free_ref_end = true;
        let config = AlignConfig::new(3, 1, flags);
        // the query recurs; the first full occurrence must win
        let result = semi_global(b"AC", b"ACAC", &matrix, &config).unwrap();
        assert_eq!(result.score(), 4);
        assert_eq!(result.end_ref(), 1);
    }

    #[test]
    fn free_query_end_prefers_smallest_row() {
        let matrix = dna();
        let mut flags = SgFlags::anchored();
        flags.free_query_end = true;
        let config = AlignConfig::new(3, 1, flags);
        let result = semi_global(b"AAAA", b"AA", &matrix, &config).unwrap();
        assert_eq!(result.score(), 4);
        assert_eq!((result.end_query(), result.end_ref()), (1, 1));
    }

    #[test]
    fn all_free_is_overlap_alignment() {
        let matrix = dna();
        let config = AlignConfig::new(3, 1, SgFlags::all_free());
        // suffix of the query overlaps a prefix of the database
        let result = semi_global(b"TTTACG", b"ACGTTT", &matrix, &config).unwrap();
        assert_eq!(result.score(), 6);
        assert_eq!((result.end_query(), result.end_ref()), (5, 2));
    }

    #[test]
    fn empty_database_is_a_gap_run() {
        let matrix = dna();
        let config = AlignConfig::new(3, 1, SgFlags::anchored());
        // open once, extend across the whole query
        let result = semi_global(b"ACG", b"", &matrix, &config).unwrap();
        assert_eq!(result.score(), -5);
        assert_eq!((result.end_query(), result.end_ref()), (2, -1));

        let free = AlignConfig::new(3, 1, SgFlags::all_free());
        let result = semi_global(b"ACG", b"", &matrix, &free).unwrap();
        assert_eq!(result.score(), 0);
        assert_eq!((result.end_query(), result.end_ref()), (0, -1));
    }

    #[test]
    fn empty_query_is_rejected() {
        let matrix = dna();
        let config = AlignConfig::new(3, 1, SgFlags::anchored());
        let err = semi_global(b"", b"ACG", &matrix, &config).unwrap_err();
        assert!(matches!(err, AlignError::EmptyQuery));
    }

    #[test]
    fn swapping_sequences_mirrors_flags() {
        let matrix = dna();
        let query = b"GATTACA";
        let database = b"GATCA";
        let mut flags = SgFlags::anchored();
        flags.free_ref_start = true;
        flags.free_query_end = true;
        let config = AlignConfig::new(3, 1, flags);
        let forward = semi_global(query, database, &matrix, &config).unwrap();
        let swapped = AlignConfig::new(3, 1, flags.swapped());
        let backward = semi_global(database, query, &matrix, &swapped).unwrap();
        assert_eq!(forward.score(), backward.score());
    }
}

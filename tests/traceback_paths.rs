// Traced alignments walked back into paths, and the paths re-scored.

use striped_align::{
    scalar, semi_global, semi_global_trace, walk, AlignConfig, AlignError, LaneWidth, PathOp,
    Profile, ScoringMatrix, SgFlags,
};

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

fn next(seed: &mut u64) -> u64 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *seed >> 33
}

fn random_seq(seed: &mut u64, len: usize) -> Vec<u8> {
    (0..len).map(|_| BASES[(next(seed) % 4) as usize]).collect()
}

fn mutated(template: &[u8], seed: &mut u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(template.len() + 8);
    for &b in template {
        let roll = next(seed) % 100;
        if roll < 4 {
            continue;
        }
        if roll < 10 {
            out.push(BASES[(next(seed) % 4) as usize]);
        } else {
            out.push(b);
        }
        if roll >= 97 {
            out.push(BASES[(next(seed) % 4) as usize]);
        }
    }
    if out.is_empty() {
        out.push(b'A');
    }
    out
}

fn all_flag_combinations() -> Vec<SgFlags> {
    (0..16u8)
        .map(|bits| SgFlags {
            free_query_start: bits & 1 != 0,
            free_query_end: bits & 2 != 0,
            free_ref_start: bits & 4 != 0,
            free_ref_end: bits & 8 != 0,
        })
        .collect()
}

/// Affine re-score of a walked path, consuming the sequences from the
/// path's begin coordinates.
fn rescore(
    path: &striped_align::AlignmentPath,
    query: &[u8],
    database: &[u8],
    matrix: &ScoringMatrix,
    config: &AlignConfig,
) -> i64 {
    let mut qi = path.beg_query() as usize;
    let mut dj = path.beg_ref() as usize;
    let mut total = 0i64;
    for seg in path.segments() {
        match seg.op {
            PathOp::Match | PathOp::Mismatch => {
                for _ in 0..seg.len {
                    total += i64::from(matrix.score(query[qi], database[dj]));
                    qi += 1;
                    dj += 1;
                }
            }
            PathOp::Insert => {
                total -= i64::from(config.gap_open)
                    + i64::from(config.gap_extend) * (i64::from(seg.len) - 1);
                qi += seg.len as usize;
            }
            PathOp::Delete => {
                total -= i64::from(config.gap_open)
                    + i64::from(config.gap_extend) * (i64::from(seg.len) - 1);
                dj += seg.len as usize;
            }
        }
    }
    total
}

#[test]
fn perfect_match_walks_four_diagonals() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"ACGT", &matrix, &[LaneWidth::W16]).unwrap();
    let config = AlignConfig::new(3, 1, SgFlags::all_free());
    let result = semi_global_trace(&profile, b"ACGT", &config, LaneWidth::W16).unwrap();
    assert_eq!(result.score(), 8);
    assert_eq!((result.end_query(), result.end_ref()), (3, 3));
    let path = walk(&result, b"ACGT", b"ACGT").unwrap();
    assert_eq!(path.to_string(), "4=");
    assert_eq!((path.beg_query(), path.beg_ref()), (0, 0));
    assert_eq!(path.matches(), 4);
}

#[test]
fn free_query_end_path_stops_at_the_database_end() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"AAAA", &matrix, &[LaneWidth::W16]).unwrap();
    let mut flags = SgFlags::anchored();
    flags.free_query_end = true;
    let config = AlignConfig::new(3, 1, flags);
    let result = semi_global_trace(&profile, b"AA", &config, LaneWidth::W16).unwrap();
    assert_eq!(result.score(), 4);
    assert_eq!((result.end_query(), result.end_ref()), (1, 1));
    let path = walk(&result, b"AAAA", b"AA").unwrap();
    assert_eq!(path.to_string(), "2=");
}

#[test]
fn anchored_insertion_shows_in_the_path() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"ACGT", &matrix, &[LaneWidth::W16]).unwrap();
    let config = AlignConfig::new(3, 1, SgFlags::anchored());
    let result = semi_global_trace(&profile, b"AGT", &config, LaneWidth::W16).unwrap();
    assert_eq!(result.score(), 3);
    let path = walk(&result, b"ACGT", b"AGT").unwrap();
    assert_eq!(path.to_string(), "1=1I2=");
}

#[test]
fn anchored_deletion_shows_in_the_path() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"AGT", &matrix, &[LaneWidth::W16]).unwrap();
    let config = AlignConfig::new(3, 1, SgFlags::anchored());
    let result = semi_global_trace(&profile, b"ACGT", &config, LaneWidth::W16).unwrap();
    assert_eq!(result.score(), 3);
    let path = walk(&result, b"AGT", b"ACGT").unwrap();
    assert_eq!(path.to_string(), "1=1D2=");
}

#[test]
fn substitution_is_a_mismatch_step() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"ACGTACGT", &matrix, &[LaneWidth::W16]).unwrap();
    let config = AlignConfig::new(3, 1, SgFlags::anchored());
    let result = semi_global_trace(&profile, b"ACGAACGT", &config, LaneWidth::W16).unwrap();
    assert_eq!(result.score(), 13);
    let path = walk(&result, b"ACGTACGT", b"ACGAACGT").unwrap();
    assert_eq!(path.to_string(), "3=1X4=");
}

#[test]
fn free_ref_start_positions_the_path() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"CGT", &matrix, &[LaneWidth::W16]).unwrap();
    let mut flags = SgFlags::anchored();
    flags.free_ref_start = true;
    flags.free_ref_end = true;
    let config = AlignConfig::new(3, 1, flags);
    let result = semi_global_trace(&profile, b"AACGTAA", &config, LaneWidth::W16).unwrap();
    assert_eq!(result.score(), 6);
    assert_eq!((result.end_query(), result.end_ref()), (2, 4));
    let path = walk(&result, b"CGT", b"AACGTAA").unwrap();
    assert_eq!(path.to_string(), "3=");
    assert_eq!((path.beg_query(), path.beg_ref()), (0, 2));
}

#[test]
fn score_only_results_cannot_be_walked() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"ACGT", &matrix, &[LaneWidth::W16]).unwrap();
    let config = AlignConfig::new(3, 1, SgFlags::anchored());
    let result = semi_global(&profile, b"ACGT", &config, LaneWidth::W16).unwrap();
    assert!(!result.has_trace());
    let err = walk(&result, b"ACGT", b"ACGT").unwrap_err();
    assert!(matches!(err, AlignError::MissingTrace));
}

#[test]
fn walking_with_the_wrong_sequences_is_rejected() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"ACGT", &matrix, &[LaneWidth::W16]).unwrap();
    let config = AlignConfig::new(3, 1, SgFlags::anchored());
    let result = semi_global_trace(&profile, b"ACGT", &config, LaneWidth::W16).unwrap();
    let err = walk(&result, b"ACGTAC", b"ACGT").unwrap_err();
    assert!(matches!(err, AlignError::InconsistentTrace { .. }));
}

#[test]
fn paths_rescore_to_the_reported_score() {
    let matrix = ScoringMatrix::dna();
    let mut seed = 0x7ace_0001u64;
    for qlen in [9, 26, 41] {
        let query = random_seq(&mut seed, qlen);
        let database = mutated(&query, &mut seed);
        let profile = Profile::build(&query, &matrix, &[LaneWidth::W16]).unwrap();
        for flags in all_flag_combinations() {
            let config = AlignConfig::new(3, 1, flags);
            let result =
                semi_global_trace(&profile, &database, &config, LaneWidth::W16).unwrap();
            assert!(!result.is_saturated());
            let path = walk(&result, &query, &database).unwrap();
            let total = rescore(&path, &query, &database, &matrix, &config);
            assert_eq!(
                total,
                result.score(),
                "path {path} does not rescore with flags {flags:?}"
            );
        }
    }
}

#[test]
fn paths_cover_exactly_the_reported_region() {
    let matrix = ScoringMatrix::dna();
    let mut seed = 0x7ace_0002u64;
    let query = random_seq(&mut seed, 30);
    let database = mutated(&query, &mut seed);
    let profile = Profile::build(&query, &matrix, &[LaneWidth::W16]).unwrap();
    for flags in all_flag_combinations() {
        let config = AlignConfig::new(3, 1, flags);
        let result = semi_global_trace(&profile, &database, &config, LaneWidth::W16).unwrap();
        let path = walk(&result, &query, &database).unwrap();
        assert_eq!(
            path.beg_query() + path.query_span() as i32 - 1,
            result.end_query(),
            "query span drifted with flags {flags:?}"
        );
        assert_eq!(
            path.beg_ref() + path.ref_span() as i32 - 1,
            result.end_ref(),
            "database span drifted with flags {flags:?}"
        );
    }
}

#[test]
fn traced_scores_match_the_reference() {
    let matrix = ScoringMatrix::dna();
    let mut seed = 0x7ace_0003u64;
    let query = random_seq(&mut seed, 37);
    let database = mutated(&query, &mut seed);
    let profile = Profile::build(&query, &matrix, &[LaneWidth::W16]).unwrap();
    for flags in all_flag_combinations() {
        let config = AlignConfig::new(3, 1, flags);
        let expected = scalar::semi_global(&query, &database, &matrix, &config).unwrap();
        let traced = semi_global_trace(&profile, &database, &config, LaneWidth::W16).unwrap();
        assert_eq!(traced.score(), expected.score(), "flags {flags:?}");
        assert_eq!(traced.end_query(), expected.end_query(), "flags {flags:?}");
        assert_eq!(traced.end_ref(), expected.end_ref(), "flags {flags:?}");
    }
}

#[test]
fn anchored_empty_database_walks_to_insertions() {
    let matrix = ScoringMatrix::dna();
    let profile = Profile::build(b"ACGT", &matrix, &[LaneWidth::W16]).unwrap();
    let config = AlignConfig::new(3, 1, SgFlags::anchored());
    let result = semi_global_trace(&profile, b"", &config, LaneWidth::W16).unwrap();
    assert_eq!(result.score(), -6);
    assert_eq!((result.end_query(), result.end_ref()), (3, -1));
    let path = walk(&result, b"ACGT", b"").unwrap();
    assert_eq!(path.to_string(), "4I");
}

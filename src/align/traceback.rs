//! Trace walking and alignment paths.
//!
//! [`walk`] replays a trace table from the end coordinates back to the
//! start of the aligned region and returns the path as run-length encoded
//! operations. The walker is a three-state machine: in the match state the
//! cell's primary direction decides the step, and in the two gap states
//! the E/F provenance bits decide whether the gap run continues or closes.

use crate::align::trace::{DIAG, DIAG_E, DIAG_F, LEFT, LEFT_E, UP, UP_F};
use crate::align::types::AlignResult;
use crate::error::{AlignError, Result};
use std::fmt;

/// One alignment step, using extended CIGAR opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PathOp {
    /// Both symbols consumed, equal.
    Match = b'=',
    /// Both symbols consumed, different.
    Mismatch = b'X',
    /// Query symbol consumed, database gapped.
    Insert = b'I',
    /// Database symbol consumed, query gapped.
    Delete = b'D',
}

impl PathOp {
    pub fn symbol(self) -> char {
        self as u8 as char
    }

    pub fn consumes_query(self) -> bool {
        !matches!(self, PathOp::Delete)
    }

    pub fn consumes_ref(self) -> bool {
        !matches!(self, PathOp::Insert)
    }
}

/// A run of identical path operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment {
    pub op: PathOp,
    pub len: u32,
}

/// Run-length encoded alignment between one query and one database region.
///
/// The path covers exactly `[beg_query, end_query]` and
/// `[beg_ref, end_ref]`; free prefixes and suffixes are outside it.
/// `Display` renders the extended CIGAR form, e.g. `3=1X2I4=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentPath {
    segments: Vec<PathSegment>,
    beg_query: i32,
    beg_ref: i32,
}

impl AlignmentPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// First query position the path consumes.
    pub fn beg_query(&self) -> i32 {
        self.beg_query
    }

    /// First database position the path consumes.
    pub fn beg_ref(&self) -> i32 {
        self.beg_ref
    }

    /// Query symbols consumed by the path.
    pub fn query_span(&self) -> u32 {
        self.segments
            .iter()
            .filter(|seg| seg.op.consumes_query())
            .map(|seg| seg.len)
            .sum()
    }

    /// Database symbols consumed by the path.
    pub fn ref_span(&self) -> u32 {
        self.segments
            .iter()
            .filter(|seg| seg.op.consumes_ref())
            .map(|seg| seg.len)
            .sum()
    }

    /// Exact matches along the path.
    pub fn matches(&self) -> u32 {
        self.segments
            .iter()
            .filter(|seg| seg.op == PathOp::Match)
            .map(|seg| seg.len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for AlignmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            write!(f, "{}{}", seg.len, seg.op.symbol())?;
        }
        Ok(())
    }
}

enum State {
    Main,
    GapE,
    GapF,
}

/// Replay a traced result into an [`AlignmentPath`].
///
/// The sequences must be the ones the result was computed from. Saturated
/// results carry a clipped table and should be re-run at a wider lane
/// width before walking.
pub fn walk(result: &AlignResult, query: &[u8], database: &[u8]) -> Result<AlignmentPath> {
    let table = result.trace().ok_or(AlignError::MissingTrace)?;
    if table.query_len() != query.len() || table.db_len() != database.len() {
        return Err(AlignError::InconsistentTrace {
            query: query.len() as i32,
            database: database.len() as i32,
            reason: "trace table was built for different sequence lengths",
        });
    }

    let flags = result.flags();
    let mut i = result.end_query();
    let mut j = result.end_ref();
    let mut state = State::Main;
    // built back to front, reversed once at the end
    let mut segments: Vec<PathSegment> = Vec::new();
    let mut push = |segments: &mut Vec<PathSegment>, op: PathOp| {
        if let Some(last) = segments.last_mut() {
            if last.op == op {
                last.len += 1;
                return;
            }
        }
        segments.push(PathSegment { op, len: 1 });
    };

    while i >= 0 && j >= 0 {
        let code = table.code(i as usize, j as usize);
        match state {
            State::Main => {
                if code & DIAG != 0 {
                    let op = if query[i as usize] == database[j as usize] {
                        PathOp::Match
                    } else {
                        PathOp::Mismatch
                    };
                    push(&mut segments, op);
                    i -= 1;
                    j -= 1;
                } else if code & UP != 0 {
                    state = State::GapF;
                } else if code & LEFT != 0 {
                    state = State::GapE;
                } else {
                    return Err(AlignError::InconsistentTrace {
                        query: i,
                        database: j,
                        reason: "cell has no primary direction",
                    });
                }
            }
            State::GapF => {
                push(&mut segments, PathOp::Insert);
                if code & DIAG_F != 0 {
                    state = State::Main;
                } else if code & UP_F == 0 {
                    return Err(AlignError::InconsistentTrace {
                        query: i,
                        database: j,
                        reason: "vertical gap cell has no provenance",
                    });
                }
                i -= 1;
            }
            State::GapE => {
                push(&mut segments, PathOp::Delete);
                if code & DIAG_E != 0 {
                    state = State::Main;
                } else if code & LEFT_E == 0 {
                    return Err(AlignError::InconsistentTrace {
                        query: i,
                        database: j,
                        reason: "horizontal gap cell has no provenance",
                    });
                }
                j -= 1;
            }
        }
    }

    // anchored starts cross the remaining boundary as one gap run
    if i >= 0 && !flags.free_query_start {
        for _ in 0..=i {
            push(&mut segments, PathOp::Insert);
        }
        i = -1;
    }
    if j >= 0 && !flags.free_ref_start {
        for _ in 0..=j {
            push(&mut segments, PathOp::Delete);
        }
        j = -1;
    }

    segments.reverse();
    Ok(AlignmentPath {
        segments,
        beg_query: i + 1,
        beg_ref: j + 1,
    })
}

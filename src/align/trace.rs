//! Packed trace codes and the striped trace table.
//!
//! Each cell carries one byte of provenance: which matrix (diagonal, up,
//! left) produced the H value, plus sub-flags telling whether the E and F
//! gap rows were opened from H or extended. Cells are stored in striped
//! vector order exactly as the kernel wrote them; [`TraceTable::code`]
//! undoes the striping.

use crate::compute::simd::{LaneElem, LaneWidth};

/// H came from E: a gap in the query, consuming one database symbol.
pub(crate) const LEFT: u8 = 0x01;
/// H came from F: a gap in the database, consuming one query symbol.
pub(crate) const UP: u8 = 0x02;
/// H came from the diagonal.
pub(crate) const DIAG: u8 = 0x04;
/// E was opened from H.
pub(crate) const DIAG_E: u8 = 0x08;
/// E extended a previous E.
pub(crate) const LEFT_E: u8 = 0x10;
/// F was opened from H.
pub(crate) const DIAG_F: u8 = 0x20;
/// F extended a previous F.
pub(crate) const UP_F: u8 = 0x40;

/// Keeps E/F provenance, clears the primary direction bits.
pub(crate) const CLEAR_PRIMARY: u8 = DIAG_E | LEFT_E | DIAG_F | UP_F;
/// Keeps primary and E provenance, clears the F bits.
pub(crate) const CLEAR_F: u8 = LEFT | UP | DIAG | DIAG_E | LEFT_E;

/// Trace cells at the lane width that produced them.
#[derive(Debug, Clone)]
pub(crate) enum Cells {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl Cells {
    /// A zero-cell buffer at the given width, for runs whose table has no
    /// columns.
    pub(crate) fn empty(width: LaneWidth) -> Cells {
        match width {
            LaneWidth::W8 => Cells::I8(Vec::new()),
            LaneWidth::W16 => Cells::I16(Vec::new()),
            LaneWidth::W32 => Cells::I32(Vec::new()),
            LaneWidth::W64 => Cells::I64(Vec::new()),
        }
    }
}

/// Extension hook for kernel element types: wrap a raw cell buffer.
pub(crate) trait TraceElem: LaneElem {
    fn into_cells(cells: Vec<Self>) -> Cells
    where
        Self: Sized;
}

impl TraceElem for i8 {
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::I8(cells)
    }
}

impl TraceElem for i16 {
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::I16(cells)
    }
}

impl TraceElem for i32 {
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::I32(cells)
    }
}

impl TraceElem for i64 {
    fn into_cells(cells: Vec<Self>) -> Cells {
        Cells::I64(cells)
    }
}

/// Full per-cell provenance for one traced alignment.
#[derive(Debug, Clone)]
pub struct TraceTable {
    cells: Cells,
    seg_len: usize,
    lanes: usize,
    query_len: usize,
    db_len: usize,
}

impl TraceTable {
    pub(crate) fn new(
        cells: Cells,
        seg_len: usize,
        lanes: usize,
        query_len: usize,
        db_len: usize,
    ) -> Self {
        TraceTable {
            cells,
            seg_len,
            lanes,
            query_len,
            db_len,
        }
    }

    pub fn query_len(&self) -> usize {
        self.query_len
    }

    pub fn db_len(&self) -> usize {
        self.db_len
    }

    /// Lane width the producing kernel ran at.
    pub fn width(&self) -> LaneWidth {
        match &self.cells {
            Cells::I8(_) => LaneWidth::W8,
            Cells::I16(_) => LaneWidth::W16,
            Cells::I32(_) => LaneWidth::W32,
            Cells::I64(_) => LaneWidth::W64,
        }
    }

    /// Packed code for (query position, database position).
    pub(crate) fn code(&self, query: usize, db: usize) -> u8 {
        let seg = query % self.seg_len;
        let lane = query / self.seg_len;
        let idx = (db * self.seg_len + seg) * self.lanes + lane;
        let raw = match &self.cells {
            Cells::I8(v) => v[idx] as u8,
            Cells::I16(v) => v[idx] as u8,
            Cells::I32(v) => v[idx] as u8,
            Cells::I64(v) => v[idx] as u8,
        };
        raw & 0x7f
    }
}

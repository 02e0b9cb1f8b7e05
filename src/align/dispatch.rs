//! Operation-to-kernel binding.
//!
//! Each (operation, width) pair resolves once per process to the best
//! kernel the host tier provides, stepping down a tier when a backend has
//! no entry for the width. Bindings live in a fixed table of `OnceLock`
//! slots: concurrent first calls race benignly and settle on one value,
//! and every later call is a load.

use std::fmt;
use std::sync::OnceLock;

use crate::align::striped::{self, KernelFn};
use crate::compute::capability::{self, Tier};
use crate::compute::simd::LaneWidth;
use crate::error::{AlignError, Result};

/// Alignment operations with dedicated kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Score and end coordinates only.
    SemiGlobal,
    /// Score, end coordinates and a full trace table.
    SemiGlobalTrace,
}

impl Operation {
    const COUNT: usize = 2;

    /// Registry slot index.
    fn index(self) -> usize {
        match self {
            Operation::SemiGlobal => 0,
            Operation::SemiGlobalTrace => 1,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::SemiGlobal => "semi-global",
            Operation::SemiGlobalTrace => "semi-global-trace",
        };
        f.write_str(name)
    }
}

/// A resolved kernel plus the geometry callers must match.
#[derive(Clone, Copy)]
pub(crate) struct Binding {
    pub(crate) kernel: KernelFn,
    pub(crate) lanes: usize,
    pub(crate) tier: Tier,
}

const SLOTS: usize = Operation::COUNT * LaneWidth::ALL.len();

static BINDINGS: [OnceLock<Option<Binding>>; SLOTS] = [const { OnceLock::new() }; SLOTS];

/// The binding for one (operation, width), resolved on first use.
pub(crate) fn resolve(op: Operation, width: LaneWidth) -> Result<Binding> {
    let slot = op.index() * LaneWidth::ALL.len() + width.index();
    let bound =
        BINDINGS[slot].get_or_init(|| bind_via(striped::kernel_for, capability::tier(), op, width));
    match bound {
        Some(binding) => Ok(*binding),
        None => Err(AlignError::UnsupportedConfiguration { op, width }),
    }
}

/// Lane count the resolved kernel stripes the query with.
pub(crate) fn lanes_for(width: LaneWidth) -> Result<usize> {
    resolve(Operation::SemiGlobal, width).map(|binding| binding.lanes)
}

/// Walk tiers downward from `top` until `source` yields a kernel. Taking
/// the source as a parameter keeps the exhausted path testable.
fn bind_via(
    source: fn(Tier, Operation, LaneWidth) -> Option<(KernelFn, usize)>,
    top: Tier,
    op: Operation,
    width: LaneWidth,
) -> Option<Binding> {
    let mut tier = top;
    loop {
        if let Some((kernel, lanes)) = source(tier, op, width) {
            if tier < top {
                log::debug!("{op} at {width} lanes falls back from {top} to {tier}");
            }
            return Some(Binding { kernel, lanes, tier });
        }
        tier = tier.lower()?;
    }
}

//! Vector-lane abstraction for the striped kernels.
//!
//! The DP core is written once against [`SimdVec`]; each backend module
//! implements the trait for its register type at every lane element width
//! it supports. Backends compile their methods with `#[target_feature]`,
//! which is why every operation is `unsafe`: callers must only reach them
//! through the dispatch registry, after the matching tier was detected.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

pub mod portable;

#[cfg(target_arch = "x86_64")]
pub mod avx2;
#[cfg(target_arch = "x86_64")]
pub mod sse41;

/// Lane element width of a kernel instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneWidth {
    W8,
    W16,
    W32,
    W64,
}

impl LaneWidth {
    /// Narrowest to widest, the escalation order.
    pub const ALL: [LaneWidth; 4] = [
        LaneWidth::W8,
        LaneWidth::W16,
        LaneWidth::W32,
        LaneWidth::W64,
    ];

    pub fn bits(self) -> u32 {
        match self {
            LaneWidth::W8 => 8,
            LaneWidth::W16 => 16,
            LaneWidth::W32 => 32,
            LaneWidth::W64 => 64,
        }
    }

    /// Registry slot index.
    pub(crate) fn index(self) -> usize {
        match self {
            LaneWidth::W8 => 0,
            LaneWidth::W16 => 1,
            LaneWidth::W32 => 2,
            LaneWidth::W64 => 3,
        }
    }

    /// The next wider width, if any.
    pub fn wider(self) -> Option<LaneWidth> {
        match self {
            LaneWidth::W8 => Some(LaneWidth::W16),
            LaneWidth::W16 => Some(LaneWidth::W32),
            LaneWidth::W32 => Some(LaneWidth::W64),
            LaneWidth::W64 => None,
        }
    }
}

impl fmt::Display for LaneWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Signed lane element: i8, i16, i32 or i64.
pub trait LaneElem:
    Copy
    + PartialOrd
    + fmt::Debug
    + BitAnd<Output = Self>
    + BitAndAssign
    + BitOr<Output = Self>
    + BitOrAssign
    + Not<Output = Self>
    + Send
    + Sync
    + 'static
{
    const WIDTH: LaneWidth;
    const MIN: Self;
    const MAX: Self;
    /// Sentinel for unreachable cells: half the type minimum. Scores at or
    /// below it mean the width cannot represent the problem.
    const NEG_INF: Self;
    const ZERO: Self;
    /// All bits set, the true value of comparison masks.
    const MASK_TRUE: Self;

    fn from_i64_sat(value: i64) -> Self;
    fn to_i64(self) -> i64;
    fn saturating_add(self, other: Self) -> Self;
    fn saturating_sub(self, other: Self) -> Self;
}

macro_rules! impl_lane_elem {
    ($ty:ty, $width:expr) => {
        impl LaneElem for $ty {
            const WIDTH: LaneWidth = $width;
            const MIN: Self = <$ty>::MIN;
            const MAX: Self = <$ty>::MAX;
            const NEG_INF: Self = <$ty>::MIN / 2;
            const ZERO: Self = 0;
            const MASK_TRUE: Self = -1;

            #[inline]
            fn from_i64_sat(value: i64) -> Self {
                if value < <$ty>::MIN as i64 {
                    <$ty>::MIN
                } else if value > <$ty>::MAX as i64 {
                    <$ty>::MAX
                } else {
                    value as $ty
                }
            }

            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }

            #[inline]
            fn saturating_add(self, other: Self) -> Self {
                <$ty>::saturating_add(self, other)
            }

            #[inline]
            fn saturating_sub(self, other: Self) -> Self {
                <$ty>::saturating_sub(self, other)
            }
        }
    };
}

impl_lane_elem!(i8, LaneWidth::W8);
impl_lane_elem!(i16, LaneWidth::W16);
impl_lane_elem!(i32, LaneWidth::W32);
impl_lane_elem!(i64, LaneWidth::W64);

/// Vector of `LANES` lanes of `Elem`.
///
/// Comparison operations produce per-lane masks (all bits set or clear);
/// `blend` and `any` consume such masks.
pub trait SimdVec: Copy {
    type Elem: LaneElem;
    const LANES: usize;

    unsafe fn splat(value: Self::Elem) -> Self;
    unsafe fn load(ptr: *const Self::Elem) -> Self;
    unsafe fn store(ptr: *mut Self::Elem, v: Self);
    /// Saturating on 8/16-bit lanes; wider intrinsic backends wrap and are
    /// guarded by the kernel's saturation bounds instead.
    unsafe fn adds(a: Self, b: Self) -> Self;
    unsafe fn subs(a: Self, b: Self) -> Self;
    unsafe fn max(a: Self, b: Self) -> Self;
    unsafe fn min(a: Self, b: Self) -> Self;
    unsafe fn cmpeq(a: Self, b: Self) -> Self;
    unsafe fn cmpgt(a: Self, b: Self) -> Self;
    unsafe fn and(a: Self, b: Self) -> Self;
    unsafe fn or(a: Self, b: Self) -> Self;
    /// `!a & b`, matching the hardware operand order.
    unsafe fn andnot(a: Self, b: Self) -> Self;
    /// Lanes from `b` where the mask lane is set, else from `a`.
    unsafe fn blend(a: Self, b: Self, mask: Self) -> Self;
    /// Shift lanes one position toward the high end, zeroing lane 0.
    unsafe fn shift_lane_up(v: Self) -> Self;
    unsafe fn insert_lane0(v: Self, value: Self::Elem) -> Self;
    unsafe fn extract(v: Self, lane: usize) -> Self::Elem;
    /// True when any mask lane is set.
    unsafe fn any(mask: Self) -> bool;
}

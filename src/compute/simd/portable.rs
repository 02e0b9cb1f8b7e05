//! Portable backend: fixed-size arrays, one scalar op per lane.
//!
//! This is the baseline tier on every platform. Lane counts match the
//! 128-bit backends so profiles laid out for one are valid for the other.

use super::{LaneElem, SimdVec};

/// `N` lanes of `T` in a plain array.
#[derive(Clone, Copy)]
pub struct Pack<T, const N: usize>([T; N]);

pub type P8 = Pack<i8, 16>;
pub type P16 = Pack<i16, 8>;
pub type P32 = Pack<i32, 4>;
pub type P64 = Pack<i64, 2>;

impl<T: LaneElem, const N: usize> SimdVec for Pack<T, N> {
    type Elem = T;
    const LANES: usize = N;

    #[inline]
    unsafe fn splat(value: T) -> Self {
        Pack([value; N])
    }

    #[inline]
    unsafe fn load(ptr: *const T) -> Self {
        Pack(ptr.cast::<[T; N]>().read_unaligned())
    }

    #[inline]
    unsafe fn store(ptr: *mut T, v: Self) {
        ptr.cast::<[T; N]>().write_unaligned(v.0);
    }

    #[inline]
    unsafe fn adds(a: Self, b: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            out[i] = out[i].saturating_add(b.0[i]);
        }
        Pack(out)
    }

    #[inline]
    unsafe fn subs(a: Self, b: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            out[i] = out[i].saturating_sub(b.0[i]);
        }
        Pack(out)
    }

    #[inline]
    unsafe fn max(a: Self, b: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            if b.0[i] > out[i] {
                out[i] = b.0[i];
            }
        }
        Pack(out)
    }

    #[inline]
    unsafe fn min(a: Self, b: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            if b.0[i] < out[i] {
                out[i] = b.0[i];
            }
        }
        Pack(out)
    }

    #[inline]
    unsafe fn cmpeq(a: Self, b: Self) -> Self {
        let mut out = [T::ZERO; N];
        for i in 0..N {
            if a.0[i] == b.0[i] {
                out[i] = T::MASK_TRUE;
            }
        }
        Pack(out)
    }

    #[inline]
    unsafe fn cmpgt(a: Self, b: Self) -> Self {
        let mut out = [T::ZERO; N];
        for i in 0..N {
            if a.0[i] > b.0[i] {
                out[i] = T::MASK_TRUE;
            }
        }
        Pack(out)
    }

    #[inline]
    unsafe fn and(a: Self, b: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            out[i] &= b.0[i];
        }
        Pack(out)
    }

    #[inline]
    unsafe fn or(a: Self, b: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            out[i] |= b.0[i];
        }
        Pack(out)
    }

    #[inline]
    unsafe fn andnot(a: Self, b: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            out[i] = !out[i] & b.0[i];
        }
        Pack(out)
    }

    #[inline]
    unsafe fn blend(a: Self, b: Self, mask: Self) -> Self {
        let mut out = a.0;
        for i in 0..N {
            if mask.0[i].to_i64() < 0 {
                out[i] = b.0[i];
            }
        }
        Pack(out)
    }

    #[inline]
    unsafe fn shift_lane_up(v: Self) -> Self {
        let mut out = [T::ZERO; N];
        for i in 1..N {
            out[i] = v.0[i - 1];
        }
        Pack(out)
    }

    #[inline]
    unsafe fn insert_lane0(v: Self, value: T) -> Self {
        let mut out = v.0;
        out[0] = value;
        Pack(out)
    }

    #[inline]
    unsafe fn extract(v: Self, lane: usize) -> T {
        v.0[lane]
    }

    #[inline]
    unsafe fn any(mask: Self) -> bool {
        mask.0.iter().any(|m| m.to_i64() < 0)
    }
}

//! 128-bit SSE4.1 backend.
//!
//! 8- and 16-bit lanes use the native saturating add/sub; 32-bit lanes
//! have no saturating form below AVX-512 and use wrapping arithmetic,
//! which the kernel's saturation bounds keep out of wrap range.

use std::arch::x86_64::*;

use super::SimdVec;

#[derive(Clone, Copy)]
pub struct S8(__m128i);

#[derive(Clone, Copy)]
pub struct S16(__m128i);

#[derive(Clone, Copy)]
pub struct S32(__m128i);

macro_rules! sse41_vec {
    ($name:ident, $elem:ty, $lanes:expr, $shift_bytes:literal,
     $set1:ident, $adds:ident, $subs:ident, $max:ident, $min:ident,
     $cmpeq:ident, $cmpgt:ident, $insert:ident) => {
        impl SimdVec for $name {
            type Elem = $elem;
            const LANES: usize = $lanes;

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn splat(value: $elem) -> Self {
                $name($set1(value as _))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn load(ptr: *const $elem) -> Self {
                $name(_mm_loadu_si128(ptr as *const __m128i))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn store(ptr: *mut $elem, v: Self) {
                _mm_storeu_si128(ptr as *mut __m128i, v.0);
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn adds(a: Self, b: Self) -> Self {
                $name($adds(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn subs(a: Self, b: Self) -> Self {
                $name($subs(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn max(a: Self, b: Self) -> Self {
                $name($max(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn min(a: Self, b: Self) -> Self {
                $name($min(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn cmpeq(a: Self, b: Self) -> Self {
                $name($cmpeq(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn cmpgt(a: Self, b: Self) -> Self {
                $name($cmpgt(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn and(a: Self, b: Self) -> Self {
                $name(_mm_and_si128(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn or(a: Self, b: Self) -> Self {
                $name(_mm_or_si128(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn andnot(a: Self, b: Self) -> Self {
                $name(_mm_andnot_si128(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn blend(a: Self, b: Self, mask: Self) -> Self {
                $name(_mm_blendv_epi8(a.0, b.0, mask.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn shift_lane_up(v: Self) -> Self {
                $name(_mm_slli_si128::<$shift_bytes>(v.0))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn insert_lane0(v: Self, value: $elem) -> Self {
                $name($insert::<0>(v.0, value as i32))
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn extract(v: Self, lane: usize) -> $elem {
                let mut tmp = [0 as $elem; $lanes];
                _mm_storeu_si128(tmp.as_mut_ptr() as *mut __m128i, v.0);
                tmp[lane]
            }

            #[inline]
            #[target_feature(enable = "sse4.1")]
            unsafe fn any(mask: Self) -> bool {
                _mm_movemask_epi8(mask.0) != 0
            }
        }
    };
}

sse41_vec!(
    S8, i8, 16, 1, _mm_set1_epi8, _mm_adds_epi8, _mm_subs_epi8, _mm_max_epi8, _mm_min_epi8,
    _mm_cmpeq_epi8, _mm_cmpgt_epi8, _mm_insert_epi8
);
sse41_vec!(
    S16, i16, 8, 2, _mm_set1_epi16, _mm_adds_epi16, _mm_subs_epi16, _mm_max_epi16, _mm_min_epi16,
    _mm_cmpeq_epi16, _mm_cmpgt_epi16, _mm_insert_epi16
);
sse41_vec!(
    S32, i32, 4, 4, _mm_set1_epi32, _mm_add_epi32, _mm_sub_epi32, _mm_max_epi32, _mm_min_epi32,
    _mm_cmpeq_epi32, _mm_cmpgt_epi32, _mm_insert_epi32
);

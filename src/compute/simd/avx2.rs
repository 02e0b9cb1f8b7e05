//! 256-bit AVX2 backend.
//!
//! `shift_lane_up` has to carry a lane across the 128-bit halves, done
//! with the usual permute2x128 + alignr pair. Lane 0 insertion goes
//! through the low 128-bit half. 32-bit lanes use wrapping add/sub, as
//! in the SSE4.1 backend, guarded by the kernel's saturation bounds.

use std::arch::x86_64::*;

use super::SimdVec;

#[derive(Clone, Copy)]
pub struct A8(__m256i);

#[derive(Clone, Copy)]
pub struct A16(__m256i);

#[derive(Clone, Copy)]
pub struct A32(__m256i);

macro_rules! avx2_vec {
    ($name:ident, $elem:ty, $lanes:expr, $alignr_bytes:literal,
     $set1:ident, $adds:ident, $subs:ident, $max:ident, $min:ident,
     $cmpeq:ident, $cmpgt:ident, $insert128:ident) => {
        impl SimdVec for $name {
            type Elem = $elem;
            const LANES: usize = $lanes;

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn splat(value: $elem) -> Self {
                $name($set1(value as _))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn load(ptr: *const $elem) -> Self {
                $name(_mm256_loadu_si256(ptr as *const __m256i))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn store(ptr: *mut $elem, v: Self) {
                _mm256_storeu_si256(ptr as *mut __m256i, v.0);
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn adds(a: Self, b: Self) -> Self {
                $name($adds(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn subs(a: Self, b: Self) -> Self {
                $name($subs(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn max(a: Self, b: Self) -> Self {
                $name($max(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn min(a: Self, b: Self) -> Self {
                $name($min(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn cmpeq(a: Self, b: Self) -> Self {
                $name($cmpeq(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn cmpgt(a: Self, b: Self) -> Self {
                $name($cmpgt(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn and(a: Self, b: Self) -> Self {
                $name(_mm256_and_si256(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn or(a: Self, b: Self) -> Self {
                $name(_mm256_or_si256(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn andnot(a: Self, b: Self) -> Self {
                $name(_mm256_andnot_si256(a.0, b.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn blend(a: Self, b: Self, mask: Self) -> Self {
                $name(_mm256_blendv_epi8(a.0, b.0, mask.0))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn shift_lane_up(v: Self) -> Self {
                let carried = _mm256_permute2x128_si256::<0x0C>(v.0, v.0);
                $name(_mm256_alignr_epi8::<$alignr_bytes>(v.0, carried))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn insert_lane0(v: Self, value: $elem) -> Self {
                let low = _mm256_castsi256_si128(v.0);
                let low = $insert128::<0>(low, value as i32);
                $name(_mm256_inserti128_si256::<0>(v.0, low))
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn extract(v: Self, lane: usize) -> $elem {
                let mut tmp = [0 as $elem; $lanes];
                _mm256_storeu_si256(tmp.as_mut_ptr() as *mut __m256i, v.0);
                tmp[lane]
            }

            #[inline]
            #[target_feature(enable = "avx2")]
            unsafe fn any(mask: Self) -> bool {
                _mm256_movemask_epi8(mask.0) != 0
            }
        }
    };
}

avx2_vec!(
    A8, i8, 32, 15, _mm256_set1_epi8, _mm256_adds_epi8, _mm256_subs_epi8, _mm256_max_epi8,
    _mm256_min_epi8, _mm256_cmpeq_epi8, _mm256_cmpgt_epi8, _mm_insert_epi8
);
avx2_vec!(
    A16, i16, 16, 14, _mm256_set1_epi16, _mm256_adds_epi16, _mm256_subs_epi16, _mm256_max_epi16,
    _mm256_min_epi16, _mm256_cmpeq_epi16, _mm256_cmpgt_epi16, _mm_insert_epi16
);
avx2_vec!(
    A32, i32, 8, 12, _mm256_set1_epi32, _mm256_add_epi32, _mm256_sub_epi32, _mm256_max_epi32,
    _mm256_min_epi32, _mm256_cmpeq_epi32, _mm256_cmpgt_epi32, _mm_insert_epi32
);

//! Host capability detection and the vector-lane abstraction.

pub mod capability;
pub mod simd;

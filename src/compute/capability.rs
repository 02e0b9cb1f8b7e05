//! Runtime CPU capability detection.
//!
//! The host is probed once per process; every later caller gets the cached
//! tier. `STRIPED_ALIGN_TIER` can lower the effective tier (useful for
//! comparing backends on one machine), but can never raise it above what
//! the hardware supports.

use std::fmt;
use std::sync::OnceLock;

/// Environment variable that caps the effective tier.
pub const TIER_ENV: &str = "STRIPED_ALIGN_TIER";

/// Vector capability tiers, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Fixed-size-array backend, available everywhere.
    Portable,
    /// 128-bit SSE4.1 vectors (x86_64).
    Sse41,
    /// 256-bit AVX2 vectors (x86_64).
    Avx2,
}

impl Tier {
    /// The next tier down, or `None` at the floor.
    pub(crate) fn lower(self) -> Option<Tier> {
        match self {
            Tier::Avx2 => Some(Tier::Sse41),
            Tier::Sse41 => Some(Tier::Portable),
            Tier::Portable => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Tier::Portable => "portable lanes (128-bit equivalent)",
            Tier::Sse41 => "SSE4.1 128-bit vectors",
            Tier::Avx2 => "AVX2 256-bit vectors",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Portable => "portable",
            Tier::Sse41 => "sse41",
            Tier::Avx2 => "avx2",
        };
        f.write_str(name)
    }
}

static TIER: OnceLock<Tier> = OnceLock::new();

/// The effective tier for this process: detected hardware, capped by the
/// environment override. Logged once on first use.
pub fn tier() -> Tier {
    *TIER.get_or_init(|| {
        let detected = detect();
        let chosen = match env_override() {
            Some(wanted) if wanted <= detected => wanted,
            Some(wanted) => {
                log::warn!(
                    "{TIER_ENV} requests {wanted} but the host only reaches {detected}; ignoring"
                );
                detected
            }
            None => detected,
        };
        log::info!("alignment tier: {chosen} ({})", chosen.describe());
        chosen
    })
}

/// Probe the host CPU. Inconclusive probes resolve to `Portable`.
pub fn detect() -> Tier {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return Tier::Avx2;
        }
        if is_x86_feature_detected!("sse4.1") {
            return Tier::Sse41;
        }
    }
    Tier::Portable
}

fn env_override() -> Option<Tier> {
    let raw = std::env::var(TIER_ENV).ok()?;
    match parse_tier(&raw) {
        Some(tier) => Some(tier),
        None => {
            log::warn!("ignoring unrecognized {TIER_ENV}={raw}");
            None
        }
    }
}

pub(crate) fn parse_tier(value: &str) -> Option<Tier> {
    match value.to_ascii_lowercase().as_str() {
        "portable" | "scalar" => Some(Tier::Portable),
        "sse41" | "sse4.1" => Some(Tier::Sse41),
        "avx2" => Some(Tier::Avx2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Portable < Tier::Sse41);
        assert!(Tier::Sse41 < Tier::Avx2);
    }

    #[test]
    fn detection_is_stable() {
        assert_eq!(detect(), detect());
        assert_eq!(tier(), tier());
    }

    #[test]
    fn override_values_parse() {
        assert_eq!(parse_tier("portable"), Some(Tier::Portable));
        assert_eq!(parse_tier("scalar"), Some(Tier::Portable));
        assert_eq!(parse_tier("SSE4.1"), Some(Tier::Sse41));
        assert_eq!(parse_tier("avx2"), Some(Tier::Avx2));
        assert_eq!(parse_tier("avx512"), None);
    }

    #[test]
    fn display_matches_override_grammar() {
        for tier in [Tier::Portable, Tier::Sse41, Tier::Avx2] {
            assert_eq!(parse_tier(&tier.to_string()), Some(tier));
        }
    }
}

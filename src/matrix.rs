//! Substitution matrices with byte mappers.
//!
//! A matrix is a square table over a small alphabet plus one trailing
//! wildcard code. The mapper folds all 256 possible input bytes onto
//! matrix codes (case-insensitively), so sequences never need validation
//! before alignment: unknown bytes score as the wildcard.

use crate::error::{AlignError, Result};

/// Square substitution matrix with a 256-entry byte mapper.
#[derive(Debug, Clone)]
pub struct ScoringMatrix {
    size: usize,
    scores: Vec<i32>,
    mapper: [u8; 256],
    min: i32,
    max: i32,
}

impl ScoringMatrix {
    /// Match/mismatch matrix over `alphabet` plus a neutral wildcard.
    ///
    /// The wildcard code scores 0 against everything, and every byte not
    /// in the alphabet maps to it.
    pub fn new(alphabet: &[u8], match_score: i32, mismatch_score: i32) -> Result<Self> {
        if alphabet.is_empty() {
            return Err(AlignError::EmptyAlphabet);
        }
        Ok(Self::build(alphabet, match_score, mismatch_score))
    }

    /// 5x5 ACGTN preset: +2 match, -1 mismatch, neutral N.
    pub fn dna() -> Self {
        Self::build(b"ACGT", 2, -1)
    }

    fn build(alphabet: &[u8], match_score: i32, mismatch_score: i32) -> Self {
        let size = alphabet.len() + 1;
        let wildcard = (size - 1) as u8;
        let mut scores = vec![0i32; size * size];
        for a in 0..alphabet.len() {
            for b in 0..alphabet.len() {
                scores[a * size + b] = if a == b { match_score } else { mismatch_score };
            }
        }
        let mut mapper = [wildcard; 256];
        for (code, &byte) in alphabet.iter().enumerate() {
            mapper[byte.to_ascii_uppercase() as usize] = code as u8;
            mapper[byte.to_ascii_lowercase() as usize] = code as u8;
        }
        let min = scores.iter().copied().min().unwrap_or(0);
        let max = scores.iter().copied().max().unwrap_or(0);
        ScoringMatrix {
            size,
            scores,
            mapper,
            min,
            max,
        }
    }

    /// Number of matrix codes, wildcard included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Smallest entry, used for saturation bounds.
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Largest entry, used for saturation bounds.
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Matrix code for an input byte.
    #[inline]
    pub fn code(&self, byte: u8) -> u8 {
        self.mapper[byte as usize]
    }

    /// Row of scores for one matrix code.
    #[inline]
    pub fn row(&self, code: u8) -> &[i32] {
        let start = code as usize * self.size;
        &self.scores[start..start + self.size]
    }

    /// Score between two input bytes.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.row(self.code(a))[self.code(b) as usize]
    }
}

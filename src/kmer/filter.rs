//! Bloom filter over canonical k-mer codes.
//!
//! A fixed-size bit array probed by one multiplicative hash per multiplier.
//! `contains` never returns `false` for an inserted code; the false-positive
//! rate is governed by the array size and the number of multipliers. Used to
//! pre-screen read k-mers before confirming them against an exact count table.

use anyhow::{Result, ensure};
use bit_vec::BitVec;

use super::codec::CanonicalKmer;

/// Multipliers used when none are given explicitly.
pub const DEFAULT_MULTIPLIERS: [u64; 6] = [2, 3, 5, 7, 11, 13];

/// Golden-ratio constant that spreads small multipliers over the word.
const SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct BloomFilter {
    bits: BitVec,
    num_bits: u64,
    fold_shift: u32,
    multipliers: Vec<u64>,
    num_inserted: u64,
}

impl BloomFilter {
    /// Create a filter for k-mers of length `k` with `num_bits` bits.
    pub fn new(k: usize, num_bits: u64, multipliers: &[u64]) -> Result<Self> {
        ensure!(num_bits > 0, "bloom filter needs at least one bit");
        ensure!(
            !multipliers.is_empty(),
            "bloom filter needs at least one hash multiplier"
        );
        ensure!(
            num_bits <= usize::MAX as u64,
            "bloom filter size {num_bits} exceeds addressable memory"
        );
        let spread = multipliers
            .iter()
            .map(|&m| m.wrapping_mul(SPREAD) | 1)
            .collect();
        Ok(Self {
            bits: BitVec::from_elem(num_bits as usize, false),
            num_bits,
            fold_shift: (k as u32).clamp(1, 63),
            multipliers: spread,
            num_inserted: 0,
        })
    }

    /// Size the filter from an expected element count.
    pub fn with_bits_per_kmer(k: usize, expected: u64, bits_per_kmer: u64) -> Result<Self> {
        let num_bits = expected.saturating_mul(bits_per_kmer).max(64);
        Self::new(k, num_bits, &DEFAULT_MULTIPLIERS)
    }

    #[inline]
    fn slot(&self, code: u64, spread: u64) -> usize {
        let h = (code ^ (code >> self.fold_shift)).wrapping_mul(spread);
        ((h ^ (h >> 32)) % self.num_bits) as usize
    }

    pub fn insert(&mut self, kmer: CanonicalKmer) {
        let code = kmer.as_u64();
        for i in 0..self.multipliers.len() {
            let slot = self.slot(code, self.multipliers[i]);
            self.bits.set(slot, true);
        }
        self.num_inserted += 1;
    }

    pub fn contains(&self, kmer: CanonicalKmer) -> bool {
        let code = kmer.as_u64();
        self.multipliers
            .iter()
            .all(|&m| self.bits.get(self.slot(code, m)).unwrap_or(false))
    }

    /// Number of `insert` calls (duplicates included).
    pub fn num_inserted(&self) -> u64 {
        self.num_inserted
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> usize {
        self.multipliers.len()
    }
}

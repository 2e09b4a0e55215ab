//! Rolling canonical k-mer iteration over a read.
//!
//! Keeps forward and reverse-complement codes updated one base at a time.
//! A non-ACGT base resets the window, so k-mers spanning an `N` are never
//! produced.

use super::codec::{CanonicalKmer, KmerCodec, Orientation, base_bits, complement_bits};

/// One K-length window of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerHit {
    /// Start of the window in the read.
    pub pos: usize,
    pub kmer: CanonicalKmer,
    /// Strand the window reads on relative to `kmer`.
    pub orientation: Orientation,
}

/// Iterator over every valid K window of a sequence, in read order.
pub struct CanonicalKmerIter<'a> {
    codec: KmerCodec,
    seq: &'a [u8],
    next: usize,
    fw: u64,
    rc: u64,
    valid: usize,
    rc_shift: u32,
}

impl<'a> CanonicalKmerIter<'a> {
    pub fn new(codec: KmerCodec, seq: &'a [u8]) -> Self {
        Self {
            codec,
            seq,
            next: 0,
            fw: 0,
            rc: 0,
            valid: 0,
            rc_shift: 2 * (codec.k() as u32 - 1),
        }
    }
}

impl Iterator for CanonicalKmerIter<'_> {
    type Item = KmerHit;

    fn next(&mut self) -> Option<KmerHit> {
        let k = self.codec.k();
        while self.next < self.seq.len() {
            let i = self.next;
            self.next += 1;

            let Some(bits) = base_bits(self.seq[i]) else {
                self.valid = 0;
                self.fw = 0;
                self.rc = 0;
                continue;
            };

            self.fw = self.codec.push_base(self.fw, bits);
            self.rc = (self.rc >> 2) | (complement_bits(bits) << self.rc_shift);
            self.valid += 1;

            if self.valid >= k {
                let pos = i + 1 - k;
                let hit = if self.fw <= self.rc {
                    KmerHit {
                        pos,
                        kmer: CanonicalKmer::new(self.fw),
                        orientation: Orientation::Forward,
                    }
                } else {
                    KmerHit {
                        pos,
                        kmer: CanonicalKmer::new(self.rc),
                        orientation: Orientation::Reverse,
                    }
                };
                return Some(hit);
            }
        }
        None
    }
}

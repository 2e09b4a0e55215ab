//! 2-bit k-mer codec and the strong-typed canonical k-mer value.
//!
//! Bases are packed two bits each, first base in the most significant pair:
//!
//! ```text
//! A = 00   C = 01   T = 10   G = 11
//! ```
//!
//! With this symbol order the complement of a base is `bits ^ 0b10`, so the
//! reverse complement of a whole k-mer is one XOR with `0xAAAA...` followed by
//! reversing the 2-bit groups. No per-base lookup is needed.
//!
//! K is limited to 32 (2 bits x 32 = 64 bits). The codec is an immutable
//! value created once per run and handed to every component that needs K.

use anyhow::{Result, ensure};

/// Largest supported k-mer length for `u64` codes.
pub const MAX_K: usize = 32;

/// ASCII base for each 2-bit symbol.
pub const BASES: [u8; 4] = [b'A', b'C', b'T', b'G'];

/// XOR pattern that complements every symbol of a packed code.
const COMPLEMENT_ALL: u64 = 0xAAAA_AAAA_AAAA_AAAA;

// ---------------------------------------------------------------------------
// Base helpers
// ---------------------------------------------------------------------------

/// 2-bit symbol of an ASCII base, or `None` for anything outside `ACGTacgt`.
#[inline]
pub fn base_bits(b: u8) -> Option<u64> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'T' | b't' => Some(2),
        b'G' | b'g' => Some(3),
        _ => None,
    }
}

/// Complement of a 2-bit symbol.
#[inline]
pub fn complement_bits(bits: u64) -> u64 {
    bits ^ 2
}

/// Complement of an ASCII base (upper-case output, `N` for non-ACGT).
#[inline]
pub fn complement_base(b: u8) -> u8 {
    match base_bits(b) {
        Some(bits) => BASES[complement_bits(bits) as usize],
        None => b'N',
    }
}

/// Reverse complement of an ASCII sequence.
pub fn reverse_complement_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement_base(b)).collect()
}

/// Reverse the order of the 32 two-bit groups of `x`.
#[inline]
fn reverse_pairs(mut x: u64) -> u64 {
    x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
    x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0F) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
    x.swap_bytes()
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// Which strand of a canonical k-mer is being read.
///
/// `Forward`: the raw k-mer equals the canonical code.
/// `Reverse`: the raw k-mer is the reverse complement of the canonical code.
///
/// The same type names the two ends of a graph node: the `Forward` end holds
/// the edges that extend the canonical k-mer to the right, the `Reverse` end
/// those that extend its reverse complement to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Orientation {
    Forward = 0,
    Reverse = 1,
}

impl Orientation {
    /// The opposite strand.
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    /// 0 for `Forward`, 1 for `Reverse`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(i: usize) -> Self {
        if i & 1 == 0 { Self::Forward } else { Self::Reverse }
    }
}

// ---------------------------------------------------------------------------
// CanonicalKmer
// ---------------------------------------------------------------------------

/// A canonical k-mer packed into a `u64`.
///
/// The minimum of the forward and reverse-complement 2-bit encodings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKmer(pub(crate) u64);

impl CanonicalKmer {
    /// Wrap a raw packed value. The caller guarantees it is canonical.
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw packed `u64` value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Debug for CanonicalKmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CanonicalKmer(0x{:016x})", self.0)
    }
}

impl std::fmt::Display for CanonicalKmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// KmerCodec
// ---------------------------------------------------------------------------

/// Packs, unpacks and canonicalizes k-mers of one fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerCodec {
    k: usize,
    mask: u64,
}

impl KmerCodec {
    /// Create a codec for k-mers of length `k`.
    ///
    /// Fails when `k` is zero or would overflow a `u64` code.
    pub fn new(k: usize) -> Result<Self> {
        ensure!(k > 0, "k-mer length must be at least 1");
        ensure!(
            k <= MAX_K,
            "k-mer length {k} is too large: codes are 64 bits wide, so k must be <= {MAX_K}"
        );
        let mask = if k == MAX_K { u64::MAX } else { (1u64 << (2 * k)) - 1 };
        Ok(Self { k, mask })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Mask covering the low `2k` bits.
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Pack a K-length ASCII k-mer. `None` on wrong length or non-ACGT input.
    pub fn encode(&self, seq: &[u8]) -> Option<u64> {
        if seq.len() != self.k {
            return None;
        }
        let mut code = 0u64;
        for &b in seq {
            code = (code << 2) | base_bits(b)?;
        }
        Some(code)
    }

    /// Unpack a code into upper-case ASCII.
    pub fn decode(&self, code: u64) -> Vec<u8> {
        (0..self.k)
            .rev()
            .map(|i| BASES[((code >> (2 * i)) & 3) as usize])
            .collect()
    }

    /// Reverse complement of a packed k-mer.
    #[inline]
    pub fn reverse_complement(&self, code: u64) -> u64 {
        reverse_pairs(code ^ COMPLEMENT_ALL) >> (64 - 2 * self.k)
    }

    /// Canonical form of a raw code and the strand it was read on.
    #[inline]
    pub fn canonical(&self, code: u64) -> (CanonicalKmer, Orientation) {
        let rc = self.reverse_complement(code);
        if code <= rc {
            (CanonicalKmer(code), Orientation::Forward)
        } else {
            (CanonicalKmer(rc), Orientation::Reverse)
        }
    }

    /// Raw code of a canonical k-mer read on the given strand.
    #[inline]
    pub fn oriented(&self, kmer: CanonicalKmer, orientation: Orientation) -> u64 {
        match orientation {
            Orientation::Forward => kmer.0,
            Orientation::Reverse => self.reverse_complement(kmer.0),
        }
    }

    /// Append a symbol on the right and drop the leftmost base.
    #[inline]
    pub fn push_base(&self, code: u64, bits: u64) -> u64 {
        ((code << 2) | bits) & self.mask
    }

    /// 2-bit symbol of the leftmost base.
    #[inline]
    pub fn first_base(&self, code: u64) -> u64 {
        (code >> (2 * (self.k - 1))) & 3
    }

    /// 2-bit symbol of the rightmost base.
    #[inline]
    pub fn last_base(&self, code: u64) -> u64 {
        code & 3
    }

    /// Canonical k-mer of an ASCII string, for table parsing.
    pub fn canonical_of(&self, seq: &[u8]) -> Option<(CanonicalKmer, Orientation)> {
        self.encode(seq).map(|code| self.canonical(code))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Every string of length `k` over ACGT, in lexicographic order of symbols.
    fn all_kmers(k: usize) -> Vec<Vec<u8>> {
        let mut out = vec![Vec::new()];
        for _ in 0..k {
            out = out
                .into_iter()
                .flat_map(|prefix| {
                    b"ACGT".iter().map(move |&b| {
                        let mut s = prefix.clone();
                        s.push(b);
                        s
                    })
                })
                .collect();
        }
        out
    }

    fn naive_rc(s: &[u8]) -> Vec<u8> {
        s.iter()
            .rev()
            .map(|&b| match b {
                b'A' => b'T',
                b'T' => b'A',
                b'C' => b'G',
                b'G' => b'C',
                _ => b'N',
            })
            .collect()
    }

    #[test]
    fn test_symbol_layout() {
        let codec = KmerCodec::new(5).unwrap();
        // A=00 C=01 G=11 T=10 -> ACGTA = 00 01 11 10 00
        assert_eq!(codec.encode(b"ACGTA"), Some(0b00_01_11_10_00));
        assert_eq!(codec.encode(b"acgta"), Some(0b00_01_11_10_00));
        for b in b"ACGT" {
            let bits = base_bits(*b).unwrap();
            assert_eq!(BASES[complement_bits(bits) as usize], naive_rc(&[*b])[0]);
        }
    }

    #[test]
    fn test_roundtrip_exhaustive_small_k() {
        for k in 1..=6 {
            let codec = KmerCodec::new(k).unwrap();
            for s in all_kmers(k) {
                let code = codec.encode(&s).unwrap();
                assert_eq!(codec.decode(code), s, "k={k}");
            }
        }
    }

    #[test]
    fn test_roundtrip_wide_k() {
        let s31 = b"ACGTTGCAAGGCTTACCGATGCATTACGGAT";
        let s32 = b"TTGACCATGCAAGTCGGATCCATGACGTATGC";
        for s in [&s31[..], &s32[..]] {
            let codec = KmerCodec::new(s.len()).unwrap();
            let code = codec.encode(s).unwrap();
            assert_eq!(codec.decode(code), s.to_vec());
            let rc = codec.reverse_complement(code);
            assert_eq!(codec.decode(rc), naive_rc(s));
        }
    }

    #[test]
    fn test_reverse_complement_matches_naive() {
        let codec = KmerCodec::new(5).unwrap();
        for s in all_kmers(5) {
            let code = codec.encode(&s).unwrap();
            let rc = codec.reverse_complement(code);
            assert_eq!(codec.decode(rc), naive_rc(&s));
            assert_eq!(codec.reverse_complement(rc), code);
        }
    }

    #[test]
    fn test_canonical_is_strand_invariant() {
        let codec = KmerCodec::new(7).unwrap();
        for s in all_kmers(7).into_iter().step_by(13) {
            let code = codec.encode(&s).unwrap();
            let (c1, o1) = codec.canonical(code);
            let (c2, o2) = codec.canonical(codec.reverse_complement(code));
            assert_eq!(c1, c2);
            assert_eq!(o1, o2.flip(), "odd k never yields a palindrome");
            assert_eq!(codec.oriented(c1, o1), code);
        }
    }

    #[test]
    fn test_push_and_edge_bases() {
        let codec = KmerCodec::new(3).unwrap();
        let atg = codec.encode(b"ATG").unwrap();
        let tga = codec.push_base(atg, base_bits(b'A').unwrap());
        assert_eq!(codec.decode(tga), b"TGA".to_vec());
        assert_eq!(BASES[codec.first_base(atg) as usize], b'A');
        assert_eq!(BASES[codec.last_base(atg) as usize], b'G');
    }

    #[test]
    fn test_invalid_input() {
        assert!(KmerCodec::new(0).is_err());
        assert!(KmerCodec::new(33).is_err());
        assert!(KmerCodec::new(32).is_ok());
        let codec = KmerCodec::new(4).unwrap();
        assert_eq!(codec.encode(b"ACNT"), None);
        assert_eq!(codec.encode(b"ACG"), None);
    }

    #[test]
    fn test_sequence_reverse_complement() {
        assert_eq!(reverse_complement_seq(b"ATGC"), b"GCAT".to_vec());
        assert_eq!(reverse_complement_seq(b"aaN"), b"NTT".to_vec());
        assert!(reverse_complement_seq(b"").is_empty());
    }
}

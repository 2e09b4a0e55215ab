//! Extending the exclusive set from the reads that carry it.
//!
//! Reads holding at least one exclusive k-mer are likely to come from a
//! target-specific region, so their other k-mers are worth keeping too. The
//! Bloom filter of solid target k-mers screens them cheaply; a second pass
//! over the target table confirms the survivors with exact counts.

use ahash::AHashSet;
use anyhow::{Result, bail};
use serde::Serialize;

use crate::io::kmer_table::KmerTableReader;
use crate::kmer::filter::BloomFilter;
use crate::kmer::iter::{CanonicalKmerIter, KmerHit};
use crate::kmer::{CanonicalKmer, KmerCodec, KmerCounts};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RescanStats {
    pub reads_scanned: u64,
    /// Reads with at least one exclusive k-mer.
    pub reads_hit: u64,
    pub candidates: u64,
    pub confirmed: u64,
}

pub struct Rescan {
    codec: KmerCodec,
    candidates: AHashSet<CanonicalKmer>,
    hits: Vec<KmerHit>,
    stats: RescanStats,
}

impl Rescan {
    pub fn new(codec: KmerCodec) -> Self {
        Self {
            codec,
            candidates: AHashSet::new(),
            hits: Vec::new(),
            stats: RescanStats::default(),
        }
    }

    /// Collect candidate k-mers from one read.
    pub fn scan_read(&mut self, exclusive: &KmerCounts, filter: &BloomFilter, read: &[u8]) {
        self.stats.reads_scanned += 1;
        self.hits.clear();
        self.hits.extend(CanonicalKmerIter::new(self.codec, read));
        if !self.hits.iter().any(|h| exclusive.contains_key(&h.kmer)) {
            return;
        }
        self.stats.reads_hit += 1;
        for hit in &self.hits {
            if !exclusive.contains_key(&hit.kmer) && filter.contains(hit.kmer) {
                self.candidates.insert(hit.kmer);
            }
        }
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Add the candidates the target table lists at or above `trough` to
    /// `exclusive`; the others are discarded.
    pub fn confirm(
        mut self,
        mut target: KmerTableReader,
        trough: u64,
        exclusive: &mut KmerCounts,
    ) -> Result<RescanStats> {
        self.stats.candidates = self.candidates.len() as u64;
        while let Some(rec) = target.next_record()? {
            if rec.count < trough {
                continue;
            }
            let Some((kmer, _)) = self.codec.canonical_of(&rec.kmer) else {
                bail!("{}:{}: cannot encode k-mer", target.path(), target.line_no());
            };
            if self.candidates.remove(&kmer) {
                exclusive.insert(kmer, rec.count);
                self.stats.confirmed += 1;
            }
        }
        Ok(self.stats)
    }
}

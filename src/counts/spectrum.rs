//! K-mer abundance spectrum and its trough / peak thresholds.
//!
//! The spectrum maps an abundance `f` to the number `n_f` of distinct k-mers
//! seen `f` times. Sequencing errors pile up at low `f` and fall off until
//! the true-coverage hump begins; the first local minimum on that slope is
//! the trough, the tallest `f * n_f` bin above it is the peak.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::io::kmer_table::KmerTableReader;

/// Trough, peak and sizes of one spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpectrumSummary {
    /// Abundance below which k-mers are treated as errors (0 = keep all).
    pub trough: u64,
    /// Abundance with the largest k-mer mass at or above the trough.
    pub peak: u64,
    pub distinct_kmers: u64,
    /// Sum of all abundances.
    pub total_kmers: u64,
    /// Distinct k-mers at or above the trough.
    pub solid_kmers: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Spectrum {
    hist: BTreeMap<u64, u64>,
}

impl Spectrum {
    pub fn from_counts<I: IntoIterator<Item = u64>>(counts: I) -> Self {
        let mut spectrum = Self::default();
        for count in counts {
            spectrum.add(count);
        }
        spectrum
    }

    /// Histogram of a k-mer table file.
    pub fn from_table(path: &str, k: Option<usize>) -> Result<Self> {
        let mut reader = KmerTableReader::open(path, k)?;
        let mut spectrum = Self::default();
        while let Some(rec) = reader.next_record()? {
            spectrum.add(rec.count);
        }
        Ok(spectrum)
    }

    #[inline]
    pub fn add(&mut self, count: u64) {
        *self.hist.entry(count).or_insert(0) += 1;
    }

    pub fn histogram(&self) -> &BTreeMap<u64, u64> {
        &self.hist
    }

    pub fn total_mass(&self) -> u64 {
        self.hist
            .iter()
            .fold(0u64, |acc, (&f, &n)| acc.saturating_add(f.saturating_mul(n)))
    }

    /// First local minimum before half of the mass is passed, else 0.
    pub fn trough(&self) -> u64 {
        let bins: Vec<(u64, u64)> = self.hist.iter().map(|(&f, &n)| (f, n)).collect();
        let half = self.total_mass() as f64 * 0.5;
        let mut accumulated = 0u64;
        for pair in bins.windows(2) {
            let ((f, n), (_, next_n)) = (pair[0], pair[1]);
            if n <= next_n {
                return f;
            }
            accumulated = accumulated.saturating_add(f.saturating_mul(n));
            if accumulated as f64 > half {
                return 0;
            }
        }
        0
    }

    /// Abundance maximizing `f * n_f` among `f >= trough`; first one on ties.
    pub fn peak(&self, trough: u64) -> u64 {
        let mut best: Option<(u64, u64)> = None;
        for (&f, &n) in self.hist.range(trough..) {
            let mass = f.saturating_mul(n);
            if best.is_none_or(|(_, m)| mass > m) {
                best = Some((f, mass));
            }
        }
        best.map_or(0, |(f, _)| f)
    }

    /// Distinct k-mers with abundance `>= trough`.
    pub fn solid_kmers(&self, trough: u64) -> u64 {
        self.hist.range(trough..).map(|(_, &n)| n).sum()
    }

    pub fn summary(&self) -> SpectrumSummary {
        let trough = self.trough();
        SpectrumSummary {
            trough,
            peak: self.peak(trough),
            distinct_kmers: self.hist.values().sum(),
            total_kmers: self.total_mass(),
            solid_kmers: self.solid_kmers(trough),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

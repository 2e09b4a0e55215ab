//! Target-exclusive k-mer selection.
//!
//! The target table is merged against every background table in one
//! streaming pass. All tables must be sorted by k-mer string, which is how
//! k-mer counters dump them. A target k-mer is exclusive when it is solid in
//! the target (count at or above the target trough) and no background lists
//! it at or above that background's own trough.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail, ensure};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::info;

use super::rescan::Rescan;
use super::spectrum::Spectrum;
use crate::io::fastx::for_each_read;
use crate::io::kmer_table::{KmerTableReader, TableRecord, write_kmer_counts};
use crate::kmer::filter::BloomFilter;
use crate::kmer::{KmerCodec, KmerCounts};

// ---------------------------------------------------------------------------
// Config / stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExclusiveConfig {
    pub k: usize,
    pub target_table: String,
    pub background_tables: Vec<String>,
    /// Target reads to rescan; empty skips the rescan.
    pub reads: Vec<String>,
    pub output: PathBuf,
    /// Overrides the target trough.
    pub target_min_count: Option<u64>,
    /// Largest accepted exclusive / solid ratio.
    pub max_exclusive_ratio: f64,
    pub bloom_bits_per_kmer: u64,
}

impl ExclusiveConfig {
    /// Checks that need no file access.
    pub fn validate(&self) -> Result<()> {
        KmerCodec::new(self.k)?;
        ensure!(
            !self.background_tables.is_empty(),
            "at least one background table is required"
        );
        ensure!(
            self.max_exclusive_ratio > 0.0 && self.max_exclusive_ratio <= 1.0,
            "max exclusive ratio must be in (0, 1], got {}",
            self.max_exclusive_ratio
        );
        ensure!(
            self.bloom_bits_per_kmer > 0,
            "bloom filter needs at least one bit per k-mer"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExclusiveStats {
    pub target_trough: u64,
    pub background_troughs: Vec<u64>,
    pub solid_target_kmers: u64,
    pub exclusive_kmers: u64,
    pub rescued_kmers: u64,
    pub kmers_written: usize,
}

// ---------------------------------------------------------------------------
// Sorted-table merge
// ---------------------------------------------------------------------------

/// A sorted table read in step with the target.
pub struct TableCursor {
    reader: KmerTableReader,
    trough: u64,
    current: Option<TableRecord>,
    started: bool,
}

impl TableCursor {
    pub fn new(reader: KmerTableReader, trough: u64) -> Self {
        Self {
            reader,
            trough,
            current: None,
            started: false,
        }
    }

    fn advance(&mut self) -> Result<()> {
        let next = self.reader.next_record()?;
        if let (Some(prev), Some(next)) = (&self.current, &next)
            && next.kmer <= prev.kmer
        {
            bail!(
                "{}:{}: table is not sorted by k-mer ({} after {})",
                self.reader.path(),
                self.reader.line_no(),
                String::from_utf8_lossy(&next.kmer),
                String::from_utf8_lossy(&prev.kmer)
            );
        }
        self.current = next;
        self.started = true;
        Ok(())
    }

    /// Move up to `kmer`; true if the table lists it as solid.
    fn is_solid(&mut self, kmer: &[u8]) -> Result<bool> {
        if !self.started {
            self.advance()?;
        }
        while let Some(rec) = &self.current {
            if rec.kmer.as_slice() >= kmer {
                return Ok(rec.kmer == kmer && rec.count >= self.trough);
            }
            self.advance()?;
        }
        Ok(false)
    }
}

/// Merge the target against the backgrounds. Every solid target k-mer goes
/// into `filter`; the exclusive ones are returned with their target counts,
/// together with the number of solid target k-mers.
pub fn merge_exclusive(
    codec: KmerCodec,
    mut target: KmerTableReader,
    target_trough: u64,
    backgrounds: &mut [TableCursor],
    filter: &mut BloomFilter,
) -> Result<(KmerCounts, u64)> {
    let mut exclusive = KmerCounts::default();
    let mut solid = 0u64;
    let mut prev: Option<Vec<u8>> = None;

    while let Some(rec) = target.next_record()? {
        if let Some(prev) = &prev
            && rec.kmer <= *prev
        {
            bail!(
                "{}:{}: table is not sorted by k-mer ({} after {})",
                target.path(),
                target.line_no(),
                String::from_utf8_lossy(&rec.kmer),
                String::from_utf8_lossy(prev)
            );
        }
        if rec.count >= target_trough {
            let Some((kmer, _)) = codec.canonical_of(&rec.kmer) else {
                bail!("{}:{}: cannot encode k-mer", target.path(), target.line_no());
            };
            solid += 1;
            filter.insert(kmer);

            let mut shared = false;
            for bg in backgrounds.iter_mut() {
                shared |= bg.is_solid(&rec.kmer)?;
            }
            if !shared {
                exclusive.insert(kmer, rec.count);
            }
        }
        prev = Some(rec.kmer);
    }
    Ok((exclusive, solid))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Select exclusive k-mers, optionally extend them from the target reads,
/// and write the resulting table.
pub fn run_exclusive(config: &ExclusiveConfig, progress: &ProgressBar) -> Result<ExclusiveStats> {
    config.validate()?;
    let start = Instant::now();
    let codec = KmerCodec::new(config.k)?;
    let k = Some(config.k);

    let spectrum = Spectrum::from_table(&config.target_table, k)?;
    let target_spectrum = spectrum.summary();
    let target_trough = config.target_min_count.unwrap_or(target_spectrum.trough);
    info!(
        "Target spectrum: trough {}, peak {}, {} solid k-mers",
        target_spectrum.trough, target_spectrum.peak, target_spectrum.solid_kmers
    );

    let mut stats = ExclusiveStats {
        target_trough,
        ..Default::default()
    };
    let mut backgrounds = Vec::with_capacity(config.background_tables.len());
    for path in &config.background_tables {
        let summary = Spectrum::from_table(path, k)?.summary();
        info!(
            "Background {}: trough {}, peak {}",
            path, summary.trough, summary.peak
        );
        stats.background_troughs.push(summary.trough);
        backgrounds.push(TableCursor::new(KmerTableReader::open(path, k)?, summary.trough));
    }

    let expected = spectrum.solid_kmers(target_trough);
    let mut filter = BloomFilter::with_bits_per_kmer(config.k, expected, config.bloom_bits_per_kmer)?;
    let target = KmerTableReader::open(&config.target_table, k)?;
    let (mut exclusive, solid) =
        merge_exclusive(codec, target, target_trough, &mut backgrounds, &mut filter)?;
    stats.solid_target_kmers = solid;
    stats.exclusive_kmers = exclusive.len() as u64;
    info!("{} exclusive of {} solid target k-mers", exclusive.len(), solid);

    if exclusive.is_empty() {
        bail!(
            "no exclusive k-mers: target and background are indistinguishable at k = {} (target trough {}, {} solid k-mers)",
            config.k,
            target_trough,
            solid
        );
    }
    let ratio = exclusive.len() as f64 / solid as f64;
    if ratio > config.max_exclusive_ratio {
        bail!(
            "{:.1}% of solid target k-mers are exclusive (limit {:.1}%): target too different from background, check for contamination",
            ratio * 100.0,
            config.max_exclusive_ratio * 100.0
        );
    }

    if !config.reads.is_empty() {
        let mut rescan = Rescan::new(codec);
        for_each_read(&config.reads, |read| {
            rescan.scan_read(&exclusive, &filter, read);
            progress.inc(1);
            Ok(())
        })?;
        progress.finish_and_clear();
        let target = KmerTableReader::open(&config.target_table, k)?;
        let rescan_stats = rescan.confirm(target, target_trough, &mut exclusive)?;
        stats.rescued_kmers = rescan_stats.confirmed;
        info!(
            "Rescan: {}/{} reads carry exclusive k-mers, {} of {} candidates confirmed",
            rescan_stats.reads_hit,
            rescan_stats.reads_scanned,
            rescan_stats.confirmed,
            rescan_stats.candidates
        );
    }

    stats.kmers_written = write_kmer_counts(&config.output, codec, &exclusive)?;
    info!(
        "Wrote {} k-mers to {} ({:.2}s)",
        stats.kmers_written,
        config.output.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

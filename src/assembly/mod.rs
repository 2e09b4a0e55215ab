//! Assembly pipeline: build → contract → thread reads → traverse.
//!
//! [`Assembler`] owns the graph through all four stages. Reads are threaded
//! one at a time as they are streamed in; contigs are produced only once all
//! reads have been seen.

pub mod thread;
pub mod traverse;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::info;

use crate::graph::DbGraph;
use crate::graph::build::{build_graph, ensure_odd_k};
use crate::graph::contract::{ContractionStats, contract};
use crate::io::assembly_info::write_assembly_info;
use crate::io::fasta::write_contigs_to_path;
use crate::io::fastx::for_each_read;
use crate::io::kmer_table::read_kmer_counts;
use crate::kmer::{KmerCodec, KmerCounts};

use self::thread::{ReadThreader, ThreadOutcome, ThreadingStats};
use self::traverse::{Contig, TraversalStats, traverse};

// ---------------------------------------------------------------------------
// Config / stats
// ---------------------------------------------------------------------------

/// Inputs of one file-backed assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    pub k: usize,
    /// Exclusive k-mer table.
    pub kmer_table: String,
    pub reads: Vec<String>,
    /// Contig FASTA; `assembly_info.json` goes next to it.
    pub output: PathBuf,
    pub min_contig_len: usize,
    pub cmdline: String,
}

impl AssemblyConfig {
    /// Checks that need no file access.
    pub fn validate(&self) -> Result<()> {
        KmerCodec::new(self.k)?;
        ensure_odd_k(self.k)?;
        if self.reads.is_empty() {
            bail!("at least one read file is required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AssemblyStats {
    pub kmers_in: usize,
    pub contraction: ContractionStats,
    pub threading: ThreadingStats,
    pub traversal: TraversalStats,
    pub contigs: usize,
    pub contigs_written: usize,
    pub min_contig_len: usize,
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

pub struct Assembler {
    graph: DbGraph,
    threader: ReadThreader,
    stats: AssemblyStats,
}

impl Assembler {
    /// Build and contract the graph of `counts`.
    pub fn new(codec: KmerCodec, counts: &KmerCounts) -> Result<Self> {
        let mut graph = build_graph(codec, counts)?;
        let contraction = contract(&mut graph)?;
        Ok(Self {
            graph,
            threader: ReadThreader::new(),
            stats: AssemblyStats {
                kmers_in: counts.len(),
                contraction,
                ..Default::default()
            },
        })
    }

    pub fn graph(&self) -> &DbGraph {
        &self.graph
    }

    pub fn threading_stats(&self) -> ThreadingStats {
        self.threader.stats()
    }

    pub fn thread_read(&mut self, read: &[u8]) -> Result<ThreadOutcome> {
        self.threader.thread(&mut self.graph, read)
    }

    /// Walk the annotated graph. Fails when no read threaded onto it.
    pub fn finish(mut self) -> Result<(Vec<Contig>, AssemblyStats)> {
        let threading = self.threader.stats();
        if threading.reads_threaded == 0 {
            bail!(
                "no read threads onto the graph ({} reads seen, {} k-mers after contraction)",
                threading.reads_seen,
                self.graph.num_kmers()
            );
        }
        let (contigs, traversal) = traverse(&mut self.graph)?;
        let stats = AssemblyStats {
            threading,
            traversal,
            contigs: contigs.len(),
            ..self.stats
        };
        Ok((contigs, stats))
    }
}

/// Assemble in memory from canonical counts and reads.
pub fn assemble<'a, I>(
    codec: KmerCodec,
    counts: &KmerCounts,
    reads: I,
) -> Result<(Vec<Contig>, AssemblyStats)>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut assembler = Assembler::new(codec, counts)?;
    for read in reads {
        assembler.thread_read(read)?;
    }
    assembler.finish()
}

// ---------------------------------------------------------------------------
// File-backed run
// ---------------------------------------------------------------------------

/// Load the table, stream the reads and write the contigs plus
/// `assembly_info.json`. Nothing is written unless traversal succeeds.
pub fn run_assembly(config: &AssemblyConfig, progress: &ProgressBar) -> Result<AssemblyStats> {
    config.validate()?;
    let start = Instant::now();
    let codec = KmerCodec::new(config.k)?;

    info!("Loading k-mer table {}", config.kmer_table);
    let counts = read_kmer_counts(&config.kmer_table, codec)?;
    info!("Loaded {} k-mers", counts.len());

    let mut assembler = Assembler::new(codec, &counts)?;
    drop(counts);

    let thread_start = Instant::now();
    for_each_read(&config.reads, |read| {
        assembler.thread_read(read)?;
        progress.inc(1);
        Ok(())
    })?;
    progress.finish_and_clear();
    let threading = assembler.threading_stats();
    info!(
        "Threaded {}/{} reads, {} tags ({:.2}s)",
        threading.reads_threaded,
        threading.reads_seen,
        threading.tags_added,
        thread_start.elapsed().as_secs_f64()
    );

    let (contigs, mut stats) = assembler.finish()?;
    stats.min_contig_len = config.min_contig_len;
    stats.contigs_written = write_contigs_to_path(&config.output, &contigs, config.min_contig_len)?;

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "Wrote {}/{} contigs (>= {} bp) to {} ({:.2}s total)",
        stats.contigs_written,
        stats.contigs,
        config.min_contig_len,
        config.output.display(),
        elapsed
    );

    let info_path = config.output.with_file_name("assembly_info.json");
    write_assembly_info(&info_path, config.k, &stats, &config.cmdline, elapsed)?;
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

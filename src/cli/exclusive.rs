//! CLI command for selecting target-exclusive k-mers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::counts::exclusive::{ExclusiveConfig, run_exclusive};

#[derive(Args, Debug)]
pub struct ExclusiveArgs {
    /// K-mer length (1-32)
    #[arg(short = 'k', long)]
    pub klen: usize,
    /// Target k-mer table, sorted by k-mer
    #[arg(short = 't', long)]
    pub target: String,
    /// Background k-mer tables, sorted by k-mer (comma-separated)
    #[arg(short = 'b', long, value_delimiter = ',', required = true)]
    pub background: Vec<String>,
    /// Target reads to rescan for k-mers next to exclusive ones (comma-separated)
    #[arg(short = 'r', long = "reads", value_delimiter = ',')]
    pub reads: Vec<String>,
    /// Output k-mer table
    #[arg(short = 'o', long)]
    pub output: String,
    /// Minimum target count; defaults to the target spectrum trough
    #[arg(long)]
    pub target_min_count: Option<u64>,
    /// Fail when more than this fraction of solid target k-mers is exclusive
    #[arg(long, default_value = "0.1")]
    pub max_exclusive_ratio: f64,
    /// Bloom filter bits per solid target k-mer
    #[arg(long, default_value = "16")]
    pub bloom_bits_per_kmer: u64,
    /// Suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

pub fn run(args: ExclusiveArgs) -> Result<()> {
    let config = ExclusiveConfig {
        k: args.klen,
        target_table: args.target,
        background_tables: args.background,
        reads: args.reads,
        output: PathBuf::from(&args.output),
        target_min_count: args.target_min_count,
        max_exclusive_ratio: args.max_exclusive_ratio,
        bloom_bits_per_kmer: args.bloom_bits_per_kmer,
    };
    config.validate()?;
    let progress = super::make_progress_bar(args.quiet)?;
    let stats = run_exclusive(&config, &progress)?;

    let info_path = config.output.with_extension("json");
    let file = std::fs::File::create(&info_path)
        .with_context(|| format!("failed to create {}", info_path.display()))?;
    serde_json::to_writer_pretty(
        std::io::BufWriter::new(file),
        &serde_json::json!({
            "stats": stats,
            "cmdline": super::cmdline(),
        }),
    )?;
    Ok(())
}

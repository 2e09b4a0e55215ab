//! CLI command for assembling contigs from exclusive k-mers and reads.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::assembly::{AssemblyConfig, run_assembly};

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// K-mer length (odd, 1-31)
    #[arg(short = 'k', long)]
    pub klen: usize,
    /// Exclusive k-mer table (`KMER<TAB>COUNT` per line)
    #[arg(short = 'i', long)]
    pub input: String,
    /// Target read files, FASTA or FASTQ, optionally compressed (comma-separated)
    #[arg(short = 'r', long = "reads", value_delimiter = ',', required = true)]
    pub reads: Vec<String>,
    /// Output FASTA; assembly_info.json is written next to it
    #[arg(short = 'o', long)]
    pub output: String,
    /// Shortest contig written
    #[arg(short = 'm', long, default_value = "0")]
    pub min_len: usize,
    /// Suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

pub fn run(args: AssembleArgs) -> Result<()> {
    let config = AssemblyConfig {
        k: args.klen,
        kmer_table: args.input,
        reads: args.reads,
        output: PathBuf::from(&args.output),
        min_contig_len: args.min_len,
        cmdline: super::cmdline(),
    };
    config.validate()?;
    info!(
        "Assembling {} with k = {} from {} read file(s)",
        config.kmer_table,
        config.k,
        config.reads.len()
    );
    let progress = super::make_progress_bar(args.quiet)?;
    run_assembly(&config, &progress)?;
    Ok(())
}

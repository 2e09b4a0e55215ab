pub mod assemble;
pub mod exclusive;
pub mod spectrum;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Parser, Debug)]
#[command(name = "exseq-rs")]
#[command(about = "Differential assembly of target-exclusive sequence")]
#[command(version = crate::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Spectrum(spectrum::SpectrumArgs),
    Exclusive(exclusive::ExclusiveArgs),
    Assemble(assemble::AssembleArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Spectrum(args) => spectrum::run(args),
        Commands::Exclusive(args) => exclusive::run(args),
        Commands::Assemble(args) => assemble::run(args),
    }
}

/// Command line as typed, for run summaries.
pub(crate) fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

/// Create a read-count spinner (shared across all CLI commands).
pub(crate) fn make_progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(1));
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {human_pos} reads processed ({per_sec})",
    )?);
    pb.enable_steady_tick(Duration::from_millis(1_000));
    Ok(pb)
}

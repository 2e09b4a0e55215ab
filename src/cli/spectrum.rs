//! CLI command printing the spectrum summary of a k-mer table.

use anyhow::Result;
use clap::Args;

use crate::counts::spectrum::Spectrum;

#[derive(Args, Debug)]
pub struct SpectrumArgs {
    /// K-mer table (`KMER<TAB>COUNT` per line)
    #[arg(short = 't', long)]
    pub table: String,
    /// Expected k-mer length; checked on every line when given
    #[arg(short = 'k', long)]
    pub klen: Option<usize>,
    /// Also print the full histogram
    #[arg(long)]
    pub histogram: bool,
}

pub fn run(args: SpectrumArgs) -> Result<()> {
    let spectrum = Spectrum::from_table(&args.table, args.klen)?;
    let summary = spectrum.summary();
    let out = if args.histogram {
        serde_json::json!({
            "summary": summary,
            "histogram": spectrum
                .histogram()
                .iter()
                .map(|(f, n)| [*f, *n])
                .collect::<Vec<_>>(),
        })
    } else {
        serde_json::to_value(summary)?
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

//! Contig FASTA writer.

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::assembly::traverse::Contig;

/// Write every contig of at least `min_len` bases as
/// `>contig_{index} length={len}` with the sequence on one line. Indices
/// count written records from 0. Returns the number written.
pub fn write_contigs<W: Write>(mut out: W, contigs: &[Contig], min_len: usize) -> Result<usize> {
    let mut written = 0usize;
    for contig in contigs.iter().filter(|c| c.seq.len() >= min_len) {
        writeln!(out, ">contig_{} length={}", written, contig.seq.len())?;
        out.write_all(&contig.seq)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

/// Create `path` and write the contigs into it.
pub fn write_contigs_to_path(path: &Path, contigs: &[Contig], min_len: usize) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_contigs(BufWriter::new(file), contigs, min_len)
        .with_context(|| format!("failed to write {}", path.display()))
}

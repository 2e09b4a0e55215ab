//! FASTX reader: wraps `paraseq` for record-set-at-a-time reading.
//!
//! Files are opened through `niffler`, so gzip/zstd/bzip2 input is
//! decompressed transparently, and `paraseq::fastx` detects FASTA versus
//! FASTQ from the first record. Reads are handed to the caller one at a time
//! from a reused record set; nothing beyond one set is buffered.

use anyhow::{Context, Result};
use paraseq::Record;
use paraseq::fastx;
use tracing::debug;

// ---------------------------------------------------------------------------
// ReadSource
// ---------------------------------------------------------------------------

/// Sequential reader over one FASTA/FASTQ file.
pub struct ReadSource {
    path: String,
    reader: fastx::Reader<Box<dyn std::io::Read + Send>>,
    record_set: fastx::RecordSet,
}

impl ReadSource {
    pub fn open(path: &str) -> Result<Self> {
        let reader = fastx::Reader::new(open_with_decompression(path)?)
            .map_err(|e| anyhow::anyhow!("failed to open {}: {}", path, e))?;
        let record_set = reader.new_record_set();
        Ok(Self {
            path: path.to_string(),
            reader,
            record_set,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pass every sequence of the file to `f`, in file order. Returns the
    /// number of records read.
    pub fn for_each_read<F>(&mut self, mut f: F) -> Result<u64>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let mut n = 0u64;
        while self
            .record_set
            .fill(&mut self.reader)
            .with_context(|| format!("failed to read {}", self.path))?
        {
            for rec in self.record_set.iter() {
                let rec = rec.with_context(|| format!("malformed record in {}", self.path))?;
                let seq = rec.seq();
                f(&seq[..])?;
                n += 1;
            }
        }
        Ok(n)
    }
}

/// Stream every read of every file, files in the given order.
pub fn for_each_read<F>(paths: &[String], mut f: F) -> Result<u64>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    if paths.is_empty() {
        anyhow::bail!("no input files specified");
    }
    let mut total = 0u64;
    for path in paths {
        let mut source = ReadSource::open(path)?;
        let n = source.for_each_read(&mut f)?;
        debug!("{}: {} reads", source.path(), n);
        total += n;
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open a single file with automatic decompression (gzip, zstd, etc.).
pub(crate) fn open_with_decompression(path: &str) -> Result<Box<dyn std::io::Read + Send>> {
    let (reader, _format) =
        niffler::send::from_path(path).with_context(|| format!("failed to open {}", path))?;
    Ok(reader)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

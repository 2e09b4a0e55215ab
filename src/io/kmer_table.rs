//! K-mer count tables: one `KMER<TAB>COUNT` pair per line.
//!
//! This is the text dump format of common k-mer counters. Tables may be
//! compressed; blank lines are skipped. Every malformed line is reported with
//! its line number.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::io::fastx::open_with_decompression;
use crate::kmer::{KmerCodec, KmerCounts};

/// One parsed table line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    /// K-mer as written in the table, upper-cased.
    pub kmer: Vec<u8>,
    pub count: u64,
}

/// Line-by-line table reader.
pub struct KmerTableReader {
    path: String,
    reader: Box<dyn BufRead + Send>,
    line: String,
    line_no: usize,
    k: Option<usize>,
}

impl KmerTableReader {
    /// Open a table. With `k` set, every k-mer must have exactly that length.
    pub fn open(path: &str, k: Option<usize>) -> Result<Self> {
        let reader = BufReader::new(open_with_decompression(path)?);
        Ok(Self::from_reader(path, Box::new(reader), k))
    }

    pub fn from_reader(name: &str, reader: Box<dyn BufRead + Send>, k: Option<usize>) -> Self {
        Self {
            path: name.to_string(),
            reader,
            line: String::new(),
            line_no: 0,
            k,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Line number of the last record returned.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Next record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<TableRecord>> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .with_context(|| format!("failed to read {}", self.path))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.line.trim_end();
            if line.is_empty() {
                continue;
            }
            return self.parse(line).map(Some);
        }
    }

    fn parse(&self, line: &str) -> Result<TableRecord> {
        let mut fields = line.split_whitespace();
        let (Some(kmer), Some(count), None) = (fields.next(), fields.next(), fields.next()) else {
            bail!(
                "{}:{}: expected `KMER<TAB>COUNT`, got {:?}",
                self.path,
                self.line_no,
                line
            );
        };
        if let Some(k) = self.k
            && kmer.len() != k
        {
            bail!(
                "{}:{}: k-mer {} has length {}, expected {}",
                self.path,
                self.line_no,
                kmer,
                kmer.len(),
                k
            );
        }
        if !kmer.bytes().all(|b| b"ACGTacgt".contains(&b)) {
            bail!("{}:{}: k-mer {} has non-ACGT bases", self.path, self.line_no, kmer);
        }
        let count = count
            .parse::<u64>()
            .with_context(|| format!("{}:{}: invalid count {:?}", self.path, self.line_no, count))?;
        Ok(TableRecord {
            kmer: kmer.to_ascii_uppercase().into_bytes(),
            count,
        })
    }
}

/// Load a whole table into canonical k-mer counts. Both strands of one k-mer
/// are summed.
pub fn read_kmer_counts(path: &str, codec: KmerCodec) -> Result<KmerCounts> {
    let mut reader = KmerTableReader::open(path, Some(codec.k()))?;
    let mut counts = KmerCounts::default();
    while let Some(rec) = reader.next_record()? {
        let Some((kmer, _)) = codec.canonical_of(&rec.kmer) else {
            bail!("{}:{}: cannot encode k-mer", reader.path(), reader.line_no());
        };
        *counts.entry(kmer).or_insert(0) += rec.count;
    }
    Ok(counts)
}

/// Write canonical counts as a table sorted by k-mer string.
pub fn write_kmer_counts(path: &Path, codec: KmerCodec, counts: &KmerCounts) -> Result<usize> {
    let mut rows: Vec<(Vec<u8>, u64)> = counts
        .iter()
        .map(|(&kmer, &count)| (codec.decode(kmer.as_u64()), count))
        .collect();
    rows.sort_unstable();

    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for (kmer, count) in &rows {
        writer.write_all(kmer)?;
        writeln!(writer, "\t{count}")?;
    }
    writer.flush()?;
    Ok(rows.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! assembly_info.json writer: summary statistics for an assembly run.

use std::path::Path;

use anyhow::{Context, Result};

use crate::assembly::AssemblyStats;

/// Write an assembly_info.json file next to the contigs.
pub fn write_assembly_info(
    path: &Path,
    k: usize,
    stats: &AssemblyStats,
    cmdline: &str,
    elapsed_secs: f64,
) -> Result<()> {
    let threading = &stats.threading;
    let percent_threaded = if threading.reads_seen > 0 {
        (threading.reads_threaded as f64 / threading.reads_seen as f64) * 100.0
    } else {
        0.0
    };

    let info = serde_json::json!({
        "k": k,
        "num_kmers": stats.kmers_in,
        "contraction": stats.contraction,
        "threading": threading,
        "percent_threaded": format!("{:.2}", percent_threaded),
        "traversal": stats.traversal,
        "num_contigs": stats.contigs,
        "num_contigs_written": stats.contigs_written,
        "min_contig_len": stats.min_contig_len,
        "runtime_seconds": format!("{:.2}", elapsed_secs),
        "cmdline": cmdline,
    });

    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &info)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::thread::ThreadingStats;

    #[test]
    fn test_write_assembly_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assembly_info.json");

        let stats = AssemblyStats {
            kmers_in: 1000,
            threading: ThreadingStats {
                reads_seen: 200,
                reads_threaded: 50,
                segments: 60,
                tags_added: 400,
            },
            contigs: 12,
            contigs_written: 3,
            min_contig_len: 100,
            ..Default::default()
        };
        write_assembly_info(&path, 31, &stats, "exseq-rs assemble ...", 4.2).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let val: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(val["k"], 31);
        assert_eq!(val["num_kmers"], 1000);
        assert_eq!(val["threading"]["reads_threaded"], 50);
        assert_eq!(val["percent_threaded"], "25.00");
        assert_eq!(val["num_contigs_written"], 3);
    }
}

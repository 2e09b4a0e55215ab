//! Graph construction from a canonical k-mer → abundance table.

use anyhow::{Result, bail, ensure};
use tracing::info;

use super::DbGraph;
use crate::kmer::codec::{BASES, complement_bits};
use crate::kmer::{KmerCodec, KmerCounts, Orientation};

/// Build the bidirected graph of `counts`.
///
/// Every adjacency is created once, from the k-mer with the larger code, and
/// mirrored onto the smaller one. A k-mer adjacent to itself gets no edge.
///
/// K must be odd: an even K admits k-mers equal to their own reverse
/// complement, whose two ends cannot be told apart.
pub fn build_graph(codec: KmerCodec, counts: &KmerCounts) -> Result<DbGraph> {
    ensure_odd_k(codec.k())?;
    if counts.is_empty() {
        bail!(
            "no k-mers to assemble: target and background are indistinguishable at k = {}",
            codec.k()
        );
    }

    let mut sorted: Vec<_> = counts.iter().map(|(&kmer, &count)| (kmer, count)).collect();
    sorted.sort_unstable_by_key(|&(kmer, _)| kmer);

    let mut graph = DbGraph::with_capacity(codec, sorted.len());
    for &(kmer, count) in &sorted {
        graph.insert_kmer(kmer, count);
    }

    let mut num_junctions = 0usize;
    for &(kmer, _) in &sorted {
        for end in [Orientation::Forward, Orientation::Reverse] {
            let code = codec.oriented(kmer, end);
            let back_base = BASES[complement_bits(codec.first_base(code)) as usize];
            for (bits, &base) in BASES.iter().enumerate() {
                let (nb, nb_end) = codec.canonical(codec.push_base(code, bits as u64));
                if nb >= kmer {
                    continue;
                }
                let Some(to) = graph.node(nb, nb_end) else {
                    continue;
                };
                let Some(from) = graph.node(kmer, end) else {
                    continue;
                };
                if graph.add_edge(from, vec![base]) {
                    num_junctions += 1;
                }
                graph.add_edge(to.other_end(), vec![back_base]);
            }
        }
    }

    info!(
        "Built graph: {} k-mers, {} junctions (k = {})",
        graph.num_kmers(),
        num_junctions,
        codec.k()
    );
    Ok(graph)
}

/// Assembly needs an odd k-mer length.
pub fn ensure_odd_k(k: usize) -> Result<()> {
    ensure!(
        k % 2 == 1,
        "k = {k} is even: assembly needs an odd k-mer length, since even k admits palindromic k-mers"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Unitig compaction.
//!
//! A k-mer is interior when both of its ends carry exactly one edge. Every
//! edge leaving a non-interior k-mer is extended through the chain of
//! interior k-mers it enters, then interior k-mers are dropped. Chains that
//! consist only of interior k-mers (isolated cycles) are dropped as well.

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

use super::{DbGraph, Edge, NodeId};
use crate::kmer::Orientation;

/// Outcome of one contraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContractionStats {
    pub kmers_before: usize,
    pub kmers_after: usize,
    pub edges_rewritten: usize,
    pub longest_edge: usize,
}

/// Walk from `node` along `seq` through interior k-mers and return the
/// concatenated bases up to the first non-interior node.
fn extend_through_chain(graph: &DbGraph, node: NodeId, seq: &[u8]) -> Result<Vec<u8>> {
    let mut out = seq.to_vec();
    let mut cur = graph.dest(node, seq)?;
    let limit = graph.num_kmers();
    let mut steps = 0usize;
    while graph.is_interior(cur) {
        steps += 1;
        if steps > limit {
            bail!(
                "graph invariant violated: chain from {} exceeds {} k-mers",
                String::from_utf8_lossy(&graph.label(node)),
                limit
            );
        }
        let next = &graph.edges(cur)[0].seq;
        out.extend_from_slice(next);
        cur = graph.dest(cur, next)?;
    }
    Ok(out)
}

/// Compact every non-branching chain into a single edge.
pub fn contract(graph: &mut DbGraph) -> Result<ContractionStats> {
    let mut stats = ContractionStats {
        kmers_before: graph.num_kmers(),
        ..Default::default()
    };

    let anchors: Vec<NodeId> = graph.nodes().filter(|&n| !graph.is_interior(n)).collect();

    // Compute every replacement before touching the graph: interior
    // membership must be judged on the uncontracted degrees.
    let mut rewrites: Vec<(NodeId, Vec<Edge>)> = Vec::new();
    for &node in &anchors {
        if graph.degree(node) == 0 {
            continue;
        }
        let mut edges = Vec::with_capacity(graph.degree(node));
        let mut changed = false;
        for edge in graph.edges(node) {
            let seq = extend_through_chain(graph, node, &edge.seq)?;
            changed |= seq.len() != edge.seq.len();
            stats.longest_edge = stats.longest_edge.max(seq.len());
            edges.push(Edge {
                seq,
                support: edge.support.clone(),
            });
        }
        if changed {
            rewrites.push((node, edges));
        }
    }

    stats.edges_rewritten = rewrites.len();
    for (node, edges) in rewrites {
        graph.set_edges(node, edges);
    }

    let interior: Vec<_> = graph
        .nodes()
        .filter(|n| n.end() == Orientation::Forward && graph.is_interior(*n))
        .map(|n| graph.kmer(n))
        .collect();
    for kmer in interior {
        graph.remove_kmer(kmer);
    }

    stats.kmers_after = graph.num_kmers();
    info!(
        "Contracted graph: {} -> {} k-mers, {} edge lists rewritten, longest edge {} bp",
        stats.kmers_before, stats.kmers_after, stats.edges_rewritten, stats.longest_edge
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::build_graph;
    use crate::kmer::{KmerCodec, KmerCounts};

    fn graph_of(k: usize, seqs: &[&[u8]]) -> DbGraph {
        let codec = KmerCodec::new(k).unwrap();
        let mut table = KmerCounts::default();
        for seq in seqs {
            for w in seq.windows(k) {
                table.insert(codec.canonical_of(w).unwrap().0, 2);
            }
        }
        build_graph(codec, &table).unwrap()
    }

    #[test]
    fn test_simple_chain_collapses_to_one_edge() {
        let mut g = graph_of(3, &[b"ATGAA"]);
        let stats = contract(&mut g).unwrap();
        assert_eq!(stats.kmers_before, 3);
        assert_eq!(stats.kmers_after, 2);
        assert!(g.nodes().all(|n| !g.is_interior(n)));
        g.check_invariants().unwrap();

        let codec = *g.codec();
        let (atg, o) = codec.canonical_of(b"ATG").unwrap();
        let start = g.node(atg, o).unwrap();
        assert_eq!(g.edges(start)[0].seq, b"AA".to_vec());
        assert_eq!(g.label(g.edge_dest(start, 0).unwrap()), b"GAA".to_vec());
    }

    #[test]
    fn test_contract_is_idempotent() {
        let mut g = graph_of(5, &[b"ACGTTGCAAGGCTTACCG", b"GCAAGGATTTCAGCA"]);
        contract(&mut g).unwrap();
        let kmers: Vec<_> = g.kmers().collect();
        let edges: Vec<Vec<u8>> = g
            .nodes()
            .flat_map(|n| g.edges(n).iter().map(|e| e.seq.clone()).collect::<Vec<_>>())
            .collect();

        let again = contract(&mut g).unwrap();
        assert_eq!(again.edges_rewritten, 0);
        assert_eq!(again.kmers_before, again.kmers_after);
        assert_eq!(g.kmers().collect::<Vec<_>>(), kmers);
        let edges_again: Vec<Vec<u8>> = g
            .nodes()
            .flat_map(|n| g.edges(n).iter().map(|e| e.seq.clone()).collect::<Vec<_>>())
            .collect();
        assert_eq!(edges, edges_again);
    }

    #[test]
    fn test_branch_keeps_branch_kmers() {
        // shared prefix, then a fork
        let mut g = graph_of(5, &[b"TTACGCATGGAC", b"TTACGCATCCTA"]);
        contract(&mut g).unwrap();
        g.check_invariants().unwrap();
        assert!(g.nodes().all(|n| !g.is_interior(n)));
        // the fork is only a fork on one strand; the other strand sees a merge
        let forks = g.nodes().filter(|&n| g.degree(n) == 2).count();
        assert_eq!(forks, 1);
    }

    #[test]
    fn test_isolated_cycle_is_dropped() {
        // circular sequence: every k-mer has one predecessor and one successor
        let circ = b"CCGTAATGCCTT";
        let mut wrapped = circ.to_vec();
        wrapped.extend_from_slice(&circ[..4]);
        let mut g = graph_of(5, &[wrapped.as_slice()]);
        assert!(g.nodes().all(|n| g.degree(n) == 1));
        let stats = contract(&mut g).unwrap();
        assert_eq!(stats.kmers_after, 0);
    }
}

//! Read-guided contig walks.
//!
//! Walks start at the far end of every dead end, longest anchoring edge
//! first. At a branch the walk follows the edge that keeps the most active
//! reads going; reads join the active set on edges where they start and
//! leave it where they end. Whenever active reads carry the walk across an
//! edge, their tags on that edge are consumed and the walk's completion
//! counter moves on, so a k-mer may be re-entered only under a new counter.
//!
//! Branch choice, highest first:
//!
//! ```text
//! active reads tagged Pass/End  >  Start tags  >  edge length  >  lower destination code
//! ```

use std::cmp::Reverse;

use ahash::AHashMap;
use anyhow::{Result, bail};
use serde::Serialize;
use tracing::debug;

use crate::graph::support::{ReadRole, ReadSet};
use crate::graph::{DbGraph, NodeId};
use crate::kmer::CanonicalKmer;

/// One assembled sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub seq: Vec<u8>,
    /// Dead end the walk started from.
    pub start: CanonicalKmer,
    /// Edges crossed.
    pub edges: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    pub leaves: usize,
    pub walks: usize,
    pub edges_walked: usize,
    pub cycle_stops: usize,
    pub tags_consumed: usize,
}

/// Leaves ordered by the longest edge at their other end, then by k-mer code,
/// `Forward` end first.
fn ordered_leaves(graph: &DbGraph) -> Vec<NodeId> {
    let mut leaves: Vec<NodeId> = graph.nodes().filter(|&n| graph.degree(n) == 0).collect();
    leaves.sort_by_key(|&n| {
        let anchor = graph
            .edges(n.other_end())
            .iter()
            .map(|e| e.seq.len())
            .max()
            .unwrap_or(0);
        (Reverse(anchor), graph.kmer(n), n.end())
    });
    leaves
}

/// Continuing reads, start tags, length, destination, position.
type EdgeScore = (usize, usize, usize, Reverse<CanonicalKmer>, Reverse<usize>);

/// Index and destination of the edge to follow from `node`.
fn choose_edge(graph: &DbGraph, node: NodeId, active: &ReadSet) -> Result<(usize, NodeId)> {
    let mut best: Option<(EdgeScore, usize, NodeId)> = None;
    for (idx, edge) in graph.edges(node).iter().enumerate() {
        let dest = graph.dest(node, &edge.seq)?;
        let key = (
            edge.support.continuing_count(active),
            edge.support.reads_with(ReadRole::Start).count(),
            edge.seq.len(),
            Reverse(graph.kmer(dest)),
            Reverse(idx),
        );
        if best.as_ref().is_none_or(|(b, _, _)| key > *b) {
            best = Some((key, idx, dest));
        }
    }
    match best {
        Some((_, idx, dest)) => Ok((idx, dest)),
        None => bail!("node {} has no edge to follow", graph.kmer(node)),
    }
}

/// Walk the graph from every dead end and collect the contigs, in walk order.
///
/// Support tags are consumed as the walks proceed.
pub fn traverse(graph: &mut DbGraph) -> Result<(Vec<Contig>, TraversalStats)> {
    let leaves = ordered_leaves(graph);
    let mut stats = TraversalStats {
        leaves: leaves.len(),
        ..Default::default()
    };
    let mut visited: AHashMap<CanonicalKmer, u32> = AHashMap::with_capacity(graph.num_kmers());
    let mut contigs = Vec::new();
    let mut active = ReadSet::default();

    for leaf in leaves {
        if visited.contains_key(&graph.kmer(leaf)) {
            continue;
        }
        let start = leaf.other_end();
        let mut cur = start;
        let mut seq = graph.label(start);
        let mut counter = 0u32;
        let mut edges = 0usize;
        active.clear();

        loop {
            let kmer = graph.kmer(cur);
            if visited.get(&kmer) == Some(&counter) {
                stats.cycle_stops += 1;
                break;
            }
            visited.insert(kmer, counter);
            if graph.degree(cur) == 0 {
                break;
            }

            let (idx, dest) = choose_edge(graph, cur, &active)?;
            let edge = &mut graph.edges_mut(cur)[idx];
            let continuing: ReadSet = edge.support.continuing(&active).collect();
            let starts: Vec<_> = edge.support.reads_with(ReadRole::Start).collect();
            let ends: Vec<_> = edge.support.reads_with(ReadRole::End).collect();
            if !continuing.is_empty() {
                counter += 1;
                stats.tags_consumed += edge.support.retire(&continuing);
            }
            active.extend(starts);
            for read in ends {
                active.remove(&read);
            }

            seq.extend_from_slice(&edge.seq);
            edges += 1;
            cur = dest;
        }

        debug!(
            "walk from {} (abundance {}) crossed {} edges, {} bp",
            graph.kmer(start),
            graph.abundance(start),
            edges,
            seq.len()
        );
        stats.walks += 1;
        stats.edges_walked += edges;
        contigs.push(Contig {
            seq,
            start: graph.kmer(start),
            edges,
        });
    }

    Ok((contigs, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

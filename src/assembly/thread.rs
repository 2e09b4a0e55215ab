//! Threading reads onto the contracted graph.
//!
//! A read is reduced to the graph nodes its K windows hit (its hops). Each
//! pair of consecutive hops must be joined by an edge whose first base is the
//! read base following the first hop's window and whose destination is the
//! second hop; a missing join splits the read into independent segments. At
//! the read boundaries one extra edge is recovered when the adjacent read base
//! selects one.
//!
//! Every transition of a segment is tagged with the read: the first one with
//! `Start`, the last with `End`, the rest with `Pass`. The mirror edge gets the
//! mirrored role so a walk on the opposite strand sees the same evidence.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::graph::support::{ReadId, ReadRole};
use crate::graph::{DbGraph, NodeId};
use crate::kmer::codec::{base_bits, complement_base};
use crate::kmer::iter::CanonicalKmerIter;

/// One traversed edge: `idx`-th edge of `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    node: NodeId,
    idx: usize,
}

#[derive(Debug, Clone, Copy)]
struct Hop {
    pos: usize,
    node: NodeId,
}

/// What happened to one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// The read crossed at least one edge.
    Threaded {
        read: ReadId,
        segments: usize,
        transitions: usize,
    },
    /// No usable transition; no id was consumed.
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThreadingStats {
    pub reads_seen: u64,
    pub reads_threaded: u64,
    pub segments: u64,
    pub tags_added: u64,
}

/// Assigns read ids and applies support tags, one read at a time.
#[derive(Debug, Default)]
pub struct ReadThreader {
    next_id: u32,
    stats: ThreadingStats,
    hops: Vec<Hop>,
    segments: Vec<Vec<Transition>>,
}

impl ReadThreader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ThreadingStats {
        self.stats
    }

    /// Thread one read and tag the edges it crosses.
    pub fn thread(&mut self, graph: &mut DbGraph, read: &[u8]) -> Result<ThreadOutcome> {
        self.stats.reads_seen += 1;
        self.collect_hops(graph, read);
        if self.hops.is_empty() {
            return Ok(ThreadOutcome::Dropped);
        }
        self.collect_segments(graph, read)?;

        let transitions: usize = self.segments.iter().map(Vec::len).sum();
        if transitions == 0 {
            return Ok(ThreadOutcome::Dropped);
        }

        let id = ReadId(self.next_id);
        self.next_id = match self.next_id.checked_add(1) {
            Some(next) => next,
            None => bail!("read id space exhausted after {} threaded reads", u32::MAX),
        };

        let mut segments = 0usize;
        for segment in &self.segments {
            if segment.is_empty() {
                continue;
            }
            segments += 1;
            let last = segment.len() - 1;
            for (i, t) in segment.iter().enumerate() {
                let roles: &[ReadRole] = match (i == 0, i == last) {
                    (true, true) => &[ReadRole::Start, ReadRole::End],
                    (true, false) => &[ReadRole::Start],
                    (false, true) => &[ReadRole::End],
                    (false, false) => &[ReadRole::Pass],
                };
                let (mirror_node, mirror_idx) = graph.find_mirror(t.node, t.idx)?;
                for &role in roles {
                    if graph.edges_mut(t.node)[t.idx].support.add(id, role) {
                        self.stats.tags_added += 1;
                    }
                    if graph.edges_mut(mirror_node)[mirror_idx]
                        .support
                        .add(id, role.mirrored())
                    {
                        self.stats.tags_added += 1;
                    }
                }
            }
        }

        self.stats.reads_threaded += 1;
        self.stats.segments += segments as u64;
        Ok(ThreadOutcome::Threaded {
            read: id,
            segments,
            transitions,
        })
    }

    fn collect_hops(&mut self, graph: &DbGraph, read: &[u8]) {
        self.hops.clear();
        for hit in CanonicalKmerIter::new(*graph.codec(), read) {
            if let Some(node) = graph.node(hit.kmer, hit.orientation) {
                self.hops.push(Hop {
                    pos: hit.pos,
                    node,
                });
            }
        }
    }

    fn collect_segments(&mut self, graph: &DbGraph, read: &[u8]) -> Result<()> {
        let k = graph.k();
        self.segments.clear();
        let mut current: Vec<Transition> = Vec::new();

        let first = self.hops[0];
        let back = first.node.other_end();
        if first.pos > 0
            && base_bits(read[first.pos - 1]).is_some()
            && let Some(idx) = graph.edge_starting_with(back, complement_base(read[first.pos - 1]))
        {
            let (node, idx) = graph.find_mirror(back, idx)?;
            current.push(Transition { node, idx });
        }

        for pair in self.hops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let joined = match graph.edge_starting_with(a.node, read[a.pos + k]) {
                Some(idx) if graph.edge_dest(a.node, idx)? == b.node => Some(idx),
                _ => None,
            };
            match joined {
                Some(idx) => current.push(Transition { node: a.node, idx }),
                None => self.segments.push(std::mem::take(&mut current)),
            }
        }

        let last = self.hops[self.hops.len() - 1];
        let next = last.pos + k;
        if next < read.len()
            && base_bits(read[next]).is_some()
            && let Some(idx) = graph.edge_starting_with(last.node, read[next])
        {
            current.push(Transition {
                node: last.node,
                idx,
            });
        }
        self.segments.push(current);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::build_graph;
    use crate::graph::contract::contract;
    use crate::kmer::{KmerCodec, KmerCounts};

    fn contracted(k: usize, seqs: &[&[u8]]) -> DbGraph {
        let codec = KmerCodec::new(k).unwrap();
        let mut table = KmerCounts::default();
        for seq in seqs {
            for w in seq.windows(k) {
                table.insert(codec.canonical_of(w).unwrap().0, 2);
            }
        }
        let mut g = build_graph(codec, &table).unwrap();
        contract(&mut g).unwrap();
        g
    }

    fn tags_of(g: &DbGraph) -> Vec<(Vec<u8>, Vec<u8>, ReadRole)> {
        let mut out = Vec::new();
        for n in g.nodes() {
            for e in g.edges(n) {
                for t in e.support.tags() {
                    out.push((g.label(n), e.seq.clone(), t.role));
                }
            }
        }
        out.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        out
    }

    #[test]
    fn test_chain_read_tags_edge_and_mirror() {
        let mut g = contracted(3, &[b"ATGAA"]);
        let mut threader = ReadThreader::new();
        let outcome = threader.thread(&mut g, b"ATGAA").unwrap();
        assert_eq!(
            outcome,
            ThreadOutcome::Threaded {
                read: ReadId(0),
                segments: 1,
                transitions: 1
            }
        );
        let tags = tags_of(&g);
        // ATG -[AA]-> GAA and its mirror TTC -[AT]-> CAT, each Start and End
        assert_eq!(tags.len(), 4);
        assert!(tags.iter().any(|t| t.0 == b"ATG" && t.1 == b"AA"));
        assert!(tags.iter().any(|t| t.0 == b"TTC" && t.1 == b"AT"));
    }

    #[test]
    fn test_reverse_strand_read_threads_too() {
        let mut g = contracted(3, &[b"ATGAA"]);
        let mut threader = ReadThreader::new();
        let outcome = threader.thread(&mut g, b"TTCAT").unwrap();
        assert!(matches!(outcome, ThreadOutcome::Threaded { transitions: 1, .. }));
        assert_eq!(tags_of(&g).len(), 4);
    }

    #[test]
    fn test_boundary_extension_recovers_edges() {
        // only the branch k-mers survive contraction; a read covering one of
        // them still crosses the adjacent edges through its flanking bases
        let mut g = contracted(5, &[b"TTACGCATGGAC", b"TTACGCATCCTA"]);
        let mut threader = ReadThreader::new();
        let outcome = threader.thread(&mut g, b"ACGCATC").unwrap();
        let ThreadOutcome::Threaded { transitions, .. } = outcome else {
            panic!("read should thread");
        };
        assert_eq!(transitions, 2);
    }

    #[test]
    fn test_unjoined_hops_split_the_read() {
        let stem = b"GTATTCCTAACGGAGC";
        let mut sx = stem.to_vec();
        sx.extend_from_slice(b"ATAAAT");
        let mut sy = stem.to_vec();
        sy.extend_from_slice(b"CCCACC");
        let mut g = contracted(5, &[sx.as_slice(), sy.as_slice()]);

        // the fork k-mer GGAGC twice; the G after the first copy starts no
        // edge, so the read splits there
        let mut threader = ReadThreader::new();
        let outcome = threader.thread(&mut g, b"CTAACGGAGCGGAGCCCCACC").unwrap();
        assert_eq!(
            outcome,
            ThreadOutcome::Threaded {
                read: ReadId(0),
                segments: 2,
                transitions: 2
            }
        );
        assert_eq!(threader.stats().segments, 2);

        // each segment is a single transition: Start and End on the edge,
        // the mirrored pair on its mirror
        let tags = tags_of(&g);
        assert_eq!(tags.len(), 8);
        for (from, seq) in [
            (&b"GTATT"[..], &b"CCTAACGGAGC"[..]),
            (&b"GCTCC"[..], &b"GTTAGGAATAC"[..]),
            (&b"GGAGC"[..], &b"CCCACC"[..]),
            (&b"GGTGG"[..], &b"GGCTCC"[..]),
        ] {
            let mut roles: Vec<ReadRole> = tags
                .iter()
                .filter(|t| t.0 == from && t.1 == seq)
                .map(|t| t.2)
                .collect();
            roles.sort_by_key(|r| *r as u8);
            assert_eq!(roles, vec![ReadRole::Start, ReadRole::End]);
        }
    }

    #[test]
    fn test_read_without_hops_is_dropped() {
        let mut g = contracted(3, &[b"ATGAA"]);
        let mut threader = ReadThreader::new();
        assert_eq!(
            threader.thread(&mut g, b"CCCCCC").unwrap(),
            ThreadOutcome::Dropped
        );
        assert_eq!(
            threader.thread(&mut g, b"AT").unwrap(),
            ThreadOutcome::Dropped
        );
        // ids are only consumed by threaded reads
        let outcome = threader.thread(&mut g, b"ATGAA").unwrap();
        assert!(matches!(outcome, ThreadOutcome::Threaded { read: ReadId(0), .. }));
        let stats = threader.stats();
        assert_eq!(stats.reads_seen, 3);
        assert_eq!(stats.reads_threaded, 1);
    }
}

//! Bidirected de Bruijn graph arena.
//!
//! Every canonical k-mer occupies one slot holding both of its ends. A node
//! is a `(slot, end)` pair packed into a [`NodeId`]:
//!
//! ```text
//! NodeId = (slot << 1) | end      end: 0 = Forward, 1 = Reverse
//! ```
//!
//! The `Forward` end holds edges that extend the canonical k-mer to the
//! right; the `Reverse` end holds edges that extend its reverse complement to
//! the right. An edge stores only the bases it appends, written in the frame
//! of its source end, so the destination is always derivable: append the
//! sequence to the source's oriented k-mer, keep the last K bases and
//! canonicalize. The destination end is the strand that window was read on.
//!
//! Each edge `n -> m` has a mirror `m.other_end() -> n.other_end()` spelling
//! the same junction on the opposite strand.

pub mod build;
pub mod contract;
pub mod support;

use ahash::AHashMap;
use anyhow::{Result, bail};

use crate::kmer::codec::{base_bits, reverse_complement_seq};
use crate::kmer::{CanonicalKmer, KmerCodec, Orientation};

use self::support::ReadSupport;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Opaque identity of one end of one k-mer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    #[inline]
    fn new(slot: usize, end: Orientation) -> Self {
        Self(((slot as u64) << 1) | end.index() as u64)
    }

    #[inline]
    pub fn slot(self) -> usize {
        (self.0 >> 1) as usize
    }

    #[inline]
    pub fn end(self) -> Orientation {
        Orientation::from_index((self.0 & 1) as usize)
    }

    /// The opposite end of the same k-mer.
    #[inline]
    pub fn other_end(self) -> Self {
        Self(self.0 ^ 1)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Edge / slot records
// ---------------------------------------------------------------------------

/// An outgoing edge of one node end.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Bases appended to the source's oriented k-mer (upper-case ACGT).
    pub seq: Vec<u8>,
    pub support: ReadSupport,
}

impl Edge {
    pub fn new(seq: Vec<u8>) -> Self {
        Self {
            seq,
            support: ReadSupport::default(),
        }
    }

    /// First appended base; edges are never empty.
    #[inline]
    pub fn first_base(&self) -> u8 {
        self.seq[0]
    }
}

#[derive(Debug)]
struct KmerSlot {
    kmer: CanonicalKmer,
    abundance: u64,
    ends: [Vec<Edge>; 2],
    live: bool,
}

// ---------------------------------------------------------------------------
// DbGraph
// ---------------------------------------------------------------------------

/// Arena of k-mer slots plus a k-mer → slot index.
#[derive(Debug)]
pub struct DbGraph {
    codec: KmerCodec,
    slots: Vec<KmerSlot>,
    lookup: AHashMap<CanonicalKmer, usize>,
}

impl DbGraph {
    pub fn new(codec: KmerCodec) -> Self {
        Self {
            codec,
            slots: Vec::new(),
            lookup: AHashMap::new(),
        }
    }

    pub fn with_capacity(codec: KmerCodec, capacity: usize) -> Self {
        Self {
            codec,
            slots: Vec::with_capacity(capacity),
            lookup: AHashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn codec(&self) -> &KmerCodec {
        &self.codec
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.codec.k()
    }

    /// Add a k-mer with both of its ends. Returns the `Forward` end; an
    /// existing k-mer keeps its slot and abundance.
    pub fn insert_kmer(&mut self, kmer: CanonicalKmer, abundance: u64) -> NodeId {
        if let Some(&slot) = self.lookup.get(&kmer) {
            return NodeId::new(slot, Orientation::Forward);
        }
        let slot = self.slots.len();
        self.slots.push(KmerSlot {
            kmer,
            abundance,
            ends: [Vec::new(), Vec::new()],
            live: true,
        });
        self.lookup.insert(kmer, slot);
        NodeId::new(slot, Orientation::Forward)
    }

    /// Remove a k-mer and both of its ends. The slot is tombstoned.
    pub fn remove_kmer(&mut self, kmer: CanonicalKmer) -> bool {
        let Some(slot) = self.lookup.remove(&kmer) else {
            return false;
        };
        let rec = &mut self.slots[slot];
        rec.live = false;
        rec.ends = [Vec::new(), Vec::new()];
        true
    }

    #[inline]
    pub fn contains(&self, kmer: CanonicalKmer) -> bool {
        self.lookup.contains_key(&kmer)
    }

    /// Node for an end of a live k-mer.
    #[inline]
    pub fn node(&self, kmer: CanonicalKmer, end: Orientation) -> Option<NodeId> {
        self.lookup.get(&kmer).map(|&slot| NodeId::new(slot, end))
    }

    #[inline]
    pub fn kmer(&self, node: NodeId) -> CanonicalKmer {
        self.slots[node.slot()].kmer
    }

    #[inline]
    pub fn abundance(&self, node: NodeId) -> u64 {
        self.slots[node.slot()].abundance
    }

    #[inline]
    pub fn is_live(&self, node: NodeId) -> bool {
        self.slots.get(node.slot()).is_some_and(|s| s.live)
    }

    /// Raw code of the k-mer as read from this end.
    #[inline]
    pub fn oriented(&self, node: NodeId) -> u64 {
        self.codec.oriented(self.kmer(node), node.end())
    }

    /// Oriented k-mer as ASCII.
    pub fn label(&self, node: NodeId) -> Vec<u8> {
        self.codec.decode(self.oriented(node))
    }

    #[inline]
    pub fn edges(&self, node: NodeId) -> &[Edge] {
        &self.slots[node.slot()].ends[node.end().index()]
    }

    #[inline]
    pub(crate) fn edges_mut(&mut self, node: NodeId) -> &mut Vec<Edge> {
        &mut self.slots[node.slot()].ends[node.end().index()]
    }

    #[inline]
    pub fn degree(&self, node: NodeId) -> usize {
        self.edges(node).len()
    }

    /// Both ends carry exactly one edge.
    #[inline]
    pub fn is_interior(&self, node: NodeId) -> bool {
        self.degree(node) == 1 && self.degree(node.other_end()) == 1
    }

    /// Append an edge unless this end already has one with the same bases.
    pub(crate) fn add_edge(&mut self, node: NodeId, seq: Vec<u8>) -> bool {
        let edges = self.edges_mut(node);
        if edges.iter().any(|e| e.seq == seq) {
            return false;
        }
        edges.push(Edge::new(seq));
        true
    }

    /// Replace the whole edge list of one end.
    pub(crate) fn set_edges(&mut self, node: NodeId, edges: Vec<Edge>) {
        *self.edges_mut(node) = edges;
    }

    /// Number of live k-mers.
    #[inline]
    pub fn num_kmers(&self) -> usize {
        self.lookup.len()
    }

    /// Total edge count over all ends (each junction counted once per strand).
    pub fn num_edges(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.live)
            .map(|s| s.ends[0].len() + s.ends[1].len())
            .sum()
    }

    /// Live k-mers in slot order.
    pub fn kmers(&self) -> impl Iterator<Item = CanonicalKmer> + '_ {
        self.slots.iter().filter(|s| s.live).map(|s| s.kmer)
    }

    /// Every end of every live k-mer, in slot order, `Forward` first.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .flat_map(|(slot, _)| {
                [
                    NodeId::new(slot, Orientation::Forward),
                    NodeId::new(slot, Orientation::Reverse),
                ]
            })
    }

    // -----------------------------------------------------------------------
    // Edge geometry
    // -----------------------------------------------------------------------

    /// Node reached by appending `seq` to the oriented k-mer of `node`.
    pub fn dest(&self, node: NodeId, seq: &[u8]) -> Result<NodeId> {
        let mut code = self.oriented(node);
        for &b in seq {
            let Some(bits) = base_bits(b) else {
                bail!(
                    "graph invariant violated: edge of {} carries non-ACGT base {:?}",
                    self.kmer(node),
                    b as char
                );
            };
            code = self.codec.push_base(code, bits);
        }
        let (kmer, end) = self.codec.canonical(code);
        match self.node(kmer, end) {
            Some(dest) => Ok(dest),
            None => bail!(
                "graph invariant violated: destination {} of edge from {} is missing",
                String::from_utf8_lossy(&self.codec.decode(code)),
                String::from_utf8_lossy(&self.label(node)),
            ),
        }
    }

    /// Destination of the `idx`-th edge of `node`.
    #[inline]
    pub fn edge_dest(&self, node: NodeId, idx: usize) -> Result<NodeId> {
        self.dest(node, &self.edges(node)[idx].seq)
    }

    /// Bases of the mirror of an edge `node --seq-->`: the reverse complement
    /// of the first `seq.len()` bases of `oriented(node) ++ seq`.
    pub fn mirror_seq(&self, node: NodeId, seq: &[u8]) -> Vec<u8> {
        let mut path = self.label(node);
        path.extend_from_slice(seq);
        path.truncate(seq.len());
        reverse_complement_seq(&path)
    }

    /// Locate the mirror of the `idx`-th edge of `node` as `(node, index)`.
    pub fn find_mirror(&self, node: NodeId, idx: usize) -> Result<(NodeId, usize)> {
        let seq = &self.edges(node)[idx].seq;
        let back = self.dest(node, seq)?.other_end();
        let mirror = self.mirror_seq(node, seq);
        match self.edges(back).iter().position(|e| e.seq == mirror) {
            Some(pos) => Ok((back, pos)),
            None => bail!(
                "graph invariant violated: edge {} -[{}]-> has no mirror",
                String::from_utf8_lossy(&self.label(node)),
                String::from_utf8_lossy(seq),
            ),
        }
    }

    /// Index of the first edge of `node` whose first base is `base`.
    pub fn edge_starting_with(&self, node: NodeId, base: u8) -> Option<usize> {
        let base = base.to_ascii_uppercase();
        self.edges(node).iter().position(|e| e.first_base() == base)
    }

    /// Check that every edge has a live destination and a mirror.
    pub fn check_invariants(&self) -> Result<()> {
        for node in self.nodes() {
            for idx in 0..self.degree(node) {
                self.find_mirror(node, idx)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kmer(codec: &KmerCodec, s: &[u8]) -> (CanonicalKmer, Orientation) {
        codec.canonical_of(s).unwrap()
    }

    #[test]
    fn test_node_id_packing() {
        let n = NodeId::new(7, Orientation::Reverse);
        assert_eq!(n.slot(), 7);
        assert_eq!(n.end(), Orientation::Reverse);
        assert_eq!(n.other_end().end(), Orientation::Forward);
        assert_eq!(n.other_end().other_end(), n);
        assert_eq!(n.as_u64(), 15);
    }

    #[test]
    fn test_insert_and_remove() {
        let codec = KmerCodec::new(3).unwrap();
        let mut g = DbGraph::new(codec);
        let (atg, _) = kmer(&codec, b"ATG");
        let n = g.insert_kmer(atg, 4);
        assert_eq!(g.insert_kmer(atg, 9), n);
        assert_eq!(g.abundance(n), 4);
        assert_eq!(g.num_kmers(), 1);
        assert!(g.remove_kmer(atg));
        assert!(!g.remove_kmer(atg));
        assert!(!g.is_live(n));
        assert_eq!(g.nodes().count(), 0);
    }

    #[test]
    fn test_dest_and_mirror_seq() {
        let codec = KmerCodec::new(3).unwrap();
        let mut g = DbGraph::new(codec);
        let (atg, atg_o) = kmer(&codec, b"ATG");
        let (tga, tga_o) = kmer(&codec, b"TGA");
        g.insert_kmer(atg, 1);
        g.insert_kmer(tga, 1);

        let from = g.node(atg, atg_o).unwrap();
        let to = g.dest(from, b"A").unwrap();
        assert_eq!(to, g.node(tga, tga_o).unwrap());
        assert_eq!(g.label(to), b"TGA".to_vec());

        // ATG + A read backwards: TCA + T
        assert_eq!(g.mirror_seq(from, b"A"), b"T".to_vec());
        assert_eq!(g.label(to.other_end()), b"TCA".to_vec());
        assert_eq!(g.dest(to.other_end(), b"T").unwrap(), from.other_end());
    }

    #[test]
    fn test_missing_destination_is_invariant_error() {
        let codec = KmerCodec::new(3).unwrap();
        let mut g = DbGraph::new(codec);
        let (atg, atg_o) = kmer(&codec, b"ATG");
        g.insert_kmer(atg, 1);
        let n = g.node(atg, atg_o).unwrap();
        let err = g.dest(n, b"C").unwrap_err().to_string();
        assert!(err.starts_with("graph invariant violated"), "{err}");

        g.add_edge(n, b"C".to_vec());
        assert!(g.check_invariants().is_err());
    }

    #[test]
    fn test_add_edge_deduplicates() {
        let codec = KmerCodec::new(3).unwrap();
        let mut g = DbGraph::new(codec);
        let (atg, _) = kmer(&codec, b"ATG");
        let n = g.insert_kmer(atg, 1);
        assert!(g.add_edge(n, b"A".to_vec()));
        assert!(!g.add_edge(n, b"A".to_vec()));
        assert_eq!(g.degree(n), 1);
        assert_eq!(g.edge_starting_with(n, b'a'), Some(0));
        assert_eq!(g.edge_starting_with(n, b'C'), None);
    }
}

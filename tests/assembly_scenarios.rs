//! End-to-end assembly scenarios on small hand-built k-mer sets.

use exseq_rs::assembly::assemble;
use exseq_rs::assembly::thread::ReadThreader;
use exseq_rs::assembly::traverse::traverse;
use exseq_rs::graph::DbGraph;
use exseq_rs::graph::build::build_graph;
use exseq_rs::graph::contract::contract;
use exseq_rs::kmer::{KmerCodec, KmerCounts};

fn counts_of(codec: &KmerCodec, seqs: &[&str]) -> KmerCounts {
    let mut counts = KmerCounts::default();
    for seq in seqs {
        for w in seq.as_bytes().windows(codec.k()) {
            *counts.entry(codec.canonical_of(w).unwrap().0).or_insert(0) += 1;
        }
    }
    counts
}

fn contracted(codec: KmerCodec, seqs: &[&str]) -> DbGraph {
    let mut g = build_graph(codec, &counts_of(&codec, seqs)).unwrap();
    contract(&mut g).unwrap();
    g
}

fn as_strings(contigs: &[exseq_rs::assembly::traverse::Contig]) -> Vec<String> {
    contigs
        .iter()
        .map(|c| String::from_utf8(c.seq.clone()).unwrap())
        .collect()
}

#[test]
fn simple_chain_assembles_to_one_contig() {
    let codec = KmerCodec::new(3).unwrap();
    let counts = counts_of(&codec, &["ATG", "TGA", "GAA"]);
    let reads: [&[u8]; 1] = [b"ATGAA"];
    let (contigs, stats) = assemble(codec, &counts, reads).unwrap();
    assert_eq!(as_strings(&contigs), vec!["ATGAA"]);
    assert_eq!(stats.contraction.kmers_after, 2);
}

#[test]
fn read_support_selects_branch() {
    let codec = KmerCodec::new(5).unwrap();
    let stem = "GTATTCCTAACGGAGC";
    let x = format!("{stem}ATAAAT");
    let y = format!("{stem}CCCACC");

    // a short read spanning only the fork and the start of Y
    let reads: [&[u8]; 1] = [b"CGGAGCCCCA"];
    let counts = counts_of(&codec, &[&x, &y]);
    let (contigs, _) = assemble(codec, &counts, reads).unwrap();
    assert_eq!(contigs[0].seq, y.as_bytes().to_vec());

    let reads: [&[u8]; 1] = [x.as_bytes()];
    let (contigs, _) = assemble(codec, &counts, reads).unwrap();
    assert_eq!(contigs[0].seq, x.as_bytes().to_vec());
}

#[test]
fn contracted_graph_stays_bidirected() {
    let codec = KmerCodec::new(7).unwrap();
    let g = contracted(
        codec,
        &[
            "ACGTTGCAAGGCTTACCGATGCATTACGGATCCA",
            "TTACCGATGCATTGGCAAGCTTTAGA",
            "GGTCCATTCGATCGGATCCATTACGG",
        ],
    );
    g.check_invariants().unwrap();
    for n in g.nodes() {
        assert!(g.is_live(n.other_end()));
        assert!(!g.is_interior(n));
    }
}

#[test]
fn traversal_terminates_on_cycles() {
    // a tail running into a loop: the loop closes on its first k-mer
    let codec = KmerCodec::new(5).unwrap();
    let tail = "TGTAGGTGCT";
    let cycle = "AATCGACTATGC";
    let lollipop = format!("{tail}{cycle}{}", &cycle[..4]);

    let mut g = contracted(codec, &[&lollipop]);
    assert_eq!(g.num_kmers(), 2);
    let (contigs, stats) = traverse(&mut g).unwrap();
    assert_eq!(as_strings(&contigs), vec![format!("{tail}{cycle}AATCG")]);
    assert_eq!(stats.cycle_stops, 1);

    // reads looping several times let the walk go round once more, then stop
    let mut g = contracted(codec, &[&lollipop]);
    let mut threader = ReadThreader::new();
    let read = format!("{tail}{cycle}{cycle}{cycle}{}", &cycle[..4]);
    threader.thread(&mut g, read.as_bytes()).unwrap();
    let (contigs, _) = traverse(&mut g).unwrap();
    assert_eq!(contigs.len(), 1);
    assert_eq!(contigs[0].seq, format!("{tail}{cycle}{cycle}AATCG").into_bytes());
}

#[test]
fn unrelated_reads_fail_cleanly() {
    let codec = KmerCodec::new(5).unwrap();
    let counts = counts_of(&codec, &["GTATTCCTAACGGAGCATAAAT"]);
    let reads: [&[u8]; 2] = [b"CCCCCCCCCC", b"NNNNNNNN"];
    let err = assemble(codec, &counts, reads).unwrap_err();
    assert!(err.to_string().contains("no read threads onto the graph"));
}

#[test]
fn even_k_is_rejected_and_odd_k_keeps_sequence_whole() {
    // the middle 4-mer ACGT is its own reverse complement
    let seq = "TTGACGTAA";
    let reads: [&[u8]; 1] = [seq.as_bytes()];

    let codec = KmerCodec::new(4).unwrap();
    let counts = counts_of(&codec, &[seq]);
    let err = assemble(codec, &counts, reads).unwrap_err();
    assert!(err.to_string().contains("even"), "{err}");

    let codec = KmerCodec::new(5).unwrap();
    let counts = counts_of(&codec, &[seq]);
    let (contigs, _) = assemble(codec, &counts, reads).unwrap();
    // one contig, reported on the strand its leaf ordering picks
    assert_eq!(as_strings(&contigs), vec!["TTACGTCAA"]);
}

pub mod assembly_info;
pub mod fasta;
pub mod fastx;
pub mod kmer_table;

pub mod assembly;
pub mod cli;
pub mod counts;
pub mod graph;
pub mod io;
pub mod kmer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

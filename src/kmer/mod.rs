pub mod codec;
pub mod filter;
pub mod iter;

pub use codec::{CanonicalKmer, KmerCodec, Orientation};

/// Canonical k-mer → abundance.
pub type KmerCounts = ahash::AHashMap<CanonicalKmer, u64>;

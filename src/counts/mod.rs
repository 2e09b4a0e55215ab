//! K-mer table analysis ahead of assembly: spectrum thresholds, exclusive
//! k-mer selection and read-driven extension of the exclusive set.

pub mod exclusive;
pub mod rescan;
pub mod spectrum;

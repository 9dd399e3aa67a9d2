//! Suffix-array back-end.
//!
//! The suffix array is built over the raw bytes of the token stream, so
//! every byte offset is a suffix — but only even offsets are
//! token-aligned. Persisted arrays keep just the even offsets; queries
//! over them count token-aligned occurrences directly.
//!
//! - `builder`: parallel construction of the unaligned byte-level array
//! - `writer`: even-offset filtering, chunk base offsets, path manifest
//! - `reader`: in-memory / mmapped access and the range-search kernel

pub mod builder;
pub mod reader;
pub mod writer;

pub use builder::build_suffix_array;
pub use reader::{MultiSa, SaData};
pub use writer::{write_chunk_manifest, write_suffix_array_chunk};

/// Manifest file listing SA chunk paths in order.
pub const SA_PATHS_FILENAME: &str = "suffix_array_paths.txt";

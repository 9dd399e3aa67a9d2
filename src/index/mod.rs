//! Index back-ends over the tokenized corpus.
//!
//! Two interchangeable structures answer the same question — how often
//! does this token sequence occur, and what follows it:
//!
//! - [`sa`] - byte-level suffix array with binary-search range queries
//! - [`fm`] - FM-index (BWT + wavelet matrix) with backward search
//!
//! ## On-disk layout
//!
//! ```text
//! out_dir/
//! ├── data.bin                 # token byte stream, sentinel-terminated
//! ├── suffix_array_paths.txt   # SA chunk manifest
//! ├── suffix_array_<k>.bin     # per-chunk even offsets, i64 LE
//! ├── bwttree.bin              # wavelet matrix
//! ├── counts.bin               # 65,536 x u64 symbol totals
//! └── cache.bin                # gzip'd 2-gram bitmap
//! ```

pub mod fm;
pub mod sa;

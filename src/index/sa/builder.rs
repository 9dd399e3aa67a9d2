//! Suffix-array builder.
//!
//! Sorts every byte offset of a chunk by suffix comparison. Comparisons
//! run to the end of the chunk: the resulting order is load-bearing for
//! occurrence counting, so no bounded-prefix shortcut is taken.

use rayon::prelude::*;

/// Threshold above which sorting goes parallel.
const PAR_SORT_MIN: usize = 100_000;

/// Build the unaligned byte-level suffix array of `text`.
///
/// Offsets cover every byte position, odd ones included; the writer
/// filters to token-aligned entries.
pub fn build_suffix_array(text: &[u8]) -> Vec<u64> {
    let n = text.len();
    let mut sa: Vec<u64> = (0..n as u64).collect();

    if n > PAR_SORT_MIN {
        sa.par_sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
    } else {
        sa.sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
    }

    sa
}

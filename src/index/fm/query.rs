//! FM-index query kernel.
//!
//! Backward search over the BWT maintains a half-open range `[start, end)`
//! of suffix-array rows whose suffixes begin with the pattern built so
//! far. Prepending symbol `c` maps the range through
//! `cum[c] + rank(·, c)`; both bounds use the same half-open rank, which
//! keeps the invariant exact (a `rank(end + 1, ·)` variant drifted through
//! one revision of the ancestor of this code and is an off-by-one).

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::FmIndex;
use crate::corpus::codec;

/// Result of a next-token probe: the candidate, its accepted suffix
/// length, and the occurrence count at that length.
pub struct SuffixProbe {
    pub token: u16,
    pub suffix_len: usize,
    pub count: u64,
}

impl FmIndex {
    /// Longest suffix of `symbols` occurring at least `min_matches`
    /// times, with its occurrence count. Symbols are in symbol space
    /// (see `codec::token_to_symbol`); the walk runs right to left.
    pub fn longest_suffix(&self, symbols: &[u16], min_matches: u64) -> (usize, u64) {
        let min_matches = min_matches.max(1);

        let Some((&last, rest)) = symbols.split_last() else {
            return (0, 0);
        };

        let seed_count = self.counts[last as usize];
        if seed_count < min_matches {
            return (0, 0);
        }

        let mut start = self.cum[last as usize] as usize;
        let mut end = start + seed_count as usize;
        let mut longest = 1usize;
        let mut past_count = seed_count;

        // first symbol of the currently matched pattern, for cache probes
        let mut pattern_head = last;

        for &c in rest.iter().rev() {
            if !self.cache().contains(c, pattern_head) {
                break;
            }

            let all = self.wavelet.rank(end, c);
            if all == 0 {
                break;
            }
            let before = self.wavelet.rank(start, c);
            let count = (all - before) as u64;

            start = self.cum[c as usize] as usize + before;
            end = start + (all - before);
            pattern_head = c;

            if count < min_matches {
                // monotone: no longer suffix can reach the threshold
                break;
            }
            longest += 1;
            past_count = count;
        }

        (longest, past_count)
    }

    /// Probe every admissible next token after the accepted suffix.
    ///
    /// A candidate `t` is admitted when the walk over `suffix ++ [t]`
    /// accepts the full extended length, contributing its occurrence
    /// count. The walk runs at threshold 1: every continuation that
    /// occurs at all claims its share, so the admitted masses partition
    /// `target` (the accepted suffix's own count) and the distribution
    /// built from them normalizes. Once the running sum reaches `target`,
    /// remaining candidates are skipped. Workers only observe the done
    /// flag between candidates, so results are a pure function of the
    /// candidate set.
    pub fn next_token_probes(
        &self,
        suffix_symbols: &[u16],
        vocab_size: usize,
        target: u64,
    ) -> Vec<SuffixProbe> {
        let Some(&last_sym) = suffix_symbols.last() else {
            return Vec::new();
        };
        let want_len = suffix_symbols.len() + 1;

        let done = AtomicBool::new(false);
        let accounted = AtomicU64::new(0);

        (0..vocab_size as u32)
            .into_par_iter()
            .filter_map(|t| {
                if done.load(Ordering::Relaxed) {
                    return None;
                }

                let sym = codec::token_to_symbol(t as u16);
                if !self.cache().contains(last_sym, sym) {
                    return None;
                }

                let mut extended = Vec::with_capacity(want_len);
                extended.extend_from_slice(suffix_symbols);
                extended.push(sym);

                let (suffix_len, count) = self.longest_suffix(&extended, 1);
                if suffix_len != want_len {
                    return None;
                }

                if accounted.fetch_add(count, Ordering::Relaxed) + count >= target {
                    done.store(true, Ordering::Relaxed);
                }
                Some(SuffixProbe {
                    token: t as u16,
                    suffix_len,
                    count,
                })
            })
            .collect()
    }
}

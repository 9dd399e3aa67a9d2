//! FM-index construction and persistence.
//!
//! Streams the BWT straight off the suffix array: for each token-aligned
//! entry `p`, the preceding symbol at `(p - 2) mod len` goes to the
//! wavelet builder (SA order is BWT order), the symbol at `p` feeds the
//! count table, and the (previous, current) pair sets a cache bit. Both
//! reads use the big-endian reinterpretation from `corpus::codec`.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use super::cache::PairCache;
use super::wavelet::{WaveletBuilder, WaveletMatrix};
use super::{FmIndex, CACHE_FILENAME, COUNTS_FILENAME, NUM_SYMBOLS, TREE_FILENAME};
use crate::corpus::{codec, TokenArray};
use crate::index::sa::SaData;
use crate::IgxError;

impl FmIndex {
    /// Build from a suffix array over the full corpus. Odd (unaligned)
    /// entries are skipped, so both raw in-memory arrays and persisted
    /// even-only chunks work.
    pub fn build(sa: &SaData, corpus: &TokenArray) -> Self {
        let mut builder = WaveletBuilder::new();
        let mut counts = vec![0u64; NUM_SYMBOLS];
        let mut cache = PairCache::new();

        let corpus_len = corpus.len();
        let bar = ProgressBar::new(sa.len());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} {wide_bar} {pos}/{len}")
                .unwrap(),
        );
        bar.set_message("building BWT");

        for i in 0..sa.len() {
            let p = sa.get(i);
            if p % 2 == 1 {
                continue;
            }

            // previous and current token straddle p; a single read covers
            // both except at the wrap-around
            let (prev, cur) = if p >= 2 {
                let both = corpus.slice(p - 2, p + 2);
                (
                    u16::from_be_bytes([both[0], both[1]]),
                    u16::from_be_bytes([both[2], both[3]]),
                )
            } else {
                (
                    codec::symbol_at(corpus, corpus_len - 2),
                    codec::symbol_at(corpus, p),
                )
            };

            builder.push(prev);
            counts[cur as usize] += 1;
            cache.add(prev, cur);

            if i % 4096 == 0 {
                bar.inc(4096.min(sa.len() - i));
            }
        }
        bar.finish_and_clear();

        FmIndex::from_parts(builder.build(), counts, cache)
    }

    /// Persist the three artifacts into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        println!("Saving FM-index to {}", dir.display());

        self.wavelet.save(&dir.join(TREE_FILENAME))?;

        let counts_path = dir.join(COUNTS_FILENAME);
        let file = File::create(&counts_path)
            .with_context(|| format!("failed to create {}", counts_path.display()))?;
        let mut w = BufWriter::with_capacity(1 << 16, file);
        for &count in &self.counts {
            w.write_all(&count.to_le_bytes())?;
        }
        w.flush()?;

        self.cache.save(&dir.join(CACHE_FILENAME))?;
        Ok(())
    }

    /// Whether all three artifacts are present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(TREE_FILENAME).exists()
            && dir.join(COUNTS_FILENAME).exists()
            && dir.join(CACHE_FILENAME).exists()
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let wavelet = WaveletMatrix::load(&dir.join(TREE_FILENAME))?;

        let counts_path = dir.join(COUNTS_FILENAME);
        let mut file = File::open(&counts_path)
            .with_context(|| format!("failed to open {}", counts_path.display()))?;
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        if raw.len() != NUM_SYMBOLS * 8 {
            anyhow::bail!(IgxError::CorruptArtifact(format!(
                "{}: expected {} bytes, found {}",
                counts_path.display(),
                NUM_SYMBOLS * 8,
                raw.len()
            )));
        }
        let counts: Vec<u64> = raw
            .chunks_exact(8)
            .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
            .collect();

        let cache = PairCache::load(&dir.join(CACHE_FILENAME))?;
        Ok(FmIndex::from_parts(wavelet, counts, cache))
    }
}

//! FM-index back-end of the ∞-gram model.
//!
//! Only `num_extend == 1` is supported here; the suffix-array back-end
//! carries longer extensions.

use anyhow::{Context, Result};
use std::path::Path;

use super::sa::{ensure_tokenized, write_build_meta};
use super::{BuildConfig, Prediction};
use crate::corpus::{codec, TokenArray};
use crate::index::fm::FmIndex;
use crate::index::sa::{build_suffix_array, SaData, SA_PATHS_FILENAME};
use crate::ingest;
use crate::tokenizer::TokenizerWrapper;

pub struct FmModel {
    index: FmIndex,
    vocab_size: usize,
}

impl FmModel {
    pub fn new(index: FmIndex, vocab_size: usize) -> Self {
        Self { index, vocab_size }
    }

    /// Build or load the FM-index under `out_dir`. A persisted index is
    /// reused when all three artifacts are present; otherwise one is
    /// built from the suffix array (persisted or in-memory) and saved.
    pub fn initialize(
        train_file: &Path,
        out_dir: &Path,
        tokenizer: &TokenizerWrapper,
        config: &BuildConfig,
    ) -> Result<Self> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;

        ensure_tokenized(train_file, out_dir, tokenizer, config)?;
        Self::build_from_data(out_dir, tokenizer.vocab_size(), config)
    }

    /// Build or load the FM-index over an existing `data.bin`.
    pub fn build_from_data(
        out_dir: &Path,
        vocab_size: usize,
        config: &BuildConfig,
    ) -> Result<Self> {
        let data_path = out_dir.join("data.bin");

        if FmIndex::exists(out_dir) {
            println!("FM-index already found; loading...");
            let index = FmIndex::load(out_dir)?;
            return Ok(Self::new(index, vocab_size));
        }

        println!("FM-index not found; creating new one");
        let corpus = TokenArray::load_mmap(&data_path)?;

        let manifest_path = out_dir.join(SA_PATHS_FILENAME);
        let index = if manifest_path.exists() {
            println!("Suffix array(s) already found");
            let listing = std::fs::read_to_string(&manifest_path)?;
            let paths: Vec<&str> = listing.lines().filter(|l| !l.is_empty()).collect();
            if paths.len() > 1 {
                anyhow::bail!("multiple chunks not implemented yet");
            }
            let sa = SaData::load(Path::new(paths[0]))?;
            FmIndex::build(&sa, &corpus)
        } else {
            println!("Creating suffix array");
            let chunk_bytes = config.max_mem_mib * 1024 * 1024;
            let mut index: Option<FmIndex> = None;

            ingest::chunk_documents(
                &data_path,
                config.sentinel_val,
                config.sentinel_size,
                chunk_bytes,
                |chunk| {
                    if index.is_some() {
                        anyhow::bail!("multiple chunks not implemented yet");
                    }
                    println!("making chunk 0 of size {}", chunk.len());
                    let sa = SaData::from_entries(build_suffix_array(chunk));
                    index = Some(FmIndex::build(&sa, &corpus));
                    Ok(())
                },
            )?;

            index.ok_or_else(|| anyhow::anyhow!("token stream {} is empty", data_path.display()))?
        };

        index.save(out_dir)?;
        write_build_meta(out_dir, config);

        Ok(Self::new(index, vocab_size))
    }

    pub fn next_token_distribution(
        &self,
        query_ids: &[u32],
        _num_extend: usize,
        min_matches: usize,
    ) -> Prediction {
        if query_ids.is_empty() {
            return Prediction::empty_query();
        }

        let symbols: Vec<u16> = query_ids
            .iter()
            .map(|&t| codec::token_to_symbol(t as u16))
            .collect();

        let (effective_n, longest_count) =
            self.index.longest_suffix(&symbols, min_matches.max(1) as u64);
        if effective_n == 0 {
            return Prediction::no_match(self.vocab_size, 1);
        }

        let suffix_symbols = &symbols[symbols.len() - effective_n..];
        let probes =
            self.index
                .next_token_probes(suffix_symbols, self.vocab_size, longest_count);

        let mut distribution = vec![0.0f32; self.vocab_size];
        let mut retrieved_suffixes = Vec::with_capacity(probes.len());
        for probe in &probes {
            distribution[probe.token as usize] += probe.count as f32 / longest_count as f32;
            retrieved_suffixes.push(vec![probe.token as u32]);
        }

        Prediction {
            distribution,
            effective_n,
            num_retrieved: longest_count as usize,
            num_extend: 1,
            retrieved_suffixes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_for(tokens: &[u32], vocab_size: usize) -> FmModel {
        let bytes = codec::pack(tokens, 0, 2);
        let sa = SaData::from_entries(build_suffix_array(&bytes));
        let corpus = TokenArray::from_bytes(bytes);
        FmModel::new(FmIndex::build(&sa, &corpus), vocab_size)
    }

    #[test]
    fn test_exact_match_distribution() {
        let model = model_for(&[7, 42, 13, 42, 9], 100);
        let p = model.next_token_distribution(&[42], 1, 1);

        assert_eq!(p.effective_n, 1);
        assert_eq!(p.num_retrieved, 2);
        assert_eq!(p.distribution[13], 0.5);
        assert_eq!(p.distribution[9], 0.5);
        let total: f32 = p.distribution.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_unseen_token_has_no_match() {
        let model = model_for(&[7, 42, 13, 42, 9], 100);
        let p = model.next_token_distribution(&[99], 1, 1);

        assert_eq!(p.effective_n, 0);
        assert_eq!(p.num_retrieved, 0);
        assert!(p.distribution.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_backoff_to_shorter_suffix() {
        let model = model_for(&[1, 2, 3, 4, 2, 3, 5], 100);
        let p = model.next_token_distribution(&[9, 2, 3], 1, 1);

        assert_eq!(p.effective_n, 2);
        assert_eq!(p.num_retrieved, 2);
        assert_eq!(p.distribution[4], 0.5);
        assert_eq!(p.distribution[5], 0.5);
    }

    #[test]
    fn test_min_matches_rejects_rare_suffixes() {
        let model = model_for(&[1, 2, 3, 4, 2, 3, 5], 100);
        let p = model.next_token_distribution(&[2, 3], 1, 3);

        assert_eq!(p.effective_n, 0);
        assert_eq!(p.num_retrieved, 0);
    }

    #[test]
    fn test_rare_continuations_still_count_under_threshold() {
        // [5, 6] occurs twice with two distinct continuations, each seen
        // once; min_matches constrains the suffix, not the continuations
        let model = model_for(&[5, 6, 7, 5, 6, 8], 100);
        let p = model.next_token_distribution(&[5, 6], 1, 2);

        assert_eq!(p.effective_n, 2);
        assert_eq!(p.num_retrieved, 2);
        assert_eq!(p.distribution[7], 0.5);
        assert_eq!(p.distribution[8], 0.5);
        let total: f32 = p.distribution.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_retrieved_suffixes_are_singletons() {
        let model = model_for(&[5, 6, 5, 7], 100);
        let p = model.next_token_distribution(&[5], 1, 1);

        assert_eq!(p.num_retrieved, 2);
        let mut tokens: Vec<u32> = p.retrieved_suffixes.iter().map(|s| s[0]).collect();
        tokens.sort_unstable();
        assert_eq!(tokens, vec![6, 7]);
    }
}

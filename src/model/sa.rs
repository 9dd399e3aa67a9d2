//! Suffix-array back-end of the ∞-gram model.

use anyhow::{Context, Result};
use std::path::Path;

use super::{BuildConfig, Prediction};
use crate::corpus::{codec, TokenArray};
use crate::index::sa::{
    build_suffix_array, write_chunk_manifest, write_suffix_array_chunk, MultiSa, SA_PATHS_FILENAME,
};
use crate::ingest;
use crate::tokenizer::TokenizerWrapper;

pub struct SaModel {
    suffix_array: MultiSa,
    corpus: TokenArray,
    vocab_size: usize,
}

impl SaModel {
    pub fn new(suffix_array: MultiSa, corpus: TokenArray, vocab_size: usize) -> Self {
        Self { suffix_array, corpus, vocab_size }
    }

    /// Build or load everything under `out_dir`: tokenized corpus, then
    /// per-chunk suffix arrays. Each artifact is skipped when already
    /// present.
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

    /// Build or load the suffix arrays over an existing `data.bin`.
    pub fn build_from_data(
        out_dir: &Path,
        vocab_size: usize,
        config: &BuildConfig,
    ) -> Result<Self> {
        let data_path = out_dir.join("data.bin");
        let corpus = TokenArray::load_mmap(&data_path)?;

        let manifest_path = out_dir.join(SA_PATHS_FILENAME);
        if manifest_path.exists() {
            println!("Suffix array(s) already found");
        } else {
            println!("Creating suffix array(s)");
            let chunk_bytes = config.max_mem_mib * 1024 * 1024;
            let mut chunk_paths: Vec<String> = Vec::new();
            let mut offset: u64 = 0;

            ingest::chunk_documents(
                &data_path,
                config.sentinel_val,
                config.sentinel_size,
                chunk_bytes,
                |chunk| {
                    let k = chunk_paths.len();
                    println!("making chunk {k} of size {}", chunk.len());

                    let sa = build_suffix_array(chunk);
                    let path = out_dir.join(format!("suffix_array_{k}.bin"));
                    write_suffix_array_chunk(&path, &sa, offset)?;

                    chunk_paths.push(path.to_string_lossy().into_owned());
                    offset += chunk.len() as u64;
                    Ok(())
                },
            )?;

            write_chunk_manifest(&manifest_path, &chunk_paths)?;
            write_build_meta(out_dir, config);
        }

        let listing = std::fs::read_to_string(&manifest_path)?;
        let paths: Vec<&str> = listing.lines().filter(|l| !l.is_empty()).collect();
        let suffix_array = MultiSa::open(&paths)?;

        Ok(Self::new(suffix_array, corpus, vocab_size))
    }

    /// Longest suffix length with at least `min_matches` occurrences.
    /// Binary search over the length: match count is monotone
    /// non-increasing in suffix length.
    fn longest_suffix_len(&self, query_ids: &[u32], min_matches: usize) -> usize {
        let mut left = 0usize;
        let mut right = query_ids.len() + 1;

        while left < right {
            let mid = (left + right) / 2;
            let suffix = codec::pack_query(&query_ids[query_ids.len() - mid..]);
            let matches = self.suffix_array.count(&self.corpus, &suffix);

            if matches >= min_matches as u64 {
                left = mid + 1;
            } else {
                right = mid;
            }
        }

        left.saturating_sub(1)
    }

    pub fn next_token_distribution(
        &self,
        query_ids: &[u32],
        num_extend: usize,
        min_matches: usize,
    ) -> Prediction {
        if query_ids.is_empty() {
            return Prediction::empty_query();
        }
        let num_extend = num_extend.max(1);

        let best_n = self.longest_suffix_len(query_ids, min_matches.max(1));
        if best_n == 0 {
            return Prediction::no_match(self.vocab_size, num_extend);
        }

        let best_query = codec::pack_query(&query_ids[query_ids.len() - best_n..]);
        let substrings = self
            .suffix_array
            .extract(&self.corpus, &best_query, num_extend as u64);

        let mut distribution = vec![0.0f32; self.vocab_size];
        let mut retrieved_suffixes = Vec::with_capacity(substrings.len());
        let mut total = 0usize;

        for bytes in &substrings {
            let tokens = codec::unpack(bytes);
            let new_ids: Vec<u32> = tokens[tokens.len() - num_extend..]
                .iter()
                .map(|&t| t as u32)
                .collect();

            distribution[new_ids[0] as usize] += 1.0;
            retrieved_suffixes.push(new_ids);
            total += 1;
        }

        if total == 0 {
            return Prediction::no_match(self.vocab_size, num_extend);
        }
        for p in &mut distribution {
            *p /= total as f32;
        }

        Prediction {
            distribution,
            effective_n: best_n,
            num_retrieved: total,
            num_extend,
            retrieved_suffixes,
        }
    }
}

/// Tokenize the training file unless `data.bin` already exists.
pub(crate) fn ensure_tokenized(
    train_file: &Path,
    out_dir: &Path,
    tokenizer: &TokenizerWrapper,
    config: &BuildConfig,
) -> Result<std::path::PathBuf> {
    let data_path = out_dir.join("data.bin");
    if data_path.exists() {
        println!("Tokenized data already found");
    } else {
        println!("Tokenizing data to disk");
        ingest::tokenize_file(
            train_file,
            &config.line_split,
            &data_path,
            tokenizer,
            config.sentinel_val,
            config.sentinel_size,
            config.n_workers,
        )?;
    }
    Ok(data_path)
}

/// Record the build parameters next to the artifacts. Best-effort: a
/// failure here never fails the build.
pub(crate) fn write_build_meta(out_dir: &Path, config: &BuildConfig) {
    if let Ok(file) = std::fs::File::create(out_dir.join("meta.json")) {
        let _ = serde_json::to_writer_pretty(file, config);
    }
}

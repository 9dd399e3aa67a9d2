//! Corpus ingestion: document splitting and parallel tokenization.
//!
//! The raw training file is split on a configurable separator, encoded
//! document-by-document on a worker pool, and appended to `data.bin` as
//! sentinel-terminated token blocks. Document boundaries are preserved;
//! nothing downstream depends on inter-document order.

pub mod chunker;

pub use chunker::chunk_documents;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::corpus::codec;
use crate::tokenizer::TokenizerWrapper;

/// Documents encoded per parallel batch.
const BATCH_DOCS: usize = 512;

/// Stream documents out of `path`, split on `separator`. The final
/// unterminated piece is also yielded. Empty pieces are passed through;
/// callers decide what to skip.
pub fn read_documents(
    path: &Path,
    separator: &str,
    mut callback: impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let sep = separator.as_bytes();
    assert!(!sep.is_empty(), "document separator must be non-empty");

    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&chunk[..n]);

        let mut start = 0;
        while let Some(pos) = find_subslice(&pending[start..], sep) {
            let doc = String::from_utf8_lossy(&pending[start..start + pos]);
            callback(&doc)?;
            start += pos + sep.len();
        }
        pending.drain(..start);
    }

    if !pending.is_empty() {
        callback(&String::from_utf8_lossy(&pending))?;
    }
    Ok(())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}

/// Tokenize `train_file` into `data_path` using `n_workers` encoder
/// threads. Each document becomes its LE token block followed by the
/// sentinel run; all-whitespace documents are skipped.
#[allow(clippy::too_many_arguments)]
pub fn tokenize_file(
    train_file: &Path,
    separator: &str,
    data_path: &Path,
    tokenizer: &TokenizerWrapper,
    sentinel_val: u16,
    sentinel_size: usize,
    n_workers: usize,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers.max(1))
        .build()
        .context("failed to start tokenizer pool")?;

    let file = File::create(data_path)
        .with_context(|| format!("failed to create {}", data_path.display()))?;
    let mut writer = BufWriter::with_capacity(1 << 16, file);

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} {pos} docs").unwrap());
    bar.set_message("tokenizing");

    let mut batch: Vec<String> = Vec::with_capacity(BATCH_DOCS);

    read_documents(train_file, separator, |doc| {
        if doc.trim().is_empty() {
            return Ok(());
        }
        batch.push(doc.to_string());
        if batch.len() == BATCH_DOCS {
            encode_batch(&pool, tokenizer, &mut batch, &mut writer, sentinel_val, sentinel_size)?;
            bar.inc(BATCH_DOCS as u64);
        }
        Ok(())
    })?;

    if !batch.is_empty() {
        bar.inc(batch.len() as u64);
        encode_batch(&pool, tokenizer, &mut batch, &mut writer, sentinel_val, sentinel_size)?;
    }

    writer.flush()?;
    bar.finish_and_clear();
    Ok(())
}

fn encode_batch(
    pool: &rayon::ThreadPool,
    tokenizer: &TokenizerWrapper,
    batch: &mut Vec<String>,
    writer: &mut impl Write,
    sentinel_val: u16,
    sentinel_size: usize,
) -> Result<()> {
    let blocks: Vec<Vec<u8>> = pool.install(|| {
        batch
            .par_iter()
            .map(|doc| {
                tokenizer
                    .encode(doc)
                    .map(|ids| codec::pack(&ids, sentinel_val, sentinel_size))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    for block in blocks {
        writer.write_all(&block)?;
    }
    batch.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_documents_splits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.txt");
        std::fs::write(&path, "alpha\nbeta\ngamma").unwrap();

        let mut docs = Vec::new();
        read_documents(&path, "\n", |d| {
            docs.push(d.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(docs, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_read_documents_multibyte_separator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.txt");
        std::fs::write(&path, "one<|doc|>two<|doc|>").unwrap();

        let mut docs = Vec::new();
        read_documents(&path, "<|doc|>", |d| {
            docs.push(d.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(docs, vec!["one", "two"]);
    }

    #[test]
    fn test_tokenize_file_writes_sentinel_blocks() {
        let dir = tempdir().unwrap();
        let train = dir.path().join("train.txt");
        let data = dir.path().join("data.bin");
        std::fs::write(&train, "t1 t2\n   \nt3").unwrap();

        let tokenizer = TokenizerWrapper::for_testing(16);
        tokenize_file(&train, "\n", &data, &tokenizer, 0, 2, 2).unwrap();

        let bytes = std::fs::read(&data).unwrap();
        let tokens = codec::unpack(&bytes);
        // two docs, each terminated by two sentinels; blank doc skipped
        assert_eq!(tokens.iter().filter(|&&t| t == 0).count(), 4);
        assert_eq!(tokens.len(), 2 + 2 + 1 + 2);
    }
}

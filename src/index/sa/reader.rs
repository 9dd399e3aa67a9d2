//! Suffix-array access and the range-search kernel.
//!
//! `SaData` reads one persisted chunk, either fully resident or through
//! a memory map. `MultiSa` stitches the chunks of a corpus back together:
//! entries already carry global corpus offsets, so chunk queries just sum.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::cmp::Ordering;
use std::fs::File;
use std::path::Path;

use crate::corpus::TokenArray;

/// Byte length of the entry-count header in a chunk file.
const HEADER_BYTES: u64 = 8;

/// Access to one suffix-array chunk.
pub enum SaData {
    Mem(Vec<u64>),
    Mmap { mmap: Mmap, len: u64 },
}

impl SaData {
    pub fn from_entries(entries: Vec<u64>) -> Self {
        SaData::Mem(entries)
    }

    /// Load a chunk file fully into memory.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read suffix array {}", path.display()))?;
        let (len, body) = Self::validate(&data, path)?;
        let entries = body
            .chunks_exact(8)
            .take(len as usize)
            .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
            .collect();
        Ok(SaData::Mem(entries))
    }

    /// Memory-map a chunk file.
    pub fn load_mmap(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open suffix array {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file)? };
        let (len, _) = Self::validate(&mmap, path)?;
        Ok(SaData::Mmap { mmap, len })
    }

    fn validate<'a>(data: &'a [u8], path: &Path) -> Result<(u64, &'a [u8])> {
        if data.len() < HEADER_BYTES as usize || data.len() % 8 != 0 {
            anyhow::bail!(crate::IgxError::CorruptArtifact(format!(
                "{}: length {} is not a multiple of 8",
                path.display(),
                data.len()
            )));
        }
        let len = u64::from_le_bytes(data[0..8].try_into().unwrap());
        let body = &data[8..];
        if body.len() as u64 != len * 8 {
            anyhow::bail!(crate::IgxError::CorruptArtifact(format!(
                "{}: header claims {} entries, file holds {}",
                path.display(),
                len,
                body.len() / 8
            )));
        }
        Ok((len, body))
    }

    /// Entry `i`, a global byte offset into the corpus.
    ///
    /// Panics when `i` is out of range — see the error-handling policy.
    #[inline]
    pub fn get(&self, i: u64) -> u64 {
        match self {
            SaData::Mem(entries) => entries[i as usize],
            SaData::Mmap { mmap, len } => {
                if i >= *len {
                    panic!("suffix array index {i} out of bounds (len {len})");
                }
                let at = (HEADER_BYTES + i * 8) as usize;
                u64::from_le_bytes(mmap[at..at + 8].try_into().unwrap())
            }
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            SaData::Mem(entries) => entries.len() as u64,
            SaData::Mmap { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Half-open range `[lo, hi)` of entries whose suffixes start with
    /// `query`, or `None` when the query is absent.
    pub fn range_of(&self, corpus: &TokenArray, query: &[u8]) -> Option<(u64, u64)> {
        if self.is_empty() {
            return None;
        }

        let lo = self.bisect(corpus, query, true);
        if lo == self.len() {
            return None;
        }

        // confirm the lower bound actually starts with the query
        let first = self.suffix_prefix(corpus, self.get(lo), query.len());
        if first != query {
            return None;
        }

        let hi = self.bisect(corpus, query, false);
        Some((lo, hi))
    }

    pub fn count(&self, corpus: &TokenArray, query: &[u8]) -> u64 {
        match self.range_of(corpus, query) {
            Some((lo, hi)) => hi - lo,
            None => 0,
        }
    }

    /// Global corpus offsets of every occurrence.
    pub fn positions(&self, corpus: &TokenArray, query: &[u8]) -> Vec<u64> {
        match self.range_of(corpus, query) {
            Some((lo, hi)) => (lo..hi).map(|i| self.get(i)).collect(),
            None => Vec::new(),
        }
    }

    /// Occurrences extended by `extend` extra tokens. Occurrences too
    /// close to the corpus end to supply the full extension are dropped.
    pub fn extract(&self, corpus: &TokenArray, query: &[u8], extend: u64) -> Vec<Vec<u8>> {
        let want = query.len() as u64 + extend * 2;
        let len = corpus.len();
        self.positions(corpus, query)
            .into_iter()
            .filter(|&pos| pos + want <= len)
            .map(|pos| corpus.slice(pos, pos + want))
            .collect()
    }

    /// Left bisect finds the first entry with suffix >= query; right
    /// bisect the first with suffix > query.
    fn bisect(&self, corpus: &TokenArray, query: &[u8], left: bool) -> u64 {
        let mut start: u64 = 0;
        let mut end = self.len();

        while start < end {
            let mid = start + (end - start) / 2;
            let prefix = self.suffix_prefix(corpus, self.get(mid), query.len());

            let go_right = match prefix.as_slice().cmp(query) {
                Ordering::Less => true,
                Ordering::Equal => !left,
                Ordering::Greater => false,
            };

            if go_right {
                start = mid + 1;
            } else {
                end = mid;
            }
        }

        start
    }

    /// The suffix at `pos`, clipped to `max_len` bytes.
    #[inline]
    fn suffix_prefix(&self, corpus: &TokenArray, pos: u64, max_len: usize) -> Vec<u8> {
        let end = (pos + max_len as u64).min(corpus.len());
        corpus.slice(pos, end)
    }
}

/// Ordered chunk list behaving as one logical suffix array.
pub struct MultiSa {
    chunks: Vec<SaData>,
}

impl MultiSa {
    pub fn new(chunks: Vec<SaData>) -> Self {
        MultiSa { chunks }
    }

    /// Open every chunk listed in a manifest, memory-mapped.
    pub fn open(chunk_paths: &[&str]) -> Result<Self> {
        let chunks = chunk_paths
            .iter()
            .map(|p| SaData::load_mmap(Path::new(p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(MultiSa { chunks })
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn count(&self, corpus: &TokenArray, query: &[u8]) -> u64 {
        self.chunks.iter().map(|c| c.count(corpus, query)).sum()
    }

    pub fn extract(&self, corpus: &TokenArray, query: &[u8], extend: u64) -> Vec<Vec<u8>> {
        let mut results = Vec::new();
        for chunk in &self.chunks {
            results.extend(chunk.extract(corpus, query, extend));
        }
        results
    }
}

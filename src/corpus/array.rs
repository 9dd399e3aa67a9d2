//! Corpus access over the byte-packed token stream.
//!
//! Either the whole stream is resident or it is memory-mapped read-only.
//! Reads always copy into a fresh buffer so callers never hold views that
//! alias the mmap.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

pub enum TokenArray {
    Mem(Vec<u8>),
    Mmap(Mmap),
}

impl TokenArray {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        TokenArray::Mem(data)
    }

    /// Load the whole token stream into memory.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read corpus {}", path.display()))?;
        Ok(TokenArray::Mem(data))
    }

    /// Memory-map the token stream read-only.
    pub fn load_mmap(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open corpus {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(TokenArray::Mmap(mmap))
    }

    /// Copy out the bytes in `[lo, hi)`.
    ///
    /// Panics when `hi` exceeds the corpus length: an out-of-range read
    /// means the index is corrupt or the caller is buggy, and masking it
    /// would hide the real bug.
    #[inline]
    pub fn slice(&self, lo: u64, hi: u64) -> Vec<u8> {
        let data = self.raw();
        if hi > data.len() as u64 || lo > hi {
            panic!("corpus read [{lo}:{hi}) out of bounds (len {})", data.len());
        }
        data[lo as usize..hi as usize].to_vec()
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.raw().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn raw(&self) -> &[u8] {
        match self {
            TokenArray::Mem(data) => data,
            TokenArray::Mmap(mmap) => mmap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_mem_slice() {
        let arr = TokenArray::from_bytes(vec![1, 2, 3, 4]);
        assert_eq!(arr.slice(1, 3), vec![2, 3]);
        assert_eq!(arr.len(), 4);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_range_panics() {
        let arr = TokenArray::from_bytes(vec![1, 2]);
        arr.slice(0, 3);
    }

    #[test]
    fn test_mmap_matches_mem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let bytes: Vec<u8> = (0..64).collect();
        let mut f = File::create(&path).unwrap();
        f.write_all(&bytes).unwrap();
        drop(f);

        let mem = TokenArray::load(&path).unwrap();
        let mapped = TokenArray::load_mmap(&path).unwrap();
        assert_eq!(mem.len(), mapped.len());
        assert_eq!(mem.slice(10, 20), mapped.slice(10, 20));
    }
}

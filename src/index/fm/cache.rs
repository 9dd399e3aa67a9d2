//! 2-gram bit cache.
//!
//! Membership of ordered symbol pairs seen in the aligned corpus, keyed
//! by `(first << 16) | second`. Queried as an admissibility prefilter
//! before wavelet-matrix rank calls: a clear bit proves the pair absent
//! (no false negatives); set bits may include the single wrap-around
//! pair from the BWT's cyclic view.
//!
//! Persisted as a gzip-compressed roaring bitmap.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use roaring::RoaringBitmap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::IgxError;

#[derive(Default)]
pub struct PairCache {
    bits: RoaringBitmap,
}

#[inline]
fn key(first: u16, second: u16) -> u32 {
    (first as u32) << 16 | second as u32
}

impl PairCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, first: u16, second: u16) {
        self.bits.insert(key(first, second));
    }

    #[inline]
    pub fn contains(&self, first: u16, second: u16) -> bool {
        self.bits.contains(key(first, second))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut raw = Vec::new();
        self.bits.serialize_into(&mut raw)?;

        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&raw)?;
        encoder.finish()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut raw = Vec::new();
        GzDecoder::new(file)
            .read_to_end(&mut raw)
            .with_context(|| format!("failed to decompress {}", path.display()))?;

        let bits = RoaringBitmap::deserialize_from(&raw[..]).map_err(|e| {
            IgxError::CorruptArtifact(format!("{}: {e}", path.display()))
        })?;
        Ok(Self { bits })
    }
}

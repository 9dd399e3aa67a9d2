//! Suffix-array persistence.
//!
//! Chunk file format: an i64 little-endian entry count, then the
//! token-aligned (even) offsets as i64 little-endian values with the
//! chunk's base offset added, mapping them into global corpus positions.
//! The count is back-patched once the entries are streamed out.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Write one SA chunk. Only even offsets are kept; `base_offset` is the
/// chunk's starting byte position in the full corpus.
pub fn write_suffix_array_chunk(path: &Path, sa: &[u64], base_offset: u64) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::with_capacity(1 << 16, file);

    // placeholder for the entry count
    writer.write_all(&0u64.to_le_bytes())?;

    let mut count: u64 = 0;
    for &offset in sa {
        if offset % 2 == 0 {
            writer.write_all(&(offset + base_offset).to_le_bytes())?;
            count += 1;
        }
    }
    writer.flush()?;

    let mut file = writer.into_inner()?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&count.to_le_bytes())?;

    Ok(())
}

/// Write the newline-separated list of chunk paths.
pub fn write_chunk_manifest(path: &Path, chunk_paths: &[String]) -> Result<()> {
    std::fs::write(path, chunk_paths.join("\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

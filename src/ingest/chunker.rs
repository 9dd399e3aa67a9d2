//! Sentinel-delimited chunking of the token stream.
//!
//! Suffix-array construction needs whole chunks resident, so the token
//! file is consumed through a bounded buffer that is cut only at document
//! boundaries: each callback receives a chunk ending on a full sentinel
//! run, and the partial document past the cut carries over to the next
//! chunk.

use anyhow::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::IgxError;

/// Size of the read buffer feeding the chunk.
const READ_BUF_BYTES: usize = 1 << 20;

/// Stream `path` into chunks of at most `chunk_bytes`, cut at sentinel
/// runs. The callback sees each chunk exactly once, in corpus order.
pub fn chunk_documents(
    path: &Path,
    sentinel_val: u16,
    sentinel_size: usize,
    chunk_bytes: usize,
    mut callback: impl FnMut(&[u8]) -> Result<()>,
) -> Result<()> {
    if chunk_bytes < READ_BUF_BYTES {
        anyhow::bail!("chunk smaller than read buffer");
    }

    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; READ_BUF_BYTES];
    let mut chunk = vec![0u8; chunk_bytes];
    let mut filled = 0usize;

    loop {
        let nread = file.read(&mut buffer)?;
        if nread == 0 {
            if filled == 0 {
                break;
            }
            if !ends_with_sentinel(&chunk[..filled], sentinel_size, sentinel_val) {
                anyhow::bail!(IgxError::SentinelMissing);
            }
            flush_chunk(
                &mut chunk,
                &mut filled,
                sentinel_size,
                sentinel_val,
                chunk_bytes,
                &mut callback,
            )?;
            break;
        }

        while filled + nread > chunk_bytes {
            // a second pass means the carried-over document still does
            // not fit, which flush_chunk reports as ChunkTooSmall
            flush_chunk(
                &mut chunk,
                &mut filled,
                sentinel_size,
                sentinel_val,
                chunk_bytes,
                &mut callback,
            )?;
        }
        chunk[filled..filled + nread].copy_from_slice(&buffer[..nread]);
        filled += nread;
    }

    Ok(())
}

/// Cut the chunk after its last sentinel run, hand it to the callback,
/// and slide the remainder to the front.
fn flush_chunk(
    chunk: &mut [u8],
    filled: &mut usize,
    sentinel_size: usize,
    sentinel_val: u16,
    chunk_bytes: usize,
    callback: &mut impl FnMut(&[u8]) -> Result<()>,
) -> Result<()> {
    let last = find_last_sentinel(&chunk[..*filled], sentinel_size, sentinel_val)
        .ok_or(IgxError::ChunkTooSmall(chunk_bytes))?;
    let cut = last + sentinel_size * 2;

    callback(&chunk[..cut])?;

    chunk.copy_within(cut..*filled, 0);
    *filled -= cut;
    Ok(())
}

/// Whether `values` ends with a full sentinel run.
pub fn ends_with_sentinel(values: &[u8], sentinel_size: usize, sentinel_val: u16) -> bool {
    let run = sentinel_size * 2;
    if values.len() < run {
        return false;
    }
    token_run_at(values, values.len() - run, sentinel_size, sentinel_val)
}

/// Byte offset of the start of the last sentinel run, scanning backwards
/// over token boundaries.
pub fn find_last_sentinel(values: &[u8], sentinel_size: usize, sentinel_val: u16) -> Option<usize> {
    let run = sentinel_size * 2;
    if values.len() < run {
        return None;
    }
    let mut i = values.len() - run;
    loop {
        if token_run_at(values, i, sentinel_size, sentinel_val) {
            return Some(i);
        }
        if i < 2 {
            return None;
        }
        i -= 2;
    }
}

#[inline]
fn token_run_at(values: &[u8], at: usize, sentinel_size: usize, sentinel_val: u16) -> bool {
    (0..sentinel_size).all(|j| {
        let o = at + j * 2;
        u16::from_le_bytes([values[o], values[o + 1]]) == sentinel_val
    })
}

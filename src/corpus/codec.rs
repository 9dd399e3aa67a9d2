//! Token-byte codec.
//!
//! Tokens are u16 values stored little-endian: token `i` occupies bytes
//! `[2i, 2i+2)`. The suffix array sorts raw bytes, so byte-lexicographic
//! order matches numeric token order only when a token's high byte is
//! compared first. The FM-index therefore reinterprets each stored pair
//! as a **big-endian** symbol at build and query time; storage stays
//! little-endian throughout. That reinterpretation lives here and only
//! here — `symbol_at` for corpus reads, `token_to_symbol` for queries.

use crate::corpus::TokenArray;

/// Pack tokens little-endian, then `sentinel_size` copies of the sentinel.
pub fn pack(tokens: &[u32], sentinel_val: u16, sentinel_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity((tokens.len() + sentinel_size) * 2);
    for &t in tokens {
        out.extend_from_slice(&(t as u16).to_le_bytes());
    }
    for _ in 0..sentinel_size {
        out.extend_from_slice(&sentinel_val.to_le_bytes());
    }
    out
}

/// Pack a query without any sentinel tail.
pub fn pack_query(tokens: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tokens.len() * 2);
    for &t in tokens {
        out.extend_from_slice(&(t as u16).to_le_bytes());
    }
    out
}

/// Decode a little-endian byte stream back into tokens.
/// The length must be even.
pub fn unpack(bytes: &[u8]) -> Vec<u16> {
    assert!(bytes.len() % 2 == 0, "token stream has odd length {}", bytes.len());
    bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Read the BWT symbol at an even byte position, wrapping at the corpus end.
/// This is the big-endian reinterpretation of the stored pair.
pub fn symbol_at(corpus: &TokenArray, byte_pos: u64) -> u16 {
    let len = corpus.len();
    let pos = byte_pos % len;
    let b = corpus.slice(pos, pos + 2);
    u16::from_be_bytes([b[0], b[1]])
}

/// Map a token id to the symbol space the wavelet matrix is built over.
#[inline]
pub fn token_to_symbol(token: u16) -> u16 {
    token.swap_bytes()
}

//! `PlantUML` text encoding.
//!
//! Diagram source is compressed with raw DEFLATE (no zlib header or checksum)
//! and written with a 64-symbol alphabet `0-9A-Za-z-_`. Bytes are consumed in
//! groups of three; a short final group is zero-filled, so the output length is
//! always a multiple of four and there is no padding character.

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::DeflateEncoder;

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

/// Encode diagram source for use in a `PlantUML` server URL.
pub fn encode_diagram(source: &str) -> io::Result<String> {
    let compressed = deflate(source.as_bytes())?;
    Ok(encode64(&compressed))
}

fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Encode bytes with the `PlantUML` alphabet.
#[must_use]
pub fn encode64(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk[0];
        let b2 = chunk.get(1).copied().unwrap_or(0);
        let b3 = chunk.get(2).copied().unwrap_or(0);
        append_3_bytes(b1, b2, b3, &mut out);
    }
    out
}

fn append_3_bytes(b1: u8, b2: u8, b3: u8, out: &mut String) {
    let c1 = b1 >> 2;
    let c2 = ((b1 & 0x3) << 4) | (b2 >> 4);
    let c3 = ((b2 & 0xF) << 2) | (b3 >> 6);
    let c4 = b3 & 0x3F;
    for c in [c1, c2, c3, c4] {
        out.push(char::from(ALPHABET[usize::from(c)]));
    }
}

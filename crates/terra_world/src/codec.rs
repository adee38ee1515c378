//! # Terrain Codec
//!
//! Stored form of an elevation grid.
//!
//! ## Format
//!
//! ```text
//! LZ4 (size-prepended) of:
//!   [4 bytes: magic "TERR"]
//!   [4 bytes: version, u32 LE]
//!   [4 bytes: sample count, u32 LE]
//!   [count * 4 bytes: f32 bit patterns, LE, column-major]
//! ```
//!
//! Samples are stored as raw bit patterns, so decoding returns exactly the
//! floats that were encoded, including signed zeros and NaN payloads.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::error::{TerrainError, TerrainResult};

/// Magic bytes identifying an encoded terrain grid.
const TERRAIN_MAGIC: [u8; 4] = *b"TERR";

/// Current format version.
const TERRAIN_VERSION: u32 = 1;

/// Header length in bytes.
const HEADER_LEN: usize = 12;

/// Encodes samples into their stored form.
///
/// # Errors
///
/// Returns [`TerrainError::InvalidInput`] if the grid holds more than
/// `u32::MAX` samples.
pub fn encode_terrain(samples: &[f32]) -> TerrainResult<Vec<u8>> {
    let count = u32::try_from(samples.len())
        .map_err(|_| TerrainError::InvalidInput(format!("{} samples exceed the format limit", samples.len())))?;

    let header: [u32; 3] = [
        u32::from_ne_bytes(TERRAIN_MAGIC),
        TERRAIN_VERSION.to_le(),
        count.to_le(),
    ];
    let words: Vec<u32> = samples.iter().map(|s| s.to_bits().to_le()).collect();

    let mut raw = Vec::with_capacity(HEADER_LEN + samples.len() * 4);
    raw.extend_from_slice(bytemuck::bytes_of(&header));
    raw.extend_from_slice(bytemuck::cast_slice(&words));

    Ok(compress_prepend_size(&raw))
}

/// Decodes stored bytes back into samples.
///
/// # Errors
///
/// Returns [`TerrainError::Internal`] if the bytes fail to decompress, carry a
/// foreign magic or unknown version, or disagree with their own sample count.
pub fn decode_terrain(bytes: &[u8]) -> TerrainResult<Vec<f32>> {
    let raw = decompress_size_prepended(bytes)
        .map_err(|e| TerrainError::Internal(format!("terrain decompression failed: {e}")))?;

    if raw.len() < HEADER_LEN {
        return Err(TerrainError::Internal(format!(
            "terrain payload too short: {} bytes",
            raw.len()
        )));
    }

    let (head, body) = raw.split_at(HEADER_LEN);
    let header: [u32; 3] = bytemuck::pod_read_unaligned(head);

    let magic = header[0].to_ne_bytes();
    if magic != TERRAIN_MAGIC {
        return Err(TerrainError::Internal(format!("bad terrain magic: {magic:?}")));
    }

    let version = u32::from_le(header[1]);
    if version != TERRAIN_VERSION {
        return Err(TerrainError::Internal(format!("unsupported terrain version: {version}")));
    }

    let count = u32::from_le(header[2]) as usize;
    if body.len() != count * 4 {
        return Err(TerrainError::Internal(format!(
            "terrain length mismatch: header says {count} samples, body holds {} bytes",
            body.len()
        )));
    }

    Ok(body
        .chunks_exact(4)
        .map(|word| f32::from_bits(u32::from_le(bytemuck::pod_read_unaligned(word))))
        .collect())
}

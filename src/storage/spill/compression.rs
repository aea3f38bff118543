// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Whole-body compression for spill records
//!
//! Both directions write into caller-owned scratch buffers so the hot path
//! reuses the context's allocations. Lz4 and snappy use their raw block
//! formats since the record header already carries both lengths.

use std::io::{Read, Write};

use crate::core::{CompressionCodec, Result, SpillError};

/// Replace the contents of `out` with `input` compressed by `codec`
pub(crate) fn compress_into(
    codec: CompressionCodec,
    level: Option<i32>,
    input: &[u8],
    out: &mut Vec<u8>,
) -> Result<()> {
    out.clear();
    match codec {
        CompressionCodec::None => {
            out.try_reserve(input.len())?;
            out.extend_from_slice(input);
        }
        CompressionCodec::Lz4 => {
            let max_len = lz4_flex::block::get_maximum_output_size(input.len());
            out.try_reserve(max_len)?;
            out.resize(max_len, 0);
            let written = lz4_flex::block::compress_into(input, out)
                .map_err(|e| SpillError::encoding(format!("LZ4 compression failed: {}", e)))?;
            out.truncate(written);
        }
        CompressionCodec::Snappy => {
            let max_len = snap::raw::max_compress_len(input.len());
            if max_len == 0 {
                return Err(SpillError::encoding(format!(
                    "{} bytes exceed the snappy input limit",
                    input.len()
                )));
            }
            out.try_reserve(max_len)?;
            out.resize(max_len, 0);
            let written = snap::raw::Encoder::new()
                .compress(input, out)
                .map_err(|e| SpillError::encoding(format!("Snappy compression failed: {}", e)))?;
            out.truncate(written);
        }
        CompressionCodec::Zstd => {
            let level = level.or(codec.default_level()).unwrap_or(3);
            zstd::stream::copy_encode(input, &mut *out, level)
                .map_err(|e| SpillError::encoding(format!("Zstd compression failed: {}", e)))?;
        }
        CompressionCodec::Gzip => {
            let level = level.or(codec.default_level()).unwrap_or(6);
            let mut encoder =
                flate2::write::GzEncoder::new(&mut *out, flate2::Compression::new(level as u32));
            encoder
                .write_all(input)
                .and_then(|_| encoder.finish().map(|_| ()))
                .map_err(|e| SpillError::encoding(format!("Gzip compression failed: {}", e)))?;
        }
    }
    Ok(())
}

/// Replace the contents of `out` with `input` expanded by `codec`.
///
/// The result must be exactly `expected_len` bytes; anything else is
/// treated as corruption rather than a codec failure.
pub(crate) fn decompress_into(
    codec: CompressionCodec,
    input: &[u8],
    expected_len: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.clear();
    match codec {
        CompressionCodec::None => {
            if input.len() != expected_len {
                return Err(length_mismatch(codec, input.len(), expected_len));
            }
            out.try_reserve(expected_len)?;
            out.extend_from_slice(input);
        }
        CompressionCodec::Lz4 => {
            out.try_reserve(expected_len)?;
            out.resize(expected_len, 0);
            let written = lz4_flex::block::decompress_into(input, out).map_err(|e| {
                SpillError::Decompression(format!("LZ4 decompression failed: {}", e))
            })?;
            if written != expected_len {
                return Err(length_mismatch(codec, written, expected_len));
            }
        }
        CompressionCodec::Snappy => {
            let declared = snap::raw::decompress_len(input).map_err(|e| {
                SpillError::Decompression(format!("Snappy decompression failed: {}", e))
            })?;
            if declared != expected_len {
                return Err(length_mismatch(codec, declared, expected_len));
            }
            out.try_reserve(expected_len)?;
            out.resize(expected_len, 0);
            let written = snap::raw::Decoder::new()
                .decompress(input, out)
                .map_err(|e| {
                    SpillError::Decompression(format!("Snappy decompression failed: {}", e))
                })?;
            if written != expected_len {
                return Err(length_mismatch(codec, written, expected_len));
            }
        }
        CompressionCodec::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(input).map_err(|e| {
                SpillError::Decompression(format!("Zstd decompression failed: {}", e))
            })?;
            read_bounded(codec, decoder, expected_len, out)?;
        }
        CompressionCodec::Gzip => {
            read_bounded(codec, flate2::read::GzDecoder::new(input), expected_len, out)?;
        }
    }
    Ok(())
}

// reads at most one byte past the expected length so oversized output is
// detected without expanding the whole stream
fn read_bounded<R: Read>(
    codec: CompressionCodec,
    reader: R,
    expected_len: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.try_reserve(expected_len)?;
    reader
        .take(expected_len as u64 + 1)
        .read_to_end(out)
        .map_err(|e| SpillError::Decompression(format!("{} decompression failed: {}", codec, e)))?;
    if out.len() != expected_len {
        return Err(length_mismatch(codec, out.len(), expected_len));
    }
    Ok(())
}

fn length_mismatch(codec: CompressionCodec, actual: usize, expected: usize) -> SpillError {
    SpillError::corrupted(format!(
        "{} body expanded to {} bytes, header declares {}",
        codec, actual, expected
    ))
}

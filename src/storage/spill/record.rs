// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Spill record header wire format
//!
//! Every serialize call appends exactly one self-describing record:
//!
//! ```text
//! +-------------------------------+  offset
//! | magic "SPLR"            u32   |  0
//! | format version          u8    |  4
//! | codec tag (0 = raw)     u8    |  5
//! | reserved                u16   |  6
//! | row_count               u32   |  8
//! | column_count            u32   |  12
//! | uncompressed_length     u64   |  16
//! | compressed_length       u64   |  24
//! | type tags      column_count x u8
//! | column lengths column_count x u64
//! | body crc32              u32   |
//! | header crc32            u32   |
//! +-------------------------------+
//! | body (compressed_length bytes when compressed,
//! |       uncompressed_length bytes otherwise)
//! +-------------------------------+
//! ```
//!
//! All integers are little-endian. The header checksum covers every header
//! byte before it; the body checksum covers the on-wire body.

use crate::core::{CompressionCodec, LogicalType, Result, SpillError};
use crate::storage::block::BlockReader;

/// "SPLR" read as a little-endian u32
pub const RECORD_MAGIC: u32 = 0x524C_5053;
pub const RECORD_FORMAT_VERSION: u8 = 1;
/// Bytes before the per-column section
pub const FIXED_HEADER_LEN: usize = 32;
const PER_COLUMN_LEN: usize = 1 + 8;
const CHECKSUMS_LEN: usize = 4 + 4;

/// Bounds-checked little-endian reader over a decoded byte slice
#[derive(Debug)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(SpillError::corrupted(format!(
                "need {} bytes at position {} but only {} remain",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

/// Decoded record header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordHeader {
    pub row_count: u32,
    /// `CompressionCodec::None` marks an uncompressed body
    pub codec: CompressionCodec,
    pub uncompressed_length: u64,
    pub compressed_length: u64,
    pub column_types: Vec<LogicalType>,
    /// Encoded (uncompressed) body length of each column
    pub column_lengths: Vec<u64>,
    pub body_checksum: u32,
}

impl RecordHeader {
    /// Header size for a record with `columns` columns
    pub fn encoded_len_for(columns: usize) -> usize {
        FIXED_HEADER_LEN + columns * PER_COLUMN_LEN + CHECKSUMS_LEN
    }

    pub fn encoded_len(&self) -> usize {
        Self::encoded_len_for(self.column_count())
    }

    pub fn column_count(&self) -> usize {
        self.column_types.len()
    }

    pub fn is_compressed(&self) -> bool {
        self.codec != CompressionCodec::None
    }

    /// Body bytes stored in the block
    pub fn wire_body_len(&self) -> u64 {
        if self.is_compressed() {
            self.compressed_length
        } else {
            self.uncompressed_length
        }
    }

    /// Header plus on-wire body
    pub fn record_len(&self) -> u64 {
        self.encoded_len() as u64 + self.wire_body_len()
    }

    /// Append the encoded header, including its trailing checksum
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.reserve(self.encoded_len());
        out.extend_from_slice(&RECORD_MAGIC.to_le_bytes());
        out.push(RECORD_FORMAT_VERSION);
        out.push(self.codec.tag());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&self.row_count.to_le_bytes());
        out.extend_from_slice(&(self.column_count() as u32).to_le_bytes());
        out.extend_from_slice(&self.uncompressed_length.to_le_bytes());
        out.extend_from_slice(&self.compressed_length.to_le_bytes());
        out.extend(self.column_types.iter().map(|t| t.tag()));
        for len in &self.column_lengths {
            out.extend_from_slice(&len.to_le_bytes());
        }
        out.extend_from_slice(&self.body_checksum.to_le_bytes());
        let header_checksum = crc32fast::hash(&out[start..]);
        out.extend_from_slice(&header_checksum.to_le_bytes());
    }

    /// Read and verify the header at the reader's cursor.
    ///
    /// `scratch` holds the variable part of the header while it is checked.
    /// On success the cursor sits at the first body byte.
    pub fn read_from(reader: &mut BlockReader<'_>, scratch: &mut Vec<u8>) -> Result<Self> {
        let record_offset = reader.offset();
        if reader.remaining() < FIXED_HEADER_LEN as u64 {
            return Err(SpillError::corrupted(format!(
                "truncated record header at offset {}: {} bytes left in {}",
                record_offset,
                reader.remaining(),
                reader.block_id()
            )));
        }
        let mut fixed = [0u8; FIXED_HEADER_LEN];
        reader.read_exact(&mut fixed)?;

        let mut cursor = ByteCursor::new(&fixed);
        let magic = cursor.u32()?;
        if magic != RECORD_MAGIC {
            return Err(SpillError::corrupted(format!(
                "bad record magic {:#010x} at offset {}",
                magic, record_offset
            )));
        }
        let version = cursor.u8()?;
        if version != RECORD_FORMAT_VERSION {
            return Err(SpillError::corrupted(format!(
                "unsupported record format version {}",
                version
            )));
        }
        let codec_tag = cursor.u8()?;
        let reserved = cursor.u16()?;
        let row_count = cursor.u32()?;
        let column_count = cursor.u32()? as usize;
        let uncompressed_length = cursor.u64()?;
        let compressed_length = cursor.u64()?;

        if column_count == 0 {
            return Err(SpillError::corrupted("record declares zero columns"));
        }
        let variable_len = (column_count as u64) * PER_COLUMN_LEN as u64 + CHECKSUMS_LEN as u64;
        if reader.remaining() < variable_len {
            return Err(SpillError::corrupted(format!(
                "truncated record header: {} columns need {} more bytes, {} left",
                column_count,
                variable_len,
                reader.remaining()
            )));
        }
        reader.read_into(variable_len as usize, scratch)?;

        let (covered, stored) = scratch.split_at(scratch.len() - 4);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&fixed);
        hasher.update(covered);
        let actual = hasher.finalize();
        let expected = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
        if actual != expected {
            return Err(SpillError::corrupted(format!(
                "header checksum mismatch at offset {}: stored {:#010x}, computed {:#010x}",
                record_offset, expected, actual
            )));
        }
        if reserved != 0 {
            return Err(SpillError::corrupted("reserved header bits are set"));
        }
        let codec = CompressionCodec::from_tag(codec_tag).ok_or_else(|| {
            SpillError::corrupted(format!("unknown compression codec tag {}", codec_tag))
        })?;

        let mut cursor = ByteCursor::new(covered);
        let mut column_types = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            let tag = cursor.u8()?;
            let ty = LogicalType::from_tag(tag).ok_or_else(|| {
                SpillError::corrupted(format!("unknown type tag {} for column {}", tag, idx))
            })?;
            column_types.push(ty);
        }
        let mut column_lengths = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            column_lengths.push(cursor.u64()?);
        }
        let body_checksum = cursor.u32()?;

        let header = Self {
            row_count,
            codec,
            uncompressed_length,
            compressed_length,
            column_types,
            column_lengths,
            body_checksum,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        let declared = self
            .column_lengths
            .iter()
            .try_fold(0u64, |acc, len| acc.checked_add(*len))
            .ok_or_else(|| SpillError::corrupted("column lengths overflow"))?;
        if declared != self.uncompressed_length {
            return Err(SpillError::corrupted(format!(
                "column lengths sum to {} but uncompressed length is {}",
                declared, self.uncompressed_length
            )));
        }
        if !self.is_compressed() && self.compressed_length != self.uncompressed_length {
            return Err(SpillError::corrupted(format!(
                "uncompressed record declares compressed length {} != {}",
                self.compressed_length, self.uncompressed_length
            )));
        }
        Ok(())
    }

    /// Fail unless `body` matches the stored body checksum
    pub fn verify_body(&self, body: &[u8]) -> Result<()> {
        let actual = crc32fast::hash(body);
        if actual != self.body_checksum {
            return Err(SpillError::corrupted(format!(
                "body checksum mismatch: stored {:#010x}, computed {:#010x}",
                self.body_checksum, actual
            )));
        }
        Ok(())
    }
}

// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Per-episode scratch buffers reused across serialize/deserialize calls

use super::record::RecordHeader;
use crate::core::{Result, SpillError, SpillOptions};

/// Counters accumulated over one spill episode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerdeStats {
    pub records_serialized: u64,
    pub records_deserialized: u64,
    pub rows_serialized: u64,
    pub rows_deserialized: u64,
    /// Encoded body bytes before compression
    pub bytes_encoded: u64,
    /// Record bytes appended to blocks (header + on-wire body)
    pub bytes_written: u64,
    /// Record bytes consumed from blocks
    pub bytes_read: u64,
    /// Records whose body went out compressed
    pub compressed_records: u64,
}

impl SerdeStats {
    /// Encoded bytes per written byte; 1.0 when nothing was written
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_written == 0 {
            1.0
        } else {
            self.bytes_encoded as f64 / self.bytes_written as f64
        }
    }
}

/// Scratch space owned by one operator for the duration of its spill episode.
///
/// Holds the serialization buffer (raw encoded body) and the compression
/// buffer (compressed body, or raw header bytes while decoding). The header
/// of the record being written and its encoded bytes are kept here too, so
/// serializing a chunk allocates nothing once the buffers have grown. Calls
/// take `&mut SerdeContext`, so one context can never serve two calls at once.
#[derive(Debug, Default)]
pub struct SerdeContext {
    pub(crate) serialize_buffer: Vec<u8>,
    pub(crate) compress_buffer: Vec<u8>,
    pub(crate) header: RecordHeader,
    pub(crate) header_buffer: Vec<u8>,
    stats: SerdeStats,
}

impl SerdeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size both scratch buffers
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            serialize_buffer: Vec::with_capacity(bytes),
            compress_buffer: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    pub fn for_options(options: &SpillOptions) -> Self {
        Self::with_capacity(options.initial_buffer_capacity)
    }

    pub fn stats(&self) -> &SerdeStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut SerdeStats {
        &mut self.stats
    }

    /// Bytes currently held by the scratch buffers
    pub fn scratch_capacity(&self) -> usize {
        self.serialize_buffer.capacity() + self.compress_buffer.capacity()
    }

    /// Give memory back between spill phases, keeping at most `bytes` per buffer
    pub fn shrink_to(&mut self, bytes: usize) {
        self.serialize_buffer.clear();
        self.compress_buffer.clear();
        self.serialize_buffer.shrink_to(bytes);
        self.compress_buffer.shrink_to(bytes);
    }
}

/// Clear `buf` and make room for `len` bytes, honouring an optional cap
pub(crate) fn reserve_scratch(buf: &mut Vec<u8>, len: usize, cap: Option<usize>) -> Result<()> {
    buf.clear();
    if let Some(cap) = cap {
        if len > cap {
            return Err(SpillError::ResourceExhausted(format!(
                "record body of {} bytes exceeds scratch buffer cap of {} bytes",
                len, cap
            )));
        }
    }
    buf.try_reserve(len)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_scratch_reuses_capacity() {
        let mut buf = Vec::with_capacity(1024);
        buf.extend_from_slice(&[1, 2, 3]);
        reserve_scratch(&mut buf, 512, None).unwrap();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 1024);
    }

    #[test]
    fn test_reserve_scratch_cap() {
        let mut buf = Vec::new();
        let err = reserve_scratch(&mut buf, 4096, Some(1024)).unwrap_err();
        assert!(matches!(err, SpillError::ResourceExhausted(_)));
        assert!(reserve_scratch(&mut buf, 1024, Some(1024)).is_ok());
    }

    #[test]
    fn test_shrink_to() {
        let mut ctx = SerdeContext::with_capacity(1 << 20);
        assert!(ctx.scratch_capacity() >= 2 << 20);
        ctx.shrink_to(4096);
        assert!(ctx.scratch_capacity() < 1 << 20);
    }

    #[test]
    fn test_compression_ratio() {
        let mut stats = SerdeStats::default();
        assert_eq!(stats.compression_ratio(), 1.0);
        stats.bytes_encoded = 400;
        stats.bytes_written = 100;
        assert_eq!(stats.compression_ratio(), 4.0);
    }
}

// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! In-memory blocks for tests and memory-backed spilling

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::{Block, BlockId, BlockManager};
use crate::core::{Result, SpillError};

#[derive(Debug)]
pub struct MemoryBlock {
    id: BlockId,
    data: Vec<u8>,
}

impl MemoryBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            data: Vec::new(),
        }
    }

    /// Wrap bytes produced elsewhere, e.g. a copied or damaged block
    pub fn from_bytes(id: BlockId, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Block for MemoryBlock {
    fn id(&self) -> BlockId {
        self.id
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn append(&mut self, parts: &[&[u8]]) -> Result<()> {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        // reserve up front so a failed growth leaves the block untouched
        self.data.try_reserve(total)?;
        for part in parts {
            self.data.extend_from_slice(part);
        }
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = usize::try_from(offset).map_err(|_| out_of_range(self.id, offset, buf.len()))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| out_of_range(self.id, offset, buf.len()))?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}

fn out_of_range(id: BlockId, offset: u64, len: usize) -> SpillError {
    SpillError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("{}: read of {} bytes at offset {} out of range", id, len, offset),
    ))
}

/// Hands out [`MemoryBlock`]s with increasing ids
#[derive(Debug, Default)]
pub struct MemoryBlockManager {
    next_id: AtomicU64,
    live_blocks: AtomicUsize,
}

impl MemoryBlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks acquired and not yet released
    pub fn live_blocks(&self) -> usize {
        self.live_blocks.load(Ordering::Relaxed)
    }
}

impl BlockManager for MemoryBlockManager {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn acquire_block(&self) -> Result<Box<dyn Block>> {
        let id = BlockId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.live_blocks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("acquired in-memory {}", id);
        Ok(Box::new(MemoryBlock::new(id)))
    }

    fn release_block(&self, block: Box<dyn Block>) -> Result<()> {
        tracing::trace!("released in-memory {} ({} bytes)", block.id(), block.len());
        self.live_blocks.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read() {
        let mut block = MemoryBlock::new(BlockId(3));
        block.append(&[&b"abc"[..], &b""[..], &b"de"[..]]).unwrap();
        assert_eq!(block.len(), 5);
        let mut buf = [0u8; 3];
        block.read_at(2, &mut buf).unwrap();
        assert_eq!(&buf, b"cde");
        assert!(block.read_at(4, &mut buf).is_err());
        assert!(block.read_at(u64::MAX, &mut buf).is_err());
    }

    #[test]
    fn test_manager_ids_and_live_count() {
        let manager = MemoryBlockManager::new();
        let a = manager.acquire_block().unwrap();
        let b = manager.acquire_block().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(manager.live_blocks(), 2);
        manager.release_block(a).unwrap();
        assert_eq!(manager.live_blocks(), 1);
        assert_eq!(manager.name(), "memory");
    }
}

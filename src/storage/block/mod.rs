// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Spill block abstraction
//!
//! A block is an append-only byte container owned by a [`BlockManager`].
//! Serde strategies only ever append whole records to it and read it back
//! sequentially through a [`BlockReader`] cursor.

pub mod local;
pub mod memory;

use std::fmt;

use crate::core::{Result, SpillError};

pub use local::{LocalBlock, LocalBlockConfig, LocalBlockManager};
pub use memory::{MemoryBlock, MemoryBlockManager};

/// Identifier of a block within its manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block-{:08}", self.0)
    }
}

/// Append-only, randomly readable byte region
pub trait Block: Send + Sync + fmt::Debug {
    fn id(&self) -> BlockId;

    /// Bytes appended so far
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append all `parts` back to back.
    ///
    /// Either every part becomes visible or, on error, none of them does.
    fn append(&mut self, parts: &[&[u8]]) -> Result<()>;

    /// Fill `buf` with the bytes starting at `offset`
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Push appended bytes to the underlying medium
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Allocates and releases spill blocks; shared across operator threads
pub trait BlockManager: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn acquire_block(&self) -> Result<Box<dyn Block>>;

    fn release_block(&self, block: Box<dyn Block>) -> Result<()>;
}

/// Sequential read cursor over a block
#[derive(Debug)]
pub struct BlockReader<'a> {
    block: &'a dyn Block,
    offset: u64,
}

impl<'a> BlockReader<'a> {
    pub fn new(block: &'a dyn Block) -> Self {
        Self::at(block, 0)
    }

    pub fn at(block: &'a dyn Block, offset: u64) -> Self {
        Self { block, offset }
    }

    pub fn block_id(&self) -> BlockId {
        self.block.id()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn remaining(&self) -> u64 {
        self.block.len().saturating_sub(self.offset)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if (buf.len() as u64) > self.remaining() {
            return Err(SpillError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "{}: read of {} bytes at offset {} past end ({} bytes)",
                    self.block.id(),
                    buf.len(),
                    self.offset,
                    self.block.len()
                ),
            )));
        }
        self.block.read_at(self.offset, buf)?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    /// Replace the contents of `out` with the next `len` bytes
    pub fn read_into(&mut self, len: usize, out: &mut Vec<u8>) -> Result<()> {
        out.clear();
        out.try_reserve(len)?;
        out.resize(len, 0);
        self.read_exact(out)
    }

    pub fn skip(&mut self, len: u64) -> Result<()> {
        if len > self.remaining() {
            return Err(SpillError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("{}: cannot skip {} bytes", self.block.id(), len),
            )));
        }
        self.offset += len;
        Ok(())
    }
}

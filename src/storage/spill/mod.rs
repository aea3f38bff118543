// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Spill serialization
//!
//! Operators that run out of memory hand whole chunks to a [`Serde`], which
//! appends one self-describing record per chunk to a spill block and later
//! rebuilds the chunks from it. Strategies are immutable and shared through
//! [`SerdePtr`]; every mutable byte lives in the caller's [`SerdeContext`].

pub mod columnar;
pub mod compression;
pub mod context;
pub mod factory;
pub mod record;

use std::sync::Arc;

use crate::core::{Chunk, Result, SerdeKind};
use crate::storage::block::{Block, BlockReader};

pub use columnar::ColumnarSerde;
pub use context::{SerdeContext, SerdeStats};
pub use factory::{create_serde, SerdeFactory, SerdeInfo};
pub use record::{RecordHeader, RECORD_FORMAT_VERSION, RECORD_MAGIC};

/// Serialize/deserialize contract every spill layout implements
pub trait ChunkSerde: Send + Sync {
    fn kind(&self) -> SerdeKind;

    /// Append `chunk` to `block` as exactly one record.
    ///
    /// The chunk is only read. On error nothing is counted as written.
    fn serialize(&self, ctx: &mut SerdeContext, chunk: &Chunk, block: &mut dyn Block) -> Result<()>;

    /// Decode the record at the reader's cursor and advance past it
    fn deserialize(&self, ctx: &mut SerdeContext, reader: &mut BlockReader<'_>) -> Result<Chunk>;

    /// Decode every record in `block`, in write order
    fn deserialize_all(&self, ctx: &mut SerdeContext, block: &dyn Block) -> Result<Vec<Chunk>> {
        let mut reader = BlockReader::new(block);
        let mut chunks = Vec::new();
        while !reader.is_exhausted() {
            chunks.push(self.deserialize(ctx, &mut reader)?);
        }
        Ok(chunks)
    }
}

/// Closed set of serde strategies, one variant per [`SerdeKind`]
#[derive(Debug, Clone, PartialEq)]
pub enum Serde {
    Columnar(ColumnarSerde),
}

impl ChunkSerde for Serde {
    fn kind(&self) -> SerdeKind {
        match self {
            Self::Columnar(serde) => serde.kind(),
        }
    }

    fn serialize(&self, ctx: &mut SerdeContext, chunk: &Chunk, block: &mut dyn Block) -> Result<()> {
        match self {
            Self::Columnar(serde) => serde.serialize(ctx, chunk, block),
        }
    }

    fn deserialize(&self, ctx: &mut SerdeContext, reader: &mut BlockReader<'_>) -> Result<Chunk> {
        match self {
            Self::Columnar(serde) => serde.deserialize(ctx, reader),
        }
    }
}

/// Serde shared by every operator thread of a query
pub type SerdePtr = Arc<Serde>;
